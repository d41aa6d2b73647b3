//! Wrapper-builder API: replaces a callable with a span-emitting callable
//! of the same calling convention.

use std::fmt;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use opentelemetry::global::{self, BoxedTracer};

use crate::callable::Callable;
use crate::future::{SpanLifecycle, TryWithSpan, WithSpan};
use crate::options::InstrumentOptions;
use crate::outcome::record_failure_event;
use crate::scope::SpanScope;
use crate::target::FnTarget;

fn resolve_tracer(options: &mut InstrumentOptions, target: &FnTarget) -> Arc<BoxedTracer> {
    match options.take_tracer() {
        Some(tracer) => Arc::new(tracer),
        None => Arc::new(global::tracer(target.module_path())),
    }
}

/// A synchronous callable wrapped in span instrumentation.
///
/// Implements [`Callable`] with the original's argument and output types;
/// the original remains reachable through [`inner`](Instrumented::inner).
pub struct Instrumented<F> {
    inner: F,
    target: FnTarget,
    options: InstrumentOptions,
    tracer: Arc<BoxedTracer>,
}

impl<F> Instrumented<F> {
    pub(crate) fn new(inner: F, target: FnTarget, mut options: InstrumentOptions) -> Self {
        let tracer = resolve_tracer(&mut options, &target);
        Instrumented {
            inner,
            target,
            options,
            tracer,
        }
    }

    /// The original, unwrapped callable.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// The target metadata captured at configuration time.
    pub fn target(&self) -> &FnTarget {
        &self.target
    }

    /// Re-applying instrumentation to a wrapped callable is a no-op: the
    /// wrapper is returned unchanged and the *first* wrap's target and
    /// options silently win. This inherent method shadows
    /// [`Instrument::instrument`] for wrapper receivers.
    pub fn instrument(self, _target: FnTarget, _options: InstrumentOptions) -> Instrumented<F> {
        self
    }

    /// Invokes the wrapped callable, recording an `Err` output onto the
    /// span before propagating it unchanged.
    pub fn try_call<Args, T, E>(&self, args: Args) -> Result<T, E>
    where
        F: Callable<Args, Output = Result<T, E>>,
        E: Display,
    {
        if self.options.ignore() {
            return self.inner.call(args);
        }
        let scope = SpanScope::enter_with(&self.tracer, &self.target, &self.options);
        let output = self.inner.call(args);
        if scope.records_exceptions() {
            if let Err(err) = &output {
                record_failure_event(&scope.span(), std::any::type_name::<E>(), err.to_string());
            }
        }
        scope.finish();
        output
    }
}

impl<F, Args> Callable<Args> for Instrumented<F>
where
    F: Callable<Args>,
{
    type Output = F::Output;

    fn call(&self, args: Args) -> F::Output {
        if self.options.ignore() {
            return self.inner.call(args);
        }
        let scope = SpanScope::enter_with(&self.tracer, &self.target, &self.options);
        let output = self.inner.call(args);
        scope.finish();
        output
    }
}

impl<F> fmt::Debug for Instrumented<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrumented")
            .field("target", &self.target)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A suspending callable wrapped in span instrumentation.
///
/// Calling it yields a [`WithSpan`] future of the original's output; the
/// span opens when the future is first polled and stays open across
/// suspensions until the delegated call completes.
pub struct InstrumentedAsync<F> {
    inner: F,
    target: FnTarget,
    options: InstrumentOptions,
    tracer: Arc<BoxedTracer>,
}

impl<F> InstrumentedAsync<F> {
    pub(crate) fn new(inner: F, target: FnTarget, mut options: InstrumentOptions) -> Self {
        let tracer = resolve_tracer(&mut options, &target);
        InstrumentedAsync {
            inner,
            target,
            options,
            tracer,
        }
    }

    /// The original, unwrapped callable.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// The target metadata captured at configuration time.
    pub fn target(&self) -> &FnTarget {
        &self.target
    }

    /// Re-applying instrumentation to a wrapped callable is a no-op; the
    /// first wrap's target and options silently win. Shadows
    /// [`InstrumentAsync::instrument_async`] for wrapper receivers.
    pub fn instrument_async(
        self,
        _target: FnTarget,
        _options: InstrumentOptions,
    ) -> InstrumentedAsync<F> {
        self
    }

    fn lifecycle(&self) -> SpanLifecycle {
        SpanLifecycle::with_tracer(
            self.tracer.clone(),
            self.target,
            self.options.span_name_cow(),
            self.options.attributes().to_vec(),
            self.options.record_exception(),
            self.options.ignore(),
        )
    }

    /// Invokes the wrapped callable, recording an `Err` output of the
    /// returned future onto the span before propagating it unchanged.
    pub fn try_call<Args, T, E>(&self, args: Args) -> TryWithSpan<F::Output>
    where
        F: Callable<Args>,
        F::Output: Future<Output = Result<T, E>>,
        E: Display,
    {
        TryWithSpan::from_lifecycle(self.inner.call(args), self.lifecycle())
    }
}

impl<F, Args> Callable<Args> for InstrumentedAsync<F>
where
    F: Callable<Args>,
    F::Output: Future,
{
    type Output = WithSpan<F::Output>;

    fn call(&self, args: Args) -> Self::Output {
        WithSpan::from_lifecycle(self.inner.call(args), self.lifecycle())
    }
}

impl<F> fmt::Debug for InstrumentedAsync<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedAsync")
            .field("target", &self.target)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Wraps a synchronous callable in span instrumentation.
///
/// The tracer is resolved once, here: the options' explicit tracer if one
/// was given, otherwise one scoped to the target's module path.
///
/// ```
/// use otel_instrument::{fn_target, Callable, Instrument, InstrumentOptions};
///
/// let double = (|x: i64| x * 2).instrument(fn_target!("double"), InstrumentOptions::default());
/// assert_eq!(double.call((21,)), 42);
/// ```
pub trait Instrument<Args>: Callable<Args> + Sized {
    /// Returns a wrapped callable with the same calling convention.
    fn instrument(self, target: FnTarget, options: InstrumentOptions) -> Instrumented<Self> {
        Instrumented::new(self, target, options)
    }
}

impl<F, Args> Instrument<Args> for F where F: Callable<Args> {}

/// Wraps a suspending callable (one returning a future) in span
/// instrumentation.
///
/// ```
/// use otel_instrument::{fn_target, Callable, InstrumentAsync, InstrumentOptions};
///
/// # async fn demo() -> u64 {
/// let fetch = (|id: u64| async move { id + 1 })
///     .instrument_async(fn_target!("fetch"), InstrumentOptions::default());
/// fetch.call((41,)).await
/// # }
/// ```
pub trait InstrumentAsync<Args>: Callable<Args> + Sized
where
    <Self as Callable<Args>>::Output: Future,
{
    /// Returns a wrapped callable whose futures run inside a span.
    fn instrument_async(
        self,
        target: FnTarget,
        options: InstrumentOptions,
    ) -> InstrumentedAsync<Self> {
        InstrumentedAsync::new(self, target, options)
    }
}

impl<F, Args> InstrumentAsync<Args> for F
where
    F: Callable<Args>,
    <F as Callable<Args>>::Output: Future,
{
}
