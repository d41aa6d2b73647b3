//! Span-carrying futures for suspending calls.
//!
//! A wrapped suspending call keeps its span open for the entire delegated
//! execution, including internal suspensions, so elapsed-time attribution
//! is wall-clock-correct. The span is started on first poll, re-attached
//! as the current span on every poll, closed on completion, and — if the
//! future is dropped before completing — closed from the drop path with
//! the cancellation recorded as an exception-equivalent event.

use std::borrow::Cow;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::thread;

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, ContextGuard, KeyValue};
use pin_project_lite::pin_project;

use crate::options::InstrumentOptions;
use crate::outcome::record_failure_event;
use crate::scope::{record_panic, start_span};
use crate::target::FnTarget;

/// Wraps a future so it executes inside a span for `target`.
///
/// This is the suspending counterpart of [`SpanScope`]: the `#[instrument]`
/// macro expands `async fn` bodies through it, and it can be used directly
/// to trace a block:
///
/// ```
/// use otel_instrument::{fn_target, with_span, InstrumentOptions};
///
/// # async fn load() -> u64 { 7 }
/// # async fn demo() -> u64 {
/// with_span(fn_target!("load"), InstrumentOptions::default(), async { load().await }).await
/// # }
/// ```
///
/// [`SpanScope`]: crate::SpanScope
pub fn with_span<F>(target: FnTarget, options: InstrumentOptions, inner: F) -> WithSpan<F>
where
    F: Future,
{
    WithSpan {
        inner,
        lifecycle: SpanLifecycle::from_options(target, options),
    }
}

/// Like [`with_span`], but records an `Err` output onto the span before
/// closing it.
pub fn try_with_span<F, T, E>(
    target: FnTarget,
    options: InstrumentOptions,
    inner: F,
) -> TryWithSpan<F>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    TryWithSpan {
        inner,
        lifecycle: SpanLifecycle::from_options(target, options),
    }
}

/// Where a pending invocation stands in its span's life.
enum Phase {
    /// Not polled yet; no span exists.
    Pending,
    /// Span started and owned by the contained context.
    Entered(Context),
    /// Span closed.
    Closed,
    /// Target is ignored; polls pass straight through.
    Bypassed,
}

/// The non-pinned state shared by [`WithSpan`] and [`TryWithSpan`].
pub(crate) struct SpanLifecycle {
    tracer: Option<Arc<BoxedTracer>>,
    target: FnTarget,
    span_name: Option<Cow<'static, str>>,
    attributes: Vec<KeyValue>,
    record_exception: bool,
    phase: Phase,
}

impl SpanLifecycle {
    pub(crate) fn from_options(target: FnTarget, mut options: InstrumentOptions) -> SpanLifecycle {
        SpanLifecycle {
            tracer: options.take_tracer().map(Arc::new),
            target,
            span_name: options.span_name_cow(),
            attributes: options.attributes().to_vec(),
            record_exception: options.record_exception(),
            phase: if options.ignore() {
                Phase::Bypassed
            } else {
                Phase::Pending
            },
        }
    }

    pub(crate) fn with_tracer(
        tracer: Arc<BoxedTracer>,
        target: FnTarget,
        span_name: Option<Cow<'static, str>>,
        attributes: Vec<KeyValue>,
        record_exception: bool,
        ignore: bool,
    ) -> SpanLifecycle {
        SpanLifecycle {
            tracer: Some(tracer),
            target,
            span_name,
            attributes,
            record_exception,
            phase: if ignore { Phase::Bypassed } else { Phase::Pending },
        }
    }

    fn start(&self) -> Context {
        let span_name = self.span_name.as_deref();
        match &self.tracer {
            Some(tracer) => start_span(tracer, &self.target, span_name, &self.attributes),
            None => {
                let tracer = global::tracer(self.target.module_path());
                start_span(&tracer, &self.target, span_name, &self.attributes)
            }
        }
    }

    /// Starts the span on first use and attaches it for the current poll.
    fn enter(&mut self) -> Option<ContextGuard> {
        if matches!(self.phase, Phase::Pending) {
            let cx = self.start();
            self.phase = Phase::Entered(cx);
        }
        match &self.phase {
            Phase::Entered(cx) => Some(cx.clone().attach()),
            _ => None,
        }
    }

    /// Runs `f` against the active span, if any.
    fn with_span_ref<F>(&self, f: F)
    where
        F: FnOnce(&opentelemetry::trace::SpanRef<'_>),
    {
        if let Phase::Entered(cx) = &self.phase {
            f(&cx.span());
        }
    }

    /// Closes the span after the delegated call completed.
    fn complete(&mut self) {
        if let Phase::Entered(cx) = std::mem::replace(&mut self.phase, Phase::Closed) {
            cx.span().end();
        }
    }

    /// Closes the span from a drop without completion: a cancellation, or
    /// a panic unwinding through the owner.
    fn abandon(&mut self) {
        if let Phase::Entered(cx) = std::mem::replace(&mut self.phase, Phase::Closed) {
            let span = cx.span();
            if thread::panicking() {
                record_panic(&span, self.record_exception);
            } else if self.record_exception {
                record_failure_event(
                    &span,
                    "cancelled",
                    "call dropped before completion".to_string(),
                );
            } else {
                span.set_status(opentelemetry::trace::Status::error(
                    "call dropped before completion",
                ));
            }
            span.end();
        }
    }
}

pin_project! {
    /// A future that executes inside a span.
    ///
    /// Created by [`with_span`] or by calling an
    /// [`InstrumentedAsync`](crate::InstrumentedAsync) wrapper.
    pub struct WithSpan<F> {
        #[pin]
        inner: F,
        lifecycle: SpanLifecycle,
    }

    impl<F> PinnedDrop for WithSpan<F> {
        fn drop(this: Pin<&mut Self>) {
            this.project().lifecycle.abandon();
        }
    }
}

impl<F: Future> Future for WithSpan<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, task_cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _guard = this.lifecycle.enter();
        match this.inner.poll(task_cx) {
            Poll::Ready(output) => {
                this.lifecycle.complete();
                Poll::Ready(output)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

pin_project! {
    /// A future that executes inside a span and records an `Err` output.
    ///
    /// Created by [`try_with_span`] or by
    /// [`InstrumentedAsync::try_call`](crate::InstrumentedAsync::try_call).
    pub struct TryWithSpan<F> {
        #[pin]
        inner: F,
        lifecycle: SpanLifecycle,
    }

    impl<F> PinnedDrop for TryWithSpan<F> {
        fn drop(this: Pin<&mut Self>) {
            this.project().lifecycle.abandon();
        }
    }
}

impl<F, T, E> Future for TryWithSpan<F>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, task_cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _guard = this.lifecycle.enter();
        match this.inner.poll(task_cx) {
            Poll::Ready(output) => {
                if this.lifecycle.record_exception {
                    if let Err(err) = &output {
                        this.lifecycle.with_span_ref(|span| {
                            record_failure_event(span, std::any::type_name::<E>(), err.to_string());
                        });
                    }
                }
                this.lifecycle.complete();
                Poll::Ready(output)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<F> WithSpan<F> {
    pub(crate) fn from_lifecycle(inner: F, lifecycle: SpanLifecycle) -> WithSpan<F> {
        WithSpan { inner, lifecycle }
    }
}

impl<F> TryWithSpan<F> {
    pub(crate) fn from_lifecycle(inner: F, lifecycle: SpanLifecycle) -> TryWithSpan<F> {
        TryWithSpan { inner, lifecycle }
    }
}
