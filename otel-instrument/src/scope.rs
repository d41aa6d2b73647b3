//! Scoped span acquisition for synchronous calls.

use std::thread;

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::{Span, SpanRef, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, ContextGuard, KeyValue};
use opentelemetry_semantic_conventions::attribute::{
    CODE_FILE_PATH, CODE_FUNCTION_NAME, CODE_LINE_NUMBER, CODE_NAMESPACE,
};

use crate::options::InstrumentOptions;
use crate::outcome::record_failure_event;
use crate::target::FnTarget;
use crate::{policy, util};

/// Builds the attribute set for one invocation: code-location semantic
/// attributes, then the process-wide defaults, then the per-target
/// attributes. Later writers win per key, and the result holds each key at
/// most once so the exported span carries a single value per key.
pub(crate) fn invocation_attributes(target: &FnTarget, extra: &[KeyValue]) -> Vec<KeyValue> {
    let mut attributes = vec![
        KeyValue::new(CODE_NAMESPACE, target.module_path()),
        KeyValue::new(CODE_FUNCTION_NAME, target.qualified_name()),
        KeyValue::new(CODE_FILE_PATH, target.file()),
        KeyValue::new(CODE_LINE_NUMBER, target.line() as i64),
    ];
    for attribute in policy::default_attributes() {
        util::merge_attribute(&mut attributes, attribute);
    }
    for attribute in extra {
        util::merge_attribute(&mut attributes, attribute.clone());
    }
    attributes
}

/// Starts a span for one invocation of `target` and returns a context with
/// the span attached as active, parented to the current context.
///
/// The display name is resolved here, at call time: the explicit
/// `span_name` if one was configured, otherwise the current process-wide
/// naming scheme applied to the target.
pub(crate) fn start_span(
    tracer: &BoxedTracer,
    target: &FnTarget,
    span_name: Option<&str>,
    extra: &[KeyValue],
) -> Context {
    let name = match span_name {
        Some(name) => name.to_string(),
        None => policy::span_name_for(target),
    };
    let mut span = tracer.start(name);
    span.set_attributes(invocation_attributes(target, extra));
    Context::current_with_span(span)
}

/// Records a panic unwinding through a wrapper.
pub(crate) fn record_panic(span: &SpanRef<'_>, record_exception: bool) {
    if record_exception {
        record_failure_event(span, "panic", "call panicked".to_string());
    } else {
        span.set_status(Status::error("call panicked"));
    }
}

/// A span held open for the duration of one synchronous call.
///
/// Entering the scope starts the span, attaches its attributes, and makes
/// it the current span; dropping the scope closes it. Closure is
/// guaranteed on every exit path: ordinary return, early return, and
/// unwinding. A panic unwinding through the scope is recorded as an
/// exception-equivalent event when `record_exception` is set.
///
/// The scope holds a thread-local context guard and is therefore not
/// `Send`.
pub struct SpanScope {
    cx: Context,
    record_exception: bool,
    closed: bool,
    // Held for the detach on drop; must outlive the fields above.
    _guard: ContextGuard,
}

impl SpanScope {
    /// Starts a span for `target` using the options' explicit tracer, or
    /// one scoped to the target's module path. The module-derived tracer
    /// is stable across repeated calls for targets of the same module.
    pub fn enter(target: &FnTarget, options: &InstrumentOptions) -> SpanScope {
        match options.tracer() {
            Some(tracer) => SpanScope::enter_with(tracer, target, options),
            None => {
                let tracer = global::tracer(target.module_path());
                SpanScope::enter_with(&tracer, target, options)
            }
        }
    }

    /// Starts a span for `target` with an explicit tracer.
    pub fn enter_with(
        tracer: &BoxedTracer,
        target: &FnTarget,
        options: &InstrumentOptions,
    ) -> SpanScope {
        let cx = start_span(tracer, target, options.span_name(), options.attributes());
        let guard = cx.clone().attach();
        SpanScope {
            cx,
            record_exception: options.record_exception(),
            closed: false,
            _guard: guard,
        }
    }

    /// A reference to the scope's span.
    pub fn span(&self) -> SpanRef<'_> {
        self.cx.span()
    }

    /// Whether failures should be recorded onto this scope's span.
    pub fn records_exceptions(&self) -> bool {
        self.record_exception
    }

    /// Closes the span and detaches it from the current context.
    pub fn finish(mut self) {
        self.closed = true;
        self.cx.span().end();
    }
}

impl Drop for SpanScope {
    fn drop(&mut self) {
        if !self.closed {
            let span = self.cx.span();
            if thread::panicking() {
                record_panic(&span, self.record_exception);
            }
            span.end();
        }
    }
}
