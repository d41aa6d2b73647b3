//! Per-target instrumentation options.

use std::borrow::Cow;
use std::fmt;

use opentelemetry::global::BoxedTracer;
use opentelemetry::KeyValue;

/// Options applied to a single instrumentation target.
///
/// Options are fixed at configuration time; re-wrapping an already wrapped
/// callable keeps the first wrap's options (see the crate docs on
/// idempotence).
///
/// ```
/// use otel_instrument::{InstrumentOptions, KeyValue};
///
/// let options = InstrumentOptions::default()
///     .with_span_name("fetch user")
///     .with_attributes([KeyValue::new("tier", "backend")]);
/// ```
pub struct InstrumentOptions {
    span_name: Option<Cow<'static, str>>,
    record_exception: bool,
    attributes: Vec<KeyValue>,
    tracer: Option<BoxedTracer>,
    ignore: bool,
}

impl Default for InstrumentOptions {
    fn default() -> Self {
        InstrumentOptions {
            span_name: None,
            record_exception: true,
            attributes: Vec::new(),
            tracer: None,
            ignore: false,
        }
    }
}

impl InstrumentOptions {
    /// Overrides the span's display name, bypassing the naming scheme.
    pub fn with_span_name<T>(mut self, span_name: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.span_name = Some(span_name.into());
        self
    }

    /// Sets whether failures (error returns, panics, cancellations) are
    /// recorded onto the span. Defaults to `true`.
    pub fn with_record_exception(mut self, record_exception: bool) -> Self {
        self.record_exception = record_exception;
        self
    }

    /// Adds per-target attributes, attached to every span for this target.
    /// They override process-wide default attributes on key collision.
    pub fn with_attributes<I>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        self.attributes.extend(attributes);
        self
    }

    /// Uses the given tracer instead of the one derived from the target's
    /// module path.
    pub fn with_tracer(mut self, tracer: BoxedTracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Marks the target as excluded: calls pass straight through and no
    /// span is emitted.
    pub fn with_ignore(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }

    pub(crate) fn span_name(&self) -> Option<&str> {
        self.span_name.as_deref()
    }

    pub(crate) fn record_exception(&self) -> bool {
        self.record_exception
    }

    pub(crate) fn attributes(&self) -> &[KeyValue] {
        &self.attributes
    }

    pub(crate) fn tracer(&self) -> Option<&BoxedTracer> {
        self.tracer.as_ref()
    }

    pub(crate) fn take_tracer(&mut self) -> Option<BoxedTracer> {
        self.tracer.take()
    }

    pub(crate) fn ignore(&self) -> bool {
        self.ignore
    }

    pub(crate) fn span_name_cow(&self) -> Option<Cow<'static, str>> {
        self.span_name.clone()
    }
}

impl fmt::Debug for InstrumentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentOptions")
            .field("span_name", &self.span_name)
            .field("record_exception", &self.record_exception)
            .field("attributes", &self.attributes)
            .field("tracer", &self.tracer.as_ref().map(|_| "BoxedTracer"))
            .field("ignore", &self.ignore)
            .finish()
    }
}
