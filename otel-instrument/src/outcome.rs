//! Recording of failed outcomes onto the active span.
//!
//! Rust has no exceptions, so "recording the exception" covers the three
//! failure shapes a wrapper can observe: an `Err` return value, a panic
//! unwinding through the call, and an async call dropped before
//! completion. All three are recorded as an `exception` event plus an
//! error status when the target's `record_exception` option is set;
//! panics and cancellations still set the error status when it is not.
//!
//! `Err` returns are probed through a pair of traits resolved by auto-ref
//! method resolution: `(&output).record_failure(..)` picks
//! [`FallibleOutcome`] when the concrete output type is a `Result` and the
//! no-op [`InfallibleOutcome`] otherwise. The probe therefore only works
//! where the output type is concrete — the `#[instrument]` macro expansion
//! and the `try_call` entry points; a generic context always resolves to
//! the no-op.

use std::fmt::Display;

use opentelemetry::trace::{SpanRef, Status};
use opentelemetry::KeyValue;
use opentelemetry_semantic_conventions::attribute::{EXCEPTION_MESSAGE, EXCEPTION_TYPE};

/// Records a failure as an `exception` event and marks the span's status
/// as error.
pub(crate) fn record_failure_event(span: &SpanRef<'_>, type_name: &'static str, message: String) {
    span.add_event(
        "exception",
        vec![
            KeyValue::new(EXCEPTION_TYPE, type_name),
            KeyValue::new(EXCEPTION_MESSAGE, message.clone()),
        ],
    );
    span.set_status(Status::error(message));
}

/// Probe implementation for `Result` outputs: records the `Err` variant.
pub trait FallibleOutcome {
    /// Records this outcome onto `span` if it is a failure.
    fn record_failure(&self, span: &SpanRef<'_>);
}

impl<T, E> FallibleOutcome for Result<T, E>
where
    E: Display,
{
    fn record_failure(&self, span: &SpanRef<'_>) {
        if let Err(err) = self {
            record_failure_event(span, std::any::type_name::<E>(), err.to_string());
        }
    }
}

/// Fallback probe for outputs that carry no failure: does nothing.
pub trait InfallibleOutcome {
    /// No-op; non-`Result` outputs have no failure to record.
    fn record_failure(&self, _span: &SpanRef<'_>) {}
}

impl<T> InfallibleOutcome for &T {}
