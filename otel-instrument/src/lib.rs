//! Span-per-call instrumentation wrappers for [OpenTelemetry].
//!
//! This crate decorates callables — functions, closures, and the methods
//! of a type — so that every invocation runs inside an observability span
//! carrying code-location semantic attributes, process-wide default
//! attributes, and per-target attributes, without altering the callable's
//! visible signature, return value, or error behavior.
//!
//! # Overview
//!
//! * [`Instrument`] / [`InstrumentAsync`] wrap a callable at configuration
//!   time and return a replacement with the same [`Callable`] convention.
//! * [`SpanScope`] and [`with_span`] are the underlying scoped-acquisition
//!   primitives for the synchronous and suspending call shapes; the
//!   `#[instrument]` attribute macro in `otel-instrument-macros` expands
//!   to them.
//! * [`policy`] holds the process-wide naming scheme and default
//!   attributes, read lazily on every wrapped call.
//!
//! ```
//! use otel_instrument::{fn_target, Callable, Instrument, InstrumentOptions, KeyValue};
//!
//! let fetch = |id: u64| format!("user-{id}");
//! let fetch = fetch.instrument(
//!     fn_target!("fetch"),
//!     InstrumentOptions::default().with_attributes([KeyValue::new("tier", "backend")]),
//! );
//!
//! // Same arguments, same return value; one span per call.
//! assert_eq!(fetch.call((7,)), "user-7");
//! ```
//!
//! # Idempotence
//!
//! A callable is wrapped at most once: applying `instrument` to an
//! already-wrapped callable returns the wrapper unchanged, and the first
//! wrap's options win silently, even when the second application names
//! different options. This mirrors the behavior of stacking a class-level
//! and a function-level `#[instrument]` attribute, where the method-level
//! attribute wins.
//!
//! # Failure recording
//!
//! With `record_exception` enabled (the default), failures are recorded
//! onto the span as an `exception` event before propagating unchanged:
//! `Err` returns (through [`Instrumented::try_call`],
//! [`InstrumentedAsync::try_call`], or the macro's return probe), panics
//! unwinding through the call, and suspending calls dropped before
//! completion. The wrapper never swallows an error; callers observe
//! exactly what they would without instrumentation.
//!
//! [OpenTelemetry]: https://opentelemetry.io

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod callable;
mod future;
mod options;
pub mod outcome;
pub mod policy;
mod scope;
mod target;
mod util;
mod wrap;

pub use callable::Callable;
pub use future::{try_with_span, with_span, TryWithSpan, WithSpan};
pub use options::InstrumentOptions;
pub use scope::SpanScope;
pub use target::FnTarget;
pub use wrap::{Instrument, InstrumentAsync, Instrumented, InstrumentedAsync};

// Re-exported for wrapped-call attribute construction (and macro-generated
// code) without a direct `opentelemetry` dependency at the call site.
pub use opentelemetry::KeyValue;

#[doc(hidden)]
pub mod __private {
    pub use opentelemetry::trace::get_active_span;
}

#[cfg(feature = "internal-logs")]
#[doc(hidden)]
pub mod _private_logs {
    pub use tracing::debug;
}

/// Internal debug logging, emitted through `tracing` when the
/// `internal-logs` feature is enabled and compiled out otherwise.
#[doc(hidden)]
#[macro_export]
macro_rules! inst_debug {
    (name: $name:expr $(,)?) => {
        #[cfg(feature = "internal-logs")]
        {
            $crate::_private_logs::debug!(name: $name, target: env!("CARGO_PKG_NAME"), name = $name);
        }
        #[cfg(not(feature = "internal-logs"))]
        {
            let _ = $name;
        }
    };
    (name: $name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        #[cfg(feature = "internal-logs")]
        {
            $crate::_private_logs::debug!(name: $name, target: env!("CARGO_PKG_NAME"), name = $name, $($key = $value),+);
        }
        #[cfg(not(feature = "internal-logs"))]
        {
            let _ = ($name, $($value),+);
        }
    };
}
