//! `#[instrument]` attribute macro for the `otel-instrument` wrappers.

use proc_macro::TokenStream;

use syn::{parse_macro_input, Item};

mod expand;

use crate::expand::InstrumentArgs;

/// Instruments a function, or every public method of an impl block, with
/// a tracing span.
///
/// Supported arguments:
///
/// * `span_name = "..."` — explicit span name, bypassing the naming
///   scheme. Not allowed on impl blocks.
/// * `record_exception = <bool>` — whether failures (`Err` returns,
///   panics, cancellations) are recorded onto the span. Defaults to
///   `true`.
/// * `attributes(key = "value", ...)` — per-target span attributes. Keys
///   are identifiers; dotted keys must go through
///   `InstrumentOptions::with_attributes`.
/// * `ignore` — leaves the item unmodified.
///
/// On an impl block, every method whose name does not start with `_` is
/// instrumented with the block's arguments minus `span_name`; methods
/// carrying their own `#[instrument]` attribute (bare or spelled
/// `otel_instrument_macros::instrument`) keep it, and the method-level
/// options win. Attributes from other crates that end in `instrument`,
/// such as `#[tracing::instrument]`, do not suppress expansion.
/// Associated functions without `self` are instrumented like any other
/// method and remain associated.
///
/// Spans are created through the tracer scoped to the enclosing module
/// path; explicit tracer overrides are only available through the
/// `otel-instrument` builder API.
///
/// ```ignore
/// #[instrument(attributes(tier = "backend"))]
/// async fn fetch_user(id: u64) -> Result<User, FetchError> {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn instrument(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match InstrumentArgs::parse(attr.into()) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error().into(),
    };
    let item = parse_macro_input!(item as Item);
    expand::expand(args, item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
