// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::LazyLock;

use opentelemetry::global;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};

static EXPORTER: LazyLock<InMemorySpanExporter> = LazyLock::new(|| {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    global::set_tracer_provider(provider);
    exporter
});

/// Installs the shared in-memory pipeline (once per test binary) and
/// returns its exporter. Tests run in parallel against one global
/// provider, so every test filters by a span name unique to it.
pub fn exporter() -> InMemorySpanExporter {
    EXPORTER.clone()
}

/// All finished spans with the given name.
pub fn spans_named(name: &str) -> Vec<SpanData> {
    exporter()
        .get_finished_spans()
        .expect("spans exported")
        .into_iter()
        .filter(|span| span.name == name)
        .collect()
}

/// The default-scheme span name for a target in the given module.
pub fn default_name(module_path: &str, qualified_name: &str) -> String {
    format!("{module_path}::{qualified_name}")
}

/// Looks up a span attribute value as a string.
pub fn attribute<'a>(span: &'a SpanData, key: &str) -> Option<std::borrow::Cow<'a, str>> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.as_str())
}
