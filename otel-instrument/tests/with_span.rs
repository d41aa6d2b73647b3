//! Integration tests for the suspending call shape.

mod common;

use std::fmt;
use std::time::Duration;

use futures_util::FutureExt;
use opentelemetry::trace::Status;
use otel_instrument::{fn_target, with_span, Callable, InstrumentAsync, InstrumentOptions};

#[derive(Debug)]
struct Boom(&'static str);

impl fmt::Display for Boom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[tokio::test]
async fn wrapped_future_spans_the_full_await() {
    common::exporter();
    let fetch = (|id: u64| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        id + 1
    })
    .instrument_async(fn_target!("async_probe"), InstrumentOptions::default());

    assert_eq!(fetch.call((41,)).await, 42);

    let name = common::default_name(module_path!(), "async_probe");
    let spans = common::spans_named(&name);
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert_eq!(span.status, Status::Unset);
    let elapsed = span
        .end_time
        .duration_since(span.start_time)
        .expect("span clock is monotonic");
    assert!(elapsed >= Duration::from_millis(10));
}

#[tokio::test]
async fn unpolled_call_emits_no_span() {
    common::exporter();
    let fetch = (|id: u64| async move { id })
        .instrument_async(fn_target!("unpolled_probe"), InstrumentOptions::default());

    drop(fetch.call((1,)));

    let name = common::default_name(module_path!(), "unpolled_probe");
    assert!(common::spans_named(&name).is_empty());
}

#[tokio::test]
async fn cancellation_is_recorded_on_the_span() {
    common::exporter();
    let fetch = (|id: u64| async move {
        tokio::task::yield_now().await;
        id
    })
    .instrument_async(fn_target!("cancel_probe"), InstrumentOptions::default());

    // One poll, then dropped mid-flight.
    assert!(fetch.call((1,)).now_or_never().is_none());

    let name = common::default_name(module_path!(), "cancel_probe");
    let spans = common::spans_named(&name);
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert!(matches!(span.status, Status::Error { .. }));
    let event = span
        .events
        .iter()
        .find(|event| event.name == "exception")
        .expect("exception event");
    assert!(event
        .attributes
        .iter()
        .any(|kv| kv.key.as_str() == "exception.type" && kv.value.as_str() == "cancelled"));
}

#[tokio::test]
async fn async_error_is_recorded_before_propagating() {
    common::exporter();
    let fetch = (|id: u64| async move {
        if id == 0 {
            Err(Boom("zero id"))
        } else {
            Ok(id)
        }
    })
    .instrument_async(fn_target!("async_fail_probe"), InstrumentOptions::default());

    let err = fetch.try_call((0,)).await.unwrap_err();
    assert_eq!(err.to_string(), "zero id");

    let name = common::default_name(module_path!(), "async_fail_probe");
    let spans = common::spans_named(&name);
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert!(matches!(span.status, Status::Error { .. }));
    let event = span
        .events
        .iter()
        .find(|event| event.name == "exception")
        .expect("exception event");
    let message = event
        .attributes
        .iter()
        .find(|kv| kv.key.as_str() == "exception.message")
        .map(|kv| kv.value.as_str());
    assert_eq!(message.as_deref(), Some("zero id"));
}

#[tokio::test]
async fn nested_calls_parent_to_the_enclosing_span() {
    common::exporter();
    let inner = (|| async { 7u64 })
        .instrument_async(fn_target!("nested_inner"), InstrumentOptions::default());
    let outer = with_span(
        fn_target!("nested_outer"),
        InstrumentOptions::default(),
        async move { inner.call(()).await },
    );

    assert_eq!(outer.await, 7);

    let outer_name = common::default_name(module_path!(), "nested_outer");
    let inner_name = common::default_name(module_path!(), "nested_inner");
    let outer_spans = common::spans_named(&outer_name);
    let inner_spans = common::spans_named(&inner_name);
    assert_eq!(outer_spans.len(), 1);
    assert_eq!(inner_spans.len(), 1);
    assert_eq!(
        inner_spans[0].parent_span_id,
        outer_spans[0].span_context.span_id()
    );
}
