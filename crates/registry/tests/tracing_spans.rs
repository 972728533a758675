//! Span coverage for registry invocations.

#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use medledger_registry::Registry;
use medledger_storage::MemoryBackend;
use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

#[derive(Clone, Default)]
struct SpanCollector {
    spans: Arc<Mutex<Vec<String>>>,
}

impl<S> tracing_subscriber::Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        _attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            self.spans.lock().expect("lock poisoned").push(span.name().to_owned());
        }
    }
}

#[tokio::test]
async fn invocation_spans_cover_dispatch_handler_and_commit() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(collector));

    let registry = Registry::new(MemoryBackend::new());
    let args: Vec<String> = ["1", "Ali", "Cairo"].iter().map(|v| (*v).to_owned()).collect();
    assert!(registry.invoke("createPatient", &args).await.is_ok());

    let recorded = spans.lock().expect("lock poisoned");
    for name in ["invoke", "transaction", "create_patient", "get_state", "commit"] {
        assert!(recorded.iter().any(|s| s == name), "missing span {name:?} in {recorded:?}");
    }
}

#[tokio::test]
async fn rejected_invocation_still_opens_dispatch_span() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(collector));

    let registry = Registry::new(MemoryBackend::new());
    assert!(!registry.invoke("nope", &[]).await.is_ok());

    let recorded = spans.lock().expect("lock poisoned");
    assert!(recorded.iter().any(|s| s == "invoke"));
    assert!(!recorded.iter().any(|s| s == "commit"), "unknown names must not open a transaction");
}
