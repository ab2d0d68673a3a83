//! Integration test verifying that `#[instrument]` annotations produce the
//! expected spans on the dispatch path.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use tenantq_dispatch::{LoadAwareSelector, TenantQueueResolver};
use tenantq_platform::{MemoryParameterStore, QueueTarget, testutil::queues_with_depths};
use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer: records span names as they are created
// ---------------------------------------------------------------------------

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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolve_creates_span() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(collector));

    let store = Arc::new(MemoryParameterStore::new());
    store.insert("/order/queue/t1", "queueA");
    TenantQueueResolver::new(store).resolve("t1", "order").await.expect("resolve");

    let recorded = spans.lock().expect("lock poisoned");
    assert!(recorded.iter().any(|s| s == "resolve"), "no 'resolve' span in {recorded:?}");
}

#[tokio::test]
async fn select_creates_span_even_on_failure() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(collector));

    let selector = LoadAwareSelector::new(Arc::new(queues_with_depths(&[("Qa", 1)])));
    let result = selector.select(&[QueueTarget::new("Qa"), QueueTarget::new("missing")]).await;
    assert!(result.is_err());

    let recorded = spans.lock().expect("lock poisoned");
    assert!(recorded.iter().any(|s| s == "select"), "no 'select' span in {recorded:?}");
}
