use super::*;
use std::time::Duration;

use async_trait::async_trait;
use sluice_config::BufferConfig;
use sluice_protocol::Bytes;
use sluice_transport::{MemoryTransportFactory, Transport, TransportError};

fn limits(max_events: usize) -> BufferConfig {
    BufferConfig {
        max_events,
        ..BufferConfig::default()
    }
}

fn key(value: &str) -> PartitionKey {
    [("p", value)].into_iter().collect()
}

fn event(text: &str, partition: PartitionKey) -> Event {
    let mut event = Event::new(text, 0);
    event.set_serialized(Bytes::copy_from_slice(text.as_bytes()));
    event.set_partition(partition);
    event
}

fn service(factory: &MemoryTransportFactory) -> DispatchService {
    DispatchService::new(Arc::new(factory.clone()))
}

// =============================================================================
// Buffering
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_events_grouped_by_partition() {
    let factory = MemoryTransportFactory::new(limits(100), 2);
    let dispatch = service(&factory);

    for (text, p) in [("a1", "a"), ("b1", "b"), ("a2", "a"), ("b2", "b"), ("a3", "a")] {
        dispatch.add(&event(text, key(p))).unwrap();
    }
    assert_eq!(dispatch.live_buffers(), 2);

    dispatch.flush().await.unwrap();

    let mut deliveries = factory.deliveries();
    deliveries.sort_by(|x, y| x.partition.cmp(&y.partition));
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[0].partition, key("a"));
    assert_eq!(deliveries[0].lines(), vec!["a1", "a2", "a3"]);
    assert_eq!(deliveries[1].lines(), vec!["b1", "b2"]);
    assert_eq!(dispatch.live_buffers(), 0);
    assert_eq!(dispatch.outstanding(), 0);
    assert_eq!(factory.closes(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_overflow_triggers_exactly_one_send() {
    let capacity = 3;
    let factory = MemoryTransportFactory::new(limits(capacity), 1);
    let dispatch = service(&factory);

    for n in 0..capacity {
        dispatch.add(&event(&n.to_string(), PartitionKey::empty())).unwrap();
    }
    assert_eq!(dispatch.stats().buffers_submitted, 0);

    dispatch.add(&event("overflow", PartitionKey::empty())).unwrap();
    assert_eq!(dispatch.stats().buffers_submitted, 1);

    dispatch.wait_for_sends().await;
    let deliveries = factory.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].events, capacity);

    dispatch.flush().await.unwrap();
    let deliveries = factory.deliveries();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[1].lines(), vec!["overflow"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_event_too_large() {
    let buffer = BufferConfig {
        max_bytes: 4,
        ..BufferConfig::default()
    };
    let factory = MemoryTransportFactory::new(buffer, 1);
    let dispatch = service(&factory);

    let err = dispatch.add(&event("too large", key("x"))).unwrap_err();
    assert!(matches!(err, DispatchError::EventTooLarge { ref partition } if partition == "p=x"));

    dispatch.flush().await.unwrap();
    assert_eq!(dispatch.stats().buffers_submitted, 0);
    assert!(factory.deliveries().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unserialized_event_is_buffer_error() {
    let factory = MemoryTransportFactory::new(limits(10), 1);
    let dispatch = service(&factory);

    let err = dispatch.add(&Event::new("raw", 0)).unwrap_err();
    assert!(matches!(err, DispatchError::Buffer(BufferError::Unserialized)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_flush() {
    let factory = MemoryTransportFactory::new(limits(10), 1);
    let dispatch = service(&factory);

    dispatch.flush().await.unwrap();
    dispatch.flush().await.unwrap();

    assert_eq!(factory.attempts(), 0);
    assert_eq!(factory.closes(), 2);
}

// =============================================================================
// Send pool
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_send_pool_bounded() {
    let factory =
        MemoryTransportFactory::new(limits(10), 2).with_send_delay(Duration::from_millis(20));
    let dispatch = service(&factory);

    for n in 0..6 {
        dispatch.add(&event("x", key(&n.to_string()))).unwrap();
    }
    dispatch.flush().await.unwrap();

    assert_eq!(factory.deliveries().len(), 6);
    assert!(factory.peak_in_flight() <= 2);
    assert_eq!(dispatch.stats().sends_succeeded, 6);
}

// =============================================================================
// Failure escalation
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_failure_rejects_and_aggregates_once() {
    let factory = MemoryTransportFactory::new(limits(2), 2).with_failing_partition(key("bad"));
    let dispatch = service(&factory);

    for text in ["ok1", "ok2", "ok3"] {
        dispatch.add(&event(text, key("ok"))).unwrap();
    }
    dispatch.wait_for_sends().await;
    assert!(!dispatch.is_failed());

    for text in ["bad1", "bad2", "bad3"] {
        dispatch.add(&event(text, key("bad"))).unwrap();
    }
    dispatch.wait_for_sends().await;
    assert!(dispatch.is_failed());

    let err = dispatch.add(&event("ok4", key("ok"))).unwrap_err();
    assert!(matches!(err, DispatchError::Rejected(ref msg) if msg.contains("injected failure")));

    match dispatch.flush().await {
        Err(DispatchError::Unrecoverable { failures, first_error }) => {
            assert_eq!(failures, 1);
            assert!(first_error.contains("injected failure"));
        }
        other => panic!("expected Unrecoverable, got {other:?}"),
    }

    // Sent exactly once, never resent
    assert_eq!(factory.lines(), vec!["ok1", "ok2"]);

    let stats = dispatch.stats();
    assert_eq!(stats.sends_failed, 1);
    assert_eq!(stats.sends_skipped, 2);

    // Flag is reset by the flush that reported it
    dispatch.flush().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_swallows_failure() {
    let factory = MemoryTransportFactory::new(limits(10), 1).with_send_failures(1);
    let dispatch = service(&factory);

    dispatch.add(&event("lost", PartitionKey::empty())).unwrap();
    dispatch.shutdown().await;

    assert_eq!(dispatch.stats().sends_failed, 1);
    assert_eq!(dispatch.outstanding(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_release_skips_pending_sends() {
    let factory = MemoryTransportFactory::new(limits(10), 1);
    let dispatch = service(&factory);

    dispatch.release();
    dispatch.add(&event("late", PartitionKey::empty())).unwrap();
    dispatch.flush().await.unwrap();

    assert_eq!(factory.attempts(), 0);
    assert_eq!(dispatch.stats().sends_skipped, 1);
    assert_eq!(dispatch.outstanding(), 0);
}

/// Memory factory whose cleanup hook fails
struct FailingClose(MemoryTransportFactory);

#[async_trait]
impl TransportFactory for FailingClose {
    fn new_instance(&self) -> Result<Transport, TransportError> {
        self.0.new_instance()
    }

    fn new_buffer(&self) -> Result<Box<dyn Buffer>, TransportError> {
        self.0.new_buffer()
    }

    fn max_threads(&self) -> usize {
        self.0.max_threads()
    }

    async fn close(&self) -> Result<(), TransportError> {
        Err(TransportError::send("multipart upload not finalized"))
    }

    fn name(&self) -> &'static str {
        "failing-close"
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_close_hook_failure_is_unrecoverable() {
    let memory = MemoryTransportFactory::new(limits(10), 1);
    let dispatch = DispatchService::new(Arc::new(FailingClose(memory.clone())));

    dispatch.add(&event("x", PartitionKey::empty())).unwrap();
    let err = dispatch.flush().await.unwrap_err();

    assert!(err.to_string().contains("multipart upload not finalized"));
    assert_eq!(memory.lines(), vec!["x"]);
}
