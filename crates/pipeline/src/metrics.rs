//! Pipeline and dispatch metrics
//!
//! Atomic counters, relaxed ordering. Values are read through snapshots at
//! the end of an invocation.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use sluice_protocol::Event;

/// Per-invocation stage counters
#[derive(Debug)]
pub struct PipelineMetrics {
    /// Records pulled from the ingestion queue
    events_seen: AtomicU64,

    /// Records dropped by the pre-filter
    filtered: AtomicU64,

    /// Null results and deserializer errors
    deserialize_errors: AtomicU64,

    /// Serializer errors
    serialize_errors: AtomicU64,

    /// Events accepted by dispatch
    dispatched: AtomicU64,

    oldest_arrival_ms: AtomicI64,
    oldest_occurrence_ms: AtomicI64,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub const fn new() -> Self {
        Self {
            events_seen: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            deserialize_errors: AtomicU64::new(0),
            serialize_errors: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            oldest_arrival_ms: AtomicI64::new(i64::MAX),
            oldest_occurrence_ms: AtomicI64::new(i64::MAX),
        }
    }

    #[inline]
    pub fn record_seen(&self) {
        self.events_seen.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_deserialize_error(&self) {
        self.deserialize_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_serialize_error(&self) {
        self.serialize_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an event accepted by dispatch and fold its timestamps into
    /// the oldest-seen minimums
    #[inline]
    pub fn record_dispatched(&self, event: &Event) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.oldest_arrival_ms
            .fetch_min(event.arrival_time_ms(), Ordering::Relaxed);
        self.oldest_occurrence_ms
            .fetch_min(event.occurrence_time_ms(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStats {
        let oldest = |v: &AtomicI64| Some(v.load(Ordering::Relaxed)).filter(|&ms| ms != i64::MAX);
        PipelineStats {
            events_seen: self.events_seen.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            deserialize_errors: self.deserialize_errors.load(Ordering::Relaxed),
            serialize_errors: self.serialize_errors.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            oldest_arrival_ms: oldest(&self.oldest_arrival_ms),
            oldest_occurrence_ms: oldest(&self.oldest_occurrence_ms),
        }
    }
}

/// Point-in-time copy of [`PipelineMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub events_seen: u64,
    pub filtered: u64,
    pub deserialize_errors: u64,
    pub serialize_errors: u64,
    pub dispatched: u64,
    /// `None` when nothing reached dispatch
    pub oldest_arrival_ms: Option<i64>,
    pub oldest_occurrence_ms: Option<i64>,
}

/// Per-invocation dispatch counters
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    events_added: AtomicU64,
    buffers_submitted: AtomicU64,
    sends_succeeded: AtomicU64,
    sends_failed: AtomicU64,

    /// Buffers discarded because the invocation had already failed
    sends_skipped: AtomicU64,

    events_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl DispatchMetrics {
    pub const fn new() -> Self {
        Self {
            events_added: AtomicU64::new(0),
            buffers_submitted: AtomicU64::new(0),
            sends_succeeded: AtomicU64::new(0),
            sends_failed: AtomicU64::new(0),
            sends_skipped: AtomicU64::new(0),
            events_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_added(&self) {
        self.events_added.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_submitted(&self) {
        self.buffers_submitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sent(&self, event_count: u64, byte_count: u64) {
        self.sends_succeeded.fetch_add(1, Ordering::Relaxed);
        self.events_sent.fetch_add(event_count, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failed(&self) {
        self.sends_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_skipped(&self) {
        self.sends_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            events_added: self.events_added.load(Ordering::Relaxed),
            buffers_submitted: self.buffers_submitted.load(Ordering::Relaxed),
            sends_succeeded: self.sends_succeeded.load(Ordering::Relaxed),
            sends_failed: self.sends_failed.load(Ordering::Relaxed),
            sends_skipped: self.sends_skipped.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub events_added: u64,
    pub buffers_submitted: u64,
    pub sends_succeeded: u64,
    pub sends_failed: u64,
    pub sends_skipped: u64,
    pub events_sent: u64,
    pub bytes_sent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_timestamps() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.snapshot().oldest_arrival_ms, None);

        let mut late = Event::new("b", 200);
        late.set_occurrence_time_ms(150);
        metrics.record_dispatched(&Event::new("a", 300));
        metrics.record_dispatched(&late);

        let stats = metrics.snapshot();
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.oldest_arrival_ms, Some(200));
        assert_eq!(stats.oldest_occurrence_ms, Some(150));
    }

    #[test]
    fn test_dispatch_counters() {
        let metrics = DispatchMetrics::new();
        metrics.record_added();
        metrics.record_submitted();
        metrics.record_sent(3, 12);
        metrics.record_failed();
        metrics.record_skipped();

        let stats = metrics.snapshot();
        assert_eq!(stats.events_added, 1);
        assert_eq!(stats.buffers_submitted, 1);
        assert_eq!(stats.sends_succeeded, 1);
        assert_eq!(stats.events_sent, 3);
        assert_eq!(stats.bytes_sent, 12);
        assert_eq!(stats.sends_failed, 1);
        assert_eq!(stats.sends_skipped, 1);
    }
}
