use std::sync::atomic::{AtomicU64, Ordering};



/// Counters shared by all workers of one pool, mutated by atomic increments only
#[derive(Debug, Default)]
pub struct Metrics {
    sent_batches: AtomicU64,
    send_errors: AtomicU64,
    messages_sent: AtomicU64,

    // not failures, just observability
    empty_polls: AtomicU64,
    dropped_at_shutdown: AtomicU64,

    // workers that died before observing stop
    worker_panics: AtomicU64,
}


/// Point-in-time copy of `Metrics`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sent_batches: u64,
    pub send_errors: u64,
    pub messages_sent: u64,
    pub empty_polls: u64,
    pub dropped_at_shutdown: u64,
    pub worker_panics: u64,
}


impl Metrics {

    pub fn new() -> Self {
        Metrics::default()
    }

    #[inline]
    pub fn record_sent(&self, messages: usize) {
        self.sent_batches.fetch_add(1, Ordering::Relaxed);
        self.messages_sent.fetch_add(messages as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_empty_poll(&self) {
        self.empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self, messages: usize) {
        self.dropped_at_shutdown.fetch_add(messages as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_worker_panic(&self) {
        self.worker_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sent_batches(&self) -> u64 {
        self.sent_batches.load(Ordering::Relaxed)
    }

    pub fn send_errors(&self) -> u64 {
        self.send_errors.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sent_batches: self.sent_batches.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            dropped_at_shutdown: self.dropped_at_shutdown.load(Ordering::Relaxed),
            worker_panics: self.worker_panics.load(Ordering::Relaxed)
        }
    }
}
