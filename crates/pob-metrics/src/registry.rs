//! Named metric store

use crate::{Histogram, HistogramSummary, MetricsSnapshot};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Thread-safe metric store keyed by name.
///
/// Metrics are created on first use. Lookups take a read lock; only the first
/// report under a new name takes the write lock.
#[derive(Default)]
pub struct Metrics {
    counters: RwLock<HashMap<&'static str, Arc<AtomicU64>>>,
    gauges: RwLock<HashMap<&'static str, Arc<AtomicI64>>>,
    histograms: RwLock<HashMap<&'static str, Arc<Histogram>>>,
}

fn entry<T, F>(map: &RwLock<HashMap<&'static str, Arc<T>>>, name: &'static str, make: F) -> Arc<T>
where
    F: FnOnce() -> T,
{
    if let Some(existing) = map.read().get(name) {
        return Arc::clone(existing);
    }
    Arc::clone(map.write().entry(name).or_insert_with(|| Arc::new(make())))
}

impl Metrics {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter
    pub fn incr(&self, name: &'static str, delta: u64) {
        entry(&self.counters, name, || AtomicU64::new(0)).fetch_add(delta, Ordering::Relaxed);
    }

    /// Set a gauge
    pub fn set_gauge(&self, name: &'static str, value: i64) {
        entry(&self.gauges, name, || AtomicI64::new(0)).store(value, Ordering::Relaxed);
    }

    /// Record a histogram observation
    pub fn observe(&self, name: &'static str, value: u64) {
        entry(&self.histograms, name, Histogram::new).observe(value);
    }

    /// Counter value, zero if never reported
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .read()
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Gauge value
    pub fn gauge(&self, name: &str) -> Option<i64> {
        self.gauges.read().get(name).map(|g| g.load(Ordering::Relaxed))
    }

    /// Point-in-time copy of every metric
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self
            .counters
            .read()
            .iter()
            .map(|(k, v)| (k.to_string(), v.load(Ordering::Relaxed)))
            .collect();
        let gauges = self
            .gauges
            .read()
            .iter()
            .map(|(k, v)| (k.to_string(), v.load(Ordering::Relaxed)))
            .collect();
        let histograms = self
            .histograms
            .read()
            .iter()
            .map(|(k, h)| (k.to_string(), HistogramSummary::from(h.as_ref())))
            .collect();
        MetricsSnapshot {
            counters,
            gauges,
            histograms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names;
    use std::thread;

    #[test]
    fn test_counter() {
        let metrics = Metrics::new();
        assert_eq!(metrics.counter(names::TX_APPLIED), 0);
        metrics.incr(names::TX_APPLIED, 1);
        metrics.incr(names::TX_APPLIED, 2);
        assert_eq!(metrics.counter(names::TX_APPLIED), 3);
    }

    #[test]
    fn test_gauge() {
        let metrics = Metrics::new();
        assert_eq!(metrics.gauge(names::CHAIN_HEIGHT), None);
        metrics.set_gauge(names::CHAIN_HEIGHT, 42);
        metrics.set_gauge(names::CHAIN_HEIGHT, 7);
        assert_eq!(metrics.gauge(names::CHAIN_HEIGHT), Some(7));
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(Metrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        m.incr(names::SEND_BLOCK_COUNT, 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.counter(names::SEND_BLOCK_COUNT), 4000);
    }
}
