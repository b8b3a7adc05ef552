//! Fixed-bucket histogram

use std::sync::atomic::{AtomicU64, Ordering};

/// Default bucket upper bounds, microseconds
pub const DEFAULT_BUCKETS: [u64; 10] = [10, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 100_000];

/// Histogram over integer observations.
///
/// Each observation lands in the first bucket whose bound is not smaller;
/// larger values go to an overflow bucket.
pub struct Histogram {
    bounds: Vec<u64>,
    buckets: Vec<AtomicU64>,
    sum: AtomicU64,
    count: AtomicU64,
    max: AtomicU64,
}

impl Histogram {
    /// Histogram with [`DEFAULT_BUCKETS`]
    pub fn new() -> Self {
        Self::with_bounds(DEFAULT_BUCKETS.to_vec())
    }

    /// Histogram with custom bounds, sorted on construction
    pub fn with_bounds(mut bounds: Vec<u64>) -> Self {
        bounds.sort_unstable();
        bounds.dedup();
        let buckets = (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect();
        Histogram {
            bounds,
            buckets,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }

    /// Record a value
    pub fn observe(&self, value: u64) {
        self.sum.fetch_add(value, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(value, Ordering::Relaxed);
        let idx = self.bounds.partition_point(|bound| *bound < value);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    /// Mean of all observations, zero when empty
    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        self.sum.load(Ordering::Relaxed) as f64 / count as f64
    }

    /// Number of observations
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Largest observation
    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    /// Per-bucket counts; the last entry is the overflow bucket
    pub fn bucket_counts(&self) -> Vec<u64> {
        self.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}
