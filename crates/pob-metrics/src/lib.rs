//! # pob-metrics
//!
//! In-process metrics for the PoB ledger.
//!
//! A single [`Metrics`] store is created by the node and shared as
//! `Arc<Metrics>` with the verifier, the message bus and the producer loop.
//! Metric names live in [`names`] so every crate reports under the same keys.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod histogram;
pub mod names;
mod registry;
mod snapshot;

pub use histogram::Histogram;
pub use registry::Metrics;
pub use snapshot::{HistogramSummary, MetricsSnapshot};

/// Time a block and record the elapsed microseconds into a histogram
#[macro_export]
macro_rules! timed {
    ($metrics:expr, $name:expr, $block:block) => {{
        let start = std::time::Instant::now();
        let result = $block;
        $metrics.observe($name, start.elapsed().as_micros() as u64);
        result
    }};
}
