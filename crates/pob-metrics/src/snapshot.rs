//! Serializable metric snapshots

use crate::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All metrics at a point in time, sorted by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Counter values
    pub counters: BTreeMap<String, u64>,
    /// Gauge values
    pub gauges: BTreeMap<String, i64>,
    /// Histogram summaries
    pub histograms: BTreeMap<String, HistogramSummary>,
}

/// Summary of one histogram
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistogramSummary {
    /// Number of observations
    pub count: u64,
    /// Mean value
    pub mean: f64,
    /// Largest value
    pub max: u64,
}

impl From<&Histogram> for HistogramSummary {
    fn from(h: &Histogram) -> Self {
        HistogramSummary {
            count: h.count(),
            mean: h.mean(),
            max: h.max(),
        }
    }
}

impl MetricsSnapshot {
    /// Pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Single-line JSON, for log lines
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::{names, Metrics};

    #[test]
    fn test_snapshot_json() {
        let metrics = Metrics::new();
        metrics.incr(names::BLOCKS_PRODUCED, 100);
        metrics.set_gauge(names::MEMPOOL_SIZE, 5);
        metrics.observe(names::BATCH_VERIFY_MICROS, 50);

        let json = metrics.snapshot().to_json_compact().unwrap();
        assert!(json.contains("\"node_blocks_produced\":100"));
        assert!(json.contains("\"node_mempool_size\":5"));
        assert!(json.contains("verifier_batch_micros"));
    }
}
