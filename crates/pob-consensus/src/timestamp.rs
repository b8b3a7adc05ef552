//! Slot arithmetic

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Slot duration in seconds
pub const SLOT_LENGTH_SECS: u64 = 3;
/// Unix time of slot 0: 2018-01-01T00:00:00Z
pub const EPOCH_UNIX_SECS: u64 = 1_514_764_800;

/// Slot index since [`EPOCH_UNIX_SECS`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Slot index
    pub slot: u64,
}

impl Timestamp {
    /// Wrap a slot index
    pub const fn new(slot: u64) -> Self {
        Self { slot }
    }

    /// Slot containing `secs`; times before the epoch map to slot 0
    pub fn from_unix_secs(secs: u64) -> Self {
        Self::new(secs.saturating_sub(EPOCH_UNIX_SECS) / SLOT_LENGTH_SECS)
    }

    /// Unix time at which the slot starts
    pub fn to_unix_secs(self) -> u64 {
        self.slot.saturating_mul(SLOT_LENGTH_SECS).saturating_add(EPOCH_UNIX_SECS)
    }

    /// Current slot from the system clock
    pub fn now() -> Self {
        Self::from_unix_secs(unix_now())
    }

    /// The following slot
    pub fn next(self) -> Self {
        Self::new(self.slot.saturating_add(1))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.slot)
    }
}

/// Seconds since the unix epoch; 0 if the clock is before it
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
