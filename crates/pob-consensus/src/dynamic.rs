//! Chain progress as seen by the scheduler

use crate::error::{SchedulingError, SchedulingResult};
use crate::timestamp::Timestamp;
use pob_primitives::BlockNumber;
use pob_types::BlockHeader;
use serde::{Deserialize, Serialize};

/// Last accepted block and the slot counter.
///
/// Once a block has been applied `total_slots == last_block_time.slot`, so
/// the schedule position of any slot is the slot modulo the committee size,
/// whether or not earlier slots produced blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDynamicProperty {
    /// Height of the last accepted block, 0 before the first
    pub last_block_number: BlockNumber,
    /// Slot of the last accepted block
    pub last_block_time: Timestamp,
    /// Slots elapsed since the epoch as of the last accepted block
    pub total_slots: u64,
}

impl ChainDynamicProperty {
    /// Fresh chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted block
    pub fn update(&mut self, header: &BlockHeader) -> SchedulingResult<()> {
        self.advance(header.number, Timestamp::new(header.slot))
    }

    /// Record a block at `number` produced in `slot`. Leaves the property
    /// untouched on error.
    pub fn advance(&mut self, number: BlockNumber, slot: Timestamp) -> SchedulingResult<()> {
        if number <= self.last_block_number {
            return Err(SchedulingError::NonIncreasingNumber {
                last: self.last_block_number,
                got: number,
            });
        }
        if self.has_blocks() {
            if slot <= self.last_block_time {
                return Err(SchedulingError::NonIncreasingSlot {
                    last: self.last_block_time.slot,
                    got: slot.slot,
                });
            }
            self.total_slots += slot.slot - self.last_block_time.slot;
        } else {
            self.total_slots = slot.slot;
        }
        self.last_block_number = number;
        self.last_block_time = slot;
        Ok(())
    }

    /// Whether any block has been accepted
    pub fn has_blocks(&self) -> bool {
        self.last_block_number > 0
    }
}
