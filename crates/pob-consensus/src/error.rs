//! Scheduling error types

use pob_primitives::{AccountId, BlockNumber};
use thiserror::Error;

/// Scheduling and registry errors. All are recoverable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    /// Identity already waiting for admission
    #[error("already pending: {0}")]
    AlreadyPending(AccountId),

    /// Identity already in the committee
    #[error("already a witness: {0}")]
    AlreadyWitness(AccountId),

    /// Identity not in the pending queue
    #[error("not pending: {0}")]
    NotPending(AccountId),

    /// Block number does not advance
    #[error("block number {got} does not follow {last}")]
    NonIncreasingNumber {
        /// Last accepted number
        last: BlockNumber,
        /// Offered number
        got: BlockNumber,
    },

    /// Block slot does not advance
    #[error("slot {got} is not after {last}")]
    NonIncreasingSlot {
        /// Slot of the last accepted block
        last: u64,
        /// Offered slot
        got: u64,
    },

    /// Block skips or repeats a height
    #[error("unexpected block number: expected {expected}, got {got}")]
    UnexpectedNumber {
        /// Next height
        expected: BlockNumber,
        /// Offered height
        got: BlockNumber,
    },

    /// Producer is not the witness scheduled for the slot
    #[error("slot {slot} belongs to {expected:?}, not {got}")]
    WrongWitness {
        /// Slot of the block
        slot: u64,
        /// Scheduled witness
        expected: Option<AccountId>,
        /// Producer named in the header
        got: AccountId,
    },
}

/// Result type for scheduling operations
pub type SchedulingResult<T> = Result<T, SchedulingError>;
