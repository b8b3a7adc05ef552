//! # pob-consensus
//!
//! Proof-of-Believability witness scheduling.
//!
//! Time is cut into fixed slots ([`Timestamp`]). A sorted committee of
//! witnesses ([`WitnessRegistry`]) takes the slots round-robin; which witness
//! owns a slot depends only on the slot index and the committee, never on
//! which earlier slots actually produced blocks. [`ChainDynamicProperty`]
//! tracks the last accepted block so a witness that already produced in its
//! slot waits a full rotation.
//!
//! The scheduling functions in [`schedule`] are pure. [`ConsensusHandle`]
//! shares one registry and dynamic property between the producer loop and
//! the block receiver, serializing mutations behind a read/write lock.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod dynamic;
mod error;
mod handle;
mod registry;
pub mod schedule;
mod timestamp;

pub use dynamic::ChainDynamicProperty;
pub use error::{SchedulingError, SchedulingResult};
pub use handle::ConsensusHandle;
pub use registry::WitnessRegistry;
pub use schedule::{assigned_witness, check_block_header, time_until_next_self_turn, witness_of_sec};
pub use timestamp::{unix_now, Timestamp, EPOCH_UNIX_SECS, SLOT_LENGTH_SECS};
