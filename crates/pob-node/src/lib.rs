//! # pob-node
//!
//! Ledger node built from the workspace crates.
//!
//! A [`Node`] owns the canonical [`Chain`] (layered state, block archive and
//! witness schedule), a [`Mempool`] and a handle on the message bus. Its
//! loop does two things:
//!
//! - on every tick, if the current slot belongs to this node, batch-verify
//!   pending transactions into a new block and broadcast it
//! - on every incoming block, check the producer against the schedule,
//!   re-run the block and extend the chain if the resulting state matches
//!
//! Configuration comes from a TOML file ([`NodeConfig`]) with CLI overrides.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod chain;
pub mod cli;
pub mod config;
pub mod contracts;
mod error;
mod genesis;
mod mempool;
mod node;

pub use chain::{Chain, ProducedBlock};
pub use config::NodeConfig;
pub use error::{NodeError, NodeResult};
pub use genesis::{init_genesis, GENESIS_WITNESS};
pub use mempool::{Mempool, DEFAULT_MEMPOOL_CAPACITY};
pub use node::{open_store, Node, MAX_BLOCKS_PER_REQUEST};
