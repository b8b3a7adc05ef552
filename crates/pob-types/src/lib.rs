//! # pob-types
//!
//! Core ledger types and their RLP wire form.
//!
//! - [`Transaction`]: a publisher invoking one [`Contract`] under a gas budget
//! - [`BlockHeader`] / [`Block`]: what a witness produces in its slot
//!
//! Transaction hashes cover the unsigned payload, so a transaction keeps its
//! identity whether or not it carries a signature.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
mod error;
pub mod transaction;

pub use block::{compute_tx_root, Block, BlockHeader};
pub use error::CodecError;
pub use transaction::{Contract, Transaction};
