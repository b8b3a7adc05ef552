//! # pob-storage
//!
//! Durable (category, key) -> blob store backing the root state layer and the
//! block archive.
//!
//! - [`KvStore`]: the store contract (point get/put/delete, per-category
//!   iteration, atomic batches)
//! - [`MemoryStore`]: in-process implementation for tests and `--in-memory` nodes
//! - [`Database`]: RocksDB implementation with one column family per block
//!   category and a shared family for state categories
//! - [`BlockStore`]: encoded blocks indexed by hash and number

#![warn(missing_docs)]
#![warn(clippy::all)]

mod block;
mod db;
mod error;
mod kv;
mod memory;

pub use block::BlockStore;
pub use db::{cf, Database, DbConfig, ALL_CFS};
pub use error::{StorageError, StorageResult};
pub use kv::{category, BatchOp, KvStore, WriteBatch};
pub use memory::MemoryStore;
