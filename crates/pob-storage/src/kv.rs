//! The backing-store contract

use crate::error::StorageResult;

/// Well-known categories
pub mod category {
    /// Token balances, keyed by account id
    pub const BALANCE: &str = "balance";
    /// Encoded block headers, keyed by block hash
    pub const HEADERS: &str = "headers";
    /// Encoded block bodies, keyed by block hash
    pub const BODIES: &str = "bodies";
    /// Block number (big endian) to block hash
    pub const BLOCK_INDEX: &str = "block_index";
    /// Node metadata
    pub const META: &str = "meta";

    /// Prefix keeping state categories apart from the block archive
    pub const STATE_PREFIX: &str = "state:";

    /// Store category backing the state category `name`
    pub fn state(name: &str) -> String {
        format!("{STATE_PREFIX}{name}")
    }
}

/// One operation of a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite
    Put {
        /// Category
        category: String,
        /// Key
        key: Vec<u8>,
        /// Value
        value: Vec<u8>,
    },
    /// Remove
    Delete {
        /// Category
        category: String,
        /// Key
        key: Vec<u8>,
    },
}

/// Operations applied atomically by [`KvStore::write_batch`]
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put
    pub fn put(&mut self, category: &str, key: &[u8], value: &[u8]) {
        self.ops.push(BatchOp::Put {
            category: category.to_string(),
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Queue a delete
    pub fn delete(&mut self, category: &str, key: &[u8]) {
        self.ops.push(BatchOp::Delete {
            category: category.to_string(),
            key: key.to_vec(),
        });
    }

    /// Append every operation of `other`
    pub fn extend(&mut self, other: WriteBatch) {
        self.ops.extend(other.ops);
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// No operations queued
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queued operations in insertion order
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Consume into operations
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Durable map keyed by (category, key).
///
/// Implementations are shared across threads behind `Arc<dyn KvStore>`.
pub trait KvStore: Send + Sync {
    /// Point lookup
    fn get(&self, category: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Insert or overwrite
    fn put(&self, category: &str, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Remove; removing an absent key is not an error
    fn delete(&self, category: &str, key: &[u8]) -> StorageResult<()>;

    /// All entries of a category, ordered by key
    fn iter_category(&self, category: &str) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply every operation or none
    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()>;

    /// Whether a key is present
    fn contains(&self, category: &str, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(category, key)?.is_some())
    }
}
