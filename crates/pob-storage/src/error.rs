//! Storage error types

use thiserror::Error;

/// Storage errors
///
/// Any of these reaching the verifier means the backing store is unusable;
/// callers treat them as fatal rather than as a rejected transaction.
#[derive(Debug, Error)]
pub enum StorageError {
    /// RocksDB error
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Invalid column family
    #[error("invalid column family: {0}")]
    InvalidColumnFamily(String),

    /// Database not open
    #[error("database not open")]
    NotOpen,

    /// Database already open
    #[error("database already open")]
    AlreadyOpen,

    /// Store refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored bytes could not be decoded
    #[error("invalid data format: {0}")]
    InvalidFormat(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
