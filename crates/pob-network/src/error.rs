//! Network error types

use thiserror::Error;

/// Network errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// No member with this id
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    /// Member id already connected to the hub
    #[error("already connected: {0}")]
    AlreadyConnected(String),

    /// Range end before its start
    #[error("invalid range: end {end} is before start {start}")]
    InvalidRange {
        /// First height
        start: u64,
        /// Last height
        end: u64,
    },

    /// No matching download in progress
    #[error("no download in progress for {start}..={end}")]
    NoSuchDownload {
        /// First height
        start: u64,
        /// Last height
        end: u64,
    },

    /// Malformed message body
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;
