//! Node error types

use pob_consensus::SchedulingError;
use pob_network::NetworkError;
use pob_primitives::{AccountIdError, BlockNumber, H256};
use pob_state::StateError;
use pob_storage::StorageError;
use pob_types::CodecError;
use pob_verifier::VerifyError;
use thiserror::Error;

/// Node errors
#[derive(Debug, Error)]
pub enum NodeError {
    /// Bad configuration value
    #[error("config error: {0}")]
    Config(String),

    /// Unparseable config file
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Bad account id in config or on the wire
    #[error("invalid account id: {0}")]
    Account(#[from] AccountIdError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// State pool error
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Verification failed
    #[error("verification failed: {0}")]
    Verify(#[from] VerifyError),

    /// Block refused by the schedule
    #[error("scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    /// Bus error
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Undecodable block or transaction
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Slot belongs to another witness
    #[error("slot {slot} is not ours")]
    NotOurTurn {
        /// Slot index
        slot: u64,
    },

    /// Block does not extend the head
    #[error("block {number} has parent {parent}, head is {head}")]
    UnknownParent {
        /// Block height
        number: BlockNumber,
        /// Parent named by the block
        parent: H256,
        /// Current head hash
        head: H256,
    },

    /// Stored chain is inconsistent
    #[error("corrupt chain data: {0}")]
    Corrupt(String),
}

impl NodeError {
    /// Whether the node cannot keep running
    pub fn is_fatal(&self) -> bool {
        match self {
            NodeError::Storage(_) | NodeError::Io(_) | NodeError::Corrupt(_) => true,
            NodeError::State(e) => e.is_fatal(),
            NodeError::Verify(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;
