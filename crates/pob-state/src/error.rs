//! State pool errors

use crate::PoolId;
use pob_primitives::{AccountId, Amount};
use pob_storage::StorageError;
use thiserror::Error;

/// State pool errors
#[derive(Debug, Error)]
pub enum StateError {
    /// Id was never handed out by this tree
    #[error("unknown pool {0}")]
    UnknownPool(PoolId),

    /// Layer was committed or discarded
    #[error("pool {0} has been retired")]
    RetiredPool(PoolId),

    /// `commit` called with a layer that is not a direct child
    #[error("pool {child} is not a child of {parent}")]
    NotAChild {
        /// Receiver of the commit
        parent: PoolId,
        /// Offending layer
        child: PoolId,
    },

    /// The root layer cannot be committed or discarded
    #[error("operation not permitted on the root pool")]
    RootPool,

    /// Debit larger than the balance
    #[error("insufficient balance for {account}: have {balance}, need {required}")]
    InsufficientBalance {
        /// Account debited
        account: AccountId,
        /// Current balance
        balance: Amount,
        /// Requested debit
        required: Amount,
    },

    /// Negative amount handed to a balance primitive
    #[error("negative amount {0}")]
    NegativeAmount(Amount),

    /// Credit would overflow the balance
    #[error("balance overflow for {0}")]
    BalanceOverflow(AccountId),

    /// A stored value has the wrong type
    #[error("type mismatch at {category}/{key}: expected {expected}")]
    TypeMismatch {
        /// Category
        category: String,
        /// Key
        key: String,
        /// Expected type name
        expected: &'static str,
    },

    /// Stored bytes are not a valid value encoding
    #[error("corrupt value encoding: {0}")]
    Decode(String),

    /// Backing store failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl StateError {
    /// Whether the error comes from the backing store and should stop the node
    pub fn is_fatal(&self) -> bool {
        matches!(self, StateError::Storage(_) | StateError::Decode(_))
    }
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;
