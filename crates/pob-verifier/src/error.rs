//! Verification error types

use pob_primitives::{Amount, H256};
use pob_state::StateError;
use pob_vm::{TimeoutReason, VmError};
use std::fmt;
use thiserror::Error;

/// Coarse failure class, for metrics and rejection notices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Gas limit exhausted
    GasExhausted,
    /// Deadline, step bound or call depth exceeded
    ExecutionTimeout,
    /// Publisher or contract could not pay
    InsufficientBalance,
    /// Contract failed on its own terms
    ContractLogicFailure,
    /// Bad signature or undecodable code
    MalformedTransaction,
    /// Layer or store failure
    State,
    /// Block did not match its header
    BlockMismatch,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::GasExhausted => "gas exhausted",
            FailureKind::ExecutionTimeout => "execution timed out",
            FailureKind::InsufficientBalance => "insufficient balance",
            FailureKind::ContractLogicFailure => "contract logic failure",
            FailureKind::MalformedTransaction => "malformed transaction",
            FailureKind::State => "state error",
            FailureKind::BlockMismatch => "block mismatch",
        };
        f.write_str(s)
    }
}

/// Verification errors. Per-transaction variants carry the transaction hash
/// and its position in the batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// Gas limit exhausted
    #[error("tx #{index} {tx_hash:?}: gas exhausted (limit {limit})")]
    GasExhausted {
        /// Transaction hash
        tx_hash: H256,
        /// Position in the batch
        index: usize,
        /// Declared gas limit
        limit: u64,
    },

    /// Execution bound other than gas exceeded
    #[error("tx #{index} {tx_hash:?}: execution timed out ({reason})")]
    ExecutionTimeout {
        /// Transaction hash
        tx_hash: H256,
        /// Position in the batch
        index: usize,
        /// Which bound
        reason: TimeoutReason,
    },

    /// A debit exceeded the balance
    #[error("tx #{index} {tx_hash:?}: insufficient balance for {account}: have {balance}, need {required}")]
    InsufficientBalance {
        /// Transaction hash
        tx_hash: H256,
        /// Position in the batch
        index: usize,
        /// Debited account
        account: String,
        /// Its balance
        balance: Amount,
        /// Requested amount
        required: Amount,
    },

    /// Contract aborted or misbehaved
    #[error("tx #{index} {tx_hash:?}: contract failed: {reason}")]
    ContractLogicFailure {
        /// Transaction hash
        tx_hash: H256,
        /// Position in the batch
        index: usize,
        /// Executor error
        reason: VmError,
    },

    /// Transaction cannot be run at all
    #[error("tx #{index} {tx_hash:?}: malformed: {reason}")]
    MalformedTransaction {
        /// Transaction hash
        tx_hash: H256,
        /// Position in the batch
        index: usize,
        /// What is wrong
        reason: String,
    },

    /// Layer or store failure while applying a transaction
    #[error("tx #{index} {tx_hash:?}: state error: {reason}")]
    State {
        /// Transaction hash
        tx_hash: H256,
        /// Position in the batch
        index: usize,
        /// Underlying error
        reason: String,
        /// Whether the backing store is unavailable
        fatal: bool,
    },

    /// Layer error outside any transaction
    #[error("pool error: {0}")]
    Pool(String),

    /// Store failure outside any transaction
    #[error("fatal pool error: {0}")]
    PoolFatal(String),

    /// Header transaction root does not match the body
    #[error("transaction root mismatch: header {expected:?}, body {actual:?}")]
    TxRootMismatch {
        /// Root in the header
        expected: H256,
        /// Root of the body
        actual: H256,
    },

    /// Resulting state differs from the producer's
    #[error("state digest mismatch: header {expected:?}, computed {actual:?}")]
    StateDigestMismatch {
        /// Digest in the header
        expected: H256,
        /// Digest computed locally
        actual: H256,
    },
}

impl VerifyError {
    /// Classify an executor error raised by transaction `index`
    pub fn from_vm(err: VmError, tx_hash: H256, index: usize) -> Self {
        match err {
            VmError::OutOfGas { limit } => VerifyError::GasExhausted { tx_hash, index, limit },
            VmError::Timeout(reason) => VerifyError::ExecutionTimeout { tx_hash, index, reason },
            VmError::InsufficientBalance {
                account,
                balance,
                required,
            } => VerifyError::InsufficientBalance {
                tx_hash,
                index,
                account,
                balance,
                required,
            },
            VmError::HostFatal(reason) => VerifyError::State {
                tx_hash,
                index,
                reason,
                fatal: true,
            },
            err if err.is_malformed_code() => VerifyError::MalformedTransaction {
                tx_hash,
                index,
                reason: err.to_string(),
            },
            reason => VerifyError::ContractLogicFailure { tx_hash, index, reason },
        }
    }

    /// Classify a state error raised while applying transaction `index`
    pub fn from_state(err: StateError, tx_hash: H256, index: usize) -> Self {
        match err {
            StateError::InsufficientBalance {
                account,
                balance,
                required,
            } => VerifyError::InsufficientBalance {
                tx_hash,
                index,
                account: account.to_string(),
                balance,
                required,
            },
            err => VerifyError::State {
                tx_hash,
                index,
                fatal: err.is_fatal(),
                reason: err.to_string(),
            },
        }
    }

    /// Failure class
    pub fn kind(&self) -> FailureKind {
        match self {
            VerifyError::GasExhausted { .. } => FailureKind::GasExhausted,
            VerifyError::ExecutionTimeout { .. } => FailureKind::ExecutionTimeout,
            VerifyError::InsufficientBalance { .. } => FailureKind::InsufficientBalance,
            VerifyError::ContractLogicFailure { .. } => FailureKind::ContractLogicFailure,
            VerifyError::MalformedTransaction { .. } => FailureKind::MalformedTransaction,
            VerifyError::State { .. } | VerifyError::Pool(_) | VerifyError::PoolFatal(_) => FailureKind::State,
            VerifyError::TxRootMismatch { .. } | VerifyError::StateDigestMismatch { .. } => FailureKind::BlockMismatch,
        }
    }

    /// Hash of the offending transaction, if one is to blame
    pub fn tx_hash(&self) -> Option<H256> {
        match self {
            VerifyError::GasExhausted { tx_hash, .. }
            | VerifyError::ExecutionTimeout { tx_hash, .. }
            | VerifyError::InsufficientBalance { tx_hash, .. }
            | VerifyError::ContractLogicFailure { tx_hash, .. }
            | VerifyError::MalformedTransaction { tx_hash, .. }
            | VerifyError::State { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }

    /// Position of the offending transaction in its batch
    pub fn index(&self) -> Option<usize> {
        match self {
            VerifyError::GasExhausted { index, .. }
            | VerifyError::ExecutionTimeout { index, .. }
            | VerifyError::InsufficientBalance { index, .. }
            | VerifyError::ContractLogicFailure { index, .. }
            | VerifyError::MalformedTransaction { index, .. }
            | VerifyError::State { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Only backing-store unavailability is fatal to the node
    pub fn is_fatal(&self) -> bool {
        matches!(self, VerifyError::State { fatal: true, .. } | VerifyError::PoolFatal(_))
    }
}

impl From<StateError> for VerifyError {
    fn from(err: StateError) -> Self {
        if err.is_fatal() {
            VerifyError::PoolFatal(err.to_string())
        } else {
            VerifyError::Pool(err.to_string())
        }
    }
}

/// Result type for verification
pub type VerifyResult<T> = Result<T, VerifyError>;
