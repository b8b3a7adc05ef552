//! Receipts and batch outcomes

use crate::error::VerifyError;
use pob_primitives::{Amount, Gas, H256};
use pob_state::{PoolId, Value};

/// Result of one applied transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction hash
    pub tx_hash: H256,
    /// Gas consumed by the contract
    pub gas_used: Gas,
    /// `gas_used * gas_price`, debited from the publisher
    pub fee: Amount,
    /// Value the contract returned
    pub return_value: Value,
    /// Entries the contract logged
    pub logs: Vec<String>,
}

/// Result of [`crate::BatchVerifier::verify_batch`]
#[derive(Debug)]
pub struct BatchOutcome {
    /// Child layer holding the applied transactions
    pub pool: PoolId,
    /// Number of transactions applied before the first failure
    pub applied: usize,
    /// One receipt per applied transaction
    pub receipts: Vec<Receipt>,
    /// First failure, if any
    pub error: Option<VerifyError>,
}

impl BatchOutcome {
    /// Whether every transaction applied
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Gas consumed across applied transactions
    pub fn gas_used(&self) -> Gas {
        self.receipts.iter().map(|r| r.gas_used).sum()
    }

    /// Fees charged across applied transactions
    pub fn fees(&self) -> Amount {
        self.receipts.iter().map(|r| r.fee).sum()
    }
}
