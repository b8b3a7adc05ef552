//! Execution context and resource limits

use pob_primitives::{AccountId, BlockNumber, Gas, H256};
use pob_types::Transaction;
use std::time::{Duration, Instant};

/// Default bound on executed instructions
pub const DEFAULT_MAX_STEPS: u64 = 10_000_000;
/// Default bound on nested calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;
/// Default bound on value stack entries
pub const DEFAULT_MAX_STACK: usize = 1024;

/// Block-level values visible to contracts.
///
/// The default is the base context used for mempool admission: height zero,
/// time zero and a zero parent hash.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Height of the block being built or verified
    pub block_height: BlockNumber,
    /// Block time in unix seconds
    pub timestamp: u64,
    /// Hash of the parent block, seeds `RANDOM`
    pub parent_hash: H256,
}

impl ExecutionContext {
    /// Context for a block at `block_height` on top of `parent_hash`
    pub fn new(block_height: BlockNumber, timestamp: u64, parent_hash: H256) -> Self {
        Self {
            block_height,
            timestamp,
            parent_hash,
        }
    }
}

/// Per-transaction call information
#[derive(Clone, Debug)]
pub struct CallContext {
    /// Account paying for the call
    pub publisher: AccountId,
    /// Contract being run
    pub contract: AccountId,
    /// Transaction hash, seeds `RANDOM`
    pub tx_hash: H256,
}

impl CallContext {
    /// Call context for running `tx`'s contract
    pub fn for_transaction(tx: &Transaction) -> Self {
        Self {
            publisher: tx.publisher.clone(),
            contract: tx.contract.account(),
            tx_hash: tx.hash(),
        }
    }
}

/// Resource bounds for one run
#[derive(Clone, Debug)]
pub struct Limits {
    /// Gas available
    pub gas_limit: Gas,
    /// Absolute wall-clock deadline
    pub deadline: Option<Instant>,
    /// Maximum instructions executed
    pub max_steps: u64,
    /// Maximum nested calls
    pub max_call_depth: usize,
    /// Maximum value stack entries
    pub max_stack: usize,
}

impl Limits {
    /// Limits with the given gas and default bounds, no deadline
    pub fn new(gas_limit: Gas) -> Self {
        Self {
            gas_limit,
            deadline: None,
            max_steps: DEFAULT_MAX_STEPS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_stack: DEFAULT_MAX_STACK,
        }
    }

    /// Set the deadline to `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the step bound
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the call depth bound
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    /// Whether the deadline has passed
    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
