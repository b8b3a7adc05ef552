//! Verifier configuration

use pob_vm::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_STEPS};
use std::time::Duration;

/// Wall-clock budget for one transaction
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Gas price floor; a free transaction would run unmetered
pub const DEFAULT_MIN_GAS_PRICE: u64 = 1;

/// Bounds applied to every contract run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Wall-clock budget per transaction, measured from the start of its run
    pub timeout: Duration,
    /// Instruction bound per transaction
    pub max_steps: u64,
    /// Nested call bound per transaction
    pub max_call_depth: usize,
    /// Reject unsigned transactions. Signed ones are always checked.
    pub require_signatures: bool,
    /// Lowest accepted gas price
    pub min_gas_price: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_steps: DEFAULT_MAX_STEPS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            require_signatures: false,
            min_gas_price: DEFAULT_MIN_GAS_PRICE,
        }
    }
}
