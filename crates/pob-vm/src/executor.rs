//! Pluggable executor interface

use crate::context::{CallContext, ExecutionContext, Limits};
use crate::error::VmResult;
use crate::host::Host;
use pob_primitives::Gas;
use pob_state::Value;
use pob_types::Contract;

/// Result of a successful run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Gas consumed
    pub gas_used: Gas,
    /// Value passed to `RETURN`, nil otherwise
    pub return_value: Value,
    /// Values passed to `LOG`, rendered
    pub logs: Vec<String>,
}

/// Runs contract code against a host.
///
/// Implementations must be deterministic in (`contract`, `call`, `ctx`,
/// host state) and must honor every bound in `limits`. On error the caller
/// discards whatever the run wrote through `host`.
pub trait Executor: Send + Sync {
    /// Run `contract` to completion
    fn run(
        &self,
        contract: &Contract,
        call: &CallContext,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        limits: &Limits,
    ) -> VmResult<ExecOutput>;
}
