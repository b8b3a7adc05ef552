//! # pob-vm
//!
//! Sandboxed contract executor.
//!
//! Contracts are bytecode for a small stack machine ([`Interpreter`]) that
//! reaches state only through the [`Host`] trait. Every run is bounded three
//! ways:
//!
//! - gas: each instruction costs [`gas::static_gas`] plus size-dependent
//!   charges; running out yields [`VmError::OutOfGas`]
//! - wall clock: an absolute deadline checked before every instruction
//! - steps, call depth and stack depth
//!
//! The last two yield [`VmError::Timeout`]. Contract-visible time, height and
//! randomness come only from the [`ExecutionContext`] and the transaction
//! hash, so every validator replaying a transaction sees the same values.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod assembler;
mod context;
mod error;
mod executor;
pub mod gas;
mod host;
mod interpreter;
mod opcode;
mod program;
mod random;

pub use assembler::{AsmError, Assembler};
pub use context::{CallContext, ExecutionContext, Limits, DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_STACK, DEFAULT_MAX_STEPS};
pub use error::{TimeoutReason, VmError, VmResult};
pub use executor::{ExecOutput, Executor};
pub use host::Host;
pub use interpreter::Interpreter;
pub use opcode::Opcode;
pub use random::{draw, RANDOM_SCALE};
