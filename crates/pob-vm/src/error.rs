//! Executor error types

use pob_primitives::Amount;
use pob_state::StateError;
use std::fmt;
use thiserror::Error;

/// Which resource bound stopped a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutReason {
    /// Absolute deadline passed
    WallClock,
    /// Instruction count reached the step bound
    StepLimit(u64),
    /// Nested calls reached the depth bound
    CallDepth(usize),
    /// Value stack reached its bound
    StackDepth(usize),
}

impl fmt::Display for TimeoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutReason::WallClock => f.write_str("wall-clock deadline"),
            TimeoutReason::StepLimit(n) => write!(f, "step limit {n}"),
            TimeoutReason::CallDepth(n) => write!(f, "call depth {n}"),
            TimeoutReason::StackDepth(n) => write!(f, "stack depth {n}"),
        }
    }
}

/// Executor errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Gas limit exhausted
    #[error("out of gas (limit {limit})")]
    OutOfGas {
        /// Declared gas limit
        limit: u64,
    },

    /// Resource bound other than gas exceeded
    #[error("time out: {0}")]
    Timeout(TimeoutReason),

    /// Balance too low for a transfer
    #[error("insufficient balance for {account}: have {balance}, need {required}")]
    InsufficientBalance {
        /// Debited account
        account: String,
        /// Its balance
        balance: Amount,
        /// Requested amount
        required: Amount,
    },

    /// Contract touched state it does not own
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Contract aborted itself
    #[error("aborted: {0}")]
    Abort(String),

    /// Stack underflow
    #[error("stack underflow")]
    StackUnderflow,

    /// Operand of the wrong type
    #[error("type mismatch in {op}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Instruction
        op: &'static str,
        /// Expected type
        expected: &'static str,
        /// Found type
        found: &'static str,
    },

    /// Integer division or remainder by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Integer overflow
    #[error("integer overflow")]
    Overflow,

    /// `RET` with no active call frame
    #[error("return outside of a function")]
    ReturnOutsideCall,

    /// Argument index past the frame's arguments
    #[error("argument {0} out of range")]
    BadArgument(u8),

    /// Unknown opcode byte
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// Immediate operand runs past the end of the code
    #[error("truncated instruction at offset {0}")]
    TruncatedCode(usize),

    /// Jump or call target is not an instruction boundary
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),

    /// String immediate is not UTF-8
    #[error("invalid string literal at offset {0}")]
    InvalidString(usize),

    /// Operand is not a valid account id
    #[error("invalid account id: {0}")]
    InvalidAccount(String),

    /// State access failed in a recoverable way
    #[error("host error: {0}")]
    Host(String),

    /// Backing store failure
    #[error("fatal host error: {0}")]
    HostFatal(String),
}

impl VmError {
    /// Whether the code itself is malformed, as opposed to failing at runtime
    pub fn is_malformed_code(&self) -> bool {
        matches!(
            self,
            VmError::InvalidOpcode(_)
                | VmError::TruncatedCode(_)
                | VmError::InvalidJump(_)
                | VmError::InvalidString(_)
        )
    }
}

impl From<StateError> for VmError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::InsufficientBalance { account, balance, required } => VmError::InsufficientBalance {
                account: account.to_string(),
                balance,
                required,
            },
            e if e.is_fatal() => VmError::HostFatal(e.to_string()),
            e => VmError::Host(e.to_string()),
        }
    }
}

/// Result type for executor operations
pub type VmResult<T> = Result<T, VmError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pob_primitives::AccountId;
    use pob_storage::StorageError;

    #[test]
    fn test_timeout_message() {
        let err = VmError::Timeout(TimeoutReason::WallClock);
        assert!(err.to_string().contains("time out"));
        assert_ne!(err, VmError::OutOfGas { limit: 1 });
    }

    #[test]
    fn test_state_error_mapping() {
        let insufficient = StateError::InsufficientBalance {
            account: AccountId::from("a"),
            balance: 1,
            required: 2,
        };
        assert!(matches!(VmError::from(insufficient), VmError::InsufficientBalance { .. }));
        assert!(matches!(
            VmError::from(StateError::Storage(StorageError::NotOpen)),
            VmError::HostFatal(_)
        ));
        assert!(matches!(VmError::from(StateError::NegativeAmount(-3)), VmError::Host(_)));
    }
}
