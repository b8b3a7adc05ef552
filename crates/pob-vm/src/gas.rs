//! Gas schedule

use crate::opcode::Opcode;

/// Gas costs
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Stack shuffling and constants
    pub const BASE: u64 = 2;
    /// Arithmetic and comparison
    pub const VERYLOW: u64 = 3;
    /// Multiplication and division
    pub const LOW: u64 = 5;
    /// Unconditional jump
    pub const MID: u64 = 8;
    /// Conditional jump and calls
    pub const HIGH: u64 = 10;

    /// Per byte of a pushed or concatenated string
    pub const BYTE: u64 = 1;

    /// State read
    pub const STATE_READ: u64 = 100;
    /// State write
    pub const STATE_WRITE: u64 = 500;
    /// Per byte of a written value
    pub const STATE_WRITE_BYTE: u64 = 4;
    /// Balance read
    pub const BALANCE: u64 = 100;
    /// Balance movement
    pub const TRANSFER: u64 = 900;
    /// Keccak draw
    pub const RANDOM: u64 = 30;

    /// Log entry
    pub const LOG: u64 = 375;
    /// Log data per byte
    pub const LOG_DATA: u64 = 8;
}

/// Gas charged before an instruction runs
pub fn static_gas(opcode: Opcode) -> u64 {
    use Opcode::*;
    match opcode {
        Stop | Return | Abort => cost::ZERO,

        PushInt | PushStr | PushTrue | PushFalse | PushNil | Pop | Dup | Swap | Over | Arg | Now | Height
        | Publisher | ContractId => cost::BASE,

        Add | Sub | Lt | Gt | Eq | Not | Concat | Assert => cost::VERYLOW,

        Mul | Div | Mod => cost::LOW,

        Jump | Ret => cost::MID,

        JumpIf | Call => cost::HIGH,

        Get | GetAt => cost::STATE_READ,
        Put | PutAt => cost::STATE_WRITE,
        Balance => cost::BALANCE,
        Transfer | Deposit | Withdraw => cost::TRANSFER,
        Random => cost::RANDOM,
        Log => cost::LOG,
    }
}

/// Size-dependent charge for a stored value
pub fn write_gas(value_len: usize) -> u64 {
    (value_len as u64).saturating_mul(cost::STATE_WRITE_BYTE)
}

/// Size-dependent charge for a log entry
pub fn log_gas(data_len: usize) -> u64 {
    (data_len as u64).saturating_mul(cost::LOG_DATA)
}

/// Size-dependent charge for string bytes produced
pub fn byte_gas(len: usize) -> u64 {
    (len as u64).saturating_mul(cost::BYTE)
}
