//! Stock contracts built with the assembler

use pob_primitives::{AccountId, Amount};
use pob_vm::{AsmError, Assembler, Opcode};

/// Move `amount` from the publisher to `to`
pub fn transfer(to: &AccountId, amount: Amount) -> Result<Vec<u8>, AsmError> {
    Assembler::new()
        .op(Opcode::Publisher)
        .push_str(to.as_str())
        .push_int(amount)
        .op(Opcode::Transfer)
        .finish()
}

/// Store `value` under `key` in the contract's own scope
pub fn store(key: &str, value: &str) -> Result<Vec<u8>, AsmError> {
    Assembler::new()
        .push_str(key)
        .push_str(value)
        .op(Opcode::Put)
        .finish()
}

/// Always aborts with `reason`
pub fn abort(reason: &str) -> Result<Vec<u8>, AsmError> {
    Assembler::new().push_str(reason).op(Opcode::Abort).finish()
}
