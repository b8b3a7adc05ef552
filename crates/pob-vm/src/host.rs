//! State access surface for contracts

use crate::error::VmResult;
use pob_primitives::{AccountId, Amount};
use pob_state::{StateReader, StateWriter, Value};

/// Everything a contract can do to state.
///
/// Any [`StateWriter`] is a host, so the interpreter can run directly against
/// a pool layer.
pub trait Host {
    /// Read (category, key); a miss is `Value::Nil`
    fn get(&self, category: &str, key: &str) -> VmResult<Value>;

    /// Write (category, key)
    fn put(&mut self, category: &str, key: &str, value: Value) -> VmResult<()>;

    /// Balance of `account`
    fn balance(&self, account: &AccountId) -> VmResult<Amount>;

    /// Move `amount` between accounts
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> VmResult<()>;
}

impl<T: StateWriter> Host for T {
    fn get(&self, category: &str, key: &str) -> VmResult<Value> {
        Ok(StateReader::get(self, category, key)?.unwrap_or_default())
    }

    fn put(&mut self, category: &str, key: &str, value: Value) -> VmResult<()> {
        Ok(StateWriter::put(self, category, key, value)?)
    }

    fn balance(&self, account: &AccountId) -> VmResult<Amount> {
        Ok(self.balance_of(account)?)
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> VmResult<()> {
        Ok(StateWriter::transfer(self, from, to, amount)?)
    }
}
