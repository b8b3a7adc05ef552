//! Single-layer views with typed accessors

use crate::{PoolId, StateError, StateResult, StateTree, Value, BALANCE_CATEGORY};
use pob_primitives::{AccountId, Amount};

/// Read access to the state visible from one layer
pub trait StateReader {
    /// Value at (category, key), `None` on a miss
    fn get(&self, category: &str, key: &str) -> StateResult<Option<Value>>;

    /// Integer at (category, key); a miss reads as zero
    fn get_int(&self, category: &str, key: &str) -> StateResult<i128> {
        match self.get(category, key)? {
            None => Ok(0),
            Some(Value::Int(v)) => Ok(v),
            Some(_) => Err(StateError::TypeMismatch {
                category: category.to_string(),
                key: key.to_string(),
                expected: "int",
            }),
        }
    }

    /// Token balance of `account`
    fn balance_of(&self, account: &AccountId) -> StateResult<Amount> {
        self.get_int(BALANCE_CATEGORY, account.as_str())
    }
}

/// Write access to one layer
pub trait StateWriter: StateReader {
    /// Write (category, key) into the layer
    fn put(&mut self, category: &str, key: &str, value: Value) -> StateResult<()>;

    /// Add `amount` to `account`'s balance
    fn credit(&mut self, account: &AccountId, amount: Amount) -> StateResult<()> {
        if amount < 0 {
            return Err(StateError::NegativeAmount(amount));
        }
        let balance = self
            .balance_of(account)?
            .checked_add(amount)
            .ok_or_else(|| StateError::BalanceOverflow(account.clone()))?;
        self.put(BALANCE_CATEGORY, account.as_str(), Value::Int(balance))
    }

    /// Subtract `amount` from `account`'s balance; never goes negative
    fn debit(&mut self, account: &AccountId, amount: Amount) -> StateResult<()> {
        if amount < 0 {
            return Err(StateError::NegativeAmount(amount));
        }
        let balance = self.balance_of(account)?;
        if balance < amount {
            return Err(StateError::InsufficientBalance {
                account: account.clone(),
                balance,
                required: amount,
            });
        }
        self.put(BALANCE_CATEGORY, account.as_str(), Value::Int(balance - amount))
    }

    /// Move `amount` from `from` to `to`
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> StateResult<()> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }
}

/// Shared view of one layer
#[derive(Debug, Clone, Copy)]
pub struct PoolView<'a> {
    tree: &'a StateTree,
    pool: PoolId,
}

/// Exclusive view of one layer
#[derive(Debug)]
pub struct PoolViewMut<'a> {
    tree: &'a mut StateTree,
    pool: PoolId,
}

impl StateTree {
    /// Read-only view of `pool`
    pub fn view(&self, pool: PoolId) -> PoolView<'_> {
        PoolView { tree: self, pool }
    }

    /// Writable view of `pool`
    pub fn view_mut(&mut self, pool: PoolId) -> PoolViewMut<'_> {
        PoolViewMut { tree: self, pool }
    }
}

impl PoolView<'_> {
    /// Layer being viewed
    pub fn pool(&self) -> PoolId {
        self.pool
    }
}

impl PoolViewMut<'_> {
    /// Layer being viewed
    pub fn pool(&self) -> PoolId {
        self.pool
    }
}

impl StateReader for PoolView<'_> {
    fn get(&self, category: &str, key: &str) -> StateResult<Option<Value>> {
        self.tree.get(self.pool, category, key)
    }
}

impl StateReader for PoolViewMut<'_> {
    fn get(&self, category: &str, key: &str) -> StateResult<Option<Value>> {
        self.tree.get(self.pool, category, key)
    }
}

impl StateWriter for PoolViewMut<'_> {
    fn put(&mut self, category: &str, key: &str, value: Value) -> StateResult<()> {
        self.tree.put(self.pool, category, key, value)
    }
}
