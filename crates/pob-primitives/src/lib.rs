//! # pob-primitives
//!
//! Primitive types shared by every PoB ledger crate: fixed-size hashes,
//! 20-byte addresses and the string account identities that witnesses,
//! publishers and contracts are named by.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod account;
mod address;
mod error;
mod hash;

pub use account::{AccountId, AccountIdError, MAX_ACCOUNT_ID_LEN};
pub use address::{Address, AddressError};
pub use error::PrimitiveError;
pub use hash::{HashError, H256};

/// Block height type
pub type BlockNumber = u64;

/// Gas type
pub type Gas = u64;

/// Token amount type. Balances are integers; there is no fixed-point unit.
pub type Amount = i128;
