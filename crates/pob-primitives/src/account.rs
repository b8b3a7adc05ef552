//! Account identities
//!
//! Witnesses, transaction publishers and balance holders are named by an
//! [`AccountId`]. Identities are compared and sorted bytewise; the witness
//! committee order depends on this, so the ordering must never change.

use crate::address::Address;
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// Longest identity accepted by [`AccountId::parse`]
pub const MAX_ACCOUNT_ID_LEN: usize = 64;

/// Account identity parsing error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountIdError {
    /// Empty identity
    #[error("account id is empty")]
    Empty,
    /// Identity longer than [`MAX_ACCOUNT_ID_LEN`]
    #[error("account id too long: {0} bytes")]
    TooLong(usize),
    /// Identity contains whitespace or control characters
    #[error("account id contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Account identity
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct AccountId(String);

impl AccountId {
    /// Create an identity without validation.
    ///
    /// Use [`AccountId::parse`] for identities coming off the wire or out of
    /// configuration files.
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    /// Parse and validate an identity
    pub fn parse(id: &str) -> Result<Self, AccountIdError> {
        if id.is_empty() {
            return Err(AccountIdError::Empty);
        }
        if id.len() > MAX_ACCOUNT_ID_LEN {
            return Err(AccountIdError::TooLong(id.len()));
        }
        if let Some(c) = id.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(AccountIdError::InvalidChar(c));
        }
        Ok(AccountId(id.to_string()))
    }

    /// Identity owned by a signing key: the hex form of its address
    pub fn from_address(address: &Address) -> Self {
        AccountId(address.to_hex())
    }

    /// Borrow as str
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        AccountId::new(id)
    }
}

impl TryFrom<String> for AccountId {
    type Error = AccountIdError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        AccountId::parse(&id)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl Borrow<str> for AccountId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "rlp")]
mod rlp_impl {
    use super::AccountId;
    use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

    impl Encodable for AccountId {
        fn rlp_append(&self, s: &mut RlpStream) {
            s.append(&self.0);
        }
    }

    impl Decodable for AccountId {
        fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
            let raw: String = rlp.as_val()?;
            AccountId::parse(&raw).map_err(|_| DecoderError::Custom("invalid account id"))
        }
    }
}
