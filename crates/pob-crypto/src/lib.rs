//! # pob-crypto
//!
//! Cryptographic primitives for the PoB ledger.
//!
//! - Keccak-256 hashing (transaction, block and randomness seeds)
//! - SHA-256 for deriving deterministic development keys
//! - secp256k1 recoverable signatures and signer recovery

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod keypair;
mod signature;

pub use error::CryptoError;
pub use hash::{keccak256, keccak256_concat, sha256};
pub use keypair::Keypair;
pub use signature::{public_key_to_address, recover_signer, verify, Signature, SIGNATURE_LEN};
