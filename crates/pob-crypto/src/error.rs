//! Cryptographic errors

use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signing failed
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Signature bytes do not form a valid secp256k1 signature
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Recovery id outside 0..=3
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// Public key recovery failed
    #[error("public key recovery failed: {0}")]
    RecoveryFailed(String),

    /// Secret key bytes are not a valid scalar
    #[error("invalid private key")]
    InvalidPrivateKey,
}
