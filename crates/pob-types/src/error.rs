//! Codec errors

use pob_crypto::CryptoError;
use thiserror::Error;

/// Decoding failure for wire-form types
#[derive(Debug, Error)]
pub enum CodecError {
    /// Malformed RLP
    #[error("rlp decode error: {0}")]
    Rlp(#[from] rlp::DecoderError),

    /// Signature bytes present but unusable
    #[error("invalid signature: {0}")]
    Signature(#[from] CryptoError),
}
