//! Recoverable secp256k1 signatures over 32-byte prehashes

use crate::{keccak256, CryptoError};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use pob_primitives::{Address, H256};

/// Encoded signature length: r (32) || s (32) || recovery id (1)
pub const SIGNATURE_LEN: usize = 65;

/// Recoverable ECDSA signature. `s` is always low (at most n/2).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// r component
    pub r: [u8; 32],
    /// s component
    pub s: [u8; 32],
    /// recovery id, 0 or 1
    pub v: u8,
}

impl Signature {
    /// Encode as r || s || v
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    /// Decode from r || s || v
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(CryptoError::InvalidSignature(format!(
                "expected {SIGNATURE_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Signature { r, s, v: bytes[64] })
    }

    fn to_ecdsa(self) -> Result<(EcdsaSignature, RecoveryId), CryptoError> {
        let mut rs = [0u8; 64];
        rs[..32].copy_from_slice(&self.r);
        rs[32..].copy_from_slice(&self.s);
        let sig = EcdsaSignature::from_slice(&rs)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        // High-s signatures are malleable twins of a valid one.
        if sig.normalize_s().is_some() {
            return Err(CryptoError::InvalidSignature("high s value".to_string()));
        }
        let recovery_id = RecoveryId::from_byte(self.v).ok_or(CryptoError::InvalidRecoveryId(self.v))?;
        Ok((sig, recovery_id))
    }

    pub(crate) fn from_ecdsa(sig: &EcdsaSignature, recovery_id: RecoveryId) -> Self {
        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Signature { r, s, v: recovery_id.to_byte() }
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature(0x{})", hex::encode(self.to_bytes()))
    }
}

/// Recover the address that produced `signature` over `message_hash`
pub fn recover_signer(message_hash: &H256, signature: &Signature) -> Result<Address, CryptoError> {
    let (sig, recovery_id) = signature.to_ecdsa()?;
    let key = VerifyingKey::recover_from_prehash(message_hash.as_bytes(), &sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    Ok(public_key_to_address(&key))
}

/// Check that `signature` over `message_hash` was produced by `expected`
pub fn verify(message_hash: &H256, signature: &Signature, expected: &Address) -> Result<bool, CryptoError> {
    Ok(recover_signer(message_hash, signature)? == *expected)
}

/// Address of a public key: last 20 bytes of keccak256 of the uncompressed point
pub fn public_key_to_address(public_key: &VerifyingKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(addr)
}
