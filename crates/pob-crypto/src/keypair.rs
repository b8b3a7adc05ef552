//! Signing keys

use crate::signature::public_key_to_address;
use crate::{sha256, CryptoError, Signature};
use k256::ecdsa::SigningKey;
use pob_primitives::{AccountId, Address, H256};
use rand::rngs::OsRng;

/// secp256k1 signing key with its derived address
#[derive(Clone)]
pub struct Keypair {
    secret: SigningKey,
    address: Address,
}

impl Keypair {
    /// Fresh random key
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Key from 32 secret bytes
    pub fn from_secret(secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let key = SigningKey::from_slice(secret).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self::from_signing_key(key))
    }

    /// Deterministic key derived from a seed phrase.
    ///
    /// For local networks and tests only; the secret is `sha256(seed)`.
    pub fn from_seed(seed: &str) -> Self {
        let mut digest = sha256(seed.as_bytes());
        loop {
            if let Ok(key) = SigningKey::from_slice(&digest) {
                return Self::from_signing_key(key);
            }
            // Out-of-range scalar; rehash until it lands in range.
            digest = sha256(&digest);
        }
    }

    fn from_signing_key(secret: SigningKey) -> Self {
        let address = public_key_to_address(secret.verifying_key());
        Keypair { secret, address }
    }

    /// Address of the public key
    pub fn address(&self) -> Address {
        self.address
    }

    /// Account identity owned by this key
    pub fn account_id(&self) -> AccountId {
        AccountId::from_address(&self.address)
    }

    /// Sign a 32-byte prehash
    pub fn sign(&self, message_hash: &H256) -> Result<Signature, CryptoError> {
        let (sig, recovery_id) = self
            .secret
            .sign_prehash_recoverable(message_hash.as_bytes())
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        Ok(Signature::from_ecdsa(&sig, recovery_id))
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair").field("address", &self.address).finish_non_exhaustive()
    }
}
