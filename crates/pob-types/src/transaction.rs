//! Transactions and contract payloads

use crate::CodecError;
use bytes::Bytes;
use pob_crypto::{keccak256, recover_signer, CryptoError, Keypair, Signature};
use pob_primitives::{AccountId, Gas, H256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

const UNSIGNED_FIELDS: usize = 6;

/// Contract invoked by a transaction: an id scoping its storage and the
/// executor bytecode to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contract {
    /// Contract id; also the account holding the contract's balance
    pub id: String,
    /// Executor bytecode
    pub code: Bytes,
}

impl Contract {
    /// New contract payload
    pub fn new(id: impl Into<String>, code: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
        }
    }

    /// Account identity of the contract
    pub fn account(&self) -> AccountId {
        AccountId::new(self.id.clone())
    }
}

/// A publisher's request to run one contract
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Account paying for and authorizing the execution
    pub publisher: AccountId,
    /// Contract to run
    pub contract: Contract,
    /// Maximum gas the execution may consume
    pub gas_limit: Gas,
    /// Price per unit of gas, debited from the publisher
    pub gas_price: u64,
    /// Publisher's sequence number
    pub nonce: u64,
    /// Signature over [`Transaction::signing_payload`]
    pub signature: Option<Signature>,
}

impl Transaction {
    /// Unsigned transaction
    pub fn new(publisher: AccountId, contract: Contract, gas_limit: Gas, gas_price: u64, nonce: u64) -> Self {
        Self {
            publisher,
            contract,
            gas_limit,
            gas_price,
            nonce,
            signature: None,
        }
    }

    fn append_unsigned(&self, s: &mut RlpStream) {
        s.append(&self.publisher);
        s.append(&self.contract.id);
        s.append(&self.contract.code.to_vec());
        s.append(&self.gas_limit);
        s.append(&self.gas_price);
        s.append(&self.nonce);
    }

    /// RLP of the unsigned fields; this is what gets signed
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(UNSIGNED_FIELDS);
        self.append_unsigned(&mut s);
        s.out().to_vec()
    }

    /// Keccak-256 of the signing payload
    pub fn hash(&self) -> H256 {
        keccak256(&self.signing_payload())
    }

    /// Sign with `keypair`, replacing any previous signature
    pub fn sign(mut self, keypair: &Keypair) -> Result<Self, CryptoError> {
        self.signature = Some(keypair.sign(&self.hash())?);
        Ok(self)
    }

    /// Account that produced the signature, if signed
    pub fn signer(&self) -> Result<Option<AccountId>, CryptoError> {
        self.signature
            .as_ref()
            .map(|sig| recover_signer(&self.hash(), sig).map(|addr| AccountId::from_address(&addr)))
            .transpose()
    }

    /// Wire form
    pub fn encode(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Parse the wire form
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(rlp::decode(bytes)?)
    }
}

impl Encodable for Transaction {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(UNSIGNED_FIELDS + 1);
        self.append_unsigned(s);
        let sig = self.signature.map(|sig| sig.to_bytes().to_vec()).unwrap_or_default();
        s.append(&sig);
    }
}

impl Decodable for Transaction {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != UNSIGNED_FIELDS + 1 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let code: Vec<u8> = rlp.val_at(2)?;
        let sig_bytes: Vec<u8> = rlp.val_at(6)?;
        let signature = if sig_bytes.is_empty() {
            None
        } else {
            Some(Signature::from_slice(&sig_bytes).map_err(|_| DecoderError::Custom("invalid signature length"))?)
        };
        Ok(Transaction {
            publisher: rlp.val_at(0)?,
            contract: Contract {
                id: rlp.val_at(1)?,
                code: Bytes::from(code),
            },
            gas_limit: rlp.val_at(3)?,
            gas_price: rlp.val_at(4)?,
            nonce: rlp.val_at(5)?,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction::new(
            AccountId::from("alice"),
            Contract::new("counter", vec![1u8, 2, 3]),
            10_000,
            1,
            7,
        )
    }

    #[test]
    fn test_hash_ignores_signature() {
        let tx = sample();
        let signed = tx.clone().sign(&Keypair::from_seed("alice")).unwrap();
        assert_eq!(tx.hash(), signed.hash());
    }

    #[test]
    fn test_hash_covers_every_field() {
        let base = sample().hash();
        let mut tx = sample();
        tx.gas_price = 2;
        assert_ne!(tx.hash(), base);
        let mut tx = sample();
        tx.contract.code = Bytes::from_static(&[1, 2, 4]);
        assert_ne!(tx.hash(), base);
    }

    #[test]
    fn test_unsigned_wire_form() {
        let tx = sample();
        let decoded = Transaction::decode(&tx.encode()).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.signer().unwrap().is_none());
    }

    #[test]
    fn test_signer_recovery() {
        let keypair = Keypair::from_seed("publisher");
        let mut tx = sample();
        tx.publisher = keypair.account_id();
        let tx = tx.sign(&keypair).unwrap();
        let decoded = Transaction::decode(&tx.encode()).unwrap();
        assert_eq!(decoded.signer().unwrap(), Some(keypair.account_id()));
    }

    #[test]
    fn test_tampered_payload_changes_signer() {
        let keypair = Keypair::from_seed("publisher");
        let mut tx = sample().sign(&keypair).unwrap();
        tx.gas_limit += 1;
        match tx.signer() {
            Ok(Some(signer)) => assert_ne!(signer, keypair.account_id()),
            Ok(None) => panic!("signature dropped"),
            Err(_) => {}
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Transaction::decode(&[0xc0]).is_err());
        assert!(Transaction::decode(b"not rlp at all").is_err());

        let mut s = RlpStream::new_list(7);
        for _ in 0..6 {
            s.append(&1u64);
        }
        s.append(&vec![0u8; 10]);
        assert!(Transaction::decode(&s.out()).is_err());
    }
}
