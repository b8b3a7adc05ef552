//! Blocks

use crate::{CodecError, Transaction};
use pob_crypto::{keccak256, keccak256_concat};
use pob_primitives::{AccountId, BlockNumber, H256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

const HEADER_FIELDS: usize = 6;

/// Block header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Height; genesis is 0
    pub number: BlockNumber,
    /// Hash of the previous header
    pub parent_hash: H256,
    /// Witness that produced the block
    pub witness: AccountId,
    /// Slot index the block was produced in
    pub slot: u64,
    /// [`compute_tx_root`] of the body
    pub tx_root: H256,
    /// Digest of the state layer produced by applying the body
    pub state_digest: H256,
}

impl BlockHeader {
    /// Keccak-256 of the encoded header
    pub fn hash(&self) -> H256 {
        keccak256(&rlp::encode(self))
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

impl Encodable for BlockHeader {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(HEADER_FIELDS);
        s.append(&self.number);
        s.append(&self.parent_hash);
        s.append(&self.witness);
        s.append(&self.slot);
        s.append(&self.tx_root);
        s.append(&self.state_digest);
    }
}

impl Decodable for BlockHeader {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != HEADER_FIELDS {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(BlockHeader {
            number: rlp.val_at(0)?,
            parent_hash: rlp.val_at(1)?,
            witness: rlp.val_at(2)?,
            slot: rlp.val_at(3)?,
            tx_root: rlp.val_at(4)?,
            state_digest: rlp.val_at(5)?,
        })
    }
}

/// Root over transaction hashes in block order
pub fn compute_tx_root(transactions: &[Transaction]) -> H256 {
    let hashes: Vec<H256> = transactions.iter().map(Transaction::hash).collect();
    let parts: Vec<&[u8]> = hashes.iter().map(|h| h.as_bytes().as_slice()).collect();
    keccak256_concat(&parts)
}

/// Header plus ordered transactions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Header
    pub header: BlockHeader,
    /// Transactions, applied in order
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Header hash
    pub fn hash(&self) -> H256 {
        self.header.hash()
    }

    /// Block number
    pub fn number(&self) -> BlockNumber {
        self.header.number
    }

    /// Whether `tx_root` matches the body
    pub fn tx_root_matches(&self) -> bool {
        compute_tx_root(&self.transactions) == self.header.tx_root
    }

    /// Encoded body alone, for the block archive
    pub fn encode_body(&self) -> Vec<u8> {
        rlp::encode_list::<Transaction, _>(&self.transactions).to_vec()
    }

    /// Parse a body written by [`Block::encode_body`]
    pub fn decode_body(bytes: &[u8]) -> Result<Vec<Transaction>, CodecError> {
        Ok(Rlp::new(bytes).as_list()?)
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

impl Encodable for Block {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.header);
        s.append_list::<Transaction, _>(&self.transactions);
    }
}

impl Decodable for Block {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Block {
            header: rlp.val_at(0)?,
            transactions: rlp.list_at(1)?,
        })
    }
}
