//! Block archive

use crate::error::{StorageError, StorageResult};
use crate::kv::{category, KvStore, WriteBatch};
use pob_primitives::{BlockNumber, H256};
use std::sync::Arc;

const LATEST_BLOCK_KEY: &[u8] = b"latest_block";

/// Encoded blocks indexed by hash and by number.
///
/// The store is codec-agnostic: callers hand in already encoded header and
/// body bytes.
#[derive(Clone)]
pub struct BlockStore {
    store: Arc<dyn KvStore>,
}

impl BlockStore {
    /// Block archive on top of `store`
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Persist a block and advance the latest-block marker in one batch
    pub fn put_block(
        &self,
        number: BlockNumber,
        hash: &H256,
        header: &[u8],
        body: &[u8],
    ) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        self.stage_block(&mut batch, number, hash, header, body)?;
        self.store.write_batch(batch)
    }

    /// Queue the writes of [`put_block`](Self::put_block) onto `batch`
    /// without applying them
    pub fn stage_block(
        &self,
        batch: &mut WriteBatch,
        number: BlockNumber,
        hash: &H256,
        header: &[u8],
        body: &[u8],
    ) -> StorageResult<()> {
        batch.put(category::HEADERS, hash.as_bytes(), header);
        batch.put(category::BODIES, hash.as_bytes(), body);
        batch.put(category::BLOCK_INDEX, &number.to_be_bytes(), hash.as_bytes());
        if self.latest_block()?.map_or(true, |latest| number > latest) {
            batch.put(category::META, LATEST_BLOCK_KEY, &number.to_be_bytes());
        }
        Ok(())
    }

    /// Encoded header by hash
    pub fn header(&self, hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        self.store.get(category::HEADERS, hash.as_bytes())
    }

    /// Encoded body by hash
    pub fn body(&self, hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        self.store.get(category::BODIES, hash.as_bytes())
    }

    /// Hash of the block at `number`
    pub fn hash_by_number(&self, number: BlockNumber) -> StorageResult<Option<H256>> {
        self.store
            .get(category::BLOCK_INDEX, &number.to_be_bytes())?
            .map(|bytes| H256::from_slice(&bytes).map_err(|e| StorageError::InvalidFormat(e.to_string())))
            .transpose()
    }

    /// Hashes for the inclusive range `start..=end`; stops at the first gap
    pub fn hashes_in_range(&self, start: BlockNumber, end: BlockNumber) -> StorageResult<Vec<(BlockNumber, H256)>> {
        let mut hashes = Vec::new();
        for number in start..=end {
            match self.hash_by_number(number)? {
                Some(hash) => hashes.push((number, hash)),
                None => break,
            }
        }
        Ok(hashes)
    }

    /// Highest stored block number
    pub fn latest_block(&self) -> StorageResult<Option<BlockNumber>> {
        self.store
            .get(category::META, LATEST_BLOCK_KEY)?
            .map(|bytes| {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StorageError::InvalidFormat(format!("latest block marker of {} bytes", bytes.len())))?;
                Ok(u64::from_be_bytes(arr))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn hash(n: u8) -> H256 {
        H256::from_bytes([n; 32])
    }

    #[test]
    fn test_put_and_read_back() {
        let blocks = BlockStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(blocks.latest_block().unwrap(), None);

        blocks.put_block(1, &hash(1), b"h1", b"b1").unwrap();
        blocks.put_block(2, &hash(2), b"h2", b"b2").unwrap();

        assert_eq!(blocks.header(&hash(1)).unwrap(), Some(b"h1".to_vec()));
        assert_eq!(blocks.body(&hash(2)).unwrap(), Some(b"b2".to_vec()));
        assert_eq!(blocks.hash_by_number(2).unwrap(), Some(hash(2)));
        assert_eq!(blocks.latest_block().unwrap(), Some(2));
    }

    #[test]
    fn test_staged_block_waits_for_the_batch() {
        let store = Arc::new(MemoryStore::new());
        let blocks = BlockStore::new(store.clone());
        let mut batch = WriteBatch::new();
        blocks.stage_block(&mut batch, 1, &hash(1), b"h1", b"b1").unwrap();
        assert_eq!(batch.len(), 4);
        assert_eq!(blocks.latest_block().unwrap(), None);

        store.write_batch(batch).unwrap();
        assert_eq!(blocks.latest_block().unwrap(), Some(1));
        assert_eq!(blocks.hash_by_number(1).unwrap(), Some(hash(1)));
    }

    #[test]
    fn test_latest_never_moves_backwards() {
        let blocks = BlockStore::new(Arc::new(MemoryStore::new()));
        blocks.put_block(5, &hash(5), b"h", b"b").unwrap();
        blocks.put_block(3, &hash(3), b"h", b"b").unwrap();
        assert_eq!(blocks.latest_block().unwrap(), Some(5));
    }

    #[test]
    fn test_hashes_in_range_stops_at_gap() {
        let blocks = BlockStore::new(Arc::new(MemoryStore::new()));
        for n in [1u8, 2, 4] {
            blocks.put_block(n as u64, &hash(n), b"h", b"b").unwrap();
        }
        let hashes = blocks.hashes_in_range(1, 4).unwrap();
        assert_eq!(hashes, vec![(1, hash(1)), (2, hash(2))]);
    }

    #[test]
    fn test_corrupt_index_is_reported() {
        let store = Arc::new(MemoryStore::new());
        store.put(category::BLOCK_INDEX, &7u64.to_be_bytes(), b"short").unwrap();
        let blocks = BlockStore::new(store);
        assert!(matches!(blocks.hash_by_number(7), Err(StorageError::InvalidFormat(_))));
    }
}
