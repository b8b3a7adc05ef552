//! Both store implementations honour the same contract.

use pob_storage::{category, BlockStore, Database, KvStore, MemoryStore, WriteBatch};
use pob_primitives::H256;
use std::sync::Arc;
use tempfile::TempDir;

fn exercise(store: &dyn KvStore) {
    store.put("balance", b"alice", b"100").unwrap();
    store.put("balance", b"bob", b"7").unwrap();
    store.put("token.c1", b"alice", b"1").unwrap();

    assert_eq!(store.get("balance", b"alice").unwrap(), Some(b"100".to_vec()));
    assert!(store.contains("token.c1", b"alice").unwrap());
    assert!(!store.contains("token.c1", b"bob").unwrap());

    let mut batch = WriteBatch::new();
    batch.put("balance", b"carol", b"3");
    batch.delete("balance", b"bob");
    store.write_batch(batch).unwrap();

    let keys: Vec<Vec<u8>> = store
        .iter_category("balance")
        .unwrap()
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec![b"alice".to_vec(), b"carol".to_vec()]);
}

#[test]
fn memory_store_contract() {
    exercise(&MemoryStore::new());
}

#[test]
fn rocksdb_store_contract() {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(dir.path()).unwrap();
    exercise(&db);
}

#[test]
fn block_store_over_rocksdb() {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(dir.path()).unwrap();
    let blocks = BlockStore::new(Arc::new(db.clone()));

    let hash = H256::from_bytes([3u8; 32]);
    blocks.put_block(1, &hash, b"header", b"body").unwrap();

    assert_eq!(blocks.hash_by_number(1).unwrap(), Some(hash));
    assert_eq!(db.iter_category(category::HEADERS).unwrap().len(), 1);
    assert_eq!(blocks.latest_block().unwrap(), Some(1));
}

#[test]
fn state_meta_is_not_block_meta() {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(dir.path()).unwrap();
    let blocks = BlockStore::new(Arc::new(db.clone()));
    blocks.put_block(4, &H256::from_bytes([4u8; 32]), b"header", b"body").unwrap();

    db.put(&category::state(category::META), b"latest_block", b"pwned").unwrap();

    assert_eq!(blocks.latest_block().unwrap(), Some(4));
    assert_eq!(db.iter_category(category::META).unwrap().len(), 1);
}
