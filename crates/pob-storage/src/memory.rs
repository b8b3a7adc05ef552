//! In-memory store

use crate::error::{StorageError, StorageResult};
use crate::kv::{BatchOp, KvStore, WriteBatch};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

type Category = BTreeMap<Vec<u8>, Vec<u8>>;

/// [`KvStore`] kept in a `BTreeMap` per category
#[derive(Default)]
pub struct MemoryStore {
    categories: RwLock<BTreeMap<String, Category>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following operation fail with [`StorageError::Unavailable`]
    /// until reset. Used to exercise the fatal storage path.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Total number of entries across categories
    pub fn len(&self) -> usize {
        self.categories.read().values().map(BTreeMap::len).sum()
    }

    /// No entries stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }
}

impl KvStore for MemoryStore {
    fn get(&self, category: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.check()?;
        Ok(self
            .categories
            .read()
            .get(category)
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn put(&self, category: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.check()?;
        self.categories
            .write()
            .entry(category.to_string())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, category: &str, key: &[u8]) -> StorageResult<()> {
        self.check()?;
        if let Some(entries) = self.categories.write().get_mut(category) {
            entries.remove(key);
        }
        Ok(())
    }

    fn iter_category(&self, category: &str) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.check()?;
        Ok(self
            .categories
            .read()
            .get(category)
            .map(|entries| entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        self.check()?;
        let mut categories = self.categories.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { category, key, value } => {
                    categories.entry(category).or_default().insert(key, value);
                }
                BatchOp::Delete { category, key } => {
                    if let Some(entries) = categories.get_mut(&category) {
                        entries.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }
}
