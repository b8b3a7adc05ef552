//! RocksDB-backed store

use crate::error::{StorageError, StorageResult};
use crate::kv::{category, BatchOp, KvStore, WriteBatch};
use parking_lot::RwLock;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Column family names
pub mod cf {
    /// Every state category, keys prefixed with the category name
    pub const STATE: &str = "state";
    /// Block headers
    pub const HEADERS: &str = crate::kv::category::HEADERS;
    /// Block bodies
    pub const BODIES: &str = crate::kv::category::BODIES;
    /// Block number to hash
    pub const BLOCK_INDEX: &str = crate::kv::category::BLOCK_INDEX;
    /// Metadata
    pub const META: &str = crate::kv::category::META;
}

/// All column family names
pub const ALL_CFS: &[&str] = &[cf::STATE, cf::HEADERS, cf::BODIES, cf::BLOCK_INDEX, cf::META];

type RocksDB = DBWithThreadMode<MultiThreaded>;

/// Database configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Create database if missing
    pub create_if_missing: bool,
    /// Maximum number of open files
    pub max_open_files: i32,
    /// Write buffer size
    pub write_buffer_size: usize,
    /// Maximum write buffers
    pub max_write_buffer_number: i32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            max_open_files: 512,
            write_buffer_size: 64 * 1024 * 1024,
            max_write_buffer_number: 3,
        }
    }
}

/// RocksDB store.
///
/// Block categories map onto their own column family with raw keys. Every
/// other category shares [`cf::STATE`], keyed by
/// `len(category) as u16 BE || category || key`.
#[derive(Clone)]
pub struct Database {
    db: Arc<RwLock<Option<RocksDB>>>,
    path: PathBuf,
}

fn dedicated_cf(category: &str) -> Option<&'static str> {
    match category {
        category::HEADERS => Some(cf::HEADERS),
        category::BODIES => Some(cf::BODIES),
        category::BLOCK_INDEX => Some(cf::BLOCK_INDEX),
        category::META => Some(cf::META),
        _ => None,
    }
}

fn state_prefix(category: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(2 + category.len());
    prefix.extend_from_slice(&(category.len() as u16).to_be_bytes());
    prefix.extend_from_slice(category.as_bytes());
    prefix
}

/// Resolve (category, key) to (column family, physical key)
fn locate(category: &str, key: &[u8]) -> (&'static str, Vec<u8>) {
    match dedicated_cf(category) {
        Some(cf) => (cf, key.to_vec()),
        None => {
            let mut physical = state_prefix(category);
            physical.extend_from_slice(key);
            (cf::STATE, physical)
        }
    }
}

impl Database {
    /// Database handle at `path`, not yet opened
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            db: Arc::new(RwLock::new(None)),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create and open with default config
    pub fn open_at(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Self::new(path);
        db.open()?;
        Ok(db)
    }

    /// Open with default config
    pub fn open(&self) -> StorageResult<()> {
        self.open_with_config(DbConfig::default())
    }

    /// Open with custom config
    pub fn open_with_config(&self, config: DbConfig) -> StorageResult<()> {
        let mut guard = self.db.write();
        if guard.is_some() {
            return Err(StorageError::AlreadyOpen);
        }

        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);

        let descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = RocksDB::open_cf_descriptors(&opts, &self.path, descriptors)?;
        info!(path = %self.path.display(), "database opened");
        *guard = Some(db);
        Ok(())
    }

    /// Close; later operations fail with [`StorageError::NotOpen`]
    pub fn close(&self) {
        if self.db.write().take().is_some() {
            debug!(path = %self.path.display(), "database closed");
        }
    }

    /// Whether the database is open
    pub fn is_open(&self) -> bool {
        self.db.read().is_some()
    }

    /// Database path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_db<T>(&self, f: impl FnOnce(&RocksDB) -> StorageResult<T>) -> StorageResult<T> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StorageError::NotOpen)?;
        f(db)
    }
}

fn handle<'a>(db: &'a RocksDB, name: &str) -> StorageResult<Arc<BoundColumnFamily<'a>>> {
    db.cf_handle(name)
        .ok_or_else(|| StorageError::InvalidColumnFamily(name.to_string()))
}

impl KvStore for Database {
    fn get(&self, category: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let (cf_name, physical) = locate(category, key);
        self.with_db(|db| Ok(db.get_cf(&handle(db, cf_name)?, physical)?))
    }

    fn put(&self, category: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let (cf_name, physical) = locate(category, key);
        self.with_db(|db| Ok(db.put_cf(&handle(db, cf_name)?, physical, value)?))
    }

    fn delete(&self, category: &str, key: &[u8]) -> StorageResult<()> {
        let (cf_name, physical) = locate(category, key);
        self.with_db(|db| Ok(db.delete_cf(&handle(db, cf_name)?, physical)?))
    }

    fn iter_category(&self, category: &str) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.with_db(|db| {
            let (cf_name, prefix) = match dedicated_cf(category) {
                Some(cf) => (cf, Vec::new()),
                None => (cf::STATE, state_prefix(category)),
            };
            let family = handle(db, cf_name)?;
            let mut entries = Vec::new();
            for item in db.iterator_cf(&family, IteratorMode::From(&prefix, Direction::Forward)) {
                let (key, value) = item?;
                if !key.starts_with(&prefix) {
                    break;
                }
                entries.push((key[prefix.len()..].to_vec(), value.to_vec()));
            }
            Ok(entries)
        })
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        self.with_db(|db| {
            let mut rocks_batch = rocksdb::WriteBatchWithTransaction::<false>::default();
            for op in batch.into_ops() {
                match op {
                    BatchOp::Put { category, key, value } => {
                        let (cf_name, physical) = locate(&category, &key);
                        rocks_batch.put_cf(&handle(db, cf_name)?, physical, value);
                    }
                    BatchOp::Delete { category, key } => {
                        let (cf_name, physical) = locate(&category, &key);
                        rocks_batch.delete_cf(&handle(db, cf_name)?, physical);
                    }
                }
            }
            db.write(rocks_batch)?;
            Ok(())
        })
    }
}
