//! Pending transactions

use dashmap::DashMap;
use pob_metrics::{names, Metrics};
use pob_primitives::H256;
use pob_types::Transaction;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Default capacity
pub const DEFAULT_MEMPOOL_CAPACITY: usize = 10_000;

struct Entry {
    seq: i64,
    tx: Transaction,
}

/// Transactions waiting for a block, handed out in arrival order
pub struct Mempool {
    entries: DashMap<H256, Entry>,
    next_seq: AtomicI64,
    capacity: usize,
    metrics: Option<Arc<Metrics>>,
}

impl Mempool {
    /// Empty pool holding at most `capacity` transactions
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            next_seq: AtomicI64::new(0),
            capacity,
            metrics: None,
        }
    }

    /// Report the pool size to `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Add `tx`. Returns false if it is already pooled or the pool is full.
    pub fn insert(&self, tx: Transaction) -> bool {
        if self.entries.len() >= self.capacity {
            tracing::warn!(capacity = self.capacity, "mempool full, transaction dropped");
            return false;
        }
        let hash = tx.hash();
        let added = match self.entries.entry(hash) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(Entry { seq, tx });
                true
            }
        };
        self.report();
        added
    }

    /// Remove and return up to `max` transactions, oldest first
    pub fn take(&self, max: usize) -> Vec<Transaction> {
        let mut oldest: Vec<(i64, H256)> = self
            .entries
            .iter()
            .map(|entry| (entry.value().seq, *entry.key()))
            .collect();
        oldest.sort_unstable();
        oldest.truncate(max);

        let taken = oldest
            .into_iter()
            .filter_map(|(_, hash)| self.entries.remove(&hash).map(|(_, entry)| entry.tx))
            .collect();
        self.report();
        taken
    }

    /// Put back transactions that did not make it into a block, ahead of
    /// anything that arrived since
    pub fn requeue(&self, txs: Vec<Transaction>) {
        let front = self
            .entries
            .iter()
            .map(|entry| entry.value().seq)
            .min()
            .unwrap_or_else(|| self.next_seq.load(Ordering::Relaxed));
        let count = txs.len() as i64;
        for (offset, tx) in txs.into_iter().enumerate() {
            let seq = front - count + offset as i64;
            self.entries.entry(tx.hash()).or_insert(Entry { seq, tx });
        }
        self.report();
    }

    /// Drop transactions included in an accepted block
    pub fn remove_included(&self, txs: &[Transaction]) {
        for tx in txs {
            self.entries.remove(&tx.hash());
        }
        self.report();
    }

    /// Whether `hash` is pooled
    pub fn contains(&self, hash: &H256) -> bool {
        self.entries.contains_key(hash)
    }

    /// Number of pooled transactions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn report(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.set_gauge(names::MEMPOOL_SIZE, self.entries.len() as i64);
        }
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new(DEFAULT_MEMPOOL_CAPACITY)
    }
}

impl std::fmt::Debug for Mempool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mempool")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pob_primitives::AccountId;
    use pob_types::Contract;

    fn tx(nonce: u64) -> Transaction {
        Transaction::new(AccountId::from("alice"), Contract::new("c", vec![0u8]), 1_000, 1, nonce)
    }

    #[test]
    fn test_take_in_arrival_order() {
        let pool = Mempool::default();
        for nonce in [5, 1, 3] {
            assert!(pool.insert(tx(nonce)));
        }
        assert!(!pool.insert(tx(1)));
        assert_eq!(pool.len(), 3);

        let taken: Vec<u64> = pool.take(2).iter().map(|t| t.nonce).collect();
        assert_eq!(taken, vec![5, 1]);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_requeue_goes_to_front() {
        let pool = Mempool::default();
        pool.insert(tx(1));
        pool.insert(tx(2));
        let taken = pool.take(2);
        pool.insert(tx(3));
        pool.requeue(taken);

        let order: Vec<u64> = pool.take(10).iter().map(|t| t.nonce).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_capacity_and_removal() {
        let metrics = Arc::new(Metrics::new());
        let pool = Mempool::new(2).with_metrics(metrics.clone());
        assert!(pool.insert(tx(1)));
        assert!(pool.insert(tx(2)));
        assert!(!pool.insert(tx(3)));
        assert_eq!(metrics.gauge(names::MEMPOOL_SIZE), Some(2));

        pool.remove_included(&[tx(1)]);
        assert!(!pool.contains(&tx(1).hash()));
        assert!(pool.contains(&tx(2).hash()));
        assert_eq!(metrics.gauge(names::MEMPOOL_SIZE), Some(1));
    }
}
