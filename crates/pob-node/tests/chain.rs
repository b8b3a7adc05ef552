//! Producing and importing blocks between two chains

use pob_consensus::Timestamp;
use pob_metrics::{names, Metrics};
use pob_node::{contracts, Chain, NodeConfig, NodeError};
use pob_primitives::{AccountId, H256};
use pob_state::Value;
use pob_storage::{BlockStore, KvStore, MemoryStore, StorageError, StorageResult, WriteBatch};
use pob_types::{Contract, Transaction};
use pob_verifier::{FailureKind, VerifyError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Divisible by three so that "a" owns it on a fresh chain
const SLOT: u64 = 30_000;

fn config(identity: &str) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.consensus.identity = identity.to_string();
    config.consensus.witnesses = vec!["c".into(), "a".into(), "b".into()];
    config.storage.in_memory = true;
    config.genesis.balances.insert("alice".into(), 100_000);
    config
}

fn open(identity: &str) -> (Chain, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new());
    let chain = Chain::open(&config(identity), Arc::new(MemoryStore::new()), metrics.clone()).unwrap();
    (chain, metrics)
}

fn alice() -> AccountId {
    AccountId::from("alice")
}

fn tx(contract: &str, code: Vec<u8>, nonce: u64) -> Transaction {
    Transaction::new(alice(), Contract::new(contract, code), 10_000, 1, nonce)
}

fn sample_txs() -> Vec<Transaction> {
    vec![
        tx("greeter", contracts::store("hello", "world").unwrap(), 0),
        tx("payer", contracts::transfer(&AccountId::from("bob"), 250).unwrap(), 1),
    ]
}

/// Memory store whose batch writes can be switched off while reads go on
#[derive(Default)]
struct FlakyBatches {
    inner: MemoryStore,
    fail_batches: AtomicBool,
}

impl KvStore for FlakyBatches {
    fn get(&self, category: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(category, key)
    }

    fn put(&self, category: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.inner.put(category, key, value)
    }

    fn delete(&self, category: &str, key: &[u8]) -> StorageResult<()> {
        self.inner.delete(category, key)
    }

    fn iter_category(&self, category: &str) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.inner.iter_category(category)
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("batch writes off".into()));
        }
        self.inner.write_batch(batch)
    }
}

#[test]
fn test_genesis_is_shared() {
    let (a, metrics) = open("a");
    let (b, _) = open("b");
    assert_eq!(a.height(), 0);
    assert_eq!(a.head().hash(), b.head().hash());
    assert_eq!(a.balance_of(&alice()).unwrap(), 100_000);
    assert_eq!(metrics.gauge(names::CHAIN_HEIGHT), Some(0));
}

#[test]
fn test_produce_then_import() {
    let (mut a, metrics_a) = open("a");
    let (mut b, metrics_b) = open("b");

    let produced = a.produce_block(&sample_txs(), Timestamp::new(SLOT)).unwrap();
    assert!(produced.rejected.is_none());
    assert!(produced.leftover.is_empty());
    let block = produced.block;
    assert_eq!(block.number(), 1);
    assert_eq!(block.header.witness, AccountId::from("a"));
    assert_eq!(block.transactions.len(), 2);
    assert_eq!(metrics_a.counter(names::BLOCKS_PRODUCED), 1);

    b.import_block(&block).unwrap();
    assert_eq!(b.head().hash(), a.head().hash());
    assert_eq!(metrics_b.counter(names::BLOCKS_ACCEPTED), 1);
    assert_eq!(metrics_b.gauge(names::CHAIN_HEIGHT), Some(1));

    for chain in [&a, &b] {
        assert_eq!(chain.get("greeter", "hello").unwrap(), Some(Value::from("world")));
        assert_eq!(chain.balance_of(&AccountId::from("bob")).unwrap(), 250);
        assert!(chain.balance_of(&alice()).unwrap() < 100_000 - 250);
        assert_eq!(chain.block_by_number(1).unwrap(), Some(block.clone()));
    }
}

#[test]
fn test_slots_rotate_between_witnesses() {
    let (mut a, _) = open("a");
    let (mut b, _) = open("b");

    let first = a.produce_block(&[], Timestamp::new(SLOT)).unwrap().block;
    b.import_block(&first).unwrap();

    // Next slot belongs to "b"; "a" may not take it
    assert!(matches!(
        a.produce_block(&[], Timestamp::new(SLOT + 1)),
        Err(NodeError::NotOurTurn { slot }) if slot == SLOT + 1
    ));
    let second = b.produce_block(&sample_txs(), Timestamp::new(SLOT + 1)).unwrap().block;
    a.import_block(&second).unwrap();
    assert_eq!(a.head().hash(), b.head().hash());
    assert_eq!(a.height(), 2);
}

#[test]
fn test_failing_transaction_splits_batch() {
    let (mut a, _) = open("a");
    let txs = vec![
        tx("greeter", contracts::store("hello", "world").unwrap(), 0),
        tx("broken", contracts::abort("no").unwrap(), 1),
        tx("later", contracts::store("k", "v").unwrap(), 2),
    ];

    let produced = a.produce_block(&txs, Timestamp::new(SLOT)).unwrap();
    assert_eq!(produced.block.transactions, txs[..1].to_vec());
    let (failed, err) = produced.rejected.unwrap();
    assert_eq!(failed, txs[1]);
    assert_eq!(err.kind(), FailureKind::ContractLogicFailure);
    assert_eq!(produced.leftover, txs[2..].to_vec());

    assert_eq!(a.get("greeter", "hello").unwrap(), Some(Value::from("world")));
    assert_eq!(a.get("later", "k").unwrap(), None);
}

#[test]
fn test_rejects_tampered_block() {
    let (mut a, _) = open("a");
    let (mut b, metrics_b) = open("b");
    let block = a.produce_block(&sample_txs(), Timestamp::new(SLOT)).unwrap().block;

    let mut forged = block.clone();
    forged.header.state_digest = H256::from_bytes([7; 32]);
    assert!(matches!(
        b.import_block(&forged),
        Err(NodeError::Verify(VerifyError::StateDigestMismatch { .. }))
    ));

    let mut wrong_witness = block.clone();
    wrong_witness.header.witness = AccountId::from("b");
    assert!(matches!(b.import_block(&wrong_witness), Err(NodeError::Scheduling(_))));

    assert_eq!(b.height(), 0);
    assert_eq!(b.balance_of(&AccountId::from("bob")).unwrap(), 0);
    assert_eq!(metrics_b.counter(names::BLOCKS_REJECTED), 2);

    // The genuine block still applies cleanly afterwards
    b.import_block(&block).unwrap();
    assert_eq!(b.head().hash(), a.head().hash());
}

#[test]
fn test_rejects_block_not_extending_head() {
    let (mut a, _) = open("a");
    let (mut b, _) = open("b");
    let first = a.produce_block(&[], Timestamp::new(SLOT)).unwrap().block;
    b.import_block(&first).unwrap();
    let second = b.produce_block(&[], Timestamp::new(SLOT + 1)).unwrap().block;

    let (mut c, _) = open("c");
    assert!(matches!(
        c.import_block(&second),
        Err(NodeError::UnknownParent { number: 2, .. })
    ));
    c.import_block(&first).unwrap();
    c.import_block(&second).unwrap();
    assert_eq!(c.head().hash(), b.head().hash());
}

#[test]
fn test_reopen_resumes_chain() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let metrics = Arc::new(Metrics::new());
    let head = {
        let mut a = Chain::open(&config("a"), store.clone(), metrics.clone()).unwrap();
        a.produce_block(&sample_txs(), Timestamp::new(SLOT)).unwrap();
        a.head().clone()
    };

    let mut reopened = Chain::open(&config("a"), store, metrics).unwrap();
    assert_eq!(reopened.head(), &head);
    assert_eq!(reopened.balance_of(&AccountId::from("bob")).unwrap(), 250);
    assert_eq!(reopened.consensus().dynamic().last_block_number, 1);

    // Same slot cannot be produced twice
    assert!(reopened.produce_block(&[], Timestamp::new(SLOT)).is_err());
    assert!(reopened.produce_block(&[], Timestamp::new(SLOT + 3)).is_ok());
}

#[test]
fn test_contract_named_like_block_metadata_cannot_touch_archive() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let metrics = Arc::new(Metrics::new());
    let mut a = Chain::open(&config("a"), store.clone(), metrics.clone()).unwrap();

    let hostile = vec![
        tx("meta", contracts::store("latest_block", "pwned").unwrap(), 0),
        tx("block_index", contracts::store("1", "pwned").unwrap(), 1),
    ];
    let produced = a.produce_block(&hostile, Timestamp::new(SLOT)).unwrap();
    assert!(produced.rejected.is_none());
    assert_eq!(a.get("meta", "latest_block").unwrap(), Some(Value::from("pwned")));

    let blocks = BlockStore::new(store.clone());
    assert_eq!(blocks.latest_block().unwrap(), Some(1));
    assert_eq!(blocks.hash_by_number(1).unwrap(), Some(produced.block.hash()));

    let reopened = Chain::open(&config("a"), store, metrics).unwrap();
    assert_eq!(reopened.height(), 1);
    assert_eq!(reopened.get("meta", "latest_block").unwrap(), Some(Value::from("pwned")));
}

#[test]
fn test_failed_persist_leaves_chain_producible() {
    let store = Arc::new(FlakyBatches::default());
    let mut a = Chain::open(&config("a"), store.clone(), Arc::new(Metrics::new())).unwrap();
    let genesis = a.head().clone();

    store.fail_batches.store(true, Ordering::SeqCst);
    let err = a.produce_block(&sample_txs(), Timestamp::new(SLOT)).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(a.head(), &genesis);
    assert_eq!(a.consensus().dynamic().last_block_number, 0);
    assert_eq!(a.get("greeter", "hello").unwrap(), None);
    assert_eq!(a.balance_of(&AccountId::from("bob")).unwrap(), 0);

    store.fail_batches.store(false, Ordering::SeqCst);
    let produced = a.produce_block(&sample_txs(), Timestamp::new(SLOT)).unwrap();
    assert_eq!(produced.block.number(), 1);
    assert_eq!(a.height(), 1);
    assert_eq!(a.get("greeter", "hello").unwrap(), Some(Value::from("world")));

    let (mut b, _) = open("b");
    b.import_block(&produced.block).unwrap();
    assert_eq!(b.head(), a.head());
}
