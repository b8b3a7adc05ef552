//! Nodes exchanging blocks over an in-process bus

use pob_consensus::{EPOCH_UNIX_SECS, SLOT_LENGTH_SECS};
use pob_metrics::{names, Metrics};
use pob_network::{Filter, LocalBus, LocalHub, Message, MessageBus, ReqType};
use pob_node::{contracts, Node, NodeConfig, NodeError};
use pob_primitives::AccountId;
use pob_storage::MemoryStore;
use pob_types::{Contract, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

const SLOT: u64 = 40_000;

fn slot_secs(slot: u64) -> u64 {
    EPOCH_UNIX_SECS + slot * SLOT_LENGTH_SECS
}

// Only "a" witnesses, so "b" never produces on its own
fn config(identity: &str) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.consensus.identity = identity.to_string();
    config.consensus.witnesses = vec!["a".into()];
    config.consensus.tick_ms = 20;
    config.storage.in_memory = true;
    config.genesis.balances.insert("alice".into(), 50_000);
    config
}

struct Peer {
    node: Arc<Node>,
    bus: Arc<LocalBus>,
    metrics: Arc<Metrics>,
}

fn peer(hub: &LocalHub, identity: &str) -> Peer {
    let metrics = Arc::new(Metrics::new());
    let bus = Arc::new(hub.connect_with_metrics(identity, metrics.clone()).unwrap());
    let node = Node::with_store(
        &config(identity),
        Arc::new(MemoryStore::new()),
        bus.clone(),
        metrics.clone(),
    )
    .unwrap();
    Peer {
        node: Arc::new(node),
        bus,
        metrics,
    }
}

fn transfer(nonce: u64, amount: i128) -> Transaction {
    let code = contracts::transfer(&AccountId::from("bob"), amount).unwrap();
    Transaction::new(
        AccountId::from("alice"),
        Contract::new(format!("pay-{nonce}"), code),
        10_000,
        1,
        nonce,
    )
}

/// Hand every queued message on `rx` to `peer`
fn pump(peer: &Peer, rx: &mut mpsc::Receiver<Message>) -> usize {
    let mut handled = 0;
    while let Ok(msg) = rx.try_recv() {
        peer.node.handle_message(msg).unwrap();
        handled += 1;
    }
    handled
}

#[test]
fn test_transaction_gossip_and_block_import() {
    let hub = LocalHub::new();
    let a = peer(&hub, "a");
    let b = peer(&hub, "b");
    let mut inbox_b = b.bus.subscribe(Filter::all());

    assert!(a.node.submit_transaction(transfer(0, 10)).unwrap());
    assert!(!a.node.submit_transaction(transfer(0, 10)).unwrap());
    assert_eq!(pump(&b, &mut inbox_b), 1);
    assert_eq!(b.node.mempool().len(), 1);
    assert_eq!(b.metrics.counter(names::RECEIVED_BROAD_TRANSACTION_COUNT), 1);

    let block = a.node.try_produce(slot_secs(SLOT)).unwrap().unwrap();
    assert_eq!(block.transactions.len(), 1);
    assert!(a.node.mempool().is_empty());
    assert_eq!(a.metrics.counter(names::SEND_BLOCK_COUNT), 1);

    // The slot is used up now
    assert!(a.node.try_produce(slot_secs(SLOT) + 1).unwrap().is_none());

    assert_eq!(pump(&b, &mut inbox_b), 1);
    assert_eq!(b.node.height(), 1);
    assert!(b.node.mempool().is_empty());
    let balance = b.node.chain().read().balance_of(&AccountId::from("bob")).unwrap();
    assert_eq!(balance, 10);
}

#[test]
fn test_non_witness_never_produces() {
    let hub = LocalHub::new();
    let b = peer(&hub, "b");
    for slot in SLOT..SLOT + 5 {
        assert!(b.node.try_produce(slot_secs(slot)).unwrap().is_none());
    }
    assert_eq!(b.node.height(), 0);
}

#[test]
fn test_failing_transaction_dropped_rest_requeued() {
    let hub = LocalHub::new();
    let a = peer(&hub, "a");

    // Each large transfer is affordable on its own, not both together
    a.node.submit_transaction(transfer(0, 10)).unwrap();
    a.node.submit_transaction(transfer(1, 30_000)).unwrap();
    a.node.submit_transaction(transfer(2, 30_000)).unwrap();
    a.node.submit_transaction(transfer(3, 20)).unwrap();

    let first = a.node.try_produce(slot_secs(SLOT)).unwrap().unwrap();
    assert_eq!(first.transactions, vec![transfer(0, 10), transfer(1, 30_000)]);
    assert_eq!(a.node.mempool().len(), 1);
    assert!(a.node.mempool().contains(&transfer(3, 20).hash()));

    let second = a.node.try_produce(slot_secs(SLOT + 1)).unwrap().unwrap();
    assert_eq!(second.transactions, vec![transfer(3, 20)]);
    let balance = a.node.chain().read().balance_of(&AccountId::from("bob")).unwrap();
    assert_eq!(balance, 30_030);
}

#[test]
fn test_failing_transaction_refused_at_admission() {
    let hub = LocalHub::new();
    let a = peer(&hub, "a");
    let b = peer(&hub, "b");
    let mut inbox_b = b.bus.subscribe(Filter::all());

    let refused = Transaction::new(
        AccountId::from("alice"),
        Contract::new("quitter", contracts::abort("no").unwrap()),
        10_000,
        1,
        0,
    );
    assert!(matches!(
        a.node.submit_transaction(refused.clone()),
        Err(NodeError::Verify(_))
    ));
    assert!(matches!(
        a.node.submit_transaction(transfer(1, 1_000_000)),
        Err(NodeError::Verify(_))
    ));
    assert!(a.node.mempool().is_empty());
    assert_eq!(pump(&b, &mut inbox_b), 0);

    let mut gossip = Message::new(ReqType::PublishTx, refused.encode());
    gossip.from = "a".into();
    b.node.handle_message(gossip).unwrap();
    assert!(b.node.mempool().is_empty());

    // Admission leaves committed state alone
    let balance = a.node.chain().read().balance_of(&AccountId::from("alice")).unwrap();
    assert_eq!(balance, 50_000);
}

#[test]
fn test_lagging_node_downloads_missing_blocks() {
    let hub = LocalHub::new();
    let a = peer(&hub, "a");
    let b = peer(&hub, "b");
    let mut inbox_a = a.bus.subscribe(Filter::all());
    let mut inbox_b = b.bus.subscribe(Filter::all().accept_types([ReqType::SyncBlock]));

    for (i, slot) in (SLOT..SLOT + 3).enumerate() {
        a.node.submit_transaction(transfer(i as u64, 5)).unwrap();
        a.node.try_produce(slot_secs(slot)).unwrap().unwrap();
    }
    let tip = a.node.chain().read().block_by_number(3).unwrap().unwrap();

    // "b" only sees the tip and asks for the gap
    b.node.handle_message(Message {
        from: "a".into(),
        to: String::new(),
        req_type: ReqType::NewBlock,
        ttl: 2,
        body: tip.encode().into(),
    })
    .unwrap();
    assert_eq!(b.node.height(), 0);
    assert_eq!(b.node.syncing(), Some((1, 3)));
    assert_eq!(b.bus.pending_downloads(), vec![(1, 3)]);

    // "a" answers the download request with three blocks
    pump(&a, &mut inbox_a);
    assert_eq!(pump(&b, &mut inbox_b), 3);
    assert_eq!(b.node.height(), 3);
    assert_eq!(b.node.syncing(), None);
    assert!(b.bus.pending_downloads().is_empty());
    assert_eq!(
        b.node.chain().read().head().hash(),
        a.node.chain().read().head().hash()
    );
}

#[test]
fn test_height_and_hash_queries() {
    let hub = LocalHub::new();
    let a = peer(&hub, "a");
    let asker = hub.connect("asker").unwrap();
    let mut inbox = asker.subscribe(
        Filter::all().accept_types([ReqType::RecvBlockHeight, ReqType::BlockHashResponse]),
    );

    a.node.try_produce(slot_secs(SLOT)).unwrap().unwrap();
    a.node.try_produce(slot_secs(SLOT + 1)).unwrap().unwrap();

    let mut request = Message::new(ReqType::ReqBlockHeight, Vec::<u8>::new());
    request.from = "asker".into();
    a.node.handle_message(request).unwrap();
    let reply = inbox.try_recv().unwrap();
    assert_eq!(reply.req_type, ReqType::RecvBlockHeight);
    assert_eq!(reply.body_height(), Some(2));

    let mut query = Message::new(ReqType::BlockHashQuery, Message::range_body(0, 10));
    query.from = "asker".into();
    a.node.handle_message(query).unwrap();
    let reply = inbox.try_recv().unwrap();
    assert_eq!(reply.req_type, ReqType::BlockHashResponse);
    // start height plus genesis and two blocks
    assert_eq!(reply.body.len(), 8 + 3 * 32);

    let mut bad = Message::new(ReqType::DownloadBlock, vec![1u8, 2, 3]);
    bad.from = "asker".into();
    assert!(a.node.handle_message(bad).is_err());
}

#[tokio::test]
async fn test_run_loop_imports_and_stops() {
    let hub = LocalHub::new();
    let a = peer(&hub, "a");
    let b = peer(&hub, "b");
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(b.node.clone().run(shutdown_rx));

    // Give the loop time to subscribe
    tokio::time::sleep(Duration::from_millis(50)).await;
    a.node.submit_transaction(transfer(0, 7)).unwrap();
    a.node.try_produce(slot_secs(SLOT)).unwrap().unwrap();

    timeout(Duration::from_secs(5), async {
        while b.node.height() < 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(5), handle).await.unwrap().unwrap().unwrap();
    let balance = b.node.chain().read().balance_of(&AccountId::from("bob")).unwrap();
    assert_eq!(balance, 7);
}
