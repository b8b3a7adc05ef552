//! Node orchestration: producer loop and message handling

use crate::chain::Chain;
use crate::config::{NodeConfig, StorageConfig};
use crate::error::{NodeError, NodeResult};
use crate::mempool::Mempool;
use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::{Mutex, RwLock};
use pob_consensus::{unix_now, Timestamp};
use pob_metrics::Metrics;
use pob_network::{Filter, Message, MessageBus, NetworkError, ReqType};
use pob_primitives::BlockNumber;
use pob_storage::{Database, KvStore, MemoryStore};
use pob_types::{Block, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

/// Most blocks sent back for one download request
pub const MAX_BLOCKS_PER_REQUEST: u64 = 128;

/// Open the backing store described by `config`
pub fn open_store(config: &StorageConfig) -> NodeResult<Arc<dyn KvStore>> {
    if config.in_memory {
        info!("using in-memory storage");
        return Ok(Arc::new(MemoryStore::new()));
    }
    std::fs::create_dir_all(&config.data_dir)?;
    let path = config.data_dir.join("db");
    info!(path = %path.display(), "opening database");
    Ok(Arc::new(Database::open_at(path)?))
}

/// A running ledger node
pub struct Node {
    chain: RwLock<Chain>,
    mempool: Mempool,
    bus: Arc<dyn MessageBus>,
    metrics: Arc<Metrics>,
    tick: Duration,
    max_block_transactions: usize,
    sync: Mutex<Option<(BlockNumber, BlockNumber)>>,
}

impl Node {
    /// Open storage per `config` and start from its chain
    pub fn new(config: &NodeConfig, bus: Arc<dyn MessageBus>, metrics: Arc<Metrics>) -> NodeResult<Self> {
        let store = open_store(&config.storage)?;
        Self::with_store(config, store, bus, metrics)
    }

    /// Start from the chain in `store`
    pub fn with_store(
        config: &NodeConfig,
        store: Arc<dyn KvStore>,
        bus: Arc<dyn MessageBus>,
        metrics: Arc<Metrics>,
    ) -> NodeResult<Self> {
        config.validate()?;
        let chain = Chain::open(config, store, metrics.clone())?;
        Ok(Self {
            chain: RwLock::new(chain),
            mempool: Mempool::default().with_metrics(metrics.clone()),
            bus,
            metrics,
            tick: config.tick(),
            max_block_transactions: config.consensus.max_block_transactions,
            sync: Mutex::new(None),
        })
    }

    /// The chain, behind its lock
    pub fn chain(&self) -> &RwLock<Chain> {
        &self.chain
    }

    /// Pending transactions
    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Latest accepted height
    pub fn height(&self) -> BlockNumber {
        self.chain.read().height()
    }

    /// Check `tx` against committed state, pool it and gossip it. Returns
    /// false if it was already pooled.
    pub fn submit_transaction(&self, tx: Transaction) -> NodeResult<bool> {
        let body = tx.encode();
        if !self.admit(tx)? {
            return Ok(false);
        }
        self.bus.broadcast(Message::new(ReqType::PublishTx, body))?;
        Ok(true)
    }

    /// Mempool admission: a transaction that would fail on the current head
    /// is refused
    fn admit(&self, tx: Transaction) -> NodeResult<bool> {
        if self.mempool.contains(&tx.hash()) {
            return Ok(false);
        }
        self.chain.write().check_transaction(&tx)?;
        Ok(self.mempool.insert(tx))
    }

    /// Produce and broadcast a block if the slot containing `now_secs` is
    /// ours and still free
    pub fn try_produce(&self, now_secs: u64) -> NodeResult<Option<Block>> {
        let mut chain = self.chain.write();
        if chain.consensus().time_until_next_self_turn(now_secs) != Some(Duration::ZERO) {
            return Ok(None);
        }

        let txs = self.mempool.take(self.max_block_transactions);
        let produced = match chain.produce_block(&txs, Timestamp::from_unix_secs(now_secs)) {
            Ok(produced) => produced,
            Err(e) => {
                self.mempool.requeue(txs);
                return Err(e);
            }
        };
        drop(chain);

        if let Some((tx, err)) = &produced.rejected {
            warn!(tx = %tx.hash(), kind = ?err.kind(), error = %err, "dropped failing transaction");
        }
        self.mempool.requeue(produced.leftover);
        self.bus
            .broadcast(Message::new(ReqType::NewBlock, produced.block.encode()))?;
        Ok(Some(produced.block))
    }

    /// React to one bus message
    pub fn handle_message(&self, msg: Message) -> NodeResult<()> {
        trace!(from = %msg.from, req_type = ?msg.req_type, "message");
        match msg.req_type {
            ReqType::PublishTx => {
                let tx = Transaction::decode(&msg.body)?;
                let hash = tx.hash();
                match self.admit(tx) {
                    Ok(true) => debug!(from = %msg.from, tx = %hash, "pooled gossiped transaction"),
                    Ok(false) => {}
                    Err(NodeError::Verify(err)) if !err.is_fatal() => {
                        debug!(from = %msg.from, tx = %hash, error = %err, "refused gossiped transaction");
                    }
                    Err(e) => return Err(e),
                }
                Ok(())
            }
            ReqType::NewBlock | ReqType::SyncBlock => self.on_block(&msg),
            ReqType::DownloadBlock => {
                let (start, end) = range_of(&msg)?;
                let end = end.min(start.saturating_add(MAX_BLOCKS_PER_REQUEST - 1));
                for number in start..=end {
                    let Some(block) = self.chain.read().block_by_number(number)? else {
                        break;
                    };
                    self.bus
                        .send(Message::new(ReqType::SyncBlock, block.encode()).to(msg.from.as_str()))?;
                }
                Ok(())
            }
            ReqType::ReqBlockHeight => {
                let body = Message::height_body(self.height());
                self.bus
                    .send(Message::new(ReqType::RecvBlockHeight, body).to(msg.from.as_str()))?;
                Ok(())
            }
            ReqType::RecvBlockHeight => {
                let peer_height = msg
                    .body_height()
                    .ok_or_else(|| invalid(&msg, "height body"))?;
                let height = self.height();
                if peer_height > height {
                    self.request_sync(height + 1, peer_height)?;
                }
                Ok(())
            }
            ReqType::BlockHashQuery => {
                let (start, end) = range_of(&msg)?;
                let end = end.min(start.saturating_add(MAX_BLOCKS_PER_REQUEST - 1));
                let hashes = self.chain.read().hashes_in_range(start, end)?;
                let mut body = BytesMut::with_capacity(8 + hashes.len() * 32);
                body.put_u64(start);
                for (_, hash) in &hashes {
                    body.put_slice(hash.as_bytes());
                }
                self.bus.send(
                    Message::new(ReqType::BlockHashResponse, body.freeze()).to(msg.from.as_str()),
                )?;
                Ok(())
            }
            ReqType::BlockHashResponse => {
                let hashes = msg.body.len().saturating_sub(8) / 32;
                debug!(from = %msg.from, hashes, "block hash response");
                Ok(())
            }
        }
    }

    fn on_block(&self, msg: &Message) -> NodeResult<()> {
        let block = Block::decode(&msg.body)?;
        let number = block.number();
        let height = self.height();
        if number <= height {
            trace!(number, height, "already have block");
            return Ok(());
        }
        if number > height + 1 {
            debug!(number, height, "block ahead of head, syncing");
            return self.request_sync(height + 1, number);
        }

        self.chain.write().import_block(&block)?;
        self.mempool.remove_included(&block.transactions);
        self.finish_sync(number)
    }

    fn request_sync(&self, start: BlockNumber, end: BlockNumber) -> NodeResult<()> {
        let mut sync = self.sync.lock();
        if sync.is_some() {
            return Ok(());
        }
        self.bus.download(start, end)?;
        *sync = Some((start, end));
        Ok(())
    }

    fn finish_sync(&self, height: BlockNumber) -> NodeResult<()> {
        let mut sync = self.sync.lock();
        if let Some((start, end)) = *sync {
            if height >= end {
                self.bus.cancel_download(start, end)?;
                *sync = None;
                info!(height, "caught up");
            }
        }
        Ok(())
    }

    /// Range of blocks still being downloaded
    pub fn syncing(&self) -> Option<(BlockNumber, BlockNumber)> {
        *self.sync.lock()
    }

    /// Serve the bus and produce blocks on schedule until `shutdown` flips
    /// to true.
    ///
    /// Per-message and per-block errors are logged and skipped; fatal ones
    /// stop the loop.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> NodeResult<()> {
        let mut inbox = self.bus.subscribe(Filter::all());
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(id = %self.bus.local_id(), height = self.height(), "node running");
        self.bus.broadcast(Message::new(ReqType::ReqBlockHeight, Bytes::new()))?;

        loop {
            tokio::select! {
                Some(msg) = inbox.recv() => {
                    if let Err(e) = self.handle_message(msg) {
                        if e.is_fatal() {
                            error!(error = %e, "fatal error handling message");
                            return Err(e);
                        }
                        warn!(error = %e, "message dropped");
                    }
                }
                _ = ticker.tick() => {
                    match self.try_produce(unix_now()) {
                        Ok(_) => {}
                        Err(e) if e.is_fatal() => {
                            error!(error = %e, "fatal error producing block");
                            return Err(e);
                        }
                        Err(e) => warn!(error = %e, "block production failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(id = %self.bus.local_id(), height = self.height(), "node stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.bus.local_id())
            .field("chain", &*self.chain.read())
            .field("mempool", &self.mempool)
            .finish()
    }
}

fn invalid(msg: &Message, expected: &str) -> NodeError {
    NodeError::Network(NetworkError::InvalidMessage(format!(
        "{:?} from {} without a valid {expected}",
        msg.req_type, msg.from
    )))
}

fn range_of(msg: &Message) -> NodeResult<(BlockNumber, BlockNumber)> {
    match msg.body_range() {
        Some((start, end)) if start <= end => Ok((start, end)),
        _ => Err(invalid(msg, "range body")),
    }
}
