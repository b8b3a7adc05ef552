//! In-process bus

use crate::bus::{MessageBus, SUBSCRIPTION_CAPACITY};
use crate::error::{NetworkError, NetworkResult};
use crate::filter::Filter;
use crate::types::{Message, ReqType, MSG_MAX_TTL};
use parking_lot::{Mutex, RwLock};
use pob_metrics::{names, Metrics};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};

struct Subscription {
    filter: Filter,
    tx: mpsc::Sender<Message>,
}

/// Receiving side of one member
struct Endpoint {
    id: String,
    subscriptions: Mutex<Vec<Subscription>>,
    metrics: Option<Arc<Metrics>>,
}

impl Endpoint {
    fn deliver(&self, msg: &Message, broadcast: bool) {
        if broadcast && msg.req_type == ReqType::PublishTx {
            if let Some(metrics) = &self.metrics {
                metrics.incr(names::RECEIVED_BROAD_TRANSACTION_COUNT, 1);
            }
        }

        // Closed receivers are pruned here
        self.subscriptions.lock().retain(|sub| {
            if !sub.filter.check(msg) {
                return !sub.tx.is_closed();
            }
            match sub.tx.try_send(msg.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(member = %self.id, req_type = ?msg.req_type, "subscriber full, message dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            }
        });
    }
}

/// Registry of in-process members.
///
/// Cloning the hub shares its membership.
#[derive(Clone, Default)]
pub struct LocalHub {
    members: Arc<RwLock<HashMap<String, Arc<Endpoint>>>>,
}

impl LocalHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the hub as `id`
    pub fn connect(&self, id: impl Into<String>) -> NetworkResult<LocalBus> {
        self.join(id.into(), None)
    }

    /// Join the hub as `id`, reporting traffic to `metrics`
    pub fn connect_with_metrics(
        &self,
        id: impl Into<String>,
        metrics: Arc<Metrics>,
    ) -> NetworkResult<LocalBus> {
        self.join(id.into(), Some(metrics))
    }

    fn join(&self, id: String, metrics: Option<Arc<Metrics>>) -> NetworkResult<LocalBus> {
        let mut members = self.members.write();
        if members.contains_key(&id) {
            return Err(NetworkError::AlreadyConnected(id));
        }
        let endpoint = Arc::new(Endpoint {
            id: id.clone(),
            subscriptions: Mutex::new(Vec::new()),
            metrics,
        });
        members.insert(id.clone(), endpoint.clone());
        debug!(member = %id, "joined local hub");

        Ok(LocalBus {
            endpoint,
            hub: self.clone(),
            downloads: Mutex::new(BTreeSet::new()),
        })
    }

    /// Remove a member; returns whether it was connected
    pub fn disconnect(&self, id: &str) -> bool {
        self.members.write().remove(id).is_some()
    }

    /// Connected member ids, sorted
    pub fn members(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.members.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn endpoint(&self, id: &str) -> Option<Arc<Endpoint>> {
        self.members.read().get(id).cloned()
    }

    fn others(&self, id: &str) -> Vec<Arc<Endpoint>> {
        self.members
            .read()
            .values()
            .filter(|endpoint| endpoint.id != id)
            .cloned()
            .collect()
    }
}

impl fmt::Debug for LocalHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalHub")
            .field("members", &self.members())
            .finish()
    }
}

/// One member's handle on a [`LocalHub`]
pub struct LocalBus {
    endpoint: Arc<Endpoint>,
    hub: LocalHub,
    downloads: Mutex<BTreeSet<(u64, u64)>>,
}

impl LocalBus {
    /// Ranges requested with [`MessageBus::download`] and not yet cancelled
    pub fn pending_downloads(&self) -> Vec<(u64, u64)> {
        self.downloads.lock().iter().copied().collect()
    }

    /// The hub this member belongs to
    pub fn hub(&self) -> &LocalHub {
        &self.hub
    }

    fn stamp(&self, mut msg: Message) -> Message {
        msg.from = self.endpoint.id.clone();
        msg.ttl = MSG_MAX_TTL;
        msg
    }

    fn count_sent(&self, req_type: ReqType) {
        let Some(metrics) = &self.endpoint.metrics else {
            return;
        };
        match req_type {
            ReqType::NewBlock => metrics.incr(names::SEND_BLOCK_COUNT, 1),
            ReqType::PublishTx => metrics.incr(names::SEND_TRANSACTION_COUNT, 1),
            _ => {}
        }
    }

    fn check_range(start: u64, end: u64) -> NetworkResult<()> {
        if end < start {
            return Err(NetworkError::InvalidRange { start, end });
        }
        Ok(())
    }
}

impl MessageBus for LocalBus {
    fn local_id(&self) -> &str {
        &self.endpoint.id
    }

    fn send(&self, msg: Message) -> NetworkResult<()> {
        let msg = self.stamp(msg);
        let target = self
            .hub
            .endpoint(&msg.to)
            .ok_or_else(|| NetworkError::UnknownPeer(msg.to.clone()))?;
        trace!(from = %msg.from, to = %msg.to, req_type = ?msg.req_type, "send");
        self.count_sent(msg.req_type);
        target.deliver(&msg, false);
        Ok(())
    }

    fn broadcast(&self, mut msg: Message) -> NetworkResult<()> {
        msg.to.clear();
        let msg = self.stamp(msg);
        trace!(from = %msg.from, req_type = ?msg.req_type, "broadcast");
        self.count_sent(msg.req_type);
        for endpoint in self.hub.others(&self.endpoint.id) {
            endpoint.deliver(&msg, true);
        }
        Ok(())
    }

    fn subscribe(&self, filter: Filter) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        self.endpoint
            .subscriptions
            .lock()
            .push(Subscription { filter, tx });
        rx
    }

    fn download(&self, start: u64, end: u64) -> NetworkResult<()> {
        Self::check_range(start, end)?;
        self.downloads.lock().insert((start, end));
        debug!(start, end, "download requested");
        self.broadcast(Message::new(
            ReqType::DownloadBlock,
            Message::range_body(start, end),
        ))
    }

    fn cancel_download(&self, start: u64, end: u64) -> NetworkResult<()> {
        if self.downloads.lock().remove(&(start, end)) {
            Ok(())
        } else {
            Err(NetworkError::NoSuchDownload { start, end })
        }
    }

    fn ask_block(&self, height: u64, to: &str) -> NetworkResult<()> {
        self.send(
            Message::new(ReqType::DownloadBlock, Message::range_body(height, height)).to(to),
        )
    }

    fn query_block_hash(&self, start: u64, end: u64) -> NetworkResult<()> {
        Self::check_range(start, end)?;
        self.broadcast(Message::new(
            ReqType::BlockHashQuery,
            Message::range_body(start, end),
        ))
    }
}

impl fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBus")
            .field("id", &self.endpoint.id)
            .field("downloads", &self.pending_downloads())
            .finish()
    }
}
