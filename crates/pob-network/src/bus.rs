//! Bus interface

use crate::error::NetworkResult;
use crate::filter::Filter;
use crate::types::Message;
use tokio::sync::mpsc;

/// Buffered messages per subscription before new ones are dropped
pub const SUBSCRIPTION_CAPACITY: usize = 10_000;

/// What the node needs from the network.
///
/// Sending never blocks: a subscriber whose buffer is full misses the
/// message, as it would on a lossy transport.
pub trait MessageBus: Send + Sync {
    /// This endpoint's id
    fn local_id(&self) -> &str;

    /// Deliver `msg` to `msg.to`
    fn send(&self, msg: Message) -> NetworkResult<()>;

    /// Deliver `msg` to every other member
    fn broadcast(&self, msg: Message) -> NetworkResult<()>;

    /// Channel of incoming messages that pass `filter`
    fn subscribe(&self, filter: Filter) -> mpsc::Receiver<Message>;

    /// Request blocks `start..=end` from peers
    fn download(&self, start: u64, end: u64) -> NetworkResult<()>;

    /// Stop a download started with the same range
    fn cancel_download(&self, start: u64, end: u64) -> NetworkResult<()>;

    /// Ask member `to` for the block at `height`
    fn ask_block(&self, height: u64, to: &str) -> NetworkResult<()>;

    /// Ask every member for the hashes of blocks `start..=end`
    fn query_block_hash(&self, start: u64, end: u64) -> NetworkResult<()>;
}
