//! Bus message types

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// TTL stamped on every sent or broadcast message
pub const MSG_MAX_TTL: u8 = 2;

/// Request types carried on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ReqType {
    /// Transaction for the mempool
    PublishTx = 0,
    /// Ask peers for their height
    ReqBlockHeight = 1,
    /// Answer to [`ReqType::ReqBlockHeight`]
    RecvBlockHeight = 2,
    /// New block, or a block answering a download
    NewBlock = 3,
    /// Request the block at a height
    DownloadBlock = 4,
    /// Ask for hashes of a height range
    BlockHashQuery = 5,
    /// Answer to [`ReqType::BlockHashQuery`]
    BlockHashResponse = 6,
    /// Block sent during sync
    SyncBlock = 7,
}

/// One bus message
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    /// Sender id
    pub from: String,
    /// Recipient id; empty for broadcasts
    pub to: String,
    /// What the body holds
    pub req_type: ReqType,
    /// Hops left
    pub ttl: u8,
    /// Encoded payload
    pub body: Bytes,
}

impl Message {
    /// Message with no addressing yet; the bus fills in `from` and `ttl`
    pub fn new(req_type: ReqType, body: impl Into<Bytes>) -> Self {
        Self {
            from: String::new(),
            to: String::new(),
            req_type,
            ttl: 0,
            body: body.into(),
        }
    }

    /// Address the message to `to`
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    /// Body holding one height
    pub fn height_body(height: u64) -> Bytes {
        Bytes::copy_from_slice(&height.to_be_bytes())
    }

    /// Body holding an inclusive height range
    pub fn range_body(start: u64, end: u64) -> Bytes {
        let mut buf = BytesMut::with_capacity(16);
        buf.put_u64(start);
        buf.put_u64(end);
        buf.freeze()
    }

    /// Height from a [`Message::height_body`] body
    pub fn body_height(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.body.as_ref().try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }

    /// Range from a [`Message::range_body`] body
    pub fn body_range(&self) -> Option<(u64, u64)> {
        if self.body.len() != 16 {
            return None;
        }
        let mut start = [0u8; 8];
        let mut end = [0u8; 8];
        start.copy_from_slice(&self.body[..8]);
        end.copy_from_slice(&self.body[8..]);
        Some((u64::from_be_bytes(start), u64::from_be_bytes(end)))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("req_type", &self.req_type)
            .field("ttl", &self.ttl)
            .field("body_len", &self.body.len())
            .finish()
    }
}
