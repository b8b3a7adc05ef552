//! # pob-network
//!
//! Message bus boundary.
//!
//! The scheduler and verification pipeline exchange blocks and transactions
//! through [`MessageBus`] and never see transport details. Subscribers
//! receive the messages their [`Filter`] admits on a tokio channel.
//!
//! [`LocalHub`] connects any number of [`LocalBus`] endpoints inside one
//! process; it backs the tests and single-process multi-node setups.
//!
//! ```text
//!   LocalBus "n1" --send/broadcast--> LocalHub --deliver--> LocalBus "n2"
//!                                                            |-- filter A -> Receiver
//!                                                            `-- filter B -> Receiver
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bus;
mod error;
mod filter;
mod local;
mod types;

pub use bus::{MessageBus, SUBSCRIPTION_CAPACITY};
pub use error::{NetworkError, NetworkResult};
pub use filter::Filter;
pub use local::{LocalBus, LocalHub};
pub use types::{Message, ReqType, MSG_MAX_TTL};
