//! # pob-state
//!
//! Layered state pool.
//!
//! State is a tree of layers kept in one arena ([`StateTree`]). The root layer
//! reads through to a [`pob_storage::KvStore`]; every other layer overlays a
//! parent. Layers are addressed by [`PoolId`], a slot index plus generation,
//! so a retired layer is rejected instead of aliasing whatever reused its
//! slot.
//!
//! ```text
//!   root (store-backed)
//!    |-- block 7 overlay
//!    |    |-- block 8 overlay   <- verify_batch child
//!    |    `-- mempool scratch
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod tree;
mod value;
mod view;

pub use error::{StateError, StateResult};
pub use tree::{PoolId, StateTree};
pub use value::Value;
pub use view::{PoolView, PoolViewMut, StateReader, StateWriter};

/// Category holding token balances keyed by account id
pub use pob_storage::category::BALANCE as BALANCE_CATEGORY;
