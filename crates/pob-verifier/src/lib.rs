//! # pob-verifier
//!
//! Transaction verification pipeline.
//!
//! Two entry points share one execution core:
//!
//! - batch mode ([`BatchVerifier::verify_batch`]) creates one child layer over
//!   a base pool and applies a block's transactions in order, stopping at the
//!   first failure
//! - cache mode ([`BatchVerifier::verify_single`]) applies one transaction
//!   directly onto a caller-owned layer, for mempool admission
//!
//! Each transaction runs in a scratch overlay of the target layer. The
//! overlay is committed only when the contract succeeds and the publisher can
//! pay `gas_used * gas_price`, so a failed transaction leaves nothing behind.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod receipt;
mod verifier;

pub use config::{VerifierConfig, DEFAULT_MIN_GAS_PRICE, DEFAULT_TIMEOUT};
pub use error::{FailureKind, VerifyError, VerifyResult};
pub use receipt::{BatchOutcome, Receipt};
pub use verifier::BatchVerifier;
