//! Metric names

/// Transactions applied by the verifier
pub const TX_APPLIED: &str = "verifier_tx_applied";
/// Transactions rejected by the verifier
pub const TX_FAILED: &str = "verifier_tx_failed";
/// Gas consumed by applied transactions
pub const GAS_USED: &str = "verifier_gas_used";
/// Transactions aborted by the execution deadline or step bound
pub const TX_TIMEOUT: &str = "verifier_tx_timeout";
/// Latency of one batch verification, microseconds
pub const BATCH_VERIFY_MICROS: &str = "verifier_batch_micros";

/// Blocks sent on the bus
pub const SEND_BLOCK_COUNT: &str = "send_block_count";
/// Transactions sent on the bus
pub const SEND_TRANSACTION_COUNT: &str = "send_transaction_count";
/// Broadcast transactions received from the bus
pub const RECEIVED_BROAD_TRANSACTION_COUNT: &str = "received_broad_transaction_count";

/// Blocks produced by this node
pub const BLOCKS_PRODUCED: &str = "node_blocks_produced";
/// Blocks received and accepted
pub const BLOCKS_ACCEPTED: &str = "node_blocks_accepted";
/// Blocks received and rejected
pub const BLOCKS_REJECTED: &str = "node_blocks_rejected";
/// Current chain height
pub const CHAIN_HEIGHT: &str = "node_chain_height";
/// Transactions waiting in the mempool
pub const MEMPOOL_SIZE: &str = "node_mempool_size";
