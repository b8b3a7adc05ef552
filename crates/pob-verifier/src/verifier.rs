//! Execution core and the two verification modes

use crate::config::VerifierConfig;
use crate::error::{VerifyError, VerifyResult};
use crate::receipt::{BatchOutcome, Receipt};
use pob_metrics::{names, timed, Metrics};
use pob_primitives::Amount;
use pob_state::{PoolId, StateReader, StateTree, StateWriter};
use pob_types::{compute_tx_root, Block, Transaction};
use pob_vm::{CallContext, ExecutionContext, Executor, Interpreter, Limits};
use std::sync::Arc;
use tracing::{debug, warn};

/// Applies transactions to the layered state pool.
///
/// The verifier holds no state of its own; the [`StateTree`] is passed to
/// every call, so one verifier can serve the producer loop, the block
/// receiver and mempool admission.
pub struct BatchVerifier {
    executor: Arc<dyn Executor>,
    config: VerifierConfig,
    metrics: Option<Arc<Metrics>>,
}

impl Default for BatchVerifier {
    fn default() -> Self {
        Self::new(VerifierConfig::default())
    }
}

impl BatchVerifier {
    /// Verifier running contracts on the bytecode [`Interpreter`]
    pub fn new(config: VerifierConfig) -> Self {
        Self::with_executor(Arc::new(Interpreter::new()), config)
    }

    /// Verifier running contracts on a custom executor
    pub fn with_executor(executor: Arc<dyn Executor>, config: VerifierConfig) -> Self {
        Self {
            executor,
            config,
            metrics: None,
        }
    }

    /// Report applied/failed counts, gas and batch latency to `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Batch mode.
    ///
    /// Creates exactly one child of `base` and applies `transactions` to it in
    /// order. Stops at the first failure; the returned child holds the
    /// effects of the transactions before it and nothing else. The caller owns
    /// the child and must commit or discard it.
    pub fn verify_batch(
        &self,
        tree: &mut StateTree,
        transactions: &[Transaction],
        base: PoolId,
        ctx: &ExecutionContext,
    ) -> VerifyResult<BatchOutcome> {
        let pool = tree.new_child(base)?;
        let mut run = || {
            let mut receipts = Vec::with_capacity(transactions.len());
            let mut error = None;
            for (index, tx) in transactions.iter().enumerate() {
                match self.apply(tree, pool, tx, index, ctx) {
                    Ok(receipt) => receipts.push(receipt),
                    Err(e) => {
                        warn!(index, error = %e, "batch stopped at failing transaction");
                        error = Some(e);
                        break;
                    }
                }
            }
            (receipts, error)
        };
        let (receipts, error) = match &self.metrics {
            Some(metrics) => timed!(metrics, names::BATCH_VERIFY_MICROS, { run() }),
            None => run(),
        };

        debug!(%base, %pool, applied = receipts.len(), total = transactions.len(), "batch verified");
        Ok(BatchOutcome {
            pool,
            applied: receipts.len(),
            receipts,
            error,
        })
    }

    /// Cache mode: apply one transaction onto `pool`'s own layer.
    ///
    /// On failure `pool` is unchanged. No extra layer outlives the call.
    pub fn verify_single(
        &self,
        tree: &mut StateTree,
        tx: &Transaction,
        pool: PoolId,
        ctx: &ExecutionContext,
    ) -> VerifyResult<Receipt> {
        self.apply(tree, pool, tx, 0, ctx)
    }

    /// Re-run a received block on top of `base`.
    ///
    /// Every transaction must apply and the resulting layer must hash to the
    /// header's state digest. On any failure the new layer is discarded.
    pub fn verify_block(
        &self,
        tree: &mut StateTree,
        block: &Block,
        base: PoolId,
        ctx: &ExecutionContext,
    ) -> VerifyResult<BatchOutcome> {
        if !block.tx_root_matches() {
            return Err(VerifyError::TxRootMismatch {
                expected: block.header.tx_root,
                actual: compute_tx_root(&block.transactions),
            });
        }

        let outcome = self.verify_batch(tree, &block.transactions, base, ctx)?;
        if let Some(err) = outcome.error {
            tree.discard(outcome.pool)?;
            return Err(err);
        }

        let digest = tree.local_digest(outcome.pool)?;
        if digest != block.header.state_digest {
            tree.discard(outcome.pool)?;
            return Err(VerifyError::StateDigestMismatch {
                expected: block.header.state_digest,
                actual: digest,
            });
        }
        Ok(outcome)
    }

    /// Run `tx` in a scratch overlay of `pool`, folding it in only on success
    fn apply(
        &self,
        tree: &mut StateTree,
        pool: PoolId,
        tx: &Transaction,
        index: usize,
        ctx: &ExecutionContext,
    ) -> VerifyResult<Receipt> {
        let tx_hash = tx.hash();
        let result = self.check_signature(tx, index).and_then(|()| {
            let scratch = tree
                .new_child(pool)
                .map_err(|e| VerifyError::from_state(e, tx_hash, index))?;
            match self.execute(tree, scratch, tx, index, ctx) {
                Ok(receipt) => {
                    tree.commit(pool, scratch)
                        .map_err(|e| VerifyError::from_state(e, tx_hash, index))?;
                    Ok(receipt)
                }
                Err(err) => {
                    tree.discard(scratch)
                        .map_err(|e| VerifyError::from_state(e, tx_hash, index))?;
                    Err(err)
                }
            }
        });
        self.record(&result);
        result
    }

    fn check_signature(&self, tx: &Transaction, index: usize) -> VerifyResult<()> {
        let malformed = |reason: String| VerifyError::MalformedTransaction {
            tx_hash: tx.hash(),
            index,
            reason,
        };
        match tx.signer() {
            Ok(Some(signer)) if signer == tx.publisher => Ok(()),
            Ok(Some(signer)) => Err(malformed(format!(
                "signed by {signer}, published by {}",
                tx.publisher
            ))),
            Ok(None) if self.config.require_signatures => Err(malformed("missing signature".into())),
            Ok(None) => Ok(()),
            Err(e) => Err(malformed(e.to_string())),
        }
    }

    /// The publisher must be able to pay for the whole gas limit before
    /// anything runs
    fn check_upfront_cost(&self, tree: &StateTree, pool: PoolId, tx: &Transaction, index: usize) -> VerifyResult<()> {
        let tx_hash = tx.hash();
        if tx.gas_price < self.config.min_gas_price {
            return Err(VerifyError::MalformedTransaction {
                tx_hash,
                index,
                reason: format!("gas price {} below minimum {}", tx.gas_price, self.config.min_gas_price),
            });
        }
        let required = Amount::from(tx.gas_limit).saturating_mul(Amount::from(tx.gas_price));
        let balance = tree
            .view(pool)
            .balance_of(&tx.publisher)
            .map_err(|e| VerifyError::from_state(e, tx_hash, index))?;
        if balance < required {
            return Err(VerifyError::InsufficientBalance {
                tx_hash,
                index,
                account: tx.publisher.to_string(),
                balance,
                required,
            });
        }
        Ok(())
    }

    fn execute(
        &self,
        tree: &mut StateTree,
        scratch: PoolId,
        tx: &Transaction,
        index: usize,
        ctx: &ExecutionContext,
    ) -> VerifyResult<Receipt> {
        let tx_hash = tx.hash();
        self.check_upfront_cost(tree, scratch, tx, index)?;
        let limits = Limits::new(tx.gas_limit)
            .with_max_steps(self.config.max_steps)
            .with_max_call_depth(self.config.max_call_depth)
            .with_timeout(self.config.timeout);
        let call = CallContext::for_transaction(tx);

        let mut view = tree.view_mut(scratch);
        let output = self
            .executor
            .run(&tx.contract, &call, &mut view, ctx, &limits)
            .map_err(|e| VerifyError::from_vm(e, tx_hash, index))?;

        let fee = Amount::from(output.gas_used).saturating_mul(Amount::from(tx.gas_price));
        view.debit(&tx.publisher, fee)
            .map_err(|e| VerifyError::from_state(e, tx_hash, index))?;

        Ok(Receipt {
            tx_hash,
            gas_used: output.gas_used,
            fee,
            return_value: output.return_value,
            logs: output.logs,
        })
    }

    fn record(&self, result: &VerifyResult<Receipt>) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        match result {
            Ok(receipt) => {
                metrics.incr(names::TX_APPLIED, 1);
                metrics.incr(names::GAS_USED, receipt.gas_used);
            }
            Err(err) => {
                metrics.incr(names::TX_FAILED, 1);
                if matches!(err, VerifyError::ExecutionTimeout { .. }) {
                    metrics.incr(names::TX_TIMEOUT, 1);
                }
            }
        }
    }
}

impl std::fmt::Debug for BatchVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchVerifier")
            .field("config", &self.config)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
