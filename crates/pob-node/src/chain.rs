//! Canonical chain: state, block archive and schedule

use crate::config::NodeConfig;
use crate::error::{NodeError, NodeResult};
use crate::genesis::init_genesis;
use pob_consensus::{ChainDynamicProperty, ConsensusHandle, Timestamp, WitnessRegistry};
use pob_metrics::{names, Metrics};
use pob_primitives::{AccountId, Amount, BlockNumber, H256};
use pob_state::{PoolId, StateReader, StateTree, Value};
use pob_storage::{BlockStore, KvStore, WriteBatch};
use pob_types::{compute_tx_root, Block, BlockHeader, Transaction};
use pob_verifier::{BatchVerifier, Receipt, VerifyError};
use pob_vm::ExecutionContext;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of producing a block
#[derive(Debug)]
pub struct ProducedBlock {
    /// The new head
    pub block: Block,
    /// Transaction that stopped the batch, with its failure
    pub rejected: Option<(Transaction, VerifyError)>,
    /// Transactions after the rejected one, not yet executed
    pub leftover: Vec<Transaction>,
}

/// The node's view of the chain.
///
/// Blocks are verified in a child of the root. The child's state and the
/// block itself reach the store in one batch, and only then do the schedule
/// and the head move.
pub struct Chain {
    tree: StateTree,
    blocks: BlockStore,
    head: BlockHeader,
    verifier: BatchVerifier,
    admission: BatchVerifier,
    consensus: ConsensusHandle,
    metrics: Arc<Metrics>,
}

impl Chain {
    /// Open the chain held in `store`, writing genesis if it is empty
    pub fn open(config: &NodeConfig, store: Arc<dyn KvStore>, metrics: Arc<Metrics>) -> NodeResult<Self> {
        let mut tree = StateTree::new(store.clone());
        let blocks = BlockStore::new(store);
        let mut dynamic = ChainDynamicProperty::new();

        let head = match blocks.latest_block()? {
            Some(number) => {
                let block = load_block(&blocks, number)?
                    .ok_or_else(|| NodeError::Corrupt(format!("latest block {number} missing")))?;
                if number > 0 {
                    dynamic.advance(number, Timestamp::new(block.header.slot))?;
                }
                info!(number, hash = %block.hash(), "resuming chain");
                block.header
            }
            None => {
                let genesis = init_genesis(&mut tree, &config.genesis_balances()?)?;
                blocks.put_block(0, &genesis.hash(), &genesis.header.encode(), &genesis.encode_body())?;
                genesis.header
            }
        };

        let registry = WitnessRegistry::new(config.identity()?, config.witnesses()?);
        let verifier = BatchVerifier::new(config.verifier_config()).with_metrics(metrics.clone());
        let admission = BatchVerifier::new(config.verifier_config());
        metrics.set_gauge(names::CHAIN_HEIGHT, head.number as i64);

        Ok(Self {
            tree,
            blocks,
            head,
            verifier,
            admission,
            consensus: ConsensusHandle::new(registry, dynamic),
            metrics,
        })
    }

    /// Latest accepted header
    pub fn head(&self) -> &BlockHeader {
        &self.head
    }

    /// Latest accepted height
    pub fn height(&self) -> BlockNumber {
        self.head.number
    }

    /// Schedule state
    pub fn consensus(&self) -> &ConsensusHandle {
        &self.consensus
    }

    /// Committed balance of `account`
    pub fn balance_of(&self, account: &AccountId) -> NodeResult<Amount> {
        Ok(self.tree.view(self.tree.root()).balance_of(account)?)
    }

    /// Committed value at (category, key)
    pub fn get(&self, category: &str, key: &str) -> NodeResult<Option<Value>> {
        Ok(self.tree.get(self.tree.root(), category, key)?)
    }

    /// Accepted block at `number`
    pub fn block_by_number(&self, number: BlockNumber) -> NodeResult<Option<Block>> {
        load_block(&self.blocks, number)
    }

    /// Hashes of accepted blocks in `start..=end`, stopping at the first gap
    pub fn hashes_in_range(&self, start: BlockNumber, end: BlockNumber) -> NodeResult<Vec<(BlockNumber, H256)>> {
        Ok(self.blocks.hashes_in_range(start, end)?)
    }

    /// Dry-run `tx` on committed state with the base context. The state is
    /// left as it was whatever the outcome.
    pub fn check_transaction(&mut self, tx: &Transaction) -> NodeResult<Receipt> {
        let root = self.tree.root();
        let scratch = self.tree.new_child(root)?;
        let result = self
            .admission
            .verify_single(&mut self.tree, tx, scratch, &ExecutionContext::default());
        self.tree.discard(scratch)?;
        Ok(result?)
    }

    fn context(number: BlockNumber, slot: u64, parent_hash: H256) -> ExecutionContext {
        ExecutionContext::new(number, Timestamp::new(slot).to_unix_secs(), parent_hash)
    }

    /// Build the next block from `txs` in `slot`.
    ///
    /// Transactions run in order until the first failure. The block carries
    /// the ones before it; the failing one is reported and the rest are
    /// handed back untouched.
    pub fn produce_block(&mut self, txs: &[Transaction], slot: Timestamp) -> NodeResult<ProducedBlock> {
        let me = self.consensus.self_identity();
        if self.consensus.assigned_witness(slot).as_ref() != Some(&me) {
            return Err(NodeError::NotOurTurn { slot: slot.slot });
        }

        let number = self.head.number + 1;
        let parent_hash = self.head.hash();
        let root = self.tree.root();
        let ctx = Self::context(number, slot.slot, parent_hash);
        let outcome = self.verifier.verify_batch(&mut self.tree, txs, root, &ctx)?;

        let applied = outcome.applied;
        let rejected = match outcome.error {
            Some(err) if err.is_fatal() => {
                self.tree.discard(outcome.pool)?;
                return Err(err.into());
            }
            Some(err) => Some((txs[applied].clone(), err)),
            None => None,
        };
        let resume = if rejected.is_some() { applied + 1 } else { applied };
        let included = txs[..applied].to_vec();

        let header = BlockHeader {
            number,
            parent_hash,
            witness: me,
            slot: slot.slot,
            tx_root: compute_tx_root(&included),
            state_digest: self.tree.local_digest(outcome.pool)?,
        };
        if let Err(e) = self.consensus.check_block_header(&header) {
            self.tree.discard(outcome.pool)?;
            return Err(e.into());
        }

        let block = Block {
            header,
            transactions: included,
        };
        self.finalize(&block, outcome.pool)?;
        self.metrics.incr(names::BLOCKS_PRODUCED, 1);
        info!(number, %slot, txs = block.transactions.len(), hash = %block.hash(), "produced block");

        Ok(ProducedBlock {
            block,
            rejected,
            leftover: txs[resume..].to_vec(),
        })
    }

    /// Check `block` against the schedule, re-run its transactions and make
    /// it the new head. The chain is unchanged on error.
    pub fn import_block(&mut self, block: &Block) -> NodeResult<()> {
        match self.try_import(block) {
            Ok(()) => {
                self.metrics.incr(names::BLOCKS_ACCEPTED, 1);
                info!(number = block.number(), witness = %block.header.witness, "imported block");
                Ok(())
            }
            Err(e) => {
                self.metrics.incr(names::BLOCKS_REJECTED, 1);
                warn!(number = block.number(), error = %e, "rejected block");
                Err(e)
            }
        }
    }

    fn try_import(&mut self, block: &Block) -> NodeResult<()> {
        let head = self.head.hash();
        if block.header.parent_hash != head {
            return Err(NodeError::UnknownParent {
                number: block.number(),
                parent: block.header.parent_hash,
                head,
            });
        }
        self.consensus.check_block_header(&block.header)?;

        let root = self.tree.root();
        let ctx = Self::context(block.number(), block.header.slot, head);
        let outcome = self.verifier.verify_block(&mut self.tree, block, root, &ctx)?;
        self.finalize(block, outcome.pool)
    }

    /// Persist `pool` and `block` in one batch, then advance the schedule
    /// and the head. On error `pool` is discarded and nothing moves.
    fn finalize(&mut self, block: &Block, pool: PoolId) -> NodeResult<()> {
        match self.persist(block, pool) {
            Ok(written) => {
                self.consensus.accept_block(&block.header)?;
                self.head = block.header.clone();
                self.metrics.set_gauge(names::CHAIN_HEIGHT, self.head.number as i64);
                debug!(number = self.head.number, written, "head advanced");
                Ok(())
            }
            Err(e) => {
                warn!(number = block.number(), error = %e, "block not persisted");
                if self.tree.is_live(pool) {
                    self.tree.discard(pool)?;
                }
                Err(e)
            }
        }
    }

    fn persist(&mut self, block: &Block, pool: PoolId) -> NodeResult<usize> {
        let mut batch = WriteBatch::new();
        self.blocks.stage_block(
            &mut batch,
            block.number(),
            &block.hash(),
            &block.header.encode(),
            &block.encode_body(),
        )?;
        Ok(self.tree.commit_and_flush(pool, batch)?)
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("height", &self.head.number)
            .field("head", &self.head.hash())
            .finish()
    }
}

fn load_block(blocks: &BlockStore, number: BlockNumber) -> NodeResult<Option<Block>> {
    let Some(hash) = blocks.hash_by_number(number)? else {
        return Ok(None);
    };
    let header = blocks
        .header(&hash)?
        .ok_or_else(|| NodeError::Corrupt(format!("header of block {number} missing")))?;
    let body = blocks
        .body(&hash)?
        .ok_or_else(|| NodeError::Corrupt(format!("body of block {number} missing")))?;
    Ok(Some(Block {
        header: BlockHeader::decode(&header)?,
        transactions: Block::decode_body(&body)?,
    }))
}
