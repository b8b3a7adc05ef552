//! Shared consensus state

use crate::dynamic::ChainDynamicProperty;
use crate::error::SchedulingResult;
use crate::registry::WitnessRegistry;
use crate::schedule;
use crate::timestamp::Timestamp;
use parking_lot::RwLock;
use pob_primitives::AccountId;
use pob_types::BlockHeader;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug)]
struct State {
    registry: WitnessRegistry,
    dynamic: ChainDynamicProperty,
}

/// Registry and dynamic property behind one lock.
///
/// Scheduling queries take a read guard and see a consistent pair. Block
/// acceptance and committee changes take the write guard, so at most one
/// mutation is in flight and no query observes half of one.
#[derive(Clone, Debug)]
pub struct ConsensusHandle {
    inner: Arc<RwLock<State>>,
}

impl ConsensusHandle {
    /// Share `registry` and `dynamic`
    pub fn new(registry: WitnessRegistry, dynamic: ChainDynamicProperty) -> Self {
        Self {
            inner: Arc::new(RwLock::new(State { registry, dynamic })),
        }
    }

    /// Run `f` against a consistent snapshot
    pub fn read<R>(&self, f: impl FnOnce(&WitnessRegistry, &ChainDynamicProperty) -> R) -> R {
        let state = self.inner.read();
        f(&state.registry, &state.dynamic)
    }

    /// Copy of the registry
    pub fn registry(&self) -> WitnessRegistry {
        self.inner.read().registry.clone()
    }

    /// Copy of the dynamic property
    pub fn dynamic(&self) -> ChainDynamicProperty {
        self.inner.read().dynamic
    }

    /// This node's identity
    pub fn self_identity(&self) -> AccountId {
        self.inner.read().registry.self_identity().clone()
    }

    /// Witness scheduled for `timestamp`
    pub fn assigned_witness(&self, timestamp: Timestamp) -> Option<AccountId> {
        self.read(|reg, dyn_| schedule::assigned_witness(reg, dyn_, timestamp).cloned())
    }

    /// Wait until this node's next slot
    pub fn time_until_next_self_turn(&self, now_secs: u64) -> Option<Duration> {
        self.read(|reg, dyn_| schedule::time_until_next_self_turn(reg, dyn_, now_secs))
    }

    /// Check `header` against the schedule without applying it
    pub fn check_block_header(&self, header: &BlockHeader) -> SchedulingResult<()> {
        self.read(|reg, dyn_| schedule::check_block_header(reg, dyn_, header))
    }

    /// Check and record a block in one critical section
    pub fn accept_block(&self, header: &BlockHeader) -> SchedulingResult<()> {
        let mut state = self.inner.write();
        schedule::check_block_header(&state.registry, &state.dynamic, header)?;
        state.dynamic.update(header)?;
        debug!(number = header.number, slot = header.slot, witness = %header.witness, "block accepted");
        Ok(())
    }

    /// Queue `id` for admission
    pub fn add_pending(&self, id: AccountId) -> SchedulingResult<()> {
        self.inner.write().registry.add_pending(id)
    }

    /// Drop `id` from the admission queue
    pub fn delete_pending(&self, id: &AccountId) -> SchedulingResult<()> {
        self.inner.write().registry.delete_pending(id)
    }

    /// Replace the committee
    pub fn update_lists(&self, new_set: impl IntoIterator<Item = AccountId>) {
        let mut state = self.inner.write();
        state.registry.update_lists(new_set);
        info!(
            witnesses = state.registry.number_of_witnesses(),
            pending = state.registry.pending().len(),
            "witness lists updated"
        );
    }
}
