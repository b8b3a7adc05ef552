//! Witness committee and admission queue

use crate::error::{SchedulingError, SchedulingResult};
use pob_primitives::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The active committee and identities waiting to join it.
///
/// `witnesses` is always sorted and duplicate free. An identity is never in
/// both lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessRegistry {
    self_identity: AccountId,
    witnesses: Vec<AccountId>,
    pending: Vec<AccountId>,
}

impl WitnessRegistry {
    /// Genesis registry with an initial committee
    pub fn new(self_identity: AccountId, witnesses: impl IntoIterator<Item = AccountId>) -> Self {
        let witnesses: BTreeSet<AccountId> = witnesses.into_iter().collect();
        Self {
            self_identity,
            witnesses: witnesses.into_iter().collect(),
            pending: Vec::new(),
        }
    }

    /// Queue `id` for admission
    pub fn add_pending(&mut self, id: AccountId) -> SchedulingResult<()> {
        if self.is_pending(&id) {
            return Err(SchedulingError::AlreadyPending(id));
        }
        if self.is_witness(&id) {
            return Err(SchedulingError::AlreadyWitness(id));
        }
        self.pending.push(id);
        Ok(())
    }

    /// Remove `id` from the admission queue
    pub fn delete_pending(&mut self, id: &AccountId) -> SchedulingResult<()> {
        let pos = self
            .pending
            .iter()
            .position(|p| p == id)
            .ok_or_else(|| SchedulingError::NotPending(id.clone()))?;
        self.pending.remove(pos);
        Ok(())
    }

    /// Replace the committee with `new_set`. Everyone else who was a witness
    /// or pending goes back to the queue, sorted.
    pub fn update_lists(&mut self, new_set: impl IntoIterator<Item = AccountId>) {
        let witnesses: BTreeSet<AccountId> = new_set.into_iter().collect();
        let pending: BTreeSet<AccountId> = self
            .witnesses
            .drain(..)
            .chain(self.pending.drain(..))
            .filter(|id| !witnesses.contains(id))
            .collect();
        self.witnesses = witnesses.into_iter().collect();
        self.pending = pending.into_iter().collect();
    }

    /// Committee size
    pub fn number_of_witnesses(&self) -> usize {
        self.witnesses.len()
    }

    /// Position of `id` in the sorted committee
    pub fn witness_index(&self, id: &AccountId) -> Option<usize> {
        self.witnesses.binary_search(id).ok()
    }

    /// Whether `id` is in the committee
    pub fn is_witness(&self, id: &AccountId) -> bool {
        self.witness_index(id).is_some()
    }

    /// Whether `id` waits for admission
    pub fn is_pending(&self, id: &AccountId) -> bool {
        self.pending.contains(id)
    }

    /// This node's identity
    pub fn self_identity(&self) -> &AccountId {
        &self.self_identity
    }

    /// This node's position in the committee
    pub fn self_index(&self) -> Option<usize> {
        self.witness_index(&self.self_identity)
    }

    /// Sorted committee
    pub fn witnesses(&self) -> &[AccountId] {
        &self.witnesses
    }

    /// Admission queue
    pub fn pending(&self) -> &[AccountId] {
        &self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<AccountId> {
        names.iter().map(|n| AccountId::from(*n)).collect()
    }

    fn registry() -> WitnessRegistry {
        let mut reg = WitnessRegistry::new(AccountId::from("id0"), ids(&["id3", "id1", "id2"]));
        reg.add_pending(AccountId::from("id4")).unwrap();
        reg.add_pending(AccountId::from("id5")).unwrap();
        reg
    }

    #[test]
    fn test_new_sorts_committee() {
        let reg = registry();
        assert_eq!(reg.number_of_witnesses(), 3);
        assert_eq!(reg.witnesses(), ids(&["id1", "id2", "id3"]).as_slice());
        assert_eq!(reg.self_index(), None);
    }

    #[test]
    fn test_add_pending() {
        let mut reg = registry();
        assert_eq!(reg.pending().len(), 2);
        assert_eq!(
            reg.add_pending(AccountId::from("id4")),
            Err(SchedulingError::AlreadyPending(AccountId::from("id4")))
        );
        assert_eq!(
            reg.add_pending(AccountId::from("id1")),
            Err(SchedulingError::AlreadyWitness(AccountId::from("id1")))
        );
        assert_eq!(reg.pending().len(), 2);
    }

    #[test]
    fn test_update_lists() {
        let mut reg = registry();
        reg.update_lists(ids(&["id3", "id5", "id1"]));
        assert_eq!(reg.witnesses(), ids(&["id1", "id3", "id5"]).as_slice());
        assert_eq!(reg.pending(), ids(&["id2", "id4"]).as_slice());
    }

    #[test]
    fn test_delete_pending() {
        let mut reg = registry();
        reg.delete_pending(&AccountId::from("id4")).unwrap();
        assert_eq!(reg.pending().len(), 1);
        assert_eq!(
            reg.delete_pending(&AccountId::from("id2")),
            Err(SchedulingError::NotPending(AccountId::from("id2")))
        );
        assert_eq!(reg.pending().len(), 1);
    }

    #[test]
    fn test_update_lists_dedups() {
        let mut reg = registry();
        reg.update_lists(ids(&["id4", "id4", "id2"]));
        assert_eq!(reg.witnesses(), ids(&["id2", "id4"]).as_slice());
        assert_eq!(reg.pending(), ids(&["id1", "id3", "id5"]).as_slice());
    }
}
