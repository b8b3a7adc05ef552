//! Arena of state layers

use crate::{StateError, StateResult, Value};
use pob_crypto::keccak256;
use pob_primitives::H256;
use pob_storage::{category, KvStore, WriteBatch};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

type Entries = BTreeMap<(String, String), Value>;

/// Handle to one layer of a [`StateTree`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId {
    index: u32,
    generation: u32,
}

impl fmt::Debug for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerKind {
    Root,
    Overlay { parent: PoolId },
}

#[derive(Debug)]
struct Layer {
    kind: LayerKind,
    entries: Entries,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    layer: Option<Layer>,
}

/// Tree of copy-on-write state layers over a backing store.
///
/// All mutation goes through `&mut self`; share the tree behind a lock to
/// give many readers access to committed layers.
pub struct StateTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    store: Arc<dyn KvStore>,
    root: PoolId,
}

impl StateTree {
    /// Tree with a single root layer backed by `store`
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        let root = PoolId { index: 0, generation: 0 };
        StateTree {
            slots: vec![Slot {
                generation: 0,
                layer: Some(Layer {
                    kind: LayerKind::Root,
                    entries: Entries::new(),
                }),
            }],
            free: Vec::new(),
            store,
            root,
        }
    }

    /// The root layer
    pub fn root(&self) -> PoolId {
        self.root
    }

    /// Backing store
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    fn layer(&self, id: PoolId) -> StateResult<&Layer> {
        let slot = self
            .slots
            .get(id.index as usize)
            .ok_or(StateError::UnknownPool(id))?;
        match &slot.layer {
            Some(layer) if slot.generation == id.generation => Ok(layer),
            _ if id.generation > slot.generation => Err(StateError::UnknownPool(id)),
            _ => Err(StateError::RetiredPool(id)),
        }
    }

    fn layer_mut(&mut self, id: PoolId) -> StateResult<&mut Layer> {
        self.layer(id)?;
        match self.slots[id.index as usize].layer.as_mut() {
            Some(layer) => Ok(layer),
            None => Err(StateError::RetiredPool(id)),
        }
    }

    /// Whether `id` names a live layer
    pub fn is_live(&self, id: PoolId) -> bool {
        self.layer(id).is_ok()
    }

    /// Read through the parent chain, then the store. `Ok(None)` is a miss.
    pub fn get(&self, pool: PoolId, category: &str, key: &str) -> StateResult<Option<Value>> {
        let lookup = (category.to_string(), key.to_string());
        let mut current = pool;
        loop {
            let layer = self.layer(current)?;
            if let Some(value) = layer.entries.get(&lookup) {
                return Ok((!value.is_nil()).then(|| value.clone()));
            }
            match layer.kind {
                LayerKind::Overlay { parent } => current = parent,
                LayerKind::Root => break,
            }
        }
        match self.store.get(&category::state(category), key.as_bytes())? {
            Some(bytes) => {
                let value = Value::from_bytes(&bytes)?;
                Ok((!value.is_nil()).then_some(value))
            }
            None => Ok(None),
        }
    }

    /// Write into `pool`'s own layer. Writing [`Value::Nil`] deletes.
    pub fn put(&mut self, pool: PoolId, category: &str, key: &str, value: Value) -> StateResult<()> {
        trace!(%pool, category, key, ?value, "put");
        self.layer_mut(pool)?
            .entries
            .insert((category.to_string(), key.to_string()), value);
        Ok(())
    }

    /// Delete `(category, key)` as seen from `pool`
    pub fn delete(&mut self, pool: PoolId, category: &str, key: &str) -> StateResult<()> {
        self.put(pool, category, key, Value::Nil)
    }

    /// New empty overlay on top of `pool`
    pub fn new_child(&mut self, pool: PoolId) -> StateResult<PoolId> {
        self.layer(pool)?;
        let layer = Layer {
            kind: LayerKind::Overlay { parent: pool },
            entries: Entries::new(),
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation += 1;
                slot.layer = Some(layer);
                PoolId { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, layer: Some(layer) });
                PoolId { index, generation: 0 }
            }
        };
        trace!(parent = %pool, child = %id, "new child");
        Ok(id)
    }

    /// Parent of `pool`; `None` for the root
    pub fn parent(&self, pool: PoolId) -> StateResult<Option<PoolId>> {
        Ok(match self.layer(pool)?.kind {
            LayerKind::Root => None,
            LayerKind::Overlay { parent } => Some(parent),
        })
    }

    /// Number of ancestors of `pool`; the root has depth 0
    pub fn depth(&self, pool: PoolId) -> StateResult<usize> {
        let mut depth = 0;
        let mut current = pool;
        while let Some(parent) = self.parent(current)? {
            depth += 1;
            current = parent;
        }
        Ok(depth)
    }

    /// Live direct children of `pool`
    pub fn children(&self, pool: PoolId) -> Vec<PoolId> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match &slot.layer {
                Some(Layer { kind: LayerKind::Overlay { parent }, .. }) if *parent == pool => Some(PoolId {
                    index: index as u32,
                    generation: slot.generation,
                }),
                _ => None,
            })
            .collect()
    }

    fn retire(&mut self, id: PoolId) -> Option<Layer> {
        let slot = &mut self.slots[id.index as usize];
        let layer = slot.layer.take();
        // A slot whose generation is exhausted is never handed out again.
        if layer.is_some() && slot.generation < u32::MAX {
            self.free.push(id.index);
        }
        layer
    }

    /// Fold `child`'s entries into `parent` and retire `child`.
    ///
    /// Children of `child` are re-parented onto `parent`; their view of the
    /// state does not change.
    pub fn commit(&mut self, parent: PoolId, child: PoolId) -> StateResult<()> {
        self.layer(parent)?;
        match self.layer(child)?.kind {
            LayerKind::Overlay { parent: p } if p == parent => {}
            LayerKind::Root => return Err(StateError::RootPool),
            LayerKind::Overlay { .. } => return Err(StateError::NotAChild { parent, child }),
        }

        let grandchildren = self.children(child);
        let Some(layer) = self.retire(child) else {
            return Err(StateError::RetiredPool(child));
        };
        let merged = layer.entries.len();
        self.layer_mut(parent)?.entries.extend(layer.entries);
        for grandchild in grandchildren {
            if let Some(g) = self.slots[grandchild.index as usize].layer.as_mut() {
                g.kind = LayerKind::Overlay { parent };
            }
        }
        debug!(%parent, %child, merged, "committed layer");
        Ok(())
    }

    /// Retire `pool` and every layer descending from it
    pub fn discard(&mut self, pool: PoolId) -> StateResult<()> {
        if self.layer(pool)?.kind == LayerKind::Root {
            return Err(StateError::RootPool);
        }
        let mut pending = vec![pool];
        let mut retired = 0usize;
        while let Some(id) = pending.pop() {
            pending.extend(self.children(id));
            if self.retire(id).is_some() {
                retired += 1;
            }
        }
        trace!(%pool, retired, "discarded layers");
        Ok(())
    }

    /// Commit `pool` and its ancestors down into the root, returning the root
    pub fn merge_into_root(&mut self, pool: PoolId) -> StateResult<PoolId> {
        let mut current = pool;
        while let Some(parent) = self.parent(current)? {
            self.commit(parent, current)?;
            current = parent;
        }
        Ok(current)
    }

    /// Write the root's entries to the store in one batch and empty the root
    /// layer. Returns the number of entries written.
    pub fn flush_root(&mut self) -> StateResult<usize> {
        let root = self.root;
        let entries = std::mem::take(&mut self.layer_mut(root)?.entries);
        let batch = state_batch(&entries);
        let written = batch.len();
        if let Err(e) = self.store.write_batch(batch) {
            // Keep the unflushed entries so a retry sees them.
            self.layer_mut(root)?.entries = entries;
            return Err(e.into());
        }
        debug!(written, "flushed root layer");
        Ok(written)
    }

    /// Persist the root with `pool` on top of it, plus `extra`, in one batch.
    ///
    /// `pool` must be a direct child of the root. It is folded into the root
    /// and the root emptied only after the store accepts the batch; on error
    /// the tree is unchanged and `pool` stays live. Returns the number of
    /// state entries written.
    pub fn commit_and_flush(&mut self, pool: PoolId, extra: WriteBatch) -> StateResult<usize> {
        let root = self.root;
        match self.layer(pool)?.kind {
            LayerKind::Overlay { parent } if parent == root => {}
            LayerKind::Root => return Err(StateError::RootPool),
            LayerKind::Overlay { .. } => return Err(StateError::NotAChild { parent: root, child: pool }),
        }

        let mut merged = self.layer(root)?.entries.clone();
        merged.extend(
            self.layer(pool)?
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        let mut batch = state_batch(&merged);
        let written = batch.len();
        batch.extend(extra);
        self.store.write_batch(batch)?;

        self.commit(root, pool)?;
        self.layer_mut(root)?.entries.clear();
        debug!(%pool, written, "persisted layer");
        Ok(written)
    }

    /// Entries written directly into `pool`, sorted by (category, key)
    pub fn local_entries(&self, pool: PoolId) -> StateResult<Vec<(String, String, Value)>> {
        Ok(self
            .layer(pool)?
            .entries
            .iter()
            .map(|((c, k), v)| (c.clone(), k.clone(), v.clone()))
            .collect())
    }

    /// Number of entries written directly into `pool`
    pub fn local_len(&self, pool: PoolId) -> StateResult<usize> {
        Ok(self.layer(pool)?.entries.len())
    }

    /// Keccak-256 over `pool`'s own entries in key order.
    ///
    /// Two layers produced by applying the same transactions to the same
    /// parent state have the same digest.
    pub fn local_digest(&self, pool: PoolId) -> StateResult<H256> {
        let layer = self.layer(pool)?;
        let mut encoded = Vec::new();
        for ((category, key), value) in &layer.entries {
            let value_bytes = value.to_bytes();
            for part in [category.as_bytes(), key.as_bytes(), value_bytes.as_slice()] {
                encoded.extend_from_slice(&(part.len() as u32).to_be_bytes());
                encoded.extend_from_slice(part);
            }
        }
        Ok(keccak256(&encoded))
    }

    /// Number of live layers, root included
    pub fn live_layers(&self) -> usize {
        self.slots.iter().filter(|slot| slot.layer.is_some()).count()
    }
}

fn state_batch(entries: &Entries) -> WriteBatch {
    let mut batch = WriteBatch::new();
    for ((name, key), value) in entries {
        let store_category = category::state(name);
        if value.is_nil() {
            batch.delete(&store_category, key.as_bytes());
        } else {
            batch.put(&store_category, key.as_bytes(), &value.to_bytes());
        }
    }
    batch
}

impl fmt::Debug for StateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTree")
            .field("root", &self.root)
            .field("live_layers", &self.live_layers())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pob_storage::MemoryStore;

    fn tree() -> StateTree {
        StateTree::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_read_your_writes() {
        let mut tree = tree();
        let root = tree.root();
        let child = tree.new_child(root).unwrap();
        tree.put(child, "c", "k", Value::Int(1)).unwrap();
        assert_eq!(tree.get(child, "c", "k").unwrap(), Some(Value::Int(1)));
        assert_eq!(tree.get(root, "c", "k").unwrap(), None);
    }

    #[test]
    fn test_miss_through_to_parent() {
        let mut tree = tree();
        let root = tree.root();
        tree.put(root, "c", "k", Value::from("base")).unwrap();
        let a = tree.new_child(root).unwrap();
        let b = tree.new_child(a).unwrap();
        assert_eq!(tree.get(b, "c", "k").unwrap(), Some(Value::from("base")));
        assert_eq!(tree.depth(b).unwrap(), 2);
        assert_eq!(tree.parent(b).unwrap(), Some(a));
        assert_eq!(tree.parent(root).unwrap(), None);
    }

    #[test]
    fn test_siblings_are_isolated() {
        let mut tree = tree();
        let root = tree.root();
        let left = tree.new_child(root).unwrap();
        let right = tree.new_child(root).unwrap();
        tree.put(left, "c", "k", Value::Int(1)).unwrap();
        assert_eq!(tree.get(right, "c", "k").unwrap(), None);
    }

    #[test]
    fn test_tombstone_hides_parent_value() {
        let mut tree = tree();
        let root = tree.root();
        tree.put(root, "c", "k", Value::Int(5)).unwrap();
        let child = tree.new_child(root).unwrap();
        tree.delete(child, "c", "k").unwrap();
        assert_eq!(tree.get(child, "c", "k").unwrap(), None);
        assert_eq!(tree.get(root, "c", "k").unwrap(), Some(Value::Int(5)));
    }

    #[test]
    fn test_commit_merges_and_retires() {
        let mut tree = tree();
        let root = tree.root();
        let child = tree.new_child(root).unwrap();
        tree.put(child, "c", "k", Value::Int(1)).unwrap();
        tree.put(child, "c", "k", Value::Int(2)).unwrap();
        tree.commit(root, child).unwrap();

        assert_eq!(tree.get(root, "c", "k").unwrap(), Some(Value::Int(2)));
        assert!(matches!(tree.get(child, "c", "k"), Err(StateError::RetiredPool(_))));
        assert!(matches!(tree.commit(root, child), Err(StateError::RetiredPool(_))));
    }

    #[test]
    fn test_commit_reparents_grandchildren() {
        let mut tree = tree();
        let root = tree.root();
        let child = tree.new_child(root).unwrap();
        tree.put(child, "c", "k", Value::Int(1)).unwrap();
        let grandchild = tree.new_child(child).unwrap();
        tree.commit(root, child).unwrap();

        assert_eq!(tree.parent(grandchild).unwrap(), Some(root));
        assert_eq!(tree.get(grandchild, "c", "k").unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn test_commit_requires_direct_child() {
        let mut tree = tree();
        let root = tree.root();
        let a = tree.new_child(root).unwrap();
        let b = tree.new_child(a).unwrap();
        assert!(matches!(tree.commit(root, b), Err(StateError::NotAChild { .. })));
        assert!(matches!(tree.commit(a, root), Err(StateError::RootPool)));
    }

    #[test]
    fn test_discard_is_recursive() {
        let mut tree = tree();
        let root = tree.root();
        let a = tree.new_child(root).unwrap();
        let b = tree.new_child(a).unwrap();
        let keep = tree.new_child(root).unwrap();
        tree.discard(a).unwrap();

        assert!(!tree.is_live(a));
        assert!(!tree.is_live(b));
        assert!(tree.is_live(keep));
        assert_eq!(tree.live_layers(), 2);
        assert!(matches!(tree.discard(root), Err(StateError::RootPool)));
    }

    #[test]
    fn test_reused_slot_rejects_stale_id() {
        let mut tree = tree();
        let root = tree.root();
        let old = tree.new_child(root).unwrap();
        tree.discard(old).unwrap();
        let new = tree.new_child(root).unwrap();

        assert_ne!(old, new);
        assert!(matches!(tree.put(old, "c", "k", Value::Int(1)), Err(StateError::RetiredPool(_))));
        assert!(tree.put(new, "c", "k", Value::Int(1)).is_ok());
    }

    #[test]
    fn test_flush_root_and_read_back_from_store() {
        let store = Arc::new(MemoryStore::new());
        let mut tree = StateTree::new(store.clone());
        let root = tree.root();
        store.put(&category::state("c"), b"old", &Value::Int(9).to_bytes()).unwrap();

        tree.put(root, "c", "k", Value::Int(3)).unwrap();
        tree.delete(root, "c", "old").unwrap();
        assert_eq!(tree.flush_root().unwrap(), 2);
        assert_eq!(tree.local_len(root).unwrap(), 0);

        assert_eq!(tree.get(root, "c", "k").unwrap(), Some(Value::Int(3)));
        assert_eq!(tree.get(root, "c", "old").unwrap(), None);
    }

    #[test]
    fn test_exhausted_slot_is_not_reused() {
        let mut tree = tree();
        let root = tree.root();
        let first = tree.new_child(root).unwrap();
        tree.discard(first).unwrap();
        tree.slots[first.index as usize].generation = u32::MAX - 1;

        let last = tree.new_child(root).unwrap();
        assert_eq!(last.index, first.index);
        assert_eq!(last.generation, u32::MAX);
        tree.discard(last).unwrap();

        let fresh = tree.new_child(root).unwrap();
        assert_ne!(fresh.index, last.index);
        assert!(matches!(tree.put(last, "c", "k", Value::Int(1)), Err(StateError::RetiredPool(_))));
    }

    #[test]
    fn test_commit_and_flush_writes_state_and_extra() {
        let store = Arc::new(MemoryStore::new());
        let mut tree = StateTree::new(store.clone());
        let root = tree.root();
        tree.put(root, "c", "base", Value::Int(1)).unwrap();
        let pool = tree.new_child(root).unwrap();
        tree.put(pool, "c", "k", Value::Int(2)).unwrap();

        let mut extra = WriteBatch::new();
        extra.put("archive", b"n", b"1");
        assert_eq!(tree.commit_and_flush(pool, extra).unwrap(), 2);

        assert!(!tree.is_live(pool));
        assert_eq!(tree.local_len(root).unwrap(), 0);
        assert_eq!(store.get("archive", b"n").unwrap(), Some(b"1".to_vec()));
        assert_eq!(tree.get(root, "c", "k").unwrap(), Some(Value::Int(2)));
        assert_eq!(tree.get(root, "c", "base").unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn test_failed_commit_and_flush_changes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut tree = StateTree::new(store.clone());
        let root = tree.root();
        let pool = tree.new_child(root).unwrap();
        tree.put(pool, "c", "k", Value::Int(2)).unwrap();

        store.set_unavailable(true);
        assert!(matches!(
            tree.commit_and_flush(pool, WriteBatch::new()),
            Err(StateError::Storage(_))
        ));
        store.set_unavailable(false);

        assert!(tree.is_live(pool));
        assert_eq!(tree.local_len(root).unwrap(), 0);
        assert_eq!(tree.get(root, "c", "k").unwrap(), None);
        assert_eq!(tree.get(pool, "c", "k").unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn test_commit_and_flush_needs_a_child_of_root() {
        let mut tree = tree();
        let root = tree.root();
        let a = tree.new_child(root).unwrap();
        let b = tree.new_child(a).unwrap();
        assert!(matches!(tree.commit_and_flush(root, WriteBatch::new()), Err(StateError::RootPool)));
        assert!(matches!(
            tree.commit_and_flush(b, WriteBatch::new()),
            Err(StateError::NotAChild { .. })
        ));
    }

    #[test]
    fn test_failed_flush_keeps_entries() {
        let store = Arc::new(MemoryStore::new());
        let mut tree = StateTree::new(store.clone());
        let root = tree.root();
        tree.put(root, "c", "k", Value::Int(3)).unwrap();

        store.set_unavailable(true);
        assert!(matches!(tree.flush_root(), Err(StateError::Storage(_))));
        assert_eq!(tree.local_len(root).unwrap(), 1);
    }

    #[test]
    fn test_merge_into_root() {
        let mut tree = tree();
        let root = tree.root();
        let a = tree.new_child(root).unwrap();
        tree.put(a, "c", "a", Value::Int(1)).unwrap();
        let b = tree.new_child(a).unwrap();
        tree.put(b, "c", "b", Value::Int(2)).unwrap();

        assert_eq!(tree.merge_into_root(b).unwrap(), root);
        assert_eq!(tree.live_layers(), 1);
        assert_eq!(tree.local_len(root).unwrap(), 2);
    }

    #[test]
    fn test_local_digest_depends_only_on_entries() {
        let mut tree = tree();
        let root = tree.root();
        let a = tree.new_child(root).unwrap();
        let b = tree.new_child(root).unwrap();
        tree.put(a, "x", "1", Value::Int(1)).unwrap();
        tree.put(a, "y", "2", Value::Int(2)).unwrap();
        tree.put(b, "y", "2", Value::Int(2)).unwrap();
        tree.put(b, "x", "1", Value::Int(1)).unwrap();
        assert_eq!(tree.local_digest(a).unwrap(), tree.local_digest(b).unwrap());

        tree.put(b, "x", "1", Value::Int(7)).unwrap();
        assert_ne!(tree.local_digest(a).unwrap(), tree.local_digest(b).unwrap());
    }

    #[test]
    fn test_unknown_pool() {
        let tree = tree();
        let bogus = PoolId { index: 42, generation: 0 };
        assert!(matches!(tree.get(bogus, "c", "k"), Err(StateError::UnknownPool(_))));
    }
}
