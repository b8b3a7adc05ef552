//! Layered pool properties.

use pob_state::{StateError, StateTree, Value};
use pob_storage::MemoryStore;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn fresh() -> StateTree {
    StateTree::new(Arc::new(MemoryStore::new()))
}

#[test]
fn commit_makes_child_writes_visible_to_parent_and_its_other_children() {
    let mut tree = fresh();
    let root = tree.root();
    let base = tree.new_child(root).unwrap();
    let writer = tree.new_child(base).unwrap();
    let observer = tree.new_child(base).unwrap();

    tree.put(writer, "token", "alice", Value::Int(10)).unwrap();
    assert_eq!(tree.get(observer, "token", "alice").unwrap(), None);

    tree.commit(base, writer).unwrap();
    assert_eq!(tree.get(base, "token", "alice").unwrap(), Some(Value::Int(10)));
    assert_eq!(tree.get(observer, "token", "alice").unwrap(), Some(Value::Int(10)));
}

#[test]
fn stale_handles_are_typed_errors() {
    let mut tree = fresh();
    let root = tree.root();
    let child = tree.new_child(root).unwrap();
    tree.commit(root, child).unwrap();
    for result in [
        tree.new_child(child).map(|_| ()),
        tree.put(child, "c", "k", Value::Nil),
        tree.discard(child),
        tree.depth(child).map(|_| ()),
    ] {
        assert!(matches!(result, Err(StateError::RetiredPool(_))));
    }
}

#[derive(Debug, Clone)]
enum Op {
    Put(u8, i64),
    Delete(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8, any::<i64>()).prop_map(|(k, v)| Op::Put(k, v)),
        (0u8..8).prop_map(Op::Delete),
    ]
}

proptest! {
    /// A chain of layers followed by full merging behaves like a single map.
    #[test]
    fn layered_writes_match_flat_map(layers in prop::collection::vec(prop::collection::vec(op(), 0..10), 1..5)) {
        let mut tree = fresh();
        let mut expected: BTreeMap<String, i64> = BTreeMap::new();
        let mut pool = tree.root();

        for layer in &layers {
            pool = tree.new_child(pool).unwrap();
            for op in layer {
                match op {
                    Op::Put(k, v) => {
                        tree.put(pool, "c", &k.to_string(), Value::Int(*v as i128)).unwrap();
                        expected.insert(k.to_string(), *v);
                    }
                    Op::Delete(k) => {
                        tree.delete(pool, "c", &k.to_string()).unwrap();
                        expected.remove(&k.to_string());
                    }
                }
                for k in 0u8..8 {
                    let got = tree.get(pool, "c", &k.to_string()).unwrap();
                    prop_assert_eq!(got, expected.get(&k.to_string()).map(|v| Value::Int(*v as i128)));
                }
            }
        }

        prop_assert_eq!(tree.depth(pool).unwrap(), layers.len());
        let root = tree.merge_into_root(pool).unwrap();
        tree.flush_root().unwrap();
        for k in 0u8..8 {
            let got = tree.get(root, "c", &k.to_string()).unwrap();
            prop_assert_eq!(got, expected.get(&k.to_string()).map(|v| Value::Int(*v as i128)));
        }
    }
}
