//! Genesis state and block

use crate::error::NodeResult;
use pob_primitives::{AccountId, Amount, H256};
use pob_state::{StateTree, StateWriter};
use pob_types::{compute_tx_root, Block, BlockHeader};
use tracing::info;

/// Witness recorded in the genesis header
pub const GENESIS_WITNESS: &str = "genesis";

/// Credit `balances` into the root layer, persist it, and return block 0.
///
/// The header commits to the digest of the genesis entries, so nodes
/// configured with different balances end up with different genesis hashes.
pub fn init_genesis(tree: &mut StateTree, balances: &[(AccountId, Amount)]) -> NodeResult<Block> {
    let root = tree.root();
    {
        let mut view = tree.view_mut(root);
        for (account, amount) in balances {
            view.credit(account, *amount)?;
        }
    }
    let state_digest = tree.local_digest(root)?;
    tree.flush_root()?;

    let header = BlockHeader {
        number: 0,
        parent_hash: H256::ZERO,
        witness: AccountId::new(GENESIS_WITNESS),
        slot: 0,
        tx_root: compute_tx_root(&[]),
        state_digest,
    };
    info!(accounts = balances.len(), hash = %header.hash(), "created genesis block");
    Ok(Block {
        header,
        transactions: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pob_state::StateReader;
    use pob_storage::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_genesis_persists_balances() {
        let store = Arc::new(MemoryStore::new());
        let mut tree = StateTree::new(store.clone());
        let balances = vec![(AccountId::from("alice"), 500)];
        let block = init_genesis(&mut tree, &balances).unwrap();

        assert_eq!(block.number(), 0);
        assert!(block.tx_root_matches());
        assert_eq!(tree.local_len(tree.root()).unwrap(), 0);

        let reopened = StateTree::new(store);
        let view = reopened.view(reopened.root());
        assert_eq!(view.balance_of(&AccountId::from("alice")).unwrap(), 500);
    }

    #[test]
    fn test_genesis_hash_depends_on_balances() {
        let hash = |amount| {
            let mut tree = StateTree::new(Arc::new(MemoryStore::new()));
            init_genesis(&mut tree, &[(AccountId::from("alice"), amount)])
                .unwrap()
                .hash()
        };
        assert_eq!(hash(1), hash(1));
        assert_ne!(hash(1), hash(2));
    }
}
