//! Reproducible randomness

use pob_crypto::keccak256_concat;
use pob_primitives::H256;

/// Draws fall in `[0, RANDOM_SCALE)`; probabilities are parts per million
pub const RANDOM_SCALE: u64 = 1_000_000;

/// Draw number `counter` for a transaction.
///
/// Depends only on the parent block hash, the transaction hash and how many
/// draws the run made before, so every validator replaying the transaction on
/// the same parent gets the same sequence. A different parent gives an
/// unrelated sequence.
pub fn draw(parent_hash: &H256, tx_hash: &H256, counter: u64) -> u64 {
    let digest = keccak256_concat(&[parent_hash.as_bytes(), tx_hash.as_bytes(), &counter.to_be_bytes()]);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_be_bytes(head) % RANDOM_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_is_reproducible() {
        let parent = H256::from_bytes([7u8; 32]);
        let tx = H256::from_bytes([9u8; 32]);
        assert_eq!(draw(&parent, &tx, 0), draw(&parent, &tx, 0));
        assert!(draw(&parent, &tx, 0) < RANDOM_SCALE);
    }

    #[test]
    fn test_draw_depends_on_every_input() {
        let parent = H256::from_bytes([7u8; 32]);
        let tx = H256::from_bytes([9u8; 32]);
        let base = draw(&parent, &tx, 0);
        let draws = [
            draw(&H256::from_bytes([8u8; 32]), &tx, 0),
            draw(&parent, &H256::from_bytes([10u8; 32]), 0),
            draw(&parent, &tx, 1),
        ];
        assert!(draws.iter().any(|d| *d != base));
    }
}
