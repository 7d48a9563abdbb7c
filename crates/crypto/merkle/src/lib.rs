//! https://ethereum.github.io/consensus-specs/ssz/merkle-proofs

use alloy_primitives::B256;

#[cfg(test)]
pub(crate) mod dense;
pub mod deposit_tree;
mod hash;
mod index;

pub use deposit_tree::DepositTree;
use hash::hash_concat;
pub use hash::{mix_in_length, zero_hashes};
use index::get_generalized_index_bit;

/// Check that `leaf` sits at `index` of a tree with the given `root`.
///
/// A branch shorter than `depth` is rejected rather than indexed out of bounds.
pub fn is_valid_merkle_branch(
    leaf: B256,
    branch: &[B256],
    depth: u64,
    index: u64,
    root: B256,
) -> bool {
    if (branch.len() as u64) < depth {
        return false;
    }

    let mut value = leaf;
    for (i, node) in branch.iter().take(depth as usize).enumerate() {
        if get_generalized_index_bit(index, i as u64) {
            value = hash_concat(node.as_slice(), value.as_slice());
        } else {
            value = hash_concat(value.as_slice(), node.as_slice());
        }
    }
    value == root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::{generate_proof, merkle_tree};

    #[test]
    fn test_merkle_tree() {
        let leaves = vec![
            B256::from_slice(&[0xAA; 32]),
            B256::from_slice(&[0xBB; 32]),
            B256::from_slice(&[0xCC; 32]),
            B256::from_slice(&[0xDD; 32]),
        ];

        let depth = 2;

        let node_2: B256 = hash_concat(leaves[0].as_slice(), leaves[1].as_slice());
        let node_3: B256 = hash_concat(leaves[2].as_slice(), leaves[3].as_slice());

        let root: B256 = hash_concat(node_2.as_slice(), node_3.as_slice());

        let tree = merkle_tree(&leaves, depth).expect("tree");

        assert_eq!(tree[1], root);

        for (index, leaf) in leaves.iter().enumerate() {
            let proof = generate_proof(&tree, index as u64, depth).expect("proof");
            assert!(is_valid_merkle_branch(*leaf, &proof, depth, index as u64, root));
            assert!(!is_valid_merkle_branch(
                *leaf,
                &proof,
                depth,
                (index as u64 + 1) % 4,
                root
            ));
        }
    }

    #[test]
    fn test_short_branch_is_invalid() {
        let leaf = B256::repeat_byte(0x11);
        assert!(!is_valid_merkle_branch(leaf, &[B256::ZERO], 4, 0, B256::ZERO));
        assert!(!is_valid_merkle_branch(leaf, &[], 1, 0, leaf));
    }

    #[test]
    fn test_zero_depth_branch_is_the_leaf() {
        let leaf = B256::repeat_byte(0x22);
        assert!(is_valid_merkle_branch(leaf, &[], 0, 0, leaf));
    }
}
