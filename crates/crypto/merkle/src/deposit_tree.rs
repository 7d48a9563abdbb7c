use alloy_primitives::B256;
use anyhow::ensure;

use crate::{
    hash::{hash_concat, mix_in_length, zero_hashes},
    index::sibling_leaf_index,
};

/// Sparse, append-only Merkle tree of deposit data roots.
///
/// The root commits to the number of deposits by mixing it in above the tree, so proofs carry
/// `depth + 1` nodes where the last one is the little-endian deposit count.
#[derive(Debug, Clone)]
pub struct DepositTree {
    depth: usize,
    leaves: Vec<B256>,
    zero_hashes: Vec<B256>,
}

impl DepositTree {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            leaves: vec![],
            zero_hashes: zero_hashes(depth),
        }
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn push_leaf(&mut self, leaf: B256) -> anyhow::Result<()> {
        ensure!(
            self.depth >= 64 || (self.leaves.len() as u64) < (1u64 << self.depth),
            "Deposit tree of depth {} is full",
            self.depth
        );
        self.leaves.push(leaf);
        Ok(())
    }

    /// Each layer from the leaves up, without zero padding.
    fn layers(&self) -> Vec<Vec<B256>> {
        let mut layers = vec![self.leaves.clone()];
        for height in 0..self.depth {
            let Some(below) = layers.last() else {
                break;
            };
            let above = below
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).unwrap_or(&self.zero_hashes[height]);
                    hash_concat(pair[0].as_slice(), right.as_slice())
                })
                .collect();
            layers.push(above);
        }
        layers
    }

    /// Root of the tree before the deposit count is mixed in.
    fn tree_root(&self) -> B256 {
        self.layers()
            .last()
            .and_then(|top| top.first().copied())
            .unwrap_or(self.zero_hashes[self.depth])
    }

    /// Root with the deposit count mixed in; the value deposits are checked against.
    pub fn root(&self) -> B256 {
        mix_in_length(self.tree_root(), self.leaves.len() as u64)
    }

    /// Proof for the leaf at `index` against [`DepositTree::root`].
    pub fn proof(&self, index: u64) -> anyhow::Result<Vec<B256>> {
        ensure!(
            (index as usize) < self.leaves.len(),
            "Leaf index {index} is out of range for {} deposits",
            self.leaves.len()
        );

        let layers = self.layers();
        let mut proof = Vec::with_capacity(self.depth + 1);
        let mut position = index;
        for (height, layer) in layers.iter().take(self.depth).enumerate() {
            let sibling = layer
                .get(sibling_leaf_index(position) as usize)
                .copied()
                .unwrap_or(self.zero_hashes[height]);
            proof.push(sibling);
            position /= 2;
        }

        let mut length_bytes = [0u8; 32];
        length_bytes[..8].copy_from_slice(&(self.leaves.len() as u64).to_le_bytes());
        proof.push(B256::from(length_bytes));
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        dense::{generate_proof, merkle_tree},
        is_valid_merkle_branch,
    };

    fn leaf(i: u8) -> B256 {
        B256::repeat_byte(i + 1)
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(4)]
    fn test_matches_dense_tree(#[case] count: u8) {
        let depth = 3;
        let leaves: Vec<B256> = (0..count).map(leaf).collect();
        let mut tree = DepositTree::new(depth);
        for leaf in &leaves {
            tree.push_leaf(*leaf).expect("room for leaf");
        }

        let dense = merkle_tree(&leaves, depth as u64).expect("dense tree");
        assert_eq!(tree.root(), mix_in_length(dense[1], count as u64));

        for index in 0..count as u64 {
            let proof = tree.proof(index).expect("proof");
            let dense_proof = generate_proof(&dense, index, depth as u64).expect("dense proof");
            assert_eq!(proof[..depth], dense_proof[..]);
            assert!(is_valid_merkle_branch(
                leaves[index as usize],
                &proof,
                depth as u64 + 1,
                index,
                tree.root()
            ));
        }
    }

    #[test]
    fn test_deep_tree_proof() {
        let mut tree = DepositTree::new(32);
        for i in 0..5 {
            tree.push_leaf(leaf(i)).expect("room for leaf");
        }
        let proof = tree.proof(4).expect("proof");
        assert_eq!(proof.len(), 33);
        assert!(is_valid_merkle_branch(leaf(4), &proof, 33, 4, tree.root()));
        assert!(!is_valid_merkle_branch(leaf(3), &proof, 33, 4, tree.root()));
    }

    #[test]
    fn test_full_tree_rejects_leaf() {
        let mut tree = DepositTree::new(1);
        tree.push_leaf(leaf(0)).expect("room for leaf");
        tree.push_leaf(leaf(1)).expect("room for leaf");
        assert!(tree.push_leaf(leaf(2)).is_err());
        assert!(tree.proof(2).is_err());
    }
}
