//! Dense trees built bottom-up, used to cross-check the proofs of [`crate::DepositTree`].

use alloy_primitives::B256;
use anyhow::ensure;

use crate::{
    hash::hash_concat,
    index::{generalized_index_child, get_generalized_index_bit},
};

pub(crate) fn merkle_tree(leaves: &[B256], depth: u64) -> anyhow::Result<Vec<B256>> {
    ensure!(depth < 32, "Depth {depth} is too large for a dense tree");
    let num_of_leaves = leaves.len();
    let bottom_length = 1 << depth;
    ensure!(
        num_of_leaves <= bottom_length,
        "Number of leaves is greater than the bottom length (depth too small)"
    );

    let mut tree = vec![B256::ZERO; bottom_length];
    tree.extend(leaves);
    tree.extend(vec![B256::ZERO; bottom_length - num_of_leaves]);

    for i in (1..bottom_length).rev() {
        tree[i] = hash_concat(tree[i * 2].as_slice(), tree[i * 2 + 1].as_slice());
    }

    Ok(tree)
}

pub(crate) fn generate_proof(tree: &[B256], index: u64, depth: u64) -> anyhow::Result<Vec<B256>> {
    let bottom_length = 1 << depth;
    ensure!(index < bottom_length, "Index out of bounds");
    ensure!(
        tree.len() as u64 == 2 * bottom_length,
        "Tree has {} nodes, expected {}",
        tree.len(),
        2 * bottom_length
    );

    let mut proof = vec![];
    let mut current_index = 1;
    let mut current_depth = depth;

    while current_depth > 0 {
        let (left_child_index, right_child_index) = (
            generalized_index_child(current_index, false),
            generalized_index_child(current_index, true),
        );

        if get_generalized_index_bit(index, current_depth - 1) {
            proof.push(tree[left_child_index as usize]);
            current_index = right_child_index;
        } else {
            proof.push(tree[right_child_index as usize]);
            current_index = left_child_index;
        }

        current_depth -= 1;
    }

    proof.reverse();

    Ok(proof)
}
