use alloy_primitives::B256;

/// Common hashing function for Merkle trees.
pub(crate) fn hash_concat(h1: &[u8], h2: &[u8]) -> B256 {
    ethereum_hashing::hash32_concat(h1, h2).into()
}

/// Roots of all-zero subtrees, where `zero_hashes(depth)[i]` is the root of a tree of height `i`.
pub fn zero_hashes(depth: usize) -> Vec<B256> {
    let mut hashes = Vec::with_capacity(depth + 1);
    hashes.push(B256::ZERO);
    for i in 0..depth {
        hashes.push(hash_concat(hashes[i].as_slice(), hashes[i].as_slice()));
    }
    hashes
}

/// Mix the number of leaves into a list root, as SSZ does for lists.
pub fn mix_in_length(root: B256, length: u64) -> B256 {
    let mut length_bytes = [0u8; 32];
    length_bytes[..8].copy_from_slice(&length.to_le_bytes());
    hash_concat(root.as_slice(), &length_bytes)
}
