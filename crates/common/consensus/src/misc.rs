use std::cmp::max;

use alloy_primitives::{B256, aliases::B32};
use ethereum_hashing::hash;
use tree_hash::TreeHash;

use crate::{
    constants::{UINT64_MAX, UINT64_MAX_SQRT},
    errors::BeaconStateError,
    fork::ForkData,
    signing_data::SigningData,
};

pub fn compute_signing_root<SSZObject: TreeHash>(ssz_object: SSZObject, domain: B256) -> B256 {
    SigningData {
        object_root: ssz_object.tree_hash_root(),
        domain,
    }
    .tree_hash_root()
}

/// Return the shuffled index corresponding to ``seed`` (and ``index_count``).
///
/// Swap-or-not shuffle: every round pairs ``index`` with its mirror around a pivot and swaps
/// them when the seeded bit for the higher of the two is set.
pub fn compute_shuffled_index(
    mut index: usize,
    index_count: usize,
    seed: B256,
    shuffle_round_count: u8,
) -> Result<usize, BeaconStateError> {
    if index >= index_count {
        return Err(BeaconStateError::ShuffleIndexOutOfRange { index, index_count });
    }
    for round in 0..shuffle_round_count {
        let seed_with_round = [seed.as_slice(), &round.to_le_bytes()].concat();
        let pivot = bytes_to_int64(&hash(&seed_with_round)[..]) % index_count as u64;

        let flip = (pivot as usize + (index_count - index)) % index_count;
        let position = max(index, flip);
        let seed_with_position = [
            seed_with_round.as_slice(),
            &(position / 256).to_le_bytes()[0..4],
        ]
        .concat();
        let source = hash(&seed_with_position);
        let byte = source[(position % 256) / 8];
        let bit = (byte >> (position % 8)) % 2;

        index = if bit == 1 { flip } else { index };
    }
    Ok(index)
}

// Return the integer deserialization of ``data`` interpreted as little-endian.
pub fn bytes_to_int64(slice: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    let len = slice.len().min(8);
    bytes[..len].copy_from_slice(&slice[..len]);
    u64::from_le_bytes(bytes)
}

/// Return the committee corresponding to ``indices``, ``seed``, ``index``, and committee ``count``.
pub fn compute_committee(
    indices: &[u64],
    seed: B256,
    index: u64,
    count: u64,
    shuffle_round_count: u8,
) -> Result<Vec<u64>, BeaconStateError> {
    if index >= count {
        return Err(BeaconStateError::CommitteeIndexOutOfRange { index, count });
    }
    let start = (indices.len() as u64 * index) / count;
    let end = (indices.len() as u64 * (index + 1)) / count;
    (start..end)
        .map(|i| {
            let shuffled_index =
                compute_shuffled_index(i as usize, indices.len(), seed, shuffle_round_count)?;
            indices
                .get(shuffled_index)
                .copied()
                .ok_or(BeaconStateError::ShuffleIndexOutOfRange {
                    index: shuffled_index,
                    index_count: indices.len(),
                })
        })
        .collect()
}

/// Return the epoch number at ``slot``.
pub fn compute_epoch_at_slot(slot: u64, slots_per_epoch: u64) -> u64 {
    slot / slots_per_epoch
}

/// Return the start slot of ``epoch``.
pub fn compute_start_slot_at_epoch(epoch: u64, slots_per_epoch: u64) -> u64 {
    epoch.saturating_mul(slots_per_epoch)
}

/// Return the epoch at which an activation or exit triggered in ``epoch`` takes effect.
pub fn compute_activation_exit_epoch(epoch: u64, activation_exit_delay: u64) -> u64 {
    epoch.saturating_add(1).saturating_add(activation_exit_delay)
}

/// Return the domain for the ``domain_type`` and ``fork_version``.
pub fn compute_domain(
    domain_type: B32,
    fork_version: B32,
    genesis_validators_root: B256,
) -> B256 {
    let fork_data_root = ForkData {
        current_version: fork_version,
        genesis_validators_root,
    }
    .compute_fork_data_root();
    let domain_bytes = [&domain_type.0, &fork_data_root.0[..28]].concat();
    B256::from_slice(&domain_bytes)
}

pub fn is_sorted_and_unique(indices: &[u64]) -> bool {
    indices.windows(2).all(|w| w[0] < w[1])
}

pub fn xor<T: AsRef<[u8]>>(bytes_1: T, bytes_2: T) -> B256 {
    let mut result = [0u8; 32];
    for (i, (a, b)) in bytes_1
        .as_ref()
        .iter()
        .zip(bytes_2.as_ref().iter())
        .take(32)
        .enumerate()
    {
        result[i] = a ^ b;
    }
    B256::from(result)
}

/// Return the largest integer ``x`` such that ``x**2 <= n``.
pub fn integer_squareroot(n: u64) -> u64 {
    if n == UINT64_MAX {
        return UINT64_MAX_SQRT;
    }

    let mut x = n;
    let mut y = x.div_ceil(2);
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

#[cfg(test)]
mod tests {
    use alloy_primitives::b256;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(15, 3)]
    #[case(16, 4)]
    #[case(1_000_000_000_000, 1_000_000)]
    #[case(u64::MAX, UINT64_MAX_SQRT)]
    fn test_integer_squareroot(#[case] n: u64, #[case] expected: u64) {
        assert_eq!(integer_squareroot(n), expected);
    }

    #[test]
    fn test_shuffled_index_is_a_permutation() {
        let seed = b256!("0x4ac96f664a6cafd300b161720809b9e17905d4d8fed7a97ff89cf0080a953fe7");
        let count = 100;
        let mut shuffled: Vec<usize> = (0..count)
            .map(|i| compute_shuffled_index(i, count, seed, 10).expect("index in range"))
            .collect();
        assert_ne!(shuffled, (0..count).collect::<Vec<_>>());
        shuffled.sort_unstable();
        assert_eq!(shuffled, (0..count).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffled_index_out_of_range() {
        assert_eq!(
            compute_shuffled_index(5, 5, B256::ZERO, 10),
            Err(BeaconStateError::ShuffleIndexOutOfRange {
                index: 5,
                index_count: 5
            })
        );
    }

    #[test]
    fn test_committees_partition_indices() {
        let indices: Vec<u64> = (0..50).collect();
        let seed = B256::repeat_byte(7);
        let mut members: Vec<u64> = (0..4)
            .flat_map(|index| compute_committee(&indices, seed, index, 4, 10).expect("committee"))
            .collect();
        members.sort_unstable();
        assert_eq!(members, indices);
        assert!(compute_committee(&indices, seed, 4, 4, 10).is_err());
    }

    #[test]
    fn test_compute_domain_prefix() {
        let domain = compute_domain(
            crate::constants::DOMAIN_RANDAO,
            alloy_primitives::fixed_bytes!("0x00000001"),
            B256::ZERO,
        );
        assert_eq!(&domain[..4], &[1, 0, 0, 0]);
        assert_ne!(
            domain,
            compute_domain(crate::constants::DOMAIN_RANDAO, B32::ZERO, B256::ZERO)
        );
    }

    #[test]
    fn test_xor() {
        let mixed = xor(B256::repeat_byte(0xf0), B256::repeat_byte(0x0f));
        assert_eq!(mixed, B256::repeat_byte(0xff));
    }
}
