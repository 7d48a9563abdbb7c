//! Committee selection.
//!
//! The state transition asks a [`CommitteeResolver`] for crosslink committees and for the
//! proposer of the current slot. [`CommitteeCache`] is the resolver used in practice: it keeps
//! one shuffling per epoch so every attestation of a block does not reshuffle the registry.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use alloy_primitives::B256;
use ethereum_hashing::hash_fixed;
use keel_network_spec::networks::BeaconNetworkSpec;
use tracing::trace;

use crate::{
    beacon_state::BeaconState,
    constants::{DOMAIN_ATTESTATION, DOMAIN_BEACON_PROPOSER},
    errors::BeaconStateError,
    misc::compute_shuffled_index,
};

pub trait CommitteeResolver {
    /// Return the crosslink committee of ``shard`` at ``epoch``.
    fn crosslink_committee(
        &mut self,
        state: &BeaconState,
        epoch: u64,
        shard: u64,
        spec: &BeaconNetworkSpec,
    ) -> Result<Vec<u64>, BeaconStateError>;

    /// Return the beacon proposer index at the current slot.
    fn beacon_proposer_index(
        &mut self,
        state: &BeaconState,
        spec: &BeaconNetworkSpec,
    ) -> Result<u64, BeaconStateError> {
        let epoch = state.get_current_epoch(spec);
        let committees_per_slot = state.get_committee_count(epoch, spec) / spec.slots_per_epoch;
        let offset = committees_per_slot * (state.slot % spec.slots_per_epoch);
        let shard = (state.get_start_shard(epoch, spec)? + offset) % spec.shard_count;
        let first_committee = self.crosslink_committee(state, epoch, shard, spec)?;
        let seed = state.get_seed(epoch, DOMAIN_BEACON_PROPOSER, spec)?;
        state.compute_proposer_index(&first_committee, seed, epoch, spec)
    }
}

/// Shufflings kept before the oldest one is evicted.
pub const MAX_CACHED_SHUFFLINGS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ShufflingKey {
    epoch: u64,
    seed: B256,
    active_validators_digest: B256,
}

impl ShufflingKey {
    fn new(epoch: u64, seed: B256, active_validator_indices: &[u64]) -> Self {
        let bytes = active_validator_indices
            .iter()
            .flat_map(|index| index.to_le_bytes())
            .collect::<Vec<u8>>();
        Self {
            epoch,
            seed,
            active_validators_digest: B256::from(hash_fixed(&bytes)),
        }
    }
}

/// Shuffled active validator lists, keyed by the inputs that determine them.
///
/// The key commits to the seed and to the exact active index set, so one cache can serve
/// several candidate states of the same epoch. At most [`MAX_CACHED_SHUFFLINGS`] entries are
/// held; the oldest is evicted first. [`CommitteeCache::clear`] drops everything.
#[derive(Debug, Default)]
pub struct CommitteeCache {
    shufflings: HashMap<ShufflingKey, Arc<Vec<u64>>>,
    insertion_order: VecDeque<ShufflingKey>,
}

impl CommitteeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.shufflings.clear();
        self.insertion_order.clear();
    }

    pub fn len(&self) -> usize {
        self.shufflings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shufflings.is_empty()
    }

    fn shuffling(
        &mut self,
        key: ShufflingKey,
        active_validator_indices: &[u64],
        spec: &BeaconNetworkSpec,
    ) -> Result<Arc<Vec<u64>>, BeaconStateError> {
        if let Some(shuffling) = self.shufflings.get(&key) {
            return Ok(shuffling.clone());
        }

        trace!(epoch = key.epoch, active = active_validator_indices.len(), "Shuffling committees");
        let count = active_validator_indices.len();
        let shuffling = (0..count)
            .map(|i| {
                let shuffled_index =
                    compute_shuffled_index(i, count, key.seed, spec.shuffle_round_count)?;
                Ok(active_validator_indices[shuffled_index])
            })
            .collect::<Result<Vec<_>, BeaconStateError>>()?;
        let shuffling = Arc::new(shuffling);
        if self.insertion_order.len() >= MAX_CACHED_SHUFFLINGS
            && let Some(oldest) = self.insertion_order.pop_front()
        {
            self.shufflings.remove(&oldest);
        }
        self.shufflings.insert(key, shuffling.clone());
        self.insertion_order.push_back(key);
        Ok(shuffling)
    }
}

impl CommitteeResolver for CommitteeCache {
    fn crosslink_committee(
        &mut self,
        state: &BeaconState,
        epoch: u64,
        shard: u64,
        spec: &BeaconNetworkSpec,
    ) -> Result<Vec<u64>, BeaconStateError> {
        let active_validator_indices = state.get_active_validator_indices(epoch);
        let count = BeaconState::committee_count_for(active_validator_indices.len() as u64, spec);
        let index = state.committee_index_of_shard(epoch, shard, spec)?;
        if index >= count {
            return Err(BeaconStateError::NoCommitteeForShard { epoch, shard });
        }

        let key = ShufflingKey::new(
            epoch,
            state.get_seed(epoch, DOMAIN_ATTESTATION, spec)?,
            &active_validator_indices,
        );
        let shuffling = self.shuffling(key, &active_validator_indices, spec)?;

        let total = shuffling.len() as u64;
        let start = (total * index / count) as usize;
        let end = (total * (index + 1) / count) as usize;
        shuffling
            .get(start..end)
            .map(<[u64]>::to_vec)
            .ok_or(BeaconStateError::NoCommitteeForShard { epoch, shard })
    }
}
