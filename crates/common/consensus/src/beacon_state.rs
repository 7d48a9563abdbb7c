use std::cmp::{max, min};

use alloy_primitives::{B256, aliases::B32};
use ethereum_hashing::{hash, hash_fixed};
use keel_bls::PubKey;
use keel_network_spec::networks::BeaconNetworkSpec;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{BitVector, VariableList, serde_utils::quoted_u64_var_list};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

use crate::{
    attestation_data::AttestationData,
    beacon_block::BeaconBlockBody,
    beacon_block_header::BeaconBlockHeader,
    checkpoint::Checkpoint,
    constants::{
        DOMAIN_ATTESTATION, EpochsPerHistoricalVector, EpochsPerSlashingsVector, FAR_FUTURE_EPOCH,
        GENESIS_EPOCH, HistoricalRootsLimit, JustificationBitsLength, MAX_RANDOM_BYTE,
        MaxPendingAttestations, ShardCount, SlotsPerEth1VotingPeriod, SlotsPerHistoricalRoot,
        ValidatorRegistryLimit,
    },
    context::ConsensusContext,
    crosslink::Crosslink,
    errors::BeaconStateError,
    eth_1_data::Eth1Data,
    fork::Fork,
    misc::{
        compute_activation_exit_epoch, compute_committee, compute_domain, compute_epoch_at_slot,
        compute_start_slot_at_epoch,
    },
    pending_attestation::PendingAttestation,
    validator::Validator,
};

/// The beacon chain state.
///
/// Ring vectors (`block_roots`, `state_roots`, `randao_mixes`, `slashings`) and the crosslink
/// lists are bounded by the mainnet sizes and hold exactly as many entries as the active
/// [`BeaconNetworkSpec`] asks for, which [`BeaconState::validate_shape`] checks.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct BeaconState {
    // Versioning
    #[serde(with = "serde_utils::quoted_u64")]
    pub genesis_time: u64,
    pub genesis_validators_root: B256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub slot: u64,
    pub fork: Fork,

    // History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: VariableList<B256, SlotsPerHistoricalRoot>,
    pub state_roots: VariableList<B256, SlotsPerHistoricalRoot>,
    pub historical_roots: VariableList<B256, HistoricalRootsLimit>,

    // Eth1
    pub eth1_data: Eth1Data,
    pub eth1_data_votes: VariableList<Eth1Data, SlotsPerEth1VotingPeriod>,
    #[serde(with = "serde_utils::quoted_u64")]
    pub eth1_deposit_index: u64,

    // Registry
    pub validators: VariableList<Validator, ValidatorRegistryLimit>,
    #[serde(with = "quoted_u64_var_list")]
    pub balances: VariableList<u64, ValidatorRegistryLimit>,

    // Shuffling
    #[serde(with = "serde_utils::quoted_u64")]
    pub start_shard: u64,
    pub randao_mixes: VariableList<B256, EpochsPerHistoricalVector>,

    // Slashings
    #[serde(with = "quoted_u64_var_list")]
    pub slashings: VariableList<u64, EpochsPerSlashingsVector>,

    // Attestations
    pub previous_epoch_attestations: VariableList<PendingAttestation, MaxPendingAttestations>,
    pub current_epoch_attestations: VariableList<PendingAttestation, MaxPendingAttestations>,

    // Crosslinks
    pub previous_crosslinks: VariableList<Crosslink, ShardCount>,
    pub current_crosslinks: VariableList<Crosslink, ShardCount>,

    // Finality
    pub justification_bits: BitVector<JustificationBitsLength>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
}

fn sized_list<T: Clone, N: ssz_types::typenum::Unsigned>(
    vector: &'static str,
    value: T,
    length: u64,
) -> Result<VariableList<T, N>, BeaconStateError> {
    VariableList::new(vec![value; length as usize]).map_err(|_| BeaconStateError::ListFull(vector))
}

fn check_length(vector: &'static str, found: usize, expected: u64) -> Result<(), BeaconStateError> {
    if found as u64 != expected {
        return Err(BeaconStateError::VectorLengthMismatch {
            vector,
            expected: expected as usize,
            found,
        });
    }
    Ok(())
}

/// Entry of a ring vector of length ``length`` that holds ``position``.
pub(crate) fn ring_entry<T>(
    ring: &[T],
    vector: &'static str,
    position: u64,
    length: u64,
) -> Result<&T, BeaconStateError> {
    ring.get((position % length) as usize)
        .ok_or(BeaconStateError::VectorLengthMismatch {
            vector,
            expected: length as usize,
            found: ring.len(),
        })
}

pub(crate) fn ring_entry_mut<T>(
    ring: &mut [T],
    vector: &'static str,
    position: u64,
    length: u64,
) -> Result<&mut T, BeaconStateError> {
    let found = ring.len();
    ring.get_mut((position % length) as usize)
        .ok_or(BeaconStateError::VectorLengthMismatch {
            vector,
            expected: length as usize,
            found,
        })
}

impl BeaconState {
    /// An empty state at genesis, with every ring vector sized for ``spec`` and the randao mixes
    /// seeded from the eth1 block hash.
    pub fn new(
        genesis_time: u64,
        eth1_data: Eth1Data,
        spec: &BeaconNetworkSpec,
    ) -> Result<Self, BeaconStateError> {
        Ok(Self {
            genesis_time,
            genesis_validators_root: B256::ZERO,
            slot: 0,
            fork: Fork::genesis(spec.genesis_fork_version),
            latest_block_header: BeaconBlockHeader {
                body_root: BeaconBlockBody::default().tree_hash_root(),
                ..Default::default()
            },
            block_roots: sized_list("block_roots", B256::ZERO, spec.slots_per_historical_root)?,
            state_roots: sized_list("state_roots", B256::ZERO, spec.slots_per_historical_root)?,
            historical_roots: VariableList::default(),
            randao_mixes: sized_list(
                "randao_mixes",
                eth1_data.block_hash,
                spec.epochs_per_historical_vector,
            )?,
            eth1_data,
            eth1_data_votes: VariableList::default(),
            eth1_deposit_index: 0,
            validators: VariableList::default(),
            balances: VariableList::default(),
            start_shard: 0,
            slashings: sized_list("slashings", 0, spec.epochs_per_slashings_vector)?,
            previous_epoch_attestations: VariableList::default(),
            current_epoch_attestations: VariableList::default(),
            previous_crosslinks: sized_list(
                "previous_crosslinks",
                Crosslink::default(),
                spec.shard_count,
            )?,
            current_crosslinks: sized_list(
                "current_crosslinks",
                Crosslink::default(),
                spec.shard_count,
            )?,
            justification_bits: BitVector::new(),
            previous_justified_checkpoint: Checkpoint::default(),
            current_justified_checkpoint: Checkpoint::default(),
            finalized_checkpoint: Checkpoint::default(),
        })
    }

    /// Check that the registry and every ring vector have the lengths ``spec`` expects.
    pub fn validate_shape(&self, spec: &BeaconNetworkSpec) -> Result<(), BeaconStateError> {
        check_length("balances", self.balances.len(), self.validators.len() as u64)?;
        check_length("block_roots", self.block_roots.len(), spec.slots_per_historical_root)?;
        check_length("state_roots", self.state_roots.len(), spec.slots_per_historical_root)?;
        check_length(
            "randao_mixes",
            self.randao_mixes.len(),
            spec.epochs_per_historical_vector,
        )?;
        check_length(
            "slashings",
            self.slashings.len(),
            spec.epochs_per_slashings_vector,
        )?;
        check_length(
            "previous_crosslinks",
            self.previous_crosslinks.len(),
            spec.shard_count,
        )?;
        check_length(
            "current_crosslinks",
            self.current_crosslinks.len(),
            spec.shard_count,
        )
    }

    pub fn validator(&self, index: u64) -> Result<&Validator, BeaconStateError> {
        self.validators
            .get(index as usize)
            .ok_or(BeaconStateError::UnknownValidator(index))
    }

    pub fn balance(&self, index: u64) -> Result<u64, BeaconStateError> {
        self.balances
            .get(index as usize)
            .copied()
            .ok_or(BeaconStateError::UnknownValidator(index))
    }

    /// Return the current epoch.
    pub fn get_current_epoch(&self, spec: &BeaconNetworkSpec) -> u64 {
        compute_epoch_at_slot(self.slot, spec.slots_per_epoch)
    }

    /// Return the previous epoch (unless the current epoch is ``GENESIS_EPOCH``).
    pub fn get_previous_epoch(&self, spec: &BeaconNetworkSpec) -> u64 {
        let current_epoch = self.get_current_epoch(spec);
        if current_epoch == GENESIS_EPOCH {
            GENESIS_EPOCH
        } else {
            current_epoch - 1
        }
    }

    /// Return the block root at the start of a recent ``epoch``.
    pub fn get_block_root(
        &self,
        epoch: u64,
        spec: &BeaconNetworkSpec,
    ) -> Result<B256, BeaconStateError> {
        self.get_block_root_at_slot(
            compute_start_slot_at_epoch(epoch, spec.slots_per_epoch),
            spec,
        )
    }

    /// Return the block root at a recent ``slot``.
    pub fn get_block_root_at_slot(
        &self,
        slot: u64,
        spec: &BeaconNetworkSpec,
    ) -> Result<B256, BeaconStateError> {
        if !(slot < self.slot && self.slot <= slot.saturating_add(spec.slots_per_historical_root))
        {
            return Err(BeaconStateError::SlotOutOfRange {
                slot,
                state_slot: self.slot,
            });
        }
        ring_entry(
            &self.block_roots,
            "block_roots",
            slot,
            spec.slots_per_historical_root,
        )
        .copied()
    }

    /// Return the randao mix at a recent ``epoch``.
    pub fn get_randao_mix(
        &self,
        epoch: u64,
        spec: &BeaconNetworkSpec,
    ) -> Result<B256, BeaconStateError> {
        ring_entry(
            &self.randao_mixes,
            "randao_mixes",
            epoch,
            spec.epochs_per_historical_vector,
        )
        .copied()
    }

    /// Return the sequence of active validator indices at ``epoch``.
    pub fn get_active_validator_indices(&self, epoch: u64) -> Vec<u64> {
        self.validators
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.is_active_validator(epoch).then_some(i as u64))
            .collect()
    }

    /// Return the validator churn limit for the current epoch.
    pub fn get_validator_churn_limit(&self, spec: &BeaconNetworkSpec) -> u64 {
        let active_validator_indices =
            self.get_active_validator_indices(self.get_current_epoch(spec));
        max(
            spec.min_per_epoch_churn_limit,
            active_validator_indices.len() as u64 / spec.churn_limit_quotient,
        )
    }

    /// Return the seed at ``epoch``.
    pub fn get_seed(
        &self,
        epoch: u64,
        domain_type: B32,
        spec: &BeaconNetworkSpec,
    ) -> Result<B256, BeaconStateError> {
        let lookback = spec.epochs_per_historical_vector - spec.min_seed_lookahead - 1;
        let mix = self.get_randao_mix(
            epoch % spec.epochs_per_historical_vector + lookback,
            spec,
        )?;
        let epoch_with_index =
            [domain_type.as_slice(), &epoch.to_le_bytes(), mix.as_slice()].concat();
        Ok(B256::from(hash_fixed(&epoch_with_index)))
    }

    /// Number of crosslink committees in an epoch with ``active_validator_count`` validators.
    pub fn committee_count_for(active_validator_count: u64, spec: &BeaconNetworkSpec) -> u64 {
        max(
            1,
            min(
                spec.shard_count / spec.slots_per_epoch,
                active_validator_count / spec.slots_per_epoch / spec.target_committee_size,
            ),
        ) * spec.slots_per_epoch
    }

    /// Return the number of committees at ``epoch``.
    pub fn get_committee_count(&self, epoch: u64, spec: &BeaconNetworkSpec) -> u64 {
        Self::committee_count_for(self.get_active_validator_indices(epoch).len() as u64, spec)
    }

    /// Return the number of shards to increment ``state.start_shard`` during ``epoch``.
    pub fn get_shard_delta(&self, epoch: u64, spec: &BeaconNetworkSpec) -> u64 {
        min(
            self.get_committee_count(epoch, spec),
            spec.shard_count - spec.shard_count / spec.slots_per_epoch,
        )
    }

    /// Return the first shard with a committee at ``epoch``.
    pub fn get_start_shard(
        &self,
        epoch: u64,
        spec: &BeaconNetworkSpec,
    ) -> Result<u64, BeaconStateError> {
        let current_epoch = self.get_current_epoch(spec);
        let next_epoch = current_epoch.saturating_add(1);
        if epoch > next_epoch {
            return Err(BeaconStateError::EpochOutOfRange {
                epoch,
                current_epoch,
            });
        }

        let mut check_epoch = next_epoch;
        let mut shard =
            (self.start_shard + self.get_shard_delta(current_epoch, spec)) % spec.shard_count;
        while check_epoch > epoch {
            check_epoch -= 1;
            shard = (shard + spec.shard_count - self.get_shard_delta(check_epoch, spec))
                % spec.shard_count;
        }
        Ok(shard)
    }

    /// Position of ``shard`` among the committees of ``epoch``.
    pub(crate) fn committee_index_of_shard(
        &self,
        epoch: u64,
        shard: u64,
        spec: &BeaconNetworkSpec,
    ) -> Result<u64, BeaconStateError> {
        let start_shard = self.get_start_shard(epoch, spec)?;
        Ok((shard % spec.shard_count + spec.shard_count - start_shard) % spec.shard_count)
    }

    /// Return the slot at which the committee of ``data`` was due to attest.
    pub fn get_attestation_data_slot(
        &self,
        data: &AttestationData,
        spec: &BeaconNetworkSpec,
    ) -> Result<u64, BeaconStateError> {
        let epoch = data.target.epoch;
        let committee_count = self.get_committee_count(epoch, spec);
        let offset = self.committee_index_of_shard(epoch, data.crosslink.shard, spec)?;
        compute_start_slot_at_epoch(epoch, spec.slots_per_epoch)
            .checked_add(offset / (committee_count / spec.slots_per_epoch))
            .ok_or(BeaconStateError::ArithmeticOverflow)
    }

    /// Return the crosslink committee of ``shard`` at ``epoch``, computed without a cache.
    pub fn get_crosslink_committee(
        &self,
        epoch: u64,
        shard: u64,
        spec: &BeaconNetworkSpec,
    ) -> Result<Vec<u64>, BeaconStateError> {
        let indices = self.get_active_validator_indices(epoch);
        let count = Self::committee_count_for(indices.len() as u64, spec);
        let index = self.committee_index_of_shard(epoch, shard, spec)?;
        if index >= count {
            return Err(BeaconStateError::NoCommitteeForShard { epoch, shard });
        }
        compute_committee(
            &indices,
            self.get_seed(epoch, DOMAIN_ATTESTATION, spec)?,
            index,
            count,
            spec.shuffle_round_count,
        )
    }

    /// Return from ``committee`` a member sampled by effective balance.
    pub fn compute_proposer_index(
        &self,
        committee: &[u64],
        seed: B256,
        epoch: u64,
        spec: &BeaconNetworkSpec,
    ) -> Result<u64, BeaconStateError> {
        if committee.is_empty() {
            return Err(BeaconStateError::NoActiveValidators);
        }

        let len = committee.len() as u64;
        let mut i: u64 = 0;
        loop {
            let position = ((epoch % len) + (i % len)) % len;
            let candidate_index = committee[position as usize];
            let random_bytes = hash(&[seed.as_slice(), &(i / 32).to_le_bytes()].concat());
            let random_byte = random_bytes[(i % 32) as usize] as u64;
            let effective_balance = self.validator(candidate_index)?.effective_balance;
            if effective_balance.saturating_mul(MAX_RANDOM_BYTE)
                >= spec.max_effective_balance.saturating_mul(random_byte)
            {
                return Ok(candidate_index);
            }
            i += 1;
        }
    }

    /// Return the signature domain (fork version concatenated with domain type) of a message.
    pub fn get_domain(
        &self,
        domain_type: B32,
        epoch: Option<u64>,
        spec: &BeaconNetworkSpec,
    ) -> B256 {
        let epoch = epoch.unwrap_or_else(|| self.get_current_epoch(spec));
        compute_domain(
            domain_type,
            self.fork.version_at(epoch),
            self.genesis_validators_root,
        )
    }

    /// Increase the validator balance at index ``index`` by ``delta``.
    pub fn increase_balance(&mut self, index: u64, delta: u64) -> Result<(), BeaconStateError> {
        let balance = self
            .balances
            .get_mut(index as usize)
            .ok_or(BeaconStateError::UnknownValidator(index))?;
        *balance = balance
            .checked_add(delta)
            .ok_or(BeaconStateError::BalanceOverflow(index))?;
        Ok(())
    }

    /// Decrease the validator balance at index ``index`` by ``delta`` with underflow protection.
    pub fn decrease_balance(&mut self, index: u64, delta: u64) -> Result<(), BeaconStateError> {
        let balance = self
            .balances
            .get_mut(index as usize)
            .ok_or(BeaconStateError::UnknownValidator(index))?;
        *balance = balance.saturating_sub(delta);
        Ok(())
    }

    /// Initiate the exit of the validator with index ``index``.
    ///
    /// The exit queue is recomputed from the whole registry on every call, so exits scheduled
    /// earlier in the same block count against the churn limit.
    pub fn initiate_validator_exit(
        &mut self,
        index: u64,
        spec: &BeaconNetworkSpec,
    ) -> Result<(), BeaconStateError> {
        // Return if validator already initiated exit
        if self.validator(index)?.exit_epoch != FAR_FUTURE_EPOCH {
            return Ok(());
        }

        // Compute exit queue epoch
        let mut exit_queue_epoch = self
            .validators
            .iter()
            .map(|validator| validator.exit_epoch)
            .filter(|&exit_epoch| exit_epoch != FAR_FUTURE_EPOCH)
            .fold(
                compute_activation_exit_epoch(
                    self.get_current_epoch(spec),
                    spec.activation_exit_delay,
                ),
                max,
            );
        let exit_queue_churn = self
            .validators
            .iter()
            .filter(|validator| validator.exit_epoch == exit_queue_epoch)
            .count() as u64;
        if exit_queue_churn >= self.get_validator_churn_limit(spec) {
            exit_queue_epoch += 1;
        }

        let withdrawable_epoch = exit_queue_epoch
            .checked_add(spec.min_validator_withdrawability_delay)
            .ok_or(BeaconStateError::ArithmeticOverflow)?;
        let validator = self
            .validators
            .get_mut(index as usize)
            .ok_or(BeaconStateError::UnknownValidator(index))?;
        validator.exit_epoch = exit_queue_epoch;
        validator.withdrawable_epoch = withdrawable_epoch;

        Ok(())
    }

    /// Slash the validator with index ``slashed_index``.
    pub fn slash_validator(
        &mut self,
        slashed_index: u64,
        whistleblower_index: Option<u64>,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BeaconStateError> {
        let spec = ctxt.spec;
        let epoch = self.get_current_epoch(spec);
        let proposer_index = ctxt.beacon_proposer_index(self)?;

        self.initiate_validator_exit(slashed_index, spec)?;

        let validator = self
            .validators
            .get_mut(slashed_index as usize)
            .ok_or(BeaconStateError::UnknownValidator(slashed_index))?;
        validator.slashed = true;
        validator.withdrawable_epoch = epoch.saturating_add(spec.epochs_per_slashings_vector);
        let effective_balance = validator.effective_balance;

        let slashed_balance = ring_entry_mut(
            &mut self.slashings,
            "slashings",
            epoch,
            spec.epochs_per_slashings_vector,
        )?;
        *slashed_balance = slashed_balance
            .checked_add(effective_balance)
            .ok_or(BeaconStateError::ArithmeticOverflow)?;
        self.decrease_balance(
            slashed_index,
            effective_balance / spec.min_slashing_penalty_quotient,
        )?;

        // Apply proposer and whistleblower rewards
        let whistleblower_index = whistleblower_index.unwrap_or(proposer_index);
        let whistleblower_reward = effective_balance / spec.whistleblower_reward_quotient;
        let proposer_reward = whistleblower_reward / spec.proposer_reward_quotient;
        self.increase_balance(proposer_index, proposer_reward)?;
        self.increase_balance(whistleblower_index, whistleblower_reward - proposer_reward)?;

        Ok(())
    }

    pub fn add_validator_to_registry(
        &mut self,
        pubkey: PubKey,
        withdrawal_credentials: B256,
        amount: u64,
        spec: &BeaconNetworkSpec,
    ) -> Result<(), BeaconStateError> {
        self.validators
            .push(get_validator_from_deposit(
                pubkey,
                withdrawal_credentials,
                amount,
                spec,
            ))
            .map_err(|_| BeaconStateError::ListFull("validators"))?;
        self.balances
            .push(amount)
            .map_err(|_| BeaconStateError::ListFull("balances"))?;

        Ok(())
    }

    /// Cache the roots of the pre-slot state and of the latest block.
    pub fn process_slot(&mut self, spec: &BeaconNetworkSpec) -> Result<(), BeaconStateError> {
        // Cache state root
        let previous_state_root = self.tree_hash_root();
        *ring_entry_mut(
            &mut self.state_roots,
            "state_roots",
            self.slot,
            spec.slots_per_historical_root,
        )? = previous_state_root;
        // Cache latest block header state root
        if self.latest_block_header.state_root == B256::ZERO {
            self.latest_block_header.state_root = previous_state_root;
        }
        // Cache block root
        let previous_block_root = self.latest_block_header.tree_hash_root();
        *ring_entry_mut(
            &mut self.block_roots,
            "block_roots",
            self.slot,
            spec.slots_per_historical_root,
        )? = previous_block_root;

        Ok(())
    }

    /// Run ``f`` on a copy of the state and keep the result only if it succeeds.
    pub(crate) fn atomically<T, E>(
        &mut self,
        f: impl FnOnce(&mut BeaconState) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut scratch = self.clone();
        let value = f(&mut scratch)?;
        *self = scratch;
        Ok(value)
    }
}

pub fn get_validator_from_deposit(
    pubkey: PubKey,
    withdrawal_credentials: B256,
    amount: u64,
    spec: &BeaconNetworkSpec,
) -> Validator {
    let effective_balance = min(
        amount - amount % spec.effective_balance_increment,
        spec.max_effective_balance,
    );
    Validator::new(pubkey, withdrawal_credentials, effective_balance)
}
