//! Reward and penalty accounting over the attestations recorded for the previous epoch.
//!
//! Nothing in block processing calls into this module. It reads the pending attestations that
//! [`BeaconState::process_attestation`] records and produces per-validator deltas that an epoch
//! transition can apply with [`BeaconState::apply_deltas`].

use std::{
    cmp::max,
    collections::{BTreeSet, HashSet},
};

use crate::{
    beacon_state::BeaconState,
    constants::BASE_REWARDS_PER_EPOCH,
    context::ConsensusContext,
    errors::BeaconStateError,
    misc::integer_squareroot,
    pending_attestation::PendingAttestation,
};

impl BeaconState {
    /// Return the combined effective balance of the ``indices``.
    /// ``EFFECTIVE_BALANCE_INCREMENT`` Gwei minimum to avoid divisions by zero.
    pub fn get_total_balance(
        &self,
        indices: &HashSet<u64>,
        ctxt: &ConsensusContext<'_>,
    ) -> Result<u64, BeaconStateError> {
        let mut total: u64 = 0;
        for &index in indices {
            total = total
                .checked_add(self.validator(index)?.effective_balance)
                .ok_or(BeaconStateError::ArithmeticOverflow)?;
        }
        Ok(max(ctxt.spec.effective_balance_increment, total))
    }

    /// Return the combined effective balance of the active validators.
    pub fn get_total_active_balance(
        &self,
        ctxt: &ConsensusContext<'_>,
    ) -> Result<u64, BeaconStateError> {
        let epoch = self.get_current_epoch(ctxt.spec);
        self.get_total_balance(
            &self
                .get_active_validator_indices(epoch)
                .into_iter()
                .collect(),
            ctxt,
        )
    }

    pub fn get_base_reward(
        &self,
        index: u64,
        total_active_balance: u64,
        ctxt: &ConsensusContext<'_>,
    ) -> Result<u64, BeaconStateError> {
        let effective_balance = self.validator(index)?.effective_balance as u128;
        let reward = effective_balance * ctxt.spec.base_reward_factor as u128
            / integer_squareroot(total_active_balance) as u128
            / BASE_REWARDS_PER_EPOCH as u128;
        u64::try_from(reward).map_err(|_| BeaconStateError::ArithmeticOverflow)
    }

    pub fn get_eligible_validator_indices(&self, ctxt: &ConsensusContext<'_>) -> Vec<u64> {
        let previous_epoch = self.get_previous_epoch(ctxt.spec);
        self.validators
            .iter()
            .enumerate()
            .filter(|(_, validator)| {
                validator.is_active_validator(previous_epoch)
                    || (validator.slashed
                        && previous_epoch.saturating_add(1) < validator.withdrawable_epoch)
            })
            .map(|(index, _)| index as u64)
            .collect()
    }

    pub fn get_matching_source_attestations(
        &self,
        epoch: u64,
        ctxt: &ConsensusContext<'_>,
    ) -> Result<&[PendingAttestation], BeaconStateError> {
        let current_epoch = self.get_current_epoch(ctxt.spec);
        let previous_epoch = self.get_previous_epoch(ctxt.spec);
        if epoch == current_epoch {
            Ok(&self.current_epoch_attestations)
        } else if epoch == previous_epoch {
            Ok(&self.previous_epoch_attestations)
        } else {
            Err(BeaconStateError::EpochOutOfRange {
                epoch,
                current_epoch,
            })
        }
    }

    pub fn get_matching_target_attestations(
        &self,
        epoch: u64,
        ctxt: &ConsensusContext<'_>,
    ) -> Result<Vec<PendingAttestation>, BeaconStateError> {
        let block_root = self.get_block_root(epoch, ctxt.spec)?;
        Ok(self
            .get_matching_source_attestations(epoch, ctxt)?
            .iter()
            .filter(|attestation| attestation.data.target.root == block_root)
            .cloned()
            .collect())
    }

    pub fn get_matching_head_attestations(
        &self,
        epoch: u64,
        ctxt: &ConsensusContext<'_>,
    ) -> Result<Vec<PendingAttestation>, BeaconStateError> {
        let mut matching = vec![];
        for attestation in self.get_matching_source_attestations(epoch, ctxt)? {
            let slot = self.get_attestation_data_slot(&attestation.data, ctxt.spec)?;
            if attestation.data.beacon_block_root == self.get_block_root_at_slot(slot, ctxt.spec)? {
                matching.push(attestation.clone());
            }
        }
        Ok(matching)
    }

    pub fn get_unslashed_attesting_indices(
        &self,
        attestations: &[PendingAttestation],
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<HashSet<u64>, BeaconStateError> {
        let mut output = HashSet::new();
        for attestation in attestations {
            output.extend(self.get_attesting_indices(
                &attestation.data,
                &attestation.aggregation_bits,
                ctxt,
            )?);
        }
        let mut unslashed = HashSet::with_capacity(output.len());
        for index in output {
            if !self.validator(index)?.slashed {
                unslashed.insert(index);
            }
        }
        Ok(unslashed)
    }

    /// Return the rewards and penalties earned by the attestations of the previous epoch.
    pub fn get_attestation_deltas(
        &self,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(Vec<u64>, Vec<u64>), BeaconStateError> {
        let spec = ctxt.spec;
        let validator_count = self.validators.len();
        let mut rewards = vec![0u128; validator_count];
        let mut penalties = vec![0u128; validator_count];
        let previous_epoch = self.get_previous_epoch(spec);
        let total_balance = self.get_total_active_balance(ctxt)?;
        let eligible_validator_indices = self.get_eligible_validator_indices(ctxt);
        let base_rewards = (0..validator_count as u64)
            .map(|index| self.get_base_reward(index, total_balance, ctxt))
            .collect::<Result<Vec<_>, _>>()?;

        // Micro-incentives for matching FFG source, FFG target, and head
        let matching_source_attestations =
            self.get_matching_source_attestations(previous_epoch, ctxt)?;
        let matching_target_attestations =
            self.get_matching_target_attestations(previous_epoch, ctxt)?;
        let matching_head_attestations =
            self.get_matching_head_attestations(previous_epoch, ctxt)?;
        let matching_target_attesting_indices =
            self.get_unslashed_attesting_indices(&matching_target_attestations, ctxt)?;
        for attestations in [
            matching_source_attestations,
            matching_target_attestations.as_slice(),
            matching_head_attestations.as_slice(),
        ] {
            let unslashed_attesting_indices =
                self.get_unslashed_attesting_indices(attestations, ctxt)?;
            let attesting_balance = self.get_total_balance(&unslashed_attesting_indices, ctxt)?;
            for &index in &eligible_validator_indices {
                let base_reward = base_rewards[index as usize] as u128;
                if unslashed_attesting_indices.contains(&index) {
                    rewards[index as usize] +=
                        base_reward * attesting_balance as u128 / total_balance as u128;
                } else {
                    penalties[index as usize] += base_reward;
                }
            }
        }

        // Proposer and inclusion delay micro-rewards
        let source_attesting_indices = self
            .get_unslashed_attesting_indices(matching_source_attestations, ctxt)?
            .into_iter()
            .collect::<BTreeSet<_>>();
        let mut earliest_inclusion = vec![None::<&PendingAttestation>; validator_count];
        for attestation in matching_source_attestations {
            for index in
                self.get_attesting_indices(&attestation.data, &attestation.aggregation_bits, ctxt)?
            {
                let earliest = &mut earliest_inclusion[index as usize];
                if earliest.is_none_or(|current| attestation.inclusion_delay < current.inclusion_delay)
                {
                    *earliest = Some(attestation);
                }
            }
        }
        for index in source_attesting_indices {
            let Some(attestation) = earliest_inclusion[index as usize] else {
                continue;
            };
            let base_reward = base_rewards[index as usize];
            let proposer_reward = base_reward / spec.proposer_reward_quotient;
            *rewards
                .get_mut(attestation.proposer_index as usize)
                .ok_or(BeaconStateError::UnknownValidator(attestation.proposer_index))? +=
                proposer_reward as u128;
            let max_attester_reward = (base_reward - proposer_reward) as u128;
            let inclusion_window = (spec.slots_per_epoch + spec.min_attestation_inclusion_delay)
                .saturating_sub(attestation.inclusion_delay);
            rewards[index as usize] +=
                max_attester_reward * inclusion_window as u128 / spec.slots_per_epoch as u128;
        }

        // Inactivity penalty
        let finality_delay = previous_epoch.saturating_sub(self.finalized_checkpoint.epoch);
        if finality_delay > spec.min_epochs_to_inactivity_penalty {
            for &index in &eligible_validator_indices {
                penalties[index as usize] +=
                    BASE_REWARDS_PER_EPOCH as u128 * base_rewards[index as usize] as u128;
                if !matching_target_attesting_indices.contains(&index) {
                    let effective_balance = self.validator(index)?.effective_balance as u128;
                    penalties[index as usize] += effective_balance * finality_delay as u128
                        / spec.inactivity_penalty_quotient as u128;
                }
            }
        }

        let saturate = |deltas: Vec<u128>| {
            deltas
                .into_iter()
                .map(|delta| u64::try_from(delta).unwrap_or(u64::MAX))
                .collect()
        };
        Ok((saturate(rewards), saturate(penalties)))
    }

    /// Credit ``rewards`` and debit ``penalties``, index by index. Penalties floor balances at
    /// zero.
    pub fn apply_deltas(
        &mut self,
        rewards: &[u64],
        penalties: &[u64],
    ) -> Result<(), BeaconStateError> {
        for (index, (&reward, &penalty)) in rewards.iter().zip(penalties).enumerate() {
            self.increase_balance(index as u64, reward)?;
            self.decrease_balance(index as u64, penalty)?;
        }
        Ok(())
    }
}
