use std::cmp::min;

use alloy_primitives::B256;
use keel_bls::{AggregatePubKey, PubKey, traits::{Aggregatable, Verifiable}};
use ssz_types::{BitList, VariableList, typenum::Unsigned};
use tree_hash::TreeHash;

use crate::{
    attestation::Attestation,
    attestation_data::{AttestationData, AttestationDataAndCustodyBit},
    beacon_state::BeaconState,
    constants::{DOMAIN_ATTESTATION, MaxValidatorsPerCommittee},
    context::ConsensusContext,
    errors::{
        AttestationInvalid, BeaconStateError, BlockOperationError, CrosslinkCheck,
        IndexedAttestationInvalid,
    },
    indexed_attestation::IndexedAttestation,
    misc::{compute_signing_root, is_sorted_and_unique},
    pending_attestation::PendingAttestation,
    verify,
};

impl BeaconState {
    pub fn process_attestation(
        &mut self,
        attestation: &Attestation,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockOperationError<AttestationInvalid>> {
        let pending_attestation = self.verify_attestation(attestation, ctxt)?;

        let attestations = if attestation.data.target.epoch == self.get_current_epoch(ctxt.spec) {
            &mut self.current_epoch_attestations
        } else {
            &mut self.previous_epoch_attestations
        };
        attestations
            .push(pending_attestation)
            .map_err(|_| BeaconStateError::ListFull("epoch attestations"))?;
        Ok(())
    }

    /// Check ``attestation`` against the state and return the record kept for reward accounting.
    pub fn verify_attestation(
        &self,
        attestation: &Attestation,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<PendingAttestation, BlockOperationError<AttestationInvalid>> {
        let spec = ctxt.spec;
        let data = &attestation.data;
        let shard = data.crosslink.shard;
        verify!(
            shard < spec.shard_count,
            AttestationInvalid::BadShard {
                shard,
                shard_count: spec.shard_count,
            }
        );

        let current_epoch = self.get_current_epoch(spec);
        let previous_epoch = self.get_previous_epoch(spec);
        verify!(
            data.target.epoch == previous_epoch || data.target.epoch == current_epoch,
            AttestationInvalid::WrongTargetEpoch {
                target: data.target.epoch,
                previous: previous_epoch,
                current: current_epoch,
            }
        );

        let attestation_slot = self.get_attestation_data_slot(data, spec)?;
        verify!(
            attestation_slot.saturating_add(spec.min_attestation_inclusion_delay) <= self.slot,
            AttestationInvalid::InclusionDelayViolation {
                attestation_slot,
                state_slot: self.slot,
            }
        );
        verify!(
            self.slot <= attestation_slot.saturating_add(spec.slots_per_epoch),
            AttestationInvalid::StaleAttestation {
                attestation_slot,
                state_slot: self.slot,
            }
        );

        let (justified_checkpoint, crosslinks) = if data.target.epoch == current_epoch {
            (&self.current_justified_checkpoint, &self.current_crosslinks)
        } else {
            (&self.previous_justified_checkpoint, &self.previous_crosslinks)
        };
        verify!(
            data.source == *justified_checkpoint,
            AttestationInvalid::SourceMismatch
        );

        // Check crosslink against expected parent crosslink
        let parent_crosslink = crosslinks.get(shard as usize).ok_or(
            BeaconStateError::VectorLengthMismatch {
                vector: "crosslinks",
                expected: spec.shard_count as usize,
                found: crosslinks.len(),
            },
        )?;
        verify!(
            data.crosslink.parent_root == parent_crosslink.tree_hash_root(),
            AttestationInvalid::CrosslinkMismatch(CrosslinkCheck::ParentRoot)
        );
        verify!(
            data.crosslink.start_epoch == parent_crosslink.end_epoch,
            AttestationInvalid::CrosslinkMismatch(CrosslinkCheck::StartEpoch)
        );
        verify!(
            data.crosslink.end_epoch
                == min(
                    data.target.epoch,
                    parent_crosslink
                        .end_epoch
                        .saturating_add(spec.max_epochs_per_crosslink)
                ),
            AttestationInvalid::CrosslinkMismatch(CrosslinkCheck::EndEpoch)
        );
        verify!(
            data.crosslink.data_root == B256::ZERO,
            AttestationInvalid::CrosslinkMismatch(CrosslinkCheck::DataRoot)
        );

        // Check signature
        let indexed_attestation = self.convert_to_indexed(attestation, ctxt)?;
        self.verify_indexed_attestation(&indexed_attestation, ctxt)
            .map_err(|err| err.map_invalid(AttestationInvalid::BadIndexedAttestation))?;

        Ok(PendingAttestation {
            aggregation_bits: attestation.aggregation_bits.clone(),
            data: data.clone(),
            inclusion_delay: self.slot - attestation_slot,
            proposer_index: ctxt.beacon_proposer_index(self)?,
        })
    }

    /// Return the members of the committee of ``data`` whose bit is set in ``bits``.
    pub fn get_attesting_indices(
        &self,
        data: &AttestationData,
        bits: &BitList<MaxValidatorsPerCommittee>,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<Vec<u64>, BeaconStateError> {
        let committee = ctxt.crosslink_committee(self, data.target.epoch, data.crosslink.shard)?;
        Ok(committee
            .into_iter()
            .enumerate()
            .filter(|(i, _)| bits.get(*i).unwrap_or(false))
            .map(|(_, index)| index)
            .collect())
    }

    /// Convert ``attestation`` to (almost) indexed-verifiable form.
    ///
    /// Attesters are split by their custody bit; both index lists come out ascending.
    pub fn convert_to_indexed(
        &self,
        attestation: &Attestation,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<IndexedAttestation, BlockOperationError<AttestationInvalid>> {
        let data = &attestation.data;
        let committee = ctxt.crosslink_committee(self, data.target.epoch, data.crosslink.shard)?;

        for bits in [&attestation.aggregation_bits, &attestation.custody_bits] {
            verify!(
                bits.len() == committee.len(),
                AttestationInvalid::BitfieldLengthMismatch {
                    expected: committee.len(),
                    found: bits.len(),
                }
            );
        }
        verify!(
            attestation
                .custody_bits
                .is_subset(&attestation.aggregation_bits),
            AttestationInvalid::CustodyBitsNotSubset
        );

        let mut custody_bit_0_indices = vec![];
        let mut custody_bit_1_indices = vec![];
        for (i, &validator_index) in committee.iter().enumerate() {
            if !attestation.aggregation_bits.get(i).unwrap_or(false) {
                continue;
            }
            if attestation.custody_bits.get(i).unwrap_or(false) {
                custody_bit_1_indices.push(validator_index);
            } else {
                custody_bit_0_indices.push(validator_index);
            }
        }
        custody_bit_0_indices.sort_unstable();
        custody_bit_1_indices.sort_unstable();

        let into_list = |indices: Vec<u64>| {
            let found = indices.len();
            VariableList::new(indices).map_err(|_| {
                BlockOperationError::invalid(AttestationInvalid::BadIndexedAttestation(
                    IndexedAttestationInvalid::TooManyIndices {
                        found,
                        max: MaxValidatorsPerCommittee::to_u64(),
                    },
                ))
            })
        };
        Ok(IndexedAttestation {
            custody_bit_0_indices: into_list(custody_bit_0_indices)?,
            custody_bit_1_indices: into_list(custody_bit_1_indices)?,
            data: data.clone(),
            signature: attestation.signature.clone(),
        })
    }

    /// Verify validity of ``indexed_attestation``.
    pub fn verify_indexed_attestation(
        &self,
        indexed_attestation: &IndexedAttestation,
        ctxt: &ConsensusContext<'_>,
    ) -> Result<(), BlockOperationError<IndexedAttestationInvalid>> {
        let spec = ctxt.spec;
        let bit_0_indices = &indexed_attestation.custody_bit_0_indices;
        let bit_1_indices = &indexed_attestation.custody_bit_1_indices;

        for indices in [bit_0_indices, bit_1_indices] {
            verify!(
                indices.len() as u64 <= spec.max_validators_per_committee,
                IndexedAttestationInvalid::TooManyIndices {
                    found: indices.len(),
                    max: spec.max_validators_per_committee,
                }
            );
        }
        for indices in [bit_0_indices, bit_1_indices] {
            verify!(
                is_sorted_and_unique(indices),
                IndexedAttestationInvalid::UnsortedOrDuplicateIndices
            );
        }
        verify!(
            !bit_0_indices
                .iter()
                .any(|index| bit_1_indices.binary_search(index).is_ok()),
            IndexedAttestationInvalid::CustodyBitSetsOverlap
        );
        verify!(
            !(bit_0_indices.is_empty() && bit_1_indices.is_empty()),
            IndexedAttestationInvalid::EmptyAttestation
        );

        let mut pubkeys = vec![];
        let mut messages = vec![];
        for (custody_bit, indices) in [(false, bit_0_indices), (true, bit_1_indices)] {
            if indices.is_empty() {
                continue;
            }
            let keys = indices
                .iter()
                .map(|&index| {
                    self.validators
                        .get(index as usize)
                        .map(|validator| &validator.pubkey)
                        .ok_or(BlockOperationError::invalid(
                            IndexedAttestationInvalid::UnknownValidator(index),
                        ))
                })
                .collect::<Result<Vec<&PubKey>, _>>()?;
            pubkeys.push(keys);
            messages.push(AttestationDataAndCustodyBit {
                data: indexed_attestation.data.clone(),
                custody_bit,
            });
        }

        if ctxt.verify_signatures().is_true() {
            let domain = self.get_domain(
                DOMAIN_ATTESTATION,
                Some(indexed_attestation.data.target.epoch),
                spec,
            );
            let aggregate_pubkeys = pubkeys
                .iter()
                .map(|keys| AggregatePubKey::aggregate(keys).map(AggregatePubKey::to_pubkey))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| {
                    BlockOperationError::invalid(IndexedAttestationInvalid::InvalidSignature)
                })?;
            let signing_roots = messages
                .iter()
                .map(|message| compute_signing_root(message, domain))
                .collect::<Vec<_>>();

            verify!(
                indexed_attestation
                    .signature
                    .verify_multiple(
                        &aggregate_pubkeys.iter().collect::<Vec<_>>(),
                        &signing_roots
                            .iter()
                            .map(|root| root.as_slice())
                            .collect::<Vec<_>>(),
                    )
                    .unwrap_or(false),
                IndexedAttestationInvalid::InvalidSignature
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keel_bls::BLSSignature;
    use keel_network_spec::networks::{BeaconNetworkSpec, MINIMAL};

    use super::*;
    use crate::{
        committee::CommitteeCache,
        context::VerifySignatures,
        errors::BlockProcessingError,
        test_utils::{ValidatorSetup, genesis_state},
    };

    /// A state one epoch in, where committees of epoch 0 can be included.
    fn attesting_state() -> BeaconState {
        let mut state = genesis_state(64, &MINIMAL);
        state.slot = MINIMAL.slots_per_epoch + 1;
        state
    }

    #[test]
    fn test_round_trip_through_indexed_form() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(64);
        let state = attesting_state();
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        let committee = ctxt.crosslink_committee(&state, 0, 2).expect("committee");
        let attestation = keys.attestation(&state, 0, 2, &[0, 2, 3, 5], &[2], &mut ctxt);
        let indexed = state
            .convert_to_indexed(&attestation, &mut ctxt)
            .expect("conversion");

        assert_eq!(indexed.custody_bit_1_indices.to_vec(), vec![committee[2]]);
        let mut bit_0 = vec![committee[0], committee[3], committee[5]];
        bit_0.sort_unstable();
        assert_eq!(indexed.custody_bit_0_indices.to_vec(), bit_0);
        assert!(indexed.attesting_indices().len() <= committee.len());
        state
            .verify_indexed_attestation(&indexed, &ctxt)
            .expect("valid indexed attestation");
    }

    #[test]
    fn test_attestation_is_recorded() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(64);
        let mut state = attesting_state();
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        let attestation = keys.attestation(&state, 0, 3, &[0, 1], &[], &mut ctxt);
        let attestation_slot = state
            .get_attestation_data_slot(&attestation.data, spec)
            .expect("slot");
        state
            .process_attestations(&[attestation.clone()], &mut ctxt)
            .expect("valid attestation");

        assert!(state.current_epoch_attestations.is_empty());
        let pending = &state.previous_epoch_attestations[0];
        assert_eq!(pending.data, attestation.data);
        assert_eq!(pending.inclusion_delay, state.slot - attestation_slot);
        assert_eq!(
            Ok(pending.proposer_index),
            ctxt.beacon_proposer_index(&state)
        );
    }

    #[test]
    fn test_wrong_target_epoch() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(64);
        let mut state = attesting_state();
        let mut cache = CommitteeCache::new();
        let mut ctxt =
            ConsensusContext::new(spec, &mut cache).set_verify_signatures(VerifySignatures::False);

        let mut attestation = keys.attestation(&state, 0, 0, &[0], &[], &mut ctxt);
        state.slot += 2 * spec.slots_per_epoch;
        attestation.data.target.epoch = 0;
        assert_eq!(
            state.process_attestations(&[attestation], &mut ctxt),
            Err(BlockProcessingError::AttestationInvalid {
                index: 0,
                reason: AttestationInvalid::WrongTargetEpoch {
                    target: 0,
                    previous: 2,
                    current: 3
                }
            })
        );
    }

    #[test]
    fn test_inclusion_too_early() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(64);
        let mut state = genesis_state(64, spec);
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        // The committee of shard 0 attests at slot 0, which cannot be included at slot 0
        let attestation = keys.attestation(&state, 0, 0, &[0], &[], &mut ctxt);
        assert_eq!(
            state.process_attestation(&attestation, &mut ctxt),
            Err(BlockOperationError::Invalid(
                AttestationInvalid::InclusionDelayViolation {
                    attestation_slot: 0,
                    state_slot: 0
                }
            ))
        );
    }

    #[test]
    fn test_stale_attestation() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(64);
        let mut state = attesting_state();
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        let attestation = keys.attestation(&state, 0, 0, &[0], &[], &mut ctxt);
        state.slot = spec.slots_per_epoch * 2 - 1;
        assert_eq!(
            state.process_attestation(&attestation, &mut ctxt),
            Err(BlockOperationError::Invalid(
                AttestationInvalid::StaleAttestation {
                    attestation_slot: 0,
                    state_slot: spec.slots_per_epoch * 2 - 1
                }
            ))
        );
    }

    #[test]
    fn test_source_and_crosslink_checks() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(64);
        let mut state = attesting_state();
        let mut cache = CommitteeCache::new();
        let mut ctxt =
            ConsensusContext::new(spec, &mut cache).set_verify_signatures(VerifySignatures::False);
        let attestation = keys.attestation(&state, 0, 1, &[0], &[], &mut ctxt);

        let mut wrong_source = attestation.clone();
        wrong_source.data.source.epoch = 7;
        assert_eq!(
            state.process_attestation(&wrong_source, &mut ctxt),
            Err(BlockOperationError::Invalid(AttestationInvalid::SourceMismatch))
        );

        let mut wrong_parent = attestation.clone();
        wrong_parent.data.crosslink.parent_root = B256::repeat_byte(1);
        assert_eq!(
            state.process_attestation(&wrong_parent, &mut ctxt),
            Err(BlockOperationError::Invalid(
                AttestationInvalid::CrosslinkMismatch(CrosslinkCheck::ParentRoot)
            ))
        );

        let mut shard_data = attestation;
        shard_data.data.crosslink.data_root = B256::repeat_byte(1);
        assert_eq!(
            state.process_attestation(&shard_data, &mut ctxt),
            Err(BlockOperationError::Invalid(
                AttestationInvalid::CrosslinkMismatch(CrosslinkCheck::DataRoot)
            ))
        );
    }

    #[test]
    fn test_custody_bits_outside_aggregation() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(64);
        let state = attesting_state();
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        let mut attestation = keys.attestation(&state, 0, 0, &[0], &[], &mut ctxt);
        attestation.custody_bits.set(1, true).expect("in range");
        assert_eq!(
            state.convert_to_indexed(&attestation, &mut ctxt),
            Err(BlockOperationError::Invalid(
                AttestationInvalid::CustodyBitsNotSubset
            ))
        );

        attestation.custody_bits = BitList::with_capacity(3).expect("bitlist");
        assert!(matches!(
            state.convert_to_indexed(&attestation, &mut ctxt),
            Err(BlockOperationError::Invalid(
                AttestationInvalid::BitfieldLengthMismatch { found: 3, .. }
            ))
        ));
    }

    #[test]
    fn test_indexed_attestation_checks() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(64);
        let state = attesting_state();
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);
        let attestation = keys.attestation(&state, 0, 0, &[0, 1, 2], &[], &mut ctxt);
        let indexed = state
            .convert_to_indexed(&attestation, &mut ctxt)
            .expect("conversion");

        let mut duplicate = indexed.clone();
        let first = duplicate.custody_bit_0_indices[0];
        duplicate.custody_bit_0_indices = vec![first, first].into();
        assert_eq!(
            state.verify_indexed_attestation(&duplicate, &ctxt),
            Err(BlockOperationError::Invalid(
                IndexedAttestationInvalid::UnsortedOrDuplicateIndices
            ))
        );

        let mut empty = indexed.clone();
        empty.custody_bit_0_indices = VariableList::default();
        assert_eq!(
            state.verify_indexed_attestation(&empty, &ctxt),
            Err(BlockOperationError::Invalid(
                IndexedAttestationInvalid::EmptyAttestation
            ))
        );

        let mut overlapping = indexed.clone();
        overlapping.custody_bit_1_indices = vec![first].into();
        assert_eq!(
            state.verify_indexed_attestation(&overlapping, &ctxt),
            Err(BlockOperationError::Invalid(
                IndexedAttestationInvalid::CustodyBitSetsOverlap
            ))
        );

        let mut forged = indexed;
        forged.signature = BLSSignature::infinity();
        assert_eq!(
            state.verify_indexed_attestation(&forged, &ctxt),
            Err(BlockOperationError::Invalid(
                IndexedAttestationInvalid::InvalidSignature
            ))
        );
    }

    #[test]
    fn test_too_many_indices() {
        let spec = BeaconNetworkSpec {
            max_validators_per_committee: 2,
            ..(**MINIMAL).clone()
        };
        let keys = ValidatorSetup::new(64);
        let state = attesting_state();
        let mut cache = CommitteeCache::new();
        let ctxt = ConsensusContext::new(&spec, &mut cache);
        let mut default_cache = CommitteeCache::new();
        let mut default_ctxt = ConsensusContext::new(&MINIMAL, &mut default_cache);
        let attestation = keys.attestation(&state, 0, 0, &[0, 1, 2], &[], &mut default_ctxt);
        let indexed = state
            .convert_to_indexed(&attestation, &mut default_ctxt)
            .expect("conversion");

        assert_eq!(
            state.verify_indexed_attestation(&indexed, &ctxt),
            Err(BlockOperationError::Invalid(
                IndexedAttestationInvalid::TooManyIndices { found: 3, max: 2 }
            ))
        );
    }
}
