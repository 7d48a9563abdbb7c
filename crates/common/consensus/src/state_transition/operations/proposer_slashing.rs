use crate::{
    beacon_state::BeaconState,
    constants::DOMAIN_BEACON_PROPOSER,
    context::ConsensusContext,
    errors::{BlockOperationError, ProposerSlashingInvalid},
    misc::{compute_epoch_at_slot, compute_signing_root},
    proposer_slashing::ProposerSlashing,
    state_transition::is_valid_signature,
    verify,
};

impl BeaconState {
    pub fn process_proposer_slashing(
        &mut self,
        proposer_slashing: &ProposerSlashing,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockOperationError<ProposerSlashingInvalid>> {
        self.verify_proposer_slashing(proposer_slashing, ctxt)?;

        // Slash the validator
        self.slash_validator(proposer_slashing.proposer_index, None, ctxt)?;
        Ok(())
    }

    pub fn verify_proposer_slashing(
        &self,
        proposer_slashing: &ProposerSlashing,
        ctxt: &ConsensusContext<'_>,
    ) -> Result<(), BlockOperationError<ProposerSlashingInvalid>> {
        let spec = ctxt.spec;
        let header_1 = &proposer_slashing.signed_header_1.message;
        let header_2 = &proposer_slashing.signed_header_2.message;

        // Verify header slots match
        verify!(
            header_1.slot == header_2.slot,
            ProposerSlashingInvalid::HeaderEpochMismatch {
                slot_1: header_1.slot,
                slot_2: header_2.slot,
            }
        );

        // Verify the headers are different
        verify!(header_1 != header_2, ProposerSlashingInvalid::IdenticalHeaders);

        // Verify the proposer is slashable
        let proposer_index = proposer_slashing.proposer_index;
        let proposer = self.validator(proposer_index).map_err(|_| {
            BlockOperationError::invalid(ProposerSlashingInvalid::UnknownProposer(proposer_index))
        })?;
        verify!(
            proposer.is_slashable_validator(self.get_current_epoch(spec)),
            ProposerSlashingInvalid::NotSlashable(proposer_index)
        );

        // Verify signatures
        if ctxt.verify_signatures().is_true() {
            for (number, signed_header) in [
                &proposer_slashing.signed_header_1,
                &proposer_slashing.signed_header_2,
            ]
            .into_iter()
            .enumerate()
            {
                let domain = self.get_domain(
                    DOMAIN_BEACON_PROPOSER,
                    Some(compute_epoch_at_slot(
                        signed_header.message.slot,
                        spec.slots_per_epoch,
                    )),
                    spec,
                );
                verify!(
                    is_valid_signature(
                        &signed_header.signature,
                        &proposer.pubkey,
                        compute_signing_root(&signed_header.message, domain),
                    ),
                    ProposerSlashingInvalid::InvalidSignature(number as u8 + 1)
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keel_network_spec::networks::MINIMAL;

    use super::*;
    use crate::{
        committee::CommitteeCache,
        errors::BlockProcessingError,
        test_utils::{ValidatorSetup, genesis_state},
    };

    #[test]
    fn test_valid_proposer_slashing() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(16);
        let mut state = genesis_state(16, spec);
        state.slot = 3;
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        let slashing = keys.proposer_slashing(&state, 7, 2, spec);
        state
            .process_proposer_slashings(&[slashing.clone()], &mut ctxt)
            .expect("valid slashing");
        assert!(state.validators[7].slashed);

        // A slashed proposer cannot be slashed again
        assert_eq!(
            state.process_proposer_slashings(&[slashing], &mut ctxt),
            Err(BlockProcessingError::ProposerSlashingInvalid {
                index: 0,
                reason: ProposerSlashingInvalid::NotSlashable(7)
            })
        );
    }

    #[test]
    fn test_different_slots() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(16);
        let state = genesis_state(16, spec);
        let mut cache = CommitteeCache::new();
        let ctxt = ConsensusContext::new(spec, &mut cache);

        let mut slashing = keys.proposer_slashing(&state, 4, 2, spec);
        slashing.signed_header_2.message.slot = 1;
        assert_eq!(
            state.verify_proposer_slashing(&slashing, &ctxt),
            Err(BlockOperationError::Invalid(
                ProposerSlashingInvalid::HeaderEpochMismatch {
                    slot_1: 2,
                    slot_2: 1
                }
            ))
        );
    }

    #[test]
    fn test_identical_headers() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(16);
        let state = genesis_state(16, spec);
        let mut cache = CommitteeCache::new();
        let ctxt = ConsensusContext::new(spec, &mut cache);

        let mut slashing = keys.proposer_slashing(&state, 4, 2, spec);
        slashing.signed_header_2 = slashing.signed_header_1.clone();
        assert_eq!(
            state.verify_proposer_slashing(&slashing, &ctxt),
            Err(BlockOperationError::Invalid(
                ProposerSlashingInvalid::IdenticalHeaders
            ))
        );
    }

    #[test]
    fn test_forged_second_header() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(16);
        let state = genesis_state(16, spec);
        let mut cache = CommitteeCache::new();
        let ctxt = ConsensusContext::new(spec, &mut cache);

        let mut slashing = keys.proposer_slashing(&state, 4, 2, spec);
        slashing.signed_header_2.signature = slashing.signed_header_1.signature.clone();
        assert_eq!(
            state.verify_proposer_slashing(&slashing, &ctxt),
            Err(BlockOperationError::Invalid(
                ProposerSlashingInvalid::InvalidSignature(2)
            ))
        );
    }

    #[test]
    fn test_one_bad_slashing_rejects_the_list() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(16);
        let mut state = genesis_state(16, spec);
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        let good = keys.proposer_slashing(&state, 4, 2, spec);
        let mut bad = keys.proposer_slashing(&state, 5, 2, spec);
        bad.proposer_index = 99;
        let before = state.clone();

        assert_eq!(
            state.process_proposer_slashings(&[good, bad], &mut ctxt),
            Err(BlockProcessingError::ProposerSlashingInvalid {
                index: 1,
                reason: ProposerSlashingInvalid::UnknownProposer(99)
            })
        );
        assert_eq!(state, before);
    }
}
