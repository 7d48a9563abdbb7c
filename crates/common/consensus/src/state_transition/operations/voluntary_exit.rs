use crate::{
    beacon_state::BeaconState,
    constants::{DOMAIN_VOLUNTARY_EXIT, FAR_FUTURE_EPOCH},
    context::ConsensusContext,
    errors::{BlockOperationError, ExitInvalid},
    misc::compute_signing_root,
    state_transition::is_valid_signature,
    verify,
    voluntary_exit::SignedVoluntaryExit,
};

impl BeaconState {
    pub fn process_voluntary_exit(
        &mut self,
        signed_voluntary_exit: &SignedVoluntaryExit,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockOperationError<ExitInvalid>> {
        self.verify_voluntary_exit(signed_voluntary_exit, ctxt)?;

        // Initiate exit
        self.initiate_validator_exit(signed_voluntary_exit.message.validator_index, ctxt.spec)?;
        Ok(())
    }

    pub fn verify_voluntary_exit(
        &self,
        signed_voluntary_exit: &SignedVoluntaryExit,
        ctxt: &ConsensusContext<'_>,
    ) -> Result<(), BlockOperationError<ExitInvalid>> {
        let spec = ctxt.spec;
        let voluntary_exit = &signed_voluntary_exit.message;
        let validator_index = voluntary_exit.validator_index;
        let validator = self.validator(validator_index).map_err(|_| {
            BlockOperationError::invalid(ExitInvalid::UnknownValidator(validator_index))
        })?;
        let current_epoch = self.get_current_epoch(spec);

        // Verify the validator is active and has not initiated an exit
        verify!(
            validator.is_active_validator(current_epoch) && validator.exit_epoch == FAR_FUTURE_EPOCH,
            ExitInvalid::NotActive(validator_index)
        );

        // Exits must specify an epoch when they become valid; they are not valid before then
        verify!(
            current_epoch >= voluntary_exit.epoch,
            ExitInvalid::ExitEpochInFuture {
                current_epoch,
                exit_epoch: voluntary_exit.epoch,
            }
        );

        // Verify the validator has been active long enough
        let earliest_exit_epoch = validator
            .activation_epoch
            .saturating_add(spec.persistent_committee_period);
        verify!(
            current_epoch >= earliest_exit_epoch,
            ExitInvalid::NotActiveLongEnough {
                current_epoch,
                earliest_exit_epoch,
            }
        );

        // Verify signature
        if ctxt.verify_signatures().is_true() {
            let domain = self.get_domain(DOMAIN_VOLUNTARY_EXIT, Some(voluntary_exit.epoch), spec);
            verify!(
                is_valid_signature(
                    &signed_voluntary_exit.signature,
                    &validator.pubkey,
                    compute_signing_root(voluntary_exit, domain),
                ),
                ExitInvalid::InvalidSignature
            );
        }

        Ok(())
    }
}
