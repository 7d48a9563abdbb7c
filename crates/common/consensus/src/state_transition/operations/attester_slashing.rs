use itertools::Itertools;

use crate::{
    attestation_data::AttestationData,
    attester_slashing::AttesterSlashing,
    beacon_state::BeaconState,
    context::ConsensusContext,
    errors::{AttesterSlashingInvalid, BlockOperationError},
    verify,
};

/// Check if ``data_1`` and ``data_2`` are slashable according to Casper FFG rules.
pub fn is_slashable_attestation_data(data_1: &AttestationData, data_2: &AttestationData) -> bool {
    // Double vote
    (data_1 != data_2 && data_1.target.epoch == data_2.target.epoch) ||
    // Surround vote
    (data_1.source.epoch < data_2.source.epoch && data_2.target.epoch < data_1.target.epoch)
}

impl BeaconState {
    pub fn process_attester_slashing(
        &mut self,
        attester_slashing: &AttesterSlashing,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockOperationError<AttesterSlashingInvalid>> {
        let slashable_indices = self.get_slashable_indices(attester_slashing, ctxt)?;
        for index in slashable_indices {
            self.slash_validator(index, None, ctxt)?;
        }
        Ok(())
    }

    /// Verify ``attester_slashing`` and return the indices it slashes, ascending.
    ///
    /// Attesters in both attestations that are no longer slashable are skipped, so the result
    /// may be empty.
    pub fn get_slashable_indices(
        &self,
        attester_slashing: &AttesterSlashing,
        ctxt: &ConsensusContext<'_>,
    ) -> Result<Vec<u64>, BlockOperationError<AttesterSlashingInvalid>> {
        let attestation_1 = &attester_slashing.attestation_1;
        let attestation_2 = &attester_slashing.attestation_2;

        // Ensure the two attestations are slashable
        verify!(
            is_slashable_attestation_data(&attestation_1.data, &attestation_2.data),
            AttesterSlashingInvalid::NotSlashable
        );

        // Validate both attestations
        self.verify_indexed_attestation(attestation_1, ctxt)
            .map_err(|err| err.map_invalid(AttesterSlashingInvalid::IndexedAttestation1))?;
        self.verify_indexed_attestation(attestation_2, ctxt)
            .map_err(|err| err.map_invalid(AttesterSlashingInvalid::IndexedAttestation2))?;

        let indices_2 = attestation_2.attesting_indices();
        let intersection = attestation_1
            .attesting_indices()
            .into_iter()
            .filter(|index| indices_2.binary_search(index).is_ok())
            .collect_vec();
        verify!(
            !intersection.is_empty(),
            AttesterSlashingInvalid::EmptyIntersection
        );

        let current_epoch = self.get_current_epoch(ctxt.spec);
        let mut slashable_indices = vec![];
        for index in intersection {
            if self.validator(index)?.is_slashable_validator(current_epoch) {
                slashable_indices.push(index);
            }
        }
        Ok(slashable_indices)
    }
}
