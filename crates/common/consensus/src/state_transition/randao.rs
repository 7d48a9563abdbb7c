use alloy_primitives::B256;
use ethereum_hashing::hash;

use super::is_valid_signature;
use crate::{
    beacon_block::BeaconBlockBody,
    beacon_state::{BeaconState, ring_entry_mut},
    constants::DOMAIN_RANDAO,
    context::ConsensusContext,
    errors::{BlockOperationError, BlockProcessingError, RandaoInvalid},
    misc::{compute_signing_root, xor},
    verify,
};

impl BeaconState {
    pub fn process_randao(
        &mut self,
        body: &BeaconBlockBody,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockProcessingError> {
        let mix = self.verify_randao_reveal(body, ctxt)?;
        let epoch = self.get_current_epoch(ctxt.spec);
        *ring_entry_mut(
            &mut self.randao_mixes,
            "randao_mixes",
            epoch,
            ctxt.spec.epochs_per_historical_vector,
        )? = mix;
        Ok(())
    }

    /// Verify the RANDAO reveal and return the mix it produces for the current epoch.
    fn verify_randao_reveal(
        &self,
        body: &BeaconBlockBody,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<B256, BlockOperationError<RandaoInvalid>> {
        let spec = ctxt.spec;
        let epoch = self.get_current_epoch(spec);

        if ctxt.verify_signatures().is_true() {
            let proposer = self.validator(ctxt.beacon_proposer_index(self)?)?;
            let signing_root =
                compute_signing_root(epoch, self.get_domain(DOMAIN_RANDAO, Some(epoch), spec));
            verify!(
                is_valid_signature(&body.randao_reveal, &proposer.pubkey, signing_root),
                RandaoInvalid::InvalidRandaoSignature
            );
        }

        // Mix in RANDAO reveal
        Ok(xor(
            self.get_randao_mix(epoch, spec)?.as_slice(),
            hash(body.randao_reveal.to_bytes()).as_slice(),
        ))
    }
}
