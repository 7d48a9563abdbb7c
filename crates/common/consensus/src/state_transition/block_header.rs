use tree_hash::TreeHash;

use super::is_valid_signature;
use crate::{
    beacon_block::SignedBeaconBlock,
    beacon_block_header::BeaconBlockHeader,
    beacon_state::BeaconState,
    constants::DOMAIN_BEACON_PROPOSER,
    context::ConsensusContext,
    errors::{BlockOperationError, BlockProcessingError, HeaderInvalid},
    misc::compute_signing_root,
    verify,
};

impl BeaconState {
    pub fn process_block_header(
        &mut self,
        signed_block: &SignedBeaconBlock,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockProcessingError> {
        let header = self.verify_block_header(signed_block, ctxt)?;
        // Cache current block as the new latest block
        self.latest_block_header = header;
        Ok(())
    }

    /// Check ``signed_block`` against the state and return the header that replaces
    /// ``latest_block_header``.
    fn verify_block_header(
        &self,
        signed_block: &SignedBeaconBlock,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<BeaconBlockHeader, BlockOperationError<HeaderInvalid>> {
        let block = &signed_block.message;

        // Verify that the slots match
        verify!(
            block.slot == self.slot,
            HeaderInvalid::SlotMismatch {
                state_slot: self.slot,
                block_slot: block.slot,
            }
        );

        // Verify that the parent matches
        let expected_parent_root = self.latest_block_header.tree_hash_root();
        verify!(
            block.parent_root == expected_parent_root,
            HeaderInvalid::ParentRootMismatch {
                expected: expected_parent_root,
                found: block.parent_root,
            }
        );

        // Verify proposer is not slashed
        let proposer_index = ctxt.beacon_proposer_index(self)?;
        let proposer = self.validator(proposer_index)?;
        verify!(
            !proposer.slashed,
            HeaderInvalid::ProposerSlashed(proposer_index)
        );

        if ctxt.verify_signatures().is_true() {
            let domain = self.get_domain(DOMAIN_BEACON_PROPOSER, None, ctxt.spec);
            verify!(
                is_valid_signature(
                    &signed_block.signature,
                    &proposer.pubkey,
                    compute_signing_root(block, domain),
                ),
                HeaderInvalid::InvalidSignature
            );
        }

        Ok(BeaconBlockHeader {
            slot: block.slot,
            parent_root: block.parent_root,
            // Overwritten in the next process_slot call
            state_root: alloy_primitives::B256::ZERO,
            body_root: block.body.tree_hash_root(),
        })
    }
}
