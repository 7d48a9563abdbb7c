//! Per-block processing.
//!
//! [`BeaconState::process_block`] is the entry point. It applies the header, randao, eth1 data
//! and operations of a block in that order, and leaves the state untouched when any of them
//! fails.

mod block_header;
mod eth1_data;
pub mod operations;
mod randao;

use alloy_primitives::B256;
use keel_bls::{BLSSignature, PubKey, traits::Verifiable};
use tracing::{debug, warn};

use crate::{
    beacon_block::SignedBeaconBlock, beacon_state::BeaconState, context::ConsensusContext,
    errors::BlockProcessingError,
};

/// Whether ``signature`` is a valid signature of ``signing_root`` by ``pubkey``. Malformed
/// points count as invalid.
pub(crate) fn is_valid_signature(
    signature: &BLSSignature,
    pubkey: &PubKey,
    signing_root: B256,
) -> bool {
    signature
        .verify(pubkey, signing_root.as_slice())
        .unwrap_or(false)
}

impl BeaconState {
    /// Apply ``signed_block`` to the state.
    ///
    /// The state is left exactly as it was when the block is rejected.
    pub fn process_block(
        &mut self,
        signed_block: &SignedBeaconBlock,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockProcessingError> {
        let block = &signed_block.message;
        let body = &block.body;
        debug!(
            slot = block.slot,
            proposer_slashings = body.proposer_slashings.len(),
            attester_slashings = body.attester_slashings.len(),
            attestations = body.attestations.len(),
            deposits = body.deposits.len(),
            voluntary_exits = body.voluntary_exits.len(),
            transfers = body.transfers.len(),
            "Processing block"
        );

        let result = self.atomically(|state| {
            state.validate_shape(ctxt.spec)?;
            state.process_block_header(signed_block, ctxt)?;
            state.process_randao(body, ctxt)?;
            state.process_eth1_data(body, ctxt)?;
            state.apply_operations(body, ctxt)
        });

        match &result {
            Ok(()) => debug!(slot = block.slot, "Processed block"),
            Err(err) => warn!(slot = block.slot, error = %err, "Rejected block"),
        }
        result
    }
}
