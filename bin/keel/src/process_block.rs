use anyhow::anyhow;
use keel_consensus::{
    beacon_block::SignedBeaconBlock,
    beacon_state::BeaconState,
    committee::CommitteeCache,
    context::{ConsensusContext, VerifySignatures},
};
use tracing::info;
use tree_hash::TreeHash;

use crate::{
    cli::process_block::ProcessBlockConfig,
    ssz_snappy::{read_ssz_snappy, write_ssz_snappy},
};

pub fn run_process_block(config: &ProcessBlockConfig) -> anyhow::Result<()> {
    let mut state: BeaconState = read_ssz_snappy(&config.pre)?;
    let block: SignedBeaconBlock = read_ssz_snappy(&config.block)?;
    info!(
        network = ?config.network.network,
        state_slot = state.slot,
        block_slot = block.message.slot,
        "Loaded pre-state and block"
    );

    let verify_signatures = if config.no_verify_signatures {
        VerifySignatures::False
    } else {
        VerifySignatures::True
    };
    let mut committees = CommitteeCache::new();
    let mut ctxt = ConsensusContext::new(&config.network, &mut committees)
        .set_verify_signatures(verify_signatures);
    state
        .process_block(&block, &mut ctxt)
        .map_err(|err| anyhow!("Block at slot {} is invalid: {err}", block.message.slot))?;

    write_ssz_snappy(&config.output, &state)?;
    info!(
        state_root = %state.tree_hash_root(),
        output = %config.output.display(),
        "Wrote post-state"
    );
    Ok(())
}
