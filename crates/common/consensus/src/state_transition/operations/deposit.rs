use alloy_primitives::B256;
use keel_bls::PubKey;
use keel_merkle::is_valid_merkle_branch;
use keel_network_spec::networks::BeaconNetworkSpec;
use tracing::warn;
use tree_hash::TreeHash;

use crate::{
    beacon_state::BeaconState,
    constants::{DEPOSIT_CONTRACT_TREE_DEPTH, DOMAIN_DEPOSIT},
    context::ConsensusContext,
    deposit::{Deposit, DepositData, DepositMessage},
    errors::{BeaconStateError, BlockOperationError, DepositInvalid},
    misc::{compute_domain, compute_signing_root},
    state_transition::is_valid_signature,
    verify,
};

/// Whether ``deposit_data`` carries a valid proof of possession for its pubkey.
///
/// Deposits are signed under the genesis fork version, so the domain does not depend on the
/// state they are processed against.
pub fn is_valid_deposit_signature(deposit_data: &DepositData, spec: &BeaconNetworkSpec) -> bool {
    let domain = compute_domain(DOMAIN_DEPOSIT, spec.genesis_fork_version, B256::ZERO);
    let signing_root = compute_signing_root(DepositMessage::from(deposit_data), domain);
    is_valid_signature(&deposit_data.signature, &deposit_data.pubkey, signing_root)
}

impl BeaconState {
    pub fn process_deposit(
        &mut self,
        deposit: &Deposit,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockOperationError<DepositInvalid>> {
        // Verify the Merkle branch
        verify!(
            is_valid_merkle_branch(
                deposit.data.tree_hash_root(),
                &deposit.proof,
                // Add 1 for the List length mix-in
                DEPOSIT_CONTRACT_TREE_DEPTH + 1,
                self.eth1_deposit_index,
                self.eth1_data.deposit_root,
            ),
            DepositInvalid::MerkleProofInvalid
        );

        // Deposits must be processed in order
        let deposit_index = self.eth1_deposit_index;
        self.eth1_deposit_index = deposit_index
            .checked_add(1)
            .ok_or(BeaconStateError::ArithmeticOverflow)?;

        self.apply_deposit(deposit_index, &deposit.data, ctxt.spec)?;
        Ok(())
    }

    fn apply_deposit(
        &mut self,
        deposit_index: u64,
        deposit_data: &DepositData,
        spec: &BeaconNetworkSpec,
    ) -> Result<(), BeaconStateError> {
        let pubkey = &deposit_data.pubkey;
        match self.validator_index_of(pubkey) {
            // Increase balance by deposit amount
            Some(index) => self.increase_balance(index, deposit_data.amount),
            None => {
                // Verify the deposit signature (proof of possession) which is not checked by
                // the deposit contract
                if !is_valid_deposit_signature(deposit_data, spec) {
                    warn!(
                        deposit_index,
                        pubkey = ?pubkey,
                        "Skipping deposit with invalid signature"
                    );
                    return Ok(());
                }
                self.add_validator_to_registry(
                    pubkey.clone(),
                    deposit_data.withdrawal_credentials,
                    deposit_data.amount,
                    spec,
                )
            }
        }
    }

    fn validator_index_of(&self, pubkey: &PubKey) -> Option<u64> {
        self.validators
            .iter()
            .position(|validator| validator.pubkey == *pubkey)
            .map(|index| index as u64)
    }
}
