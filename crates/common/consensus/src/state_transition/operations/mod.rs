//! Block operations.
//!
//! Every operation kind has a single-operation processor that checks everything before it
//! mutates the state, and a list processor that applies a whole list from a block body in order.
//! The public list processors are all-or-nothing: on error the state is unchanged.

mod attestation;
mod attester_slashing;
mod deposit;
mod proposer_slashing;
mod transfer;
mod voluntary_exit;

use std::cmp::min;

pub use attester_slashing::is_slashable_attestation_data;
pub use deposit::is_valid_deposit_signature;
use tracing::trace;

use crate::{
    attestation::Attestation,
    attester_slashing::AttesterSlashing,
    beacon_block::BeaconBlockBody,
    beacon_state::BeaconState,
    context::ConsensusContext,
    deposit::Deposit,
    errors::{BlockProcessingError, IntoWithIndex},
    proposer_slashing::ProposerSlashing,
    transfer::SignedTransfer,
    voluntary_exit::SignedVoluntaryExit,
};

fn check_operation_count(
    operation: &'static str,
    found: usize,
    max: u64,
) -> Result<(), BlockProcessingError> {
    if found as u64 > max {
        return Err(BlockProcessingError::TooManyOperations {
            operation,
            found,
            max,
        });
    }
    Ok(())
}

macro_rules! list_processors {
    ($($(#[$doc:meta])* $public:ident, $apply:ident, $single:ident, $operation:ty, $kind:literal;)*) => {
        impl BeaconState {
            $(
                $(#[$doc])*
                pub fn $public(
                    &mut self,
                    operations: &[$operation],
                    ctxt: &mut ConsensusContext<'_>,
                ) -> Result<(), BlockProcessingError> {
                    self.atomically(|state| state.$apply(operations, ctxt))
                }

                fn $apply(
                    &mut self,
                    operations: &[$operation],
                    ctxt: &mut ConsensusContext<'_>,
                ) -> Result<(), BlockProcessingError> {
                    if !operations.is_empty() {
                        trace!(count = operations.len(), operation = $kind, "Processing operations");
                    }
                    for (index, operation) in operations.iter().enumerate() {
                        self.$single(operation, ctxt)
                            .map_err(|err| err.into_with_index(index))?;
                    }
                    Ok(())
                }
            )*
        }
    };
}

list_processors! {
    process_proposer_slashings, apply_proposer_slashings, process_proposer_slashing,
        ProposerSlashing, "proposer slashings";
    process_attester_slashings, apply_attester_slashings, process_attester_slashing,
        AttesterSlashing, "attester slashings";
    process_attestations, apply_attestations, process_attestation,
        Attestation, "attestations";
    /// Deposits must arrive in order; each one advances ``eth1_deposit_index``.
    process_deposits, apply_deposits, process_deposit,
        Deposit, "deposits";
    process_voluntary_exits, apply_voluntary_exits, process_voluntary_exit,
        SignedVoluntaryExit, "voluntary exits";
}

impl BeaconState {
    /// Apply every operation in ``body``, or none of them.
    pub fn process_operations(
        &mut self,
        body: &BeaconBlockBody,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockProcessingError> {
        self.atomically(|state| state.apply_operations(body, ctxt))
    }

    pub(crate) fn apply_operations(
        &mut self,
        body: &BeaconBlockBody,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockProcessingError> {
        let spec = ctxt.spec;
        check_operation_count(
            "proposer slashings",
            body.proposer_slashings.len(),
            spec.max_proposer_slashings,
        )?;
        check_operation_count(
            "attester slashings",
            body.attester_slashings.len(),
            spec.max_attester_slashings,
        )?;
        check_operation_count(
            "attestations",
            body.attestations.len(),
            spec.max_attestations,
        )?;
        check_operation_count("deposits", body.deposits.len(), spec.max_deposits)?;
        check_operation_count(
            "voluntary exits",
            body.voluntary_exits.len(),
            spec.max_voluntary_exits,
        )?;
        check_operation_count("transfers", body.transfers.len(), spec.max_transfers)?;

        // Verify that outstanding deposits are processed up to the maximum number of deposits
        let expected_deposits = min(
            spec.max_deposits,
            self.eth1_data
                .deposit_count
                .saturating_sub(self.eth1_deposit_index),
        );
        if body.deposits.len() as u64 != expected_deposits {
            return Err(BlockProcessingError::DepositCountMismatch {
                expected: expected_deposits,
                found: body.deposits.len(),
            });
        }

        self.apply_proposer_slashings(&body.proposer_slashings, ctxt)?;
        self.apply_attester_slashings(&body.attester_slashings, ctxt)?;
        self.apply_attestations(&body.attestations, ctxt)?;
        self.apply_deposits(&body.deposits, ctxt)?;
        self.apply_voluntary_exits(&body.voluntary_exits, ctxt)?;
        self.apply_transfers(&body.transfers, ctxt)
    }

    pub fn process_transfers(
        &mut self,
        transfers: &[SignedTransfer],
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockProcessingError> {
        self.atomically(|state| state.apply_transfers(transfers, ctxt))
    }

    fn apply_transfers(
        &mut self,
        transfers: &[SignedTransfer],
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockProcessingError> {
        if let Some(index) = (0..transfers.len())
            .find(|&index| transfers[..index].contains(&transfers[index]))
        {
            return Err(BlockProcessingError::DuplicateTransfer { index });
        }

        if !transfers.is_empty() {
            trace!(count = transfers.len(), operation = "transfers", "Processing operations");
        }
        for (index, transfer) in transfers.iter().enumerate() {
            self.process_transfer(transfer, ctxt)
                .map_err(|err| err.into_with_index(index))?;
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
        context::VerifySignatures,
        eth_1_data::Eth1Data,
        test_utils::{ValidatorSetup, deposits_for, genesis_state},
    };

    #[test]
    fn test_too_many_operations() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(16);
        let mut state = genesis_state(16, spec);
        let mut cache = CommitteeCache::new();
        let mut ctxt =
            ConsensusContext::new(spec, &mut cache).set_verify_signatures(VerifySignatures::False);

        let mut body = BeaconBlockBody::default();
        body.transfers = vec![keys.transfer(0, 1, 1, 0, 0)].into();

        assert_eq!(
            state.process_operations(&body, &mut ctxt),
            Err(BlockProcessingError::TooManyOperations {
                operation: "transfers",
                found: 1,
                max: 0
            })
        );
    }

    #[test]
    fn test_deposit_count_must_match_outstanding() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(20);
        let mut state = genesis_state(16, spec);
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        let (deposits, eth1_data): (_, Eth1Data) = deposits_for(&keys, 16..20, spec);
        state.eth1_data = eth1_data;
        let mut body = BeaconBlockBody::default();
        body.deposits = deposits[..3].to_vec().into();
        let before = state.clone();

        assert_eq!(
            state.process_operations(&body, &mut ctxt),
            Err(BlockProcessingError::DepositCountMismatch {
                expected: 4,
                found: 3
            })
        );
        assert_eq!(state, before);

        body.deposits = deposits.into();
        state.process_operations(&body, &mut ctxt).expect("all deposits");
        assert_eq!(state.eth1_deposit_index, 4);
        assert_eq!(state.validators.len(), 20);
    }
}
