use std::cmp::max;

use ethereum_hashing::hash;

use crate::{
    beacon_state::BeaconState,
    constants::{BLS_WITHDRAWAL_PREFIX, DOMAIN_TRANSFER, FAR_FUTURE_EPOCH},
    context::ConsensusContext,
    errors::{BlockOperationError, TransferInvalid},
    misc::compute_signing_root,
    state_transition::is_valid_signature,
    transfer::SignedTransfer,
    verify,
};

impl BeaconState {
    /// Move ``amount`` from sender to recipient and pay ``fee`` to the proposer.
    ///
    /// The dust check runs on the updated balances, so the transfer is applied to a copy of the
    /// state and kept only if it passes.
    pub fn process_transfer(
        &mut self,
        signed_transfer: &SignedTransfer,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockOperationError<TransferInvalid>> {
        self.verify_transfer(signed_transfer, ctxt)?;

        self.atomically(|state| -> Result<(), BlockOperationError<TransferInvalid>> {
            let transfer = &signed_transfer.message;
            let proposer_index = ctxt.beacon_proposer_index(state)?;

            // Process the transfer
            state.decrease_balance(transfer.sender, transfer.amount + transfer.fee)?;
            state.increase_balance(transfer.recipient, transfer.amount)?;
            state.increase_balance(proposer_index, transfer.fee)?;

            // Verify balances are not dust
            let min_deposit_amount = ctxt.spec.min_deposit_amount;
            for index in [transfer.sender, transfer.recipient] {
                let balance = state.balance(index)?;
                verify!(
                    !(0 < balance && balance < min_deposit_amount),
                    TransferInvalid::DustBalance
                );
            }
            Ok(())
        })
    }

    pub fn verify_transfer(
        &self,
        signed_transfer: &SignedTransfer,
        ctxt: &ConsensusContext<'_>,
    ) -> Result<(), BlockOperationError<TransferInvalid>> {
        let spec = ctxt.spec;
        let transfer = &signed_transfer.message;
        let sender = self.validator(transfer.sender).map_err(|_| {
            BlockOperationError::invalid(TransferInvalid::UnknownSender(transfer.sender))
        })?;
        verify!(
            (transfer.recipient as usize) < self.validators.len(),
            TransferInvalid::UnknownRecipient(transfer.recipient)
        );

        // Verify the balance covers amount and fee (with overflow protection)
        let balance = self.balance(transfer.sender)?;
        let insufficient = TransferInvalid::InsufficientBalance {
            balance,
            amount: transfer.amount,
            fee: transfer.fee,
        };
        verify!(balance >= max(transfer.amount, transfer.fee), insufficient.clone());
        let total = transfer
            .amount
            .checked_add(transfer.fee)
            .ok_or(BlockOperationError::invalid(insufficient.clone()))?;
        verify!(balance >= total, insufficient);

        // A transfer is valid in only one slot
        verify!(
            self.slot == transfer.slot,
            TransferInvalid::SlotMismatch {
                state_slot: self.slot,
                transfer_slot: transfer.slot,
            }
        );

        // Sender must be not yet eligible for activation, withdrawn, or transfer balance over
        // MAX_EFFECTIVE_BALANCE
        verify!(
            sender.activation_eligibility_epoch == FAR_FUTURE_EPOCH
                || self.get_current_epoch(spec) >= sender.withdrawable_epoch
                || total.saturating_add(spec.max_effective_balance) <= balance,
            TransferInvalid::SenderNotEligible(transfer.sender)
        );

        // Verify that the pubkey is valid
        let pubkey_hash = hash(transfer.pubkey.to_bytes());
        verify!(
            sender.withdrawal_credentials[0] == BLS_WITHDRAWAL_PREFIX
                && sender.withdrawal_credentials[1..] == pubkey_hash[1..],
            TransferInvalid::WithdrawalCredentialsMismatch
        );

        // Verify that the signature is valid
        if ctxt.verify_signatures().is_true() {
            let domain = self.get_domain(DOMAIN_TRANSFER, None, spec);
            verify!(
                is_valid_signature(
                    &signed_transfer.signature,
                    &transfer.pubkey,
                    compute_signing_root(transfer, domain),
                ),
                TransferInvalid::InvalidSignature
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keel_network_spec::networks::MINIMAL;
    use rstest::rstest;

    use super::*;
    use crate::{
        committee::CommitteeCache,
        errors::BlockProcessingError,
        test_utils::{ValidatorSetup, genesis_state},
    };

    const EXCESS: u64 = 3_000_000_000;

    /// A state where validator 0 holds ``EXCESS`` above the maximum effective balance.
    fn funded_state() -> BeaconState {
        let mut state = genesis_state(16, &MINIMAL);
        state.slot = 4;
        state.balances[0] += EXCESS;
        state
    }

    #[test]
    fn test_transfer_moves_amount_and_fee() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(16);
        let mut state = genesis_state(16, spec);
        state.slot = 4;
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        let proposer_index = ctxt.beacon_proposer_index(&state).expect("proposer");
        let sender = (proposer_index + 1) % 16;
        let recipient = (proposer_index + 2) % 16;
        state.balances[sender as usize] += EXCESS;
        let transfer = keys.sign_transfer(
            &state,
            keys.transfer(sender, recipient, 2_000_000_000, 1_000_000_000, 4)
                .message,
            spec,
        );
        let before = state.balances.clone();

        state
            .process_transfers(&[transfer], &mut ctxt)
            .expect("valid transfer");
        assert_eq!(
            state.balances[sender as usize],
            before[sender as usize] - 3_000_000_000
        );
        assert_eq!(
            state.balances[recipient as usize],
            before[recipient as usize] + 2_000_000_000
        );
        assert_eq!(
            state.balances[proposer_index as usize],
            before[proposer_index as usize] + 1_000_000_000
        );
    }

    #[rstest]
    #[case::amount_exceeds_balance(EXCESS + 40_000_000_000, 0)]
    #[case::fee_exceeds_balance(0, EXCESS + 40_000_000_000)]
    #[case::sum_overflows(u64::MAX, 1)]
    fn test_insufficient_balance(#[case] amount: u64, #[case] fee: u64) {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(16);
        let mut state = funded_state();
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        let transfer = keys.transfer(0, 1, amount, fee, 4);
        assert!(matches!(
            state.process_transfer(&transfer, &mut ctxt),
            Err(BlockOperationError::Invalid(
                TransferInvalid::InsufficientBalance { .. }
            ))
        ));
    }

    #[test]
    fn test_sender_must_have_excess_balance() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(16);
        let mut state = funded_state();
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        let transfer =
            keys.sign_transfer(&state, keys.transfer(0, 1, EXCESS, 1, 4).message, spec);
        assert_eq!(
            state.process_transfer(&transfer, &mut ctxt),
            Err(BlockOperationError::Invalid(
                TransferInvalid::SenderNotEligible(0)
            ))
        );
    }

    #[test]
    fn test_slot_and_credentials_checks() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(16);
        let mut state = funded_state();
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        let late = keys.transfer(0, 1, 1_000_000_000, 0, 5);
        assert_eq!(
            state.process_transfer(&late, &mut ctxt),
            Err(BlockOperationError::Invalid(TransferInvalid::SlotMismatch {
                state_slot: 4,
                transfer_slot: 5
            }))
        );

        let mut foreign_key = keys.transfer(0, 1, 1_000_000_000, 0, 4);
        foreign_key.message.pubkey = keys.pubkey(2).clone();
        assert_eq!(
            state.process_transfer(&foreign_key, &mut ctxt),
            Err(BlockOperationError::Invalid(
                TransferInvalid::WithdrawalCredentialsMismatch
            ))
        );

        let unsigned = keys.transfer(0, 1, 1_000_000_000, 0, 4);
        assert_eq!(
            state.process_transfer(&unsigned, &mut ctxt),
            Err(BlockOperationError::Invalid(TransferInvalid::InvalidSignature))
        );
    }

    #[test]
    fn test_dust_balance_leaves_state_unchanged() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(16);
        let mut state = funded_state();
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        // An unactivated sender may transfer everything but must not leave dust behind
        state.validators[0].activation_eligibility_epoch = FAR_FUTURE_EPOCH;
        let balance = state.balances[0];
        let transfer = keys.sign_transfer(
            &state,
            keys.transfer(0, 1, balance - 500_000_000, 0, 4).message,
            spec,
        );
        let before = state.clone();

        assert_eq!(
            state.process_transfer(&transfer, &mut ctxt),
            Err(BlockOperationError::Invalid(TransferInvalid::DustBalance))
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_duplicate_transfers_are_rejected() {
        let spec = &*MINIMAL;
        let keys = ValidatorSetup::new(16);
        let mut state = funded_state();
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(spec, &mut cache);

        let transfer = keys.sign_transfer(
            &state,
            keys.transfer(0, 1, 1_000_000_000, 0, 4).message,
            spec,
        );
        assert_eq!(
            state.process_transfers(&[transfer.clone(), transfer], &mut ctxt),
            Err(BlockProcessingError::DuplicateTransfer { index: 1 })
        );
    }
}
