use alloy_primitives::B256;
use keel_bls::PubKey;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

use crate::constants::FAR_FUTURE_EPOCH;

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Validator {
    pub pubkey: PubKey,

    /// Commitment to pubkey for withdrawals
    pub withdrawal_credentials: B256,

    /// Balance at stake
    #[serde(with = "serde_utils::quoted_u64")]
    pub effective_balance: u64,
    pub slashed: bool,

    /// When criteria for activation were met
    #[serde(with = "serde_utils::quoted_u64")]
    pub activation_eligibility_epoch: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub activation_epoch: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub exit_epoch: u64,

    /// When validator can withdraw funds
    #[serde(with = "serde_utils::quoted_u64")]
    pub withdrawable_epoch: u64,
}

impl Validator {
    /// A freshly deposited validator: nothing scheduled yet.
    pub fn new(pubkey: PubKey, withdrawal_credentials: B256, effective_balance: u64) -> Self {
        Self {
            pubkey,
            withdrawal_credentials,
            effective_balance,
            slashed: false,
            activation_eligibility_epoch: FAR_FUTURE_EPOCH,
            activation_epoch: FAR_FUTURE_EPOCH,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
        }
    }

    /// Check if ``validator`` is active.
    pub fn is_active_validator(&self, epoch: u64) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    /// Check if ``validator`` is slashable.
    pub fn is_slashable_validator(&self, epoch: u64) -> bool {
        !self.slashed && self.activation_epoch <= epoch && epoch < self.withdrawable_epoch
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn validator(activation_epoch: u64, exit_epoch: u64, withdrawable_epoch: u64) -> Validator {
        Validator {
            activation_epoch,
            exit_epoch,
            withdrawable_epoch,
            ..Validator::new(PubKey::default(), B256::ZERO, 32_000_000_000)
        }
    }

    #[rstest]
    #[case(validator(0, FAR_FUTURE_EPOCH, FAR_FUTURE_EPOCH), 5, true, true)]
    #[case(validator(6, FAR_FUTURE_EPOCH, FAR_FUTURE_EPOCH), 5, false, false)]
    #[case(validator(0, 5, 10), 5, false, true)]
    #[case(validator(0, 5, 10), 10, false, false)]
    fn test_activity_and_slashability(
        #[case] validator: Validator,
        #[case] epoch: u64,
        #[case] active: bool,
        #[case] slashable: bool,
    ) {
        assert_eq!(validator.is_active_validator(epoch), active);
        assert_eq!(validator.is_slashable_validator(epoch), slashable);
    }

    #[test]
    fn test_slashed_is_not_slashable() {
        let mut validator = validator(0, FAR_FUTURE_EPOCH, FAR_FUTURE_EPOCH);
        validator.slashed = true;
        assert!(validator.is_active_validator(3));
        assert!(!validator.is_slashable_validator(3));
    }
}
