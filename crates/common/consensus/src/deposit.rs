use alloy_primitives::B256;
use keel_bls::{BLSSignature, PubKey};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::FixedVector;
use tree_hash_derive::TreeHash;

use crate::constants::DepositProofLength;

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Deposit {
    /// Merkle path to the deposit root, plus the mixed in deposit count
    pub proof: FixedVector<B256, DepositProofLength>,
    pub data: DepositData,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct DepositData {
    pub pubkey: PubKey,
    pub withdrawal_credentials: B256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub amount: u64,
    pub signature: BLSSignature,
}

/// The signed part of a [`DepositData`].
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct DepositMessage {
    pub pubkey: PubKey,
    pub withdrawal_credentials: B256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub amount: u64,
}

impl From<&DepositData> for DepositMessage {
    fn from(data: &DepositData) -> Self {
        Self {
            pubkey: data.pubkey.clone(),
            withdrawal_credentials: data.withdrawal_credentials,
            amount: data.amount,
        }
    }
}
