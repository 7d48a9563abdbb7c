use keel_bls::{BLSSignature, PubKey};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct SignedTransfer {
    pub message: Transfer,
    pub signature: BLSSignature,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Transfer {
    #[serde(with = "serde_utils::quoted_u64")]
    pub sender: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub recipient: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub amount: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub fee: u64,
    /// Inclusion slot
    #[serde(with = "serde_utils::quoted_u64")]
    pub slot: u64,
    /// Withdrawal pubkey
    pub pubkey: PubKey,
}
