use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// A link from the beacon chain to a span of epochs of one shard's data.
#[derive(
    Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash, Hash, Default,
)]
pub struct Crosslink {
    #[serde(with = "serde_utils::quoted_u64")]
    pub shard: u64,
    pub parent_root: B256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub start_epoch: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub end_epoch: u64,
    pub data_root: B256,
}
