use alloy_primitives::{B256, aliases::B32};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

#[derive(
    Debug, PartialEq, Clone, Copy, Serialize, Deserialize, Encode, Decode, TreeHash, Eq, Default,
)]
pub struct Fork {
    pub previous_version: B32,
    pub current_version: B32,
    #[serde(with = "serde_utils::quoted_u64")]
    pub epoch: u64,
}

impl Fork {
    /// A fork that has been in effect since genesis.
    pub fn genesis(version: B32) -> Self {
        Self {
            previous_version: version,
            current_version: version,
            epoch: 0,
        }
    }

    /// Return the fork version in effect at ``epoch``.
    pub fn version_at(&self, epoch: u64) -> B32 {
        if epoch < self.epoch {
            self.previous_version
        } else {
            self.current_version
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct ForkData {
    pub current_version: B32,
    pub genesis_validators_root: B256,
}

impl ForkData {
    pub fn compute_fork_data_root(&self) -> B256 {
        self.tree_hash_root()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::fixed_bytes;

    use super::*;

    #[test]
    fn test_version_at_fork_boundary() {
        let fork = Fork {
            previous_version: fixed_bytes!("0x00000000"),
            current_version: fixed_bytes!("0x00000001"),
            epoch: 10,
        };
        assert_eq!(fork.version_at(9), fork.previous_version);
        assert_eq!(fork.version_at(10), fork.current_version);
        assert_eq!(fork.version_at(11), fork.current_version);
    }
}
