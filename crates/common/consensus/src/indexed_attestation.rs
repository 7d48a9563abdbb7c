use keel_bls::BLSSignature;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{VariableList, serde_utils::quoted_u64_var_list};
use tree_hash_derive::TreeHash;

use crate::{attestation_data::AttestationData, constants::MaxValidatorsPerCommittee};

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct IndexedAttestation {
    /// Indices with custody bit equal to 0
    #[serde(with = "quoted_u64_var_list")]
    pub custody_bit_0_indices: VariableList<u64, MaxValidatorsPerCommittee>,
    /// Indices with custody bit equal to 1
    #[serde(with = "quoted_u64_var_list")]
    pub custody_bit_1_indices: VariableList<u64, MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: BLSSignature,
}

impl IndexedAttestation {
    /// Every attesting index, ascending, across both custody bit sets.
    pub fn attesting_indices(&self) -> Vec<u64> {
        let mut indices: Vec<u64> = self
            .custody_bit_0_indices
            .iter()
            .chain(self.custody_bit_1_indices.iter())
            .copied()
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
