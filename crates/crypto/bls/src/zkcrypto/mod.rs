pub mod aggregate_pubkey;
pub mod private_key;
pub mod pubkey;
pub mod signature;

use bls12_381::{
    G2Affine, G2Projective,
    hash_to_curve::{ExpandMsgXmd, HashToCurve},
};

use crate::constants::DST;

pub(crate) fn hash_to_g2(message: &[u8]) -> G2Projective {
    <G2Projective as HashToCurve<ExpandMsgXmd<sha2::Sha256>>>::hash_to_curve([message], DST)
}

pub(crate) fn hash_to_g2_affine(message: &[u8]) -> G2Affine {
    G2Affine::from(hash_to_g2(message))
}
