use bls12_381::{G1Affine, G1Projective};
use ssz_types::FixedVector;

use crate::{PubKey, errors::BLSError};

impl From<G1Projective> for PubKey {
    fn from(value: G1Projective) -> Self {
        Self {
            inner: FixedVector::from(G1Affine::from(value).to_compressed().to_vec()),
        }
    }
}

impl TryFrom<&PubKey> for G1Affine {
    type Error = BLSError;

    fn try_from(value: &PubKey) -> Result<Self, Self::Error> {
        let bytes: [u8; 48] = value
            .to_bytes()
            .try_into()
            .map_err(|_| BLSError::InvalidByteLength)?;
        let point = G1Affine::from_compressed(&bytes)
            .into_option()
            .ok_or(BLSError::InvalidPublicKey)?;
        if bool::from(point.is_identity()) {
            return Err(BLSError::InvalidPublicKey);
        }
        Ok(point)
    }
}
