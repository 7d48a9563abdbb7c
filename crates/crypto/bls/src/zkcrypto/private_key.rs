use bls12_381::{G1Projective, Scalar};
use group::Curve;
use ssz_types::FixedVector;

use super::hash_to_g2;
use crate::{
    PrivateKey, PubKey,
    errors::BLSError,
    signature::BLSSignature,
    traits::{Signable, ZkcryptoSignable},
};

impl PrivateKey {
    fn scalar(&self) -> Result<Scalar, BLSError> {
        let bytes: [u8; 32] = self.inner.0;
        let scalar = Scalar::from_bytes(&bytes)
            .into_option()
            .ok_or(BLSError::InvalidPrivateKey)?;
        if scalar == Scalar::zero() {
            return Err(BLSError::InvalidPrivateKey);
        }
        Ok(scalar)
    }
}

impl Signable for PrivateKey {
    type Error = BLSError;

    fn sign(&self, message: &[u8]) -> Result<BLSSignature, Self::Error> {
        let signature_point = hash_to_g2(message) * self.scalar()?;
        Ok(BLSSignature {
            inner: FixedVector::new(signature_point.to_affine().to_compressed().to_vec())
                .map_err(|_| BLSError::InvalidSignature)?,
        })
    }

    fn public_key(&self) -> Result<PubKey, Self::Error> {
        Ok(PubKey::from(G1Projective::generator() * self.scalar()?))
    }
}

impl ZkcryptoSignable for PrivateKey {}
