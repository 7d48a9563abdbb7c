use bls12_381::{G1Affine, G2Affine, G2Projective, Gt, pairing};
use group::Curve;
use ssz_types::FixedVector;

use super::hash_to_g2_affine;
use crate::{
    AggregatePubKey, BLSSignature, PubKey,
    errors::BLSError,
    traits::{Aggregatable, Verifiable, ZkcryptoAggregatable, ZkcryptoVerifiable},
};

impl TryFrom<&BLSSignature> for G2Affine {
    type Error = BLSError;

    fn try_from(value: &BLSSignature) -> Result<Self, Self::Error> {
        let bytes: [u8; 96] = value
            .to_bytes()
            .try_into()
            .map_err(|_| BLSError::InvalidByteLength)?;
        G2Affine::from_compressed(&bytes)
            .into_option()
            .ok_or(BLSError::InvalidSignature)
    }
}

impl Aggregatable<BLSSignature> for BLSSignature {
    type Error = BLSError;

    fn aggregate(signatures: &[&BLSSignature]) -> Result<Self, Self::Error> {
        if signatures.is_empty() {
            return Err(BLSError::InvalidSignature);
        }

        let agg_point = signatures
            .iter()
            .try_fold(G2Projective::identity(), |acc, signature| {
                let point = G2Affine::try_from(*signature)?;
                Ok::<_, BLSError>(acc + G2Projective::from(point))
            })?;

        Ok(Self {
            inner: FixedVector::new(agg_point.to_affine().to_compressed().to_vec())
                .map_err(|_| BLSError::InvalidByteLength)?,
        })
    }
}

impl ZkcryptoAggregatable<BLSSignature> for BLSSignature {}

impl Verifiable for BLSSignature {
    type Error = BLSError;

    fn verify(&self, pubkey: &PubKey, message: &[u8]) -> Result<bool, BLSError> {
        let gt1 = pairing(&G1Affine::try_from(pubkey)?, &hash_to_g2_affine(message));
        let gt2 = pairing(&G1Affine::generator(), &G2Affine::try_from(self)?);

        Ok(gt1 == gt2)
    }

    fn fast_aggregate_verify<'a, P>(&self, pubkeys: P, message: &[u8]) -> Result<bool, BLSError>
    where
        P: AsRef<[&'a PubKey]>,
    {
        let agg_pubkey = AggregatePubKey::aggregate(pubkeys.as_ref())?;
        self.verify(&agg_pubkey.to_pubkey(), message)
    }

    fn verify_multiple(&self, pubkeys: &[&PubKey], messages: &[&[u8]]) -> Result<bool, BLSError> {
        if pubkeys.len() != messages.len() || pubkeys.is_empty() {
            return Err(BLSError::MessageCountMismatch {
                pubkeys: pubkeys.len(),
                messages: messages.len(),
            });
        }

        let gt1 = pubkeys.iter().zip(messages.iter()).try_fold(
            Gt::identity(),
            |acc, (pubkey, message)| {
                Ok::<_, BLSError>(
                    acc + pairing(&G1Affine::try_from(*pubkey)?, &hash_to_g2_affine(message)),
                )
            },
        )?;
        let gt2 = pairing(&G1Affine::generator(), &G2Affine::try_from(self)?);

        Ok(gt1 == gt2)
    }
}

impl ZkcryptoVerifiable for BLSSignature {}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;
    use rstest::rstest;

    use super::*;
    use crate::{PrivateKey, traits::Signable};

    fn private_key(seed: u8) -> PrivateKey {
        let mut bytes = [0u8; 32];
        bytes[0] = seed;
        PrivateKey {
            inner: B256::from(bytes),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let key = private_key(7);
        let message = b"beacon block";
        let signature = key.sign(message).expect("sign");
        let pubkey = key.public_key().expect("pubkey");

        assert_eq!(signature.verify(&pubkey, message), Ok(true));
        assert_eq!(signature.verify(&pubkey, b"other block"), Ok(false));
    }

    #[test]
    fn test_fast_aggregate_verify() {
        let message = b"attestation";
        let keys: Vec<PrivateKey> = (1..=3).map(private_key).collect();
        let pubkeys: Vec<PubKey> = keys
            .iter()
            .map(|key| key.public_key().expect("pubkey"))
            .collect();
        let signatures: Vec<BLSSignature> = keys
            .iter()
            .map(|key| key.sign(message).expect("sign"))
            .collect();
        let signature =
            BLSSignature::aggregate(&signatures.iter().collect::<Vec<_>>()).expect("aggregate");

        let refs: Vec<&PubKey> = pubkeys.iter().collect();
        assert_eq!(signature.fast_aggregate_verify(&refs, message), Ok(true));
        assert_eq!(signature.fast_aggregate_verify(&refs[..2], message), Ok(false));
    }

    #[rstest]
    #[case::both_messages(true)]
    #[case::swapped_messages(false)]
    fn test_verify_multiple(#[case] in_order: bool) {
        let (key_0, key_1) = (private_key(11), private_key(12));
        let (message_0, message_1) = (b"custody bit 0".as_slice(), b"custody bit 1".as_slice());
        let signature = BLSSignature::aggregate(&[
            &key_0.sign(message_0).expect("sign"),
            &key_1.sign(message_1).expect("sign"),
        ])
        .expect("aggregate");
        let pubkey_0 = key_0.public_key().expect("pubkey");
        let pubkey_1 = key_1.public_key().expect("pubkey");

        let messages = if in_order {
            [message_0, message_1]
        } else {
            [message_1, message_0]
        };
        assert_eq!(
            signature.verify_multiple(&[&pubkey_0, &pubkey_1], &messages),
            Ok(in_order)
        );
    }

    #[test]
    fn test_malformed_points_are_errors() {
        let signature = BLSSignature::default();
        let pubkey = private_key(3).public_key().expect("pubkey");
        assert_eq!(
            signature.verify(&pubkey, b"message"),
            Err(BLSError::InvalidSignature)
        );
        assert_eq!(
            BLSSignature::infinity().verify(&PubKey::default(), b"message"),
            Err(BLSError::InvalidPublicKey)
        );
    }
}
