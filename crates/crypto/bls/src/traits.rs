use crate::{PubKey, errors::BLSError, signature::BLSSignature};

/// Combine several points of the same group into one.
pub trait Aggregatable<T>: Sized {
    type Error;
    fn aggregate(items: &[&T]) -> Result<Self, Self::Error>;
}

pub trait ZkcryptoAggregatable<T>: Aggregatable<T, Error = BLSError> {}

pub trait Verifiable {
    type Error;

    /// Verifies a BLS signature against a public key and message.
    ///
    /// # Returns
    /// * `Result<bool, BLSError>` - Ok(true) if the signature is valid, Ok(false) if verification
    ///   fails, or Err if there are issues with signature or public key bytes
    fn verify(&self, pubkey: &PubKey, message: &[u8]) -> Result<bool, Self::Error>;

    /// Verifies the signature against a single message using an aggregate of multiple public
    /// keys.
    fn fast_aggregate_verify<'a, P>(&self, pubkeys: P, message: &[u8]) -> Result<bool, Self::Error>
    where
        P: AsRef<[&'a PubKey]>;

    /// Verifies an aggregate signature over distinct messages, where `pubkeys[i]` signed
    /// `messages[i]`.
    ///
    /// Each entry is usually itself an aggregate of the keys that signed the same message, which
    /// is how custody-bit attestations are checked.
    fn verify_multiple(
        &self,
        pubkeys: &[&PubKey],
        messages: &[&[u8]],
    ) -> Result<bool, Self::Error>;
}

pub trait ZkcryptoVerifiable: Verifiable<Error = BLSError> {}

pub trait Signable {
    type Error;

    fn sign(&self, message: &[u8]) -> Result<BLSSignature, Self::Error>;

    fn public_key(&self) -> Result<PubKey, Self::Error>;
}

pub trait ZkcryptoSignable: Signable<Error = BLSError> {}
