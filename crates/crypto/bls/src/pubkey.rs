use std::str::FromStr;

use alloy_primitives::hex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ssz_derive::{Decode, Encode};
use ssz_types::{FixedVector, typenum::U48};
use tree_hash_derive::TreeHash;

use crate::{constants::PUBKEY_LENGTH, errors::BLSError};

/// Compressed G1 point as it appears in validator records and deposits.
///
/// The bytes are not checked to be a valid curve point until they are used for verification, so a
/// deposit can carry an arbitrary key and still be hashed into the deposit tree.
#[derive(Debug, PartialEq, Clone, Encode, Decode, TreeHash, Default, Eq, Hash)]
pub struct PubKey {
    pub inner: FixedVector<u8, U48>,
}

impl Serialize for PubKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.to_bytes())))
    }
}

impl<'de> Deserialize<'de> for PubKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let result: String = Deserialize::deserialize(deserializer)?;
        PubKey::from_str(&result).map_err(serde::de::Error::custom)
    }
}

impl PubKey {
    pub fn to_bytes(&self) -> &[u8] {
        self.inner.iter().as_slice()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BLSError> {
        if bytes.len() != PUBKEY_LENGTH {
            return Err(BLSError::InvalidByteLength);
        }
        Ok(PubKey {
            inner: FixedVector::new(bytes.to_vec()).map_err(|_| BLSError::InvalidByteLength)?,
        })
    }
}

impl FromStr for PubKey {
    type Err = BLSError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(clean_str).map_err(|_| BLSError::InvalidHexString)?;
        PubKey::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pubkey_hex_round_trip() {
        let hex_key = format!("0x{}", "ab".repeat(48));
        let pubkey = PubKey::from_str(&hex_key).expect("valid hex pubkey");
        assert_eq!(pubkey.to_bytes(), [0xab; 48].as_slice());

        let serialized = serde_yaml::to_string(&pubkey).expect("serialize pubkey");
        assert!(serialized.contains(&hex_key));
    }

    #[test]
    fn test_pubkey_rejects_wrong_length() {
        assert_eq!(
            PubKey::from_str("0xabcd"),
            Err(BLSError::InvalidByteLength)
        );
        assert_eq!(PubKey::from_str("0xzz"), Err(BLSError::InvalidHexString));
    }
}
