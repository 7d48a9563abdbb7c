use thiserror::Error;

#[derive(Error, PartialEq, Eq, Debug, Clone)]
pub enum BLSError {
    #[error("invalid byte length")]
    InvalidByteLength,
    #[error("invalid hex string")]
    InvalidHexString,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("expected one message per public key, got {pubkeys} keys and {messages} messages")]
    MessageCountMismatch { pubkeys: usize, messages: usize },
}
