//! Error types for block processing.
//!
//! Every per-operation check has its own reason enum so that a rejected block reports exactly
//! which operation failed (by its position in the block body) and why. Internal failures of the
//! state accessors are carried separately as [`BeaconStateError`].

use alloy_primitives::B256;
use thiserror::Error;

/// Failures of state accessors and mutators that are not about the validity of an operation.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BeaconStateError {
    #[error("unknown validator index {0}")]
    UnknownValidator(u64),
    #[error("{vector} has length {found}, expected {expected}")]
    VectorLengthMismatch {
        vector: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{0} is full")]
    ListFull(&'static str),
    #[error("slot {slot} is out of the historical range ending at {state_slot}")]
    SlotOutOfRange { slot: u64, state_slot: u64 },
    #[error("epoch {epoch} is out of range for current epoch {current_epoch}")]
    EpochOutOfRange { epoch: u64, current_epoch: u64 },
    #[error("no crosslink committee for shard {shard} in epoch {epoch}")]
    NoCommitteeForShard { epoch: u64, shard: u64 },
    #[error("committee index {index} is out of range for {count} committees")]
    CommitteeIndexOutOfRange { index: u64, count: u64 },
    #[error("no active validators")]
    NoActiveValidators,
    #[error("balance of validator {0} overflowed")]
    BalanceOverflow(u64),
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    #[error("shuffle index {index} is out of range for {index_count} indices")]
    ShuffleIndexOutOfRange { index: usize, index_count: usize },
}

/// A failed check on a single operation: either the operation is invalid for the given reason,
/// or the state could not be read.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BlockOperationError<T> {
    Invalid(T),
    BeaconState(BeaconStateError),
}

impl<T> BlockOperationError<T> {
    pub fn invalid(reason: T) -> Self {
        BlockOperationError::Invalid(reason)
    }

    pub fn map_invalid<U>(self, f: impl FnOnce(T) -> U) -> BlockOperationError<U> {
        match self {
            BlockOperationError::Invalid(reason) => BlockOperationError::Invalid(f(reason)),
            BlockOperationError::BeaconState(error) => BlockOperationError::BeaconState(error),
        }
    }
}

impl<T> From<BeaconStateError> for BlockOperationError<T> {
    fn from(error: BeaconStateError) -> Self {
        BlockOperationError::BeaconState(error)
    }
}

/// Return early with `BlockOperationError::Invalid($reason)` unless `$condition` holds.
#[macro_export]
macro_rules! verify {
    ($condition:expr, $reason:expr $(,)?) => {
        if !$condition {
            return Err($crate::errors::BlockOperationError::invalid($reason));
        }
    };
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum HeaderInvalid {
    #[error("block slot {block_slot} does not match state slot {state_slot}")]
    SlotMismatch { state_slot: u64, block_slot: u64 },
    #[error("parent root {found} does not match latest block header root {expected}")]
    ParentRootMismatch { expected: B256, found: B256 },
    #[error("proposer {0} is slashed")]
    ProposerSlashed(u64),
    #[error("invalid proposer signature")]
    InvalidSignature,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RandaoInvalid {
    #[error("invalid randao reveal")]
    InvalidRandaoSignature,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Eth1DataInvalid {
    #[error("eth1 data votes already hold a full voting period")]
    VoteHistoryFull,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ProposerSlashingInvalid {
    #[error("unknown proposer {0}")]
    UnknownProposer(u64),
    #[error("headers are from different epochs: slots {slot_1} and {slot_2}")]
    HeaderEpochMismatch { slot_1: u64, slot_2: u64 },
    #[error("headers are identical")]
    IdenticalHeaders,
    #[error("proposer {0} is not slashable")]
    NotSlashable(u64),
    #[error("invalid signature on header {0}")]
    InvalidSignature(u8),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum IndexedAttestationInvalid {
    #[error("custody bit set holds {found} indices, at most {max} allowed")]
    TooManyIndices { found: usize, max: u64 },
    #[error("indices are not strictly sorted or contain duplicates")]
    UnsortedOrDuplicateIndices,
    #[error("custody bit sets overlap")]
    CustodyBitSetsOverlap,
    #[error("no attesting indices")]
    EmptyAttestation,
    #[error("unknown validator {0}")]
    UnknownValidator(u64),
    #[error("invalid aggregate signature")]
    InvalidSignature,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AttesterSlashingInvalid {
    #[error("attestation data is not slashable")]
    NotSlashable,
    #[error("first attestation is invalid: {0}")]
    IndexedAttestation1(IndexedAttestationInvalid),
    #[error("second attestation is invalid: {0}")]
    IndexedAttestation2(IndexedAttestationInvalid),
    #[error("attestations share no attesting indices")]
    EmptyIntersection,
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum CrosslinkCheck {
    #[error("parent root")]
    ParentRoot,
    #[error("start epoch")]
    StartEpoch,
    #[error("end epoch")]
    EndEpoch,
    #[error("data root")]
    DataRoot,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AttestationInvalid {
    #[error("shard {shard} is not below shard count {shard_count}")]
    BadShard { shard: u64, shard_count: u64 },
    #[error("target epoch {target} is neither previous {previous} nor current {current}")]
    WrongTargetEpoch {
        target: u64,
        previous: u64,
        current: u64,
    },
    #[error("attestation slot {attestation_slot} is too recent for state slot {state_slot}")]
    InclusionDelayViolation {
        attestation_slot: u64,
        state_slot: u64,
    },
    #[error("attestation slot {attestation_slot} is too old for state slot {state_slot}")]
    StaleAttestation {
        attestation_slot: u64,
        state_slot: u64,
    },
    #[error("source checkpoint does not match the justified checkpoint")]
    SourceMismatch,
    #[error("crosslink {0} does not match")]
    CrosslinkMismatch(CrosslinkCheck),
    #[error("bitfield length {found} does not match committee size {expected}")]
    BitfieldLengthMismatch { expected: usize, found: usize },
    #[error("custody bits set outside the aggregation bits")]
    CustodyBitsNotSubset,
    #[error("indexed attestation is invalid: {0}")]
    BadIndexedAttestation(IndexedAttestationInvalid),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DepositInvalid {
    #[error("merkle proof does not verify against the deposit root")]
    MerkleProofInvalid,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ExitInvalid {
    #[error("unknown validator {0}")]
    UnknownValidator(u64),
    #[error("validator {0} is not active")]
    NotActive(u64),
    #[error("exit epoch {exit_epoch} is in the future, current epoch {current_epoch}")]
    ExitEpochInFuture { current_epoch: u64, exit_epoch: u64 },
    #[error("validator has not been active long enough, current {current_epoch}, earliest {earliest_exit_epoch}")]
    NotActiveLongEnough {
        current_epoch: u64,
        earliest_exit_epoch: u64,
    },
    #[error("invalid exit signature")]
    InvalidSignature,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TransferInvalid {
    #[error("unknown sender {0}")]
    UnknownSender(u64),
    #[error("unknown recipient {0}")]
    UnknownRecipient(u64),
    #[error("sender balance {balance} cannot cover amount {amount} plus fee {fee}")]
    InsufficientBalance { balance: u64, amount: u64, fee: u64 },
    #[error("transfer slot {transfer_slot} does not match state slot {state_slot}")]
    SlotMismatch { state_slot: u64, transfer_slot: u64 },
    #[error("sender {0} is neither withdrawable nor unactivated, and has no excess balance")]
    SenderNotEligible(u64),
    #[error("pubkey does not match the sender's withdrawal credentials")]
    WithdrawalCredentialsMismatch,
    #[error("invalid transfer signature")]
    InvalidSignature,
    #[error("transfer leaves a dust balance")]
    DustBalance,
}

/// Why a block was rejected. Per-operation variants carry the position of the offending
/// operation inside its list in the block body.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BlockProcessingError {
    #[error("invalid block header: {reason}")]
    HeaderInvalid { reason: HeaderInvalid },
    #[error("invalid randao reveal: {reason}")]
    RandaoInvalid { reason: RandaoInvalid },
    #[error("invalid eth1 data vote: {reason}")]
    Eth1DataInvalid { reason: Eth1DataInvalid },
    #[error("proposer slashing {index} is invalid: {reason}")]
    ProposerSlashingInvalid {
        index: usize,
        reason: ProposerSlashingInvalid,
    },
    #[error("attester slashing {index} is invalid: {reason}")]
    AttesterSlashingInvalid {
        index: usize,
        reason: AttesterSlashingInvalid,
    },
    #[error("attestation {index} is invalid: {reason}")]
    AttestationInvalid {
        index: usize,
        reason: AttestationInvalid,
    },
    #[error("deposit {index} is invalid: {reason}")]
    DepositInvalid {
        index: usize,
        reason: DepositInvalid,
    },
    #[error("voluntary exit {index} is invalid: {reason}")]
    ExitInvalid { index: usize, reason: ExitInvalid },
    #[error("transfer {index} is invalid: {reason}")]
    TransferInvalid {
        index: usize,
        reason: TransferInvalid,
    },
    #[error("block carries {found} {operation}, at most {max} allowed")]
    TooManyOperations {
        operation: &'static str,
        found: usize,
        max: u64,
    },
    #[error("block carries {found} deposits, expected {expected}")]
    DepositCountMismatch { expected: u64, found: usize },
    #[error("duplicate transfer at index {index}")]
    DuplicateTransfer { index: usize },
    #[error("beacon state error: {0}")]
    BeaconState(#[from] BeaconStateError),
}

/// Attach the position of an operation to its failure.
pub trait IntoWithIndex<T>: Sized {
    fn into_with_index(self, index: usize) -> T;
}

macro_rules! impl_into_with_index {
    ($($reason:ident => $variant:ident),* $(,)?) => {
        $(
            impl IntoWithIndex<BlockProcessingError> for BlockOperationError<$reason> {
                fn into_with_index(self, index: usize) -> BlockProcessingError {
                    match self {
                        BlockOperationError::Invalid(reason) => {
                            BlockProcessingError::$variant { index, reason }
                        }
                        BlockOperationError::BeaconState(error) => {
                            BlockProcessingError::BeaconState(error)
                        }
                    }
                }
            }
        )*
    };
}

impl_into_with_index!(
    ProposerSlashingInvalid => ProposerSlashingInvalid,
    AttesterSlashingInvalid => AttesterSlashingInvalid,
    AttestationInvalid => AttestationInvalid,
    DepositInvalid => DepositInvalid,
    ExitInvalid => ExitInvalid,
    TransferInvalid => TransferInvalid,
);

macro_rules! impl_from_block_operation_error {
    ($($reason:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<BlockOperationError<$reason>> for BlockProcessingError {
                fn from(error: BlockOperationError<$reason>) -> Self {
                    match error {
                        BlockOperationError::Invalid(reason) => {
                            BlockProcessingError::$variant { reason }
                        }
                        BlockOperationError::BeaconState(error) => {
                            BlockProcessingError::BeaconState(error)
                        }
                    }
                }
            }
        )*
    };
}

impl_from_block_operation_error!(
    HeaderInvalid => HeaderInvalid,
    RandaoInvalid => RandaoInvalid,
    Eth1DataInvalid => Eth1DataInvalid,
);
