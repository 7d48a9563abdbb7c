use alloy_primitives::{aliases::B32, fixed_bytes};
use ssz_types::typenum::{U1, U4, U16, U33, U128, U1024, U4096, U8192, U65536, U16777216, U1099511627776};

pub const BASE_REWARDS_PER_EPOCH: u64 = 5;
pub const BLS_WITHDRAWAL_PREFIX: u8 = 0x00;
pub const DEPOSIT_CONTRACT_TREE_DEPTH: u64 = 32;
pub const DOMAIN_ATTESTATION: B32 = fixed_bytes!("0x02000000");
pub const DOMAIN_BEACON_PROPOSER: B32 = fixed_bytes!("0x00000000");
pub const DOMAIN_DEPOSIT: B32 = fixed_bytes!("0x03000000");
pub const DOMAIN_RANDAO: B32 = fixed_bytes!("0x01000000");
pub const DOMAIN_TRANSFER: B32 = fixed_bytes!("0x05000000");
pub const DOMAIN_VOLUNTARY_EXIT: B32 = fixed_bytes!("0x04000000");
pub const FAR_FUTURE_EPOCH: u64 = u64::MAX;
pub const GENESIS_EPOCH: u64 = 0;
pub const GENESIS_SLOT: u64 = 0;
pub const JUSTIFICATION_BITS_LENGTH: usize = 4;
pub const MAX_RANDOM_BYTE: u64 = 255;
pub const UINT64_MAX: u64 = u64::MAX;
pub const UINT64_MAX_SQRT: u64 = 4294967295;

// SSZ list bounds, sized for the mainnet preset. Smaller presets use a prefix of each list.
pub type DepositProofLength = U33;
pub type EpochsPerHistoricalVector = U65536;
pub type EpochsPerSlashingsVector = U8192;
pub type HistoricalRootsLimit = U16777216;
pub type JustificationBitsLength = U4;
pub type MaxAttestations = U128;
pub type MaxAttesterSlashings = U1;
pub type MaxDeposits = U16;
pub type MaxPendingAttestations = U8192;
pub type MaxProposerSlashings = U16;
pub type MaxTransfers = U16;
pub type MaxValidatorsPerCommittee = U4096;
pub type MaxVoluntaryExits = U16;
pub type ShardCount = U1024;
pub type SlotsPerEth1VotingPeriod = U1024;
pub type SlotsPerHistoricalRoot = U8192;
pub type ValidatorRegistryLimit = U1099511627776;
