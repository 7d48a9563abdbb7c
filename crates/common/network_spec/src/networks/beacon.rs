use std::sync::{Arc, LazyLock};

use alloy_primitives::{aliases::B32, fixed_bytes};
use anyhow::ensure;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Minimal,
    Custom(String),
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match String::deserialize(deserializer)?.as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "minimal" => Ok(Network::Minimal),
            custom => Ok(Network::Custom(custom.to_string())),
        }
    }
}

/// Every tunable constant the state transition consults.
///
/// One value is threaded by reference through a whole transition, so a block is always processed
/// against a single consistent configuration.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct BeaconNetworkSpec {
    pub preset_base: String,
    #[serde(rename = "CONFIG_NAME")]
    pub network: Network,

    // Misc
    pub shard_count: u64,
    pub target_committee_size: u64,
    pub max_validators_per_committee: u64,
    pub min_per_epoch_churn_limit: u64,
    pub churn_limit_quotient: u64,
    pub shuffle_round_count: u8,
    pub min_genesis_active_validator_count: u64,
    pub min_genesis_time: u64,

    // Gwei values
    pub min_deposit_amount: u64,
    pub max_effective_balance: u64,
    pub ejection_balance: u64,
    pub effective_balance_increment: u64,

    // Initial values
    #[serde(with = "crate::b32_hex")]
    pub genesis_fork_version: B32,

    // Time parameters
    pub seconds_per_slot: u64,
    pub min_attestation_inclusion_delay: u64,
    pub slots_per_epoch: u64,
    pub min_seed_lookahead: u64,
    pub activation_exit_delay: u64,
    pub slots_per_eth1_voting_period: u64,
    pub slots_per_historical_root: u64,
    pub min_validator_withdrawability_delay: u64,
    pub persistent_committee_period: u64,
    pub max_epochs_per_crosslink: u64,
    pub min_epochs_to_inactivity_penalty: u64,

    // State vector lengths
    pub epochs_per_historical_vector: u64,
    pub epochs_per_slashings_vector: u64,

    // Rewards and penalties
    pub base_reward_factor: u64,
    pub whistleblower_reward_quotient: u64,
    pub proposer_reward_quotient: u64,
    pub inactivity_penalty_quotient: u64,
    pub min_slashing_penalty_quotient: u64,

    // Max operations per block
    pub max_proposer_slashings: u64,
    pub max_attester_slashings: u64,
    pub max_attestations: u64,
    pub max_deposits: u64,
    pub max_voluntary_exits: u64,
    pub max_transfers: u64,
}

impl BeaconNetworkSpec {
    /// Reject configurations that would make the transition divide by zero or index an empty
    /// ring.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("SHARD_COUNT", self.shard_count),
            ("TARGET_COMMITTEE_SIZE", self.target_committee_size),
            ("CHURN_LIMIT_QUOTIENT", self.churn_limit_quotient),
            ("EFFECTIVE_BALANCE_INCREMENT", self.effective_balance_increment),
            ("MAX_EFFECTIVE_BALANCE", self.max_effective_balance),
            ("SLOTS_PER_EPOCH", self.slots_per_epoch),
            ("SLOTS_PER_HISTORICAL_ROOT", self.slots_per_historical_root),
            ("EPOCHS_PER_HISTORICAL_VECTOR", self.epochs_per_historical_vector),
            ("EPOCHS_PER_SLASHINGS_VECTOR", self.epochs_per_slashings_vector),
            ("BASE_REWARD_FACTOR", self.base_reward_factor),
            ("WHISTLEBLOWER_REWARD_QUOTIENT", self.whistleblower_reward_quotient),
            ("PROPOSER_REWARD_QUOTIENT", self.proposer_reward_quotient),
            ("INACTIVITY_PENALTY_QUOTIENT", self.inactivity_penalty_quotient),
            ("MIN_SLASHING_PENALTY_QUOTIENT", self.min_slashing_penalty_quotient),
        ] {
            ensure!(value > 0, "{name} must be greater than zero");
        }
        ensure!(
            self.shard_count >= self.slots_per_epoch,
            "SHARD_COUNT ({}) must be at least SLOTS_PER_EPOCH ({})",
            self.shard_count,
            self.slots_per_epoch
        );
        ensure!(
            self.epochs_per_historical_vector > self.min_seed_lookahead,
            "EPOCHS_PER_HISTORICAL_VECTOR must exceed MIN_SEED_LOOKAHEAD"
        );
        Ok(())
    }
}

pub static MAINNET: LazyLock<Arc<BeaconNetworkSpec>> = LazyLock::new(|| {
    BeaconNetworkSpec {
        preset_base: "mainnet".to_string(),
        network: Network::Mainnet,
        shard_count: 1024,
        target_committee_size: 128,
        max_validators_per_committee: 4096,
        min_per_epoch_churn_limit: 4,
        churn_limit_quotient: 65536,
        shuffle_round_count: 90,
        min_genesis_active_validator_count: 65536,
        min_genesis_time: 1578009600,
        min_deposit_amount: 1_000_000_000,
        max_effective_balance: 32_000_000_000,
        ejection_balance: 16_000_000_000,
        effective_balance_increment: 1_000_000_000,
        genesis_fork_version: fixed_bytes!("0x00000000"),
        seconds_per_slot: 6,
        min_attestation_inclusion_delay: 1,
        slots_per_epoch: 64,
        min_seed_lookahead: 1,
        activation_exit_delay: 4,
        slots_per_eth1_voting_period: 1024,
        slots_per_historical_root: 8192,
        min_validator_withdrawability_delay: 256,
        persistent_committee_period: 2048,
        max_epochs_per_crosslink: 64,
        min_epochs_to_inactivity_penalty: 4,
        epochs_per_historical_vector: 65536,
        epochs_per_slashings_vector: 8192,
        base_reward_factor: 64,
        whistleblower_reward_quotient: 512,
        proposer_reward_quotient: 8,
        inactivity_penalty_quotient: 33_554_432,
        min_slashing_penalty_quotient: 32,
        max_proposer_slashings: 16,
        max_attester_slashings: 1,
        max_attestations: 128,
        max_deposits: 16,
        max_voluntary_exits: 16,
        max_transfers: 0,
    }
    .into()
});

pub static MINIMAL: LazyLock<Arc<BeaconNetworkSpec>> = LazyLock::new(|| {
    BeaconNetworkSpec {
        preset_base: "minimal".to_string(),
        network: Network::Minimal,
        shard_count: 8,
        target_committee_size: 4,
        shuffle_round_count: 10,
        min_genesis_active_validator_count: 64,
        slots_per_epoch: 8,
        slots_per_eth1_voting_period: 16,
        slots_per_historical_root: 64,
        max_epochs_per_crosslink: 4,
        epochs_per_historical_vector: 64,
        epochs_per_slashings_vector: 64,
        ..(**MAINNET).clone()
    }
    .into()
});
