#![warn(clippy::unwrap_used)]

pub mod attestation;
pub mod attestation_data;
pub mod attester_slashing;
pub mod beacon_block;
pub mod beacon_block_header;
pub mod beacon_state;
pub mod checkpoint;
pub mod committee;
pub mod constants;
pub mod context;
pub mod crosslink;
pub mod deposit;
pub mod errors;
pub mod eth_1_data;
pub mod fork;
pub mod indexed_attestation;
pub mod misc;
pub mod pending_attestation;
pub mod proposer_slashing;
pub mod rewards;
pub mod signing_data;
pub mod state_transition;
pub mod transfer;
pub mod validator;
pub mod voluntary_exit;

#[cfg(any(test, feature = "test_consensus"))]
pub mod test_utils;
