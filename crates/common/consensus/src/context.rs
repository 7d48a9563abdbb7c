use keel_network_spec::networks::BeaconNetworkSpec;

use crate::{beacon_state::BeaconState, committee::CommitteeResolver, errors::BeaconStateError};

/// Whether signatures are checked while processing a block.
///
/// `False` exists for replaying trusted history and for tests. Deposit signatures are checked
/// either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifySignatures {
    #[default]
    True,
    False,
}

impl VerifySignatures {
    pub fn is_true(self) -> bool {
        self == VerifySignatures::True
    }
}

/// Everything a transition needs besides the state itself.
pub struct ConsensusContext<'a> {
    pub spec: &'a BeaconNetworkSpec,
    committees: &'a mut dyn CommitteeResolver,
    verify_signatures: VerifySignatures,
}

impl<'a> ConsensusContext<'a> {
    pub fn new(spec: &'a BeaconNetworkSpec, committees: &'a mut dyn CommitteeResolver) -> Self {
        Self {
            spec,
            committees,
            verify_signatures: VerifySignatures::True,
        }
    }

    pub fn set_verify_signatures(mut self, verify_signatures: VerifySignatures) -> Self {
        self.verify_signatures = verify_signatures;
        self
    }

    pub fn verify_signatures(&self) -> VerifySignatures {
        self.verify_signatures
    }

    pub fn crosslink_committee(
        &mut self,
        state: &BeaconState,
        epoch: u64,
        shard: u64,
    ) -> Result<Vec<u64>, BeaconStateError> {
        self.committees
            .crosslink_committee(state, epoch, shard, self.spec)
    }

    pub fn beacon_proposer_index(&mut self, state: &BeaconState) -> Result<u64, BeaconStateError> {
        self.committees.beacon_proposer_index(state, self.spec)
    }
}
