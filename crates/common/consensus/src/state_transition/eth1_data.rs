use crate::{
    beacon_block::BeaconBlockBody,
    beacon_state::BeaconState,
    context::ConsensusContext,
    errors::{BeaconStateError, BlockOperationError, BlockProcessingError, Eth1DataInvalid},
    verify,
};

impl BeaconState {
    /// Record the eth1 vote of ``body`` and adopt it once a strict majority of the voting period
    /// agrees.
    pub fn process_eth1_data(
        &mut self,
        body: &BeaconBlockBody,
        ctxt: &mut ConsensusContext<'_>,
    ) -> Result<(), BlockProcessingError> {
        let voting_period = ctxt.spec.slots_per_eth1_voting_period;
        self.check_eth1_vote_capacity(voting_period)?;

        self.eth1_data_votes
            .push(body.eth1_data.clone())
            .map_err(|_| BeaconStateError::ListFull("eth1_data_votes"))?;

        let count = self
            .eth1_data_votes
            .iter()
            .filter(|data| **data == body.eth1_data)
            .count() as u64;

        if count * 2 > voting_period {
            self.eth1_data = body.eth1_data.clone();
        }

        Ok(())
    }

    fn check_eth1_vote_capacity(
        &self,
        voting_period: u64,
    ) -> Result<(), BlockOperationError<Eth1DataInvalid>> {
        verify!(
            (self.eth1_data_votes.len() as u64) < voting_period,
            Eth1DataInvalid::VoteHistoryFull
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;
    use keel_network_spec::networks::{BeaconNetworkSpec, MINIMAL};
    use rstest::rstest;

    use super::*;
    use crate::{committee::CommitteeCache, eth_1_data::Eth1Data, test_utils::genesis_state};

    fn vote(byte: u8) -> Eth1Data {
        Eth1Data {
            deposit_root: B256::repeat_byte(byte),
            deposit_count: byte as u64,
            block_hash: B256::repeat_byte(byte),
        }
    }

    #[rstest]
    #[case::odd_period(7, true)]
    #[case::exactly_half(8, false)]
    #[case::minority(10, false)]
    fn test_majority_threshold(#[case] voting_period: u64, #[case] adopted: bool) {
        let spec = BeaconNetworkSpec {
            slots_per_eth1_voting_period: voting_period,
            ..(**MINIMAL).clone()
        };
        let mut state = genesis_state(8, &spec);
        let original = state.eth1_data.clone();
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(&spec, &mut cache);

        let body = BeaconBlockBody {
            eth1_data: vote(1),
            ..Default::default()
        };
        for _ in 0..3 {
            state.process_eth1_data(&body, &mut ctxt).expect("vote");
            assert_eq!(state.eth1_data, original);
        }
        state.process_eth1_data(&body, &mut ctxt).expect("vote");

        let expected = if adopted { vote(1) } else { original };
        assert_eq!(state.eth1_data, expected);
        assert_eq!(state.eth1_data_votes.len(), 4);
    }

    #[test]
    fn test_votes_are_compared_by_value() {
        let spec = BeaconNetworkSpec {
            slots_per_eth1_voting_period: 4,
            ..(**MINIMAL).clone()
        };
        let mut state = genesis_state(8, &spec);
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(&spec, &mut cache);

        for byte in [1, 2, 1] {
            let body = BeaconBlockBody {
                eth1_data: vote(byte),
                ..Default::default()
            };
            state.process_eth1_data(&body, &mut ctxt).expect("vote");
        }
        assert_ne!(state.eth1_data, vote(1));

        let mut different_count = vote(1);
        different_count.deposit_count = 99;
        let body = BeaconBlockBody {
            eth1_data: different_count,
            ..Default::default()
        };
        state.process_eth1_data(&body, &mut ctxt).expect("vote");
        assert_ne!(state.eth1_data.deposit_count, 99);
        assert_ne!(state.eth1_data, vote(1));
    }

    #[test]
    fn test_full_vote_history() {
        let spec = BeaconNetworkSpec {
            slots_per_eth1_voting_period: 2,
            ..(**MINIMAL).clone()
        };
        let mut state = genesis_state(8, &spec);
        let mut cache = CommitteeCache::new();
        let mut ctxt = ConsensusContext::new(&spec, &mut cache);
        let body = BeaconBlockBody {
            eth1_data: vote(1),
            ..Default::default()
        };
        state.process_eth1_data(&body, &mut ctxt).expect("vote");
        state.process_eth1_data(&body, &mut ctxt).expect("vote");

        assert_eq!(
            state.process_eth1_data(&body, &mut ctxt),
            Err(BlockProcessingError::Eth1DataInvalid {
                reason: Eth1DataInvalid::VoteHistoryFull
            })
        );
        assert_eq!(state.eth1_data_votes.len(), 2);
    }
}
