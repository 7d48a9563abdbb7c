//! Deterministic keys, states and signed operations for tests.
//!
//! Validator `i` holds the secret scalar `i + 1`, so every test that asks for the same number
//! of validators sees the same registry. Nothing here is suitable outside of tests.

use std::{cmp::min, ops::Range};

use alloy_primitives::B256;
use ethereum_hashing::hash;
use keel_bls::{
    BLSSignature, PrivateKey, PubKey,
    traits::{Aggregatable, Signable},
};
use keel_merkle::DepositTree;
use keel_network_spec::networks::BeaconNetworkSpec;
use ssz_types::{BitList, FixedVector, VariableList};
use tree_hash::TreeHash;

use crate::{
    attestation::Attestation,
    attestation_data::{AttestationData, AttestationDataAndCustodyBit},
    attester_slashing::AttesterSlashing,
    beacon_block::{BeaconBlock, BeaconBlockBody, SignedBeaconBlock},
    beacon_block_header::{BeaconBlockHeader, SignedBeaconBlockHeader},
    beacon_state::BeaconState,
    checkpoint::Checkpoint,
    constants::{
        BLS_WITHDRAWAL_PREFIX, DEPOSIT_CONTRACT_TREE_DEPTH, DOMAIN_ATTESTATION,
        DOMAIN_BEACON_PROPOSER, DOMAIN_DEPOSIT, DOMAIN_RANDAO, DOMAIN_TRANSFER,
        DOMAIN_VOLUNTARY_EXIT, GENESIS_EPOCH,
    },
    context::ConsensusContext,
    crosslink::Crosslink,
    deposit::{Deposit, DepositData, DepositMessage},
    eth_1_data::Eth1Data,
    indexed_attestation::IndexedAttestation,
    misc::{compute_domain, compute_epoch_at_slot, compute_signing_root},
    proposer_slashing::ProposerSlashing,
    transfer::{SignedTransfer, Transfer},
    validator::Validator,
    voluntary_exit::{SignedVoluntaryExit, VoluntaryExit},
};

/// BLS withdrawal credentials committing to ``pubkey``.
pub fn bls_withdrawal_credentials(pubkey: &PubKey) -> B256 {
    let mut credentials = B256::from_slice(&hash(pubkey.to_bytes()));
    credentials.0[0] = BLS_WITHDRAWAL_PREFIX;
    credentials
}

pub struct ValidatorSetup {
    keys: Vec<(PrivateKey, PubKey)>,
}

impl ValidatorSetup {
    pub fn new(count: u64) -> Self {
        let keys = (1..=count)
            .map(|scalar| {
                let mut inner = B256::ZERO;
                inner.0[..8].copy_from_slice(&scalar.to_le_bytes());
                let private_key = PrivateKey { inner };
                let pubkey = private_key.public_key().expect("non-zero scalar");
                (private_key, pubkey)
            })
            .collect();
        Self { keys }
    }

    pub fn private_key(&self, index: u64) -> &PrivateKey {
        &self.keys[index as usize].0
    }

    pub fn pubkey(&self, index: u64) -> &PubKey {
        &self.keys[index as usize].1
    }

    pub fn sign(&self, index: u64, signing_root: B256) -> BLSSignature {
        self.private_key(index)
            .sign(signing_root.as_slice())
            .expect("valid key")
    }

    fn sign_attestation_data(
        &self,
        state: &BeaconState,
        data: &AttestationData,
        custody_bit_0_indices: &[u64],
        custody_bit_1_indices: &[u64],
        spec: &BeaconNetworkSpec,
    ) -> BLSSignature {
        let domain = state.get_domain(DOMAIN_ATTESTATION, Some(data.target.epoch), spec);
        let mut signatures = vec![];
        for (custody_bit, indices) in [(false, custody_bit_0_indices), (true, custody_bit_1_indices)]
        {
            let signing_root = compute_signing_root(
                AttestationDataAndCustodyBit {
                    data: data.clone(),
                    custody_bit,
                },
                domain,
            );
            signatures.extend(indices.iter().map(|&index| self.sign(index, signing_root)));
        }
        BLSSignature::aggregate(&signatures.iter().collect::<Vec<_>>()).expect("signatures")
    }

    /// An attestation by the members at ``attesters`` (positions in the committee of ``shard``),
    /// of whom those at ``custody_bit_1`` set their custody bit.
    pub fn attestation(
        &self,
        state: &BeaconState,
        target_epoch: u64,
        shard: u64,
        attesters: &[usize],
        custody_bit_1: &[usize],
        ctxt: &mut ConsensusContext<'_>,
    ) -> Attestation {
        let spec = ctxt.spec;
        let committee = ctxt
            .crosslink_committee(state, target_epoch, shard)
            .expect("committee");
        let (source, crosslinks) = if target_epoch == state.get_current_epoch(spec) {
            (state.current_justified_checkpoint, &state.current_crosslinks)
        } else {
            (state.previous_justified_checkpoint, &state.previous_crosslinks)
        };
        let parent = &crosslinks[shard as usize];
        let mut data = AttestationData {
            beacon_block_root: B256::ZERO,
            source,
            target: Checkpoint {
                epoch: target_epoch,
                root: state.get_block_root(target_epoch, spec).unwrap_or_default(),
            },
            crosslink: Crosslink {
                shard,
                parent_root: parent.tree_hash_root(),
                start_epoch: parent.end_epoch,
                end_epoch: min(target_epoch, parent.end_epoch + spec.max_epochs_per_crosslink),
                data_root: B256::ZERO,
            },
        };
        let slot = state
            .get_attestation_data_slot(&data, spec)
            .expect("attestation slot");
        data.beacon_block_root = state.get_block_root_at_slot(slot, spec).unwrap_or_default();

        let mut aggregation_bits = BitList::with_capacity(committee.len()).expect("committee size");
        let mut custody_bits = BitList::with_capacity(committee.len()).expect("committee size");
        let mut custody_bit_0_indices = vec![];
        let mut custody_bit_1_indices = vec![];
        for &position in attesters {
            aggregation_bits.set(position, true).expect("in committee");
            if custody_bit_1.contains(&position) {
                custody_bits.set(position, true).expect("in committee");
                custody_bit_1_indices.push(committee[position]);
            } else {
                custody_bit_0_indices.push(committee[position]);
            }
        }

        let signature = self.sign_attestation_data(
            state,
            &data,
            &custody_bit_0_indices,
            &custody_bit_1_indices,
            spec,
        );
        Attestation {
            aggregation_bits,
            data,
            custody_bits,
            signature,
        }
    }

    /// Two signed headers for the same slot by ``proposer_index`` with different bodies.
    pub fn proposer_slashing(
        &self,
        state: &BeaconState,
        proposer_index: u64,
        slot: u64,
        spec: &BeaconNetworkSpec,
    ) -> ProposerSlashing {
        let domain = state.get_domain(
            DOMAIN_BEACON_PROPOSER,
            Some(compute_epoch_at_slot(slot, spec.slots_per_epoch)),
            spec,
        );
        let signed_header = |body_byte: u8| {
            let message = BeaconBlockHeader {
                slot,
                body_root: B256::repeat_byte(body_byte),
                ..Default::default()
            };
            let signature = self.sign(proposer_index, compute_signing_root(&message, domain));
            SignedBeaconBlockHeader { message, signature }
        };
        ProposerSlashing {
            proposer_index,
            signed_header_1: signed_header(1),
            signed_header_2: signed_header(2),
        }
    }

    /// A double vote in the current epoch by two groups of validators.
    pub fn attester_slashing(
        &self,
        state: &BeaconState,
        indices_1: &[u64],
        indices_2: &[u64],
        spec: &BeaconNetworkSpec,
    ) -> AttesterSlashing {
        let epoch = state.get_current_epoch(spec);
        let indexed_attestation = |indices: &[u64], block_byte: u8| {
            let data = AttestationData {
                beacon_block_root: B256::repeat_byte(block_byte),
                target: Checkpoint {
                    epoch,
                    root: B256::ZERO,
                },
                ..Default::default()
            };
            let mut indices = indices.to_vec();
            indices.sort_unstable();
            let signature = self.sign_attestation_data(state, &data, &indices, &[], spec);
            IndexedAttestation {
                custody_bit_0_indices: indices.into(),
                custody_bit_1_indices: VariableList::default(),
                data,
                signature,
            }
        };
        AttesterSlashing {
            attestation_1: indexed_attestation(indices_1, 1),
            attestation_2: indexed_attestation(indices_2, 2),
        }
    }

    pub fn voluntary_exit(
        &self,
        state: &BeaconState,
        validator_index: u64,
        epoch: u64,
        spec: &BeaconNetworkSpec,
    ) -> SignedVoluntaryExit {
        let message = VoluntaryExit {
            epoch,
            validator_index,
        };
        let domain = state.get_domain(DOMAIN_VOLUNTARY_EXIT, Some(epoch), spec);
        let signature = self.sign(validator_index, compute_signing_root(&message, domain));
        SignedVoluntaryExit { message, signature }
    }

    /// An unsigned transfer whose withdrawal pubkey is the sender's own key.
    pub fn transfer(
        &self,
        sender: u64,
        recipient: u64,
        amount: u64,
        fee: u64,
        slot: u64,
    ) -> SignedTransfer {
        SignedTransfer {
            message: Transfer {
                sender,
                recipient,
                amount,
                fee,
                slot,
                pubkey: self.pubkey(sender).clone(),
            },
            signature: BLSSignature::infinity(),
        }
    }

    pub fn sign_transfer(
        &self,
        state: &BeaconState,
        transfer: Transfer,
        spec: &BeaconNetworkSpec,
    ) -> SignedTransfer {
        let domain = state.get_domain(DOMAIN_TRANSFER, None, spec);
        let signature = self.sign(transfer.sender, compute_signing_root(&transfer, domain));
        SignedTransfer {
            message: transfer,
            signature,
        }
    }
}

/// A state at slot 0 whose ``count`` validators are all active with the maximum effective
/// balance.
pub fn genesis_state(count: u64, spec: &BeaconNetworkSpec) -> BeaconState {
    let keys = ValidatorSetup::new(count);
    let mut state =
        BeaconState::new(0, Eth1Data::default(), spec).expect("state sized for the spec");
    for index in 0..count {
        let pubkey = keys.pubkey(index).clone();
        let withdrawal_credentials = bls_withdrawal_credentials(&pubkey);
        let mut validator =
            Validator::new(pubkey, withdrawal_credentials, spec.max_effective_balance);
        validator.activation_eligibility_epoch = GENESIS_EPOCH;
        validator.activation_epoch = GENESIS_EPOCH;
        state.validators.push(validator).expect("registry limit");
        state
            .balances
            .push(spec.max_effective_balance)
            .expect("registry limit");
    }
    state.genesis_validators_root = state.validators.tree_hash_root();
    state
}

pub fn randao_reveal(
    state: &BeaconState,
    keys: &ValidatorSetup,
    ctxt: &mut ConsensusContext<'_>,
) -> BLSSignature {
    let epoch = state.get_current_epoch(ctxt.spec);
    let proposer_index = ctxt.beacon_proposer_index(state).expect("proposer");
    let domain = state.get_domain(DOMAIN_RANDAO, Some(epoch), ctxt.spec);
    keys.sign(proposer_index, compute_signing_root(epoch, domain))
}

/// A block on top of ``state`` at its current slot, with a valid randao reveal and proposer
/// signature.
pub fn build_signed_block(
    state: &BeaconState,
    keys: &ValidatorSetup,
    mut body: BeaconBlockBody,
    ctxt: &mut ConsensusContext<'_>,
) -> SignedBeaconBlock {
    body.randao_reveal = randao_reveal(state, keys, ctxt);
    let block = BeaconBlock {
        slot: state.slot,
        parent_root: state.latest_block_header.tree_hash_root(),
        state_root: B256::ZERO,
        body,
    };
    sign_block(state, keys, block, ctxt)
}

/// Sign ``block`` as the proposer of the current slot of ``state``.
pub fn sign_block(
    state: &BeaconState,
    keys: &ValidatorSetup,
    block: BeaconBlock,
    ctxt: &mut ConsensusContext<'_>,
) -> SignedBeaconBlock {
    let proposer_index = ctxt.beacon_proposer_index(state).expect("proposer");
    let domain = state.get_domain(DOMAIN_BEACON_PROPOSER, None, ctxt.spec);
    let signature = keys.sign(proposer_index, compute_signing_root(&block, domain));
    SignedBeaconBlock {
        message: block,
        signature,
    }
}

/// Deposit data for validator ``index`` of ``keys``, signed with its own key.
pub fn deposit_data(
    keys: &ValidatorSetup,
    index: u64,
    amount: u64,
    spec: &BeaconNetworkSpec,
) -> DepositData {
    let pubkey = keys.pubkey(index).clone();
    let withdrawal_credentials = bls_withdrawal_credentials(&pubkey);
    let message = DepositMessage {
        pubkey: pubkey.clone(),
        withdrawal_credentials,
        amount,
    };
    let domain = compute_domain(DOMAIN_DEPOSIT, spec.genesis_fork_version, B256::ZERO);
    DepositData {
        pubkey,
        withdrawal_credentials,
        amount,
        signature: keys.sign(index, compute_signing_root(message, domain)),
    }
}

/// Put ``deposit_data`` into a fresh deposit tree and return the deposits with their proofs,
/// along with the eth1 data that commits to the tree.
pub fn deposits_from(deposit_data: Vec<DepositData>) -> (Vec<Deposit>, Eth1Data) {
    let mut tree = DepositTree::new(DEPOSIT_CONTRACT_TREE_DEPTH as usize);
    for data in &deposit_data {
        tree.push_leaf(data.tree_hash_root()).expect("tree capacity");
    }
    let deposits = deposit_data
        .into_iter()
        .enumerate()
        .map(|(index, data)| Deposit {
            proof: FixedVector::new(tree.proof(index as u64).expect("proof"))
                .expect("proof length"),
            data,
        })
        .collect();
    let eth1_data = Eth1Data {
        deposit_root: tree.root(),
        deposit_count: tree.len() as u64,
        block_hash: B256::ZERO,
    };
    (deposits, eth1_data)
}

/// Full-balance deposits for the validators of ``keys`` in ``indices``.
pub fn deposits_for(
    keys: &ValidatorSetup,
    indices: Range<u64>,
    spec: &BeaconNetworkSpec,
) -> (Vec<Deposit>, Eth1Data) {
    deposits_from(
        indices
            .map(|index| deposit_data(keys, index, spec.max_effective_balance, spec))
            .collect(),
    )
}
