//! Integration tests of full GJKR sessions, with honest and misbehaving members.

use std::collections::BTreeMap;

use ark_ec::{CurveGroup, Group};
use ark_ff::UniformRand;
use ark_secp256k1::Fr;
use rand::rngs::OsRng;
use tracing_subscriber::EnvFilter;

use gjkr::dkg::{
    DisqualifiedMembersKeysMessage, DistributedKeyGeneration, DkgOutput, EphemeralKeyExchange,
    EphemeralPublicKeyMessage, MemberCommitmentsMessage, MemberId,
    MemberPublicKeySharePointsMessage, PeerSharesMessage, Phase, PointsAccusationsMessage,
    PointsJustification, PointsVerification, Reason, Reconstruction,
    SecretSharesAccusationsMessage, SharesJustification, SharesVerification,
};
use gjkr::keys::{
    EphemeralKeyPair, EphemeralPrivateKey, GroupKey, IndividualVerifyingKey, SymmetricKey,
};
use gjkr::parameters::ThresholdParameters;
use gjkr::testing::Secp256k1Sha256;
use gjkr::{CipherSuite, DkgResult, FromBytes, ToBytes};

type Suite = Secp256k1Sha256;
type Dkg<S> = DistributedKeyGeneration<S, Suite>;
type G = <Suite as CipherSuite>::G;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Send a message through the wire.
fn transmit<T: ToBytes + FromBytes>(message: &T) -> T {
    T::from_bytes(&message.to_bytes().unwrap()).unwrap()
}

fn transmit_all<T: ToBytes + FromBytes>(messages: &[T]) -> Vec<T> {
    messages.iter().map(transmit).collect()
}

fn announce(
    params: &ThresholdParameters<Suite>,
    roster: &[MemberId],
) -> (Vec<Dkg<EphemeralKeyExchange>>, Vec<EphemeralPublicKeyMessage<Suite>>) {
    let mut states = Vec::new();
    let mut broadcast = Vec::new();
    for index in roster.iter() {
        let (state, messages) = Dkg::new(params, *index, roster, OsRng).unwrap();
        states.push(state);
        broadcast.extend(messages);
    }

    (states, broadcast)
}

fn share(
    states: Vec<Dkg<EphemeralKeyExchange>>,
    keys: &[EphemeralPublicKeyMessage<Suite>],
) -> (
    Vec<Dkg<SharesVerification>>,
    Vec<MemberCommitmentsMessage<Suite>>,
    Vec<PeerSharesMessage<Suite>>,
) {
    let keys = transmit_all(keys);
    let mut next = Vec::new();
    let mut commitments = Vec::new();
    let mut peer_shares = Vec::new();
    for state in states {
        let (state, commitment, shares) = state.to_sharing(&keys, OsRng).unwrap();
        next.push(state);
        commitments.push(commitment);
        peer_shares.extend(shares);
    }

    (next, commitments, peer_shares)
}

fn verify_shares(
    states: Vec<Dkg<SharesVerification>>,
    commitments: &[MemberCommitmentsMessage<Suite>],
    peer_shares: &[PeerSharesMessage<Suite>],
) -> (
    Vec<Dkg<SharesJustification>>,
    Vec<SecretSharesAccusationsMessage<Suite>>,
) {
    let commitments = transmit_all(commitments);
    let peer_shares = transmit_all(peer_shares);
    states
        .into_iter()
        .map(|state| state.verify_shares(&commitments, &peer_shares).unwrap())
        .unzip()
}

fn resolve_shares(
    states: Vec<Dkg<SharesJustification>>,
    accusations: &[SecretSharesAccusationsMessage<Suite>],
) -> (
    Vec<Dkg<PointsVerification>>,
    Vec<MemberPublicKeySharePointsMessage<Suite>>,
) {
    let accusations = transmit_all(accusations);
    states
        .into_iter()
        .map(|state| state.resolve_shares_accusations(&accusations).unwrap())
        .unzip()
}

fn verify_points(
    states: Vec<Dkg<PointsVerification>>,
    points: &[MemberPublicKeySharePointsMessage<Suite>],
) -> (
    Vec<Dkg<PointsJustification>>,
    Vec<PointsAccusationsMessage<Suite>>,
) {
    let points = transmit_all(points);
    states
        .into_iter()
        .map(|state| state.verify_points(&points).unwrap())
        .unzip()
}

fn resolve_points(
    states: Vec<Dkg<PointsJustification>>,
    accusations: &[PointsAccusationsMessage<Suite>],
) -> (
    Vec<Dkg<Reconstruction>>,
    Vec<DisqualifiedMembersKeysMessage<Suite>>,
) {
    let accusations = transmit_all(accusations);
    states
        .into_iter()
        .map(|state| state.resolve_points_accusations(&accusations).unwrap())
        .unzip()
}

fn finish(
    states: Vec<Dkg<Reconstruction>>,
    reveals: &[DisqualifiedMembersKeysMessage<Suite>],
) -> Vec<DkgResult<DkgOutput<Suite>>> {
    let reveals = transmit_all(reveals);
    states
        .into_iter()
        .map(|state| state.finish(&reveals))
        .collect()
}

/// Run the rounds following the shares accusations.
fn complete(
    states: Vec<Dkg<PointsVerification>>,
    points: &[MemberPublicKeySharePointsMessage<Suite>],
) -> Vec<DkgResult<DkgOutput<Suite>>> {
    let (states, accusations) = verify_points(states, points);
    let (states, reveals) = resolve_points(states, &accusations);
    finish(states, &reveals)
}

/// Check that the outputs of `members` agree, and that any `t` of their
/// signing shares yield the group key.
fn assert_consistent(
    outputs: &[DkgResult<DkgOutput<Suite>>],
    members: &[MemberId],
    t: usize,
) -> GroupKey<Suite> {
    let outputs: Vec<&DkgOutput<Suite>> = members
        .iter()
        .map(|member| outputs[*member as usize - 1].as_ref().unwrap())
        .collect();

    let group_key = outputs[0].group_public_key;
    for output in outputs.iter() {
        assert_eq!(output.group_public_key, group_key);
        assert_eq!(output.ledger, outputs[0].ledger);
    }

    let verifying_keys: Vec<IndividualVerifyingKey<Suite>> = outputs
        .iter()
        .map(|output| output.signing_share.to_public())
        .collect();
    for window in verifying_keys.windows(t) {
        assert_eq!(GroupKey::from_verifying_keys(window).unwrap(), group_key);
    }

    group_key
}

fn replace_peer_shares(
    peer_shares: &mut [PeerSharesMessage<Suite>],
    replacement: PeerSharesMessage<Suite>,
) {
    let position = peer_shares
        .iter()
        .position(|message| {
            message.sender_id() == replacement.sender_id()
                && message.receiver_id() == replacement.receiver_id()
        })
        .unwrap();
    peer_shares[position] = replacement;
}

#[test]
fn honest_session() {
    init_logging();

    let params = ThresholdParameters::<Suite>::new(4, 3).unwrap();
    let roster = [1, 2, 3, 4];

    let (states, keys) = announce(&params, &roster);
    assert_eq!(keys.len(), 12);

    let (states, commitments, peer_shares) = share(states, &keys);
    assert_eq!(peer_shares.len(), 12);

    let (states, accusations) = verify_shares(states, &commitments, &peer_shares);
    assert!(accusations
        .iter()
        .all(|message| message.accused_members_keys().is_empty()));

    let (states, points) = resolve_shares(states, &accusations);
    let expected: G = points
        .iter()
        .map(|message| message.public_key_share_points()[0])
        .sum();

    let (states, accusations) = verify_points(states, &points);
    assert!(accusations
        .iter()
        .all(|message| message.accused_members_keys().is_empty()));

    let (states, reveals) = resolve_points(states, &accusations);
    assert!(reveals
        .iter()
        .all(|message| message.disqualified_members_keys().is_empty()));

    let outputs = finish(states, &reveals);
    let group_key = assert_consistent(&outputs, &roster, 3);

    assert_eq!(group_key.key().into_affine(), expected.into_affine());
    for output in outputs.iter() {
        let output = output.as_ref().unwrap();
        assert!(output.ledger.disqualified.is_empty());
        assert_eq!(output.ledger.survivors, roster.to_vec());
    }
}

#[test]
fn shares_encrypted_with_the_wrong_key_disqualify_their_sender() {
    init_logging();

    let mut rng = OsRng;
    let params = ThresholdParameters::<Suite>::new(4, 3).unwrap();
    let roster = [1, 2, 3, 4];

    let (states, keys) = announce(&params, &roster);
    let (states, commitments, mut peer_shares) = share(states, &keys);

    // Member 2 encrypts its shares to member 3 under an unrelated key.
    let unrelated = EphemeralKeyPair::<Suite>::generate(&mut rng);
    let other = EphemeralKeyPair::<Suite>::generate(&mut rng);
    let wrong_key = SymmetricKey::derive(&unrelated.private_key, &other.public_key).unwrap();
    let forged = PeerSharesMessage::new(
        2,
        3,
        &Fr::rand(&mut rng),
        &Fr::rand(&mut rng),
        &wrong_key,
        &mut rng,
    )
    .unwrap();
    replace_peer_shares(&mut peer_shares, forged);

    let (states, accusations) = verify_shares(states, &commitments, &peer_shares);
    assert_eq!(
        accusations[2]
            .accused_members_keys()
            .keys()
            .copied()
            .collect::<Vec<_>>(),
        vec![2]
    );
    for member in [1, 2, 4] {
        assert!(accusations[member - 1].accused_members_keys().is_empty());
    }

    let (states, points) = resolve_shares(states, &accusations);
    for member in [1, 3, 4] {
        let ledger = states[member - 1].ledger();
        let entry = ledger.get(2).unwrap();
        assert_eq!(entry.phase, Phase::Shares);
        assert_eq!(entry.reason, Reason::AccusedGuilty);
        assert!(!ledger.is_disqualified(3));
    }

    let outputs = complete(states, &points);
    assert_consistent(&outputs, &[1, 3, 4], 3);
    assert_eq!(
        outputs[0].as_ref().unwrap().ledger.survivors,
        vec![1, 3, 4]
    );
}

#[test]
fn forged_revealed_key_disqualifies_the_accuser() {
    init_logging();

    let params = ThresholdParameters::<Suite>::new(4, 3).unwrap();
    let roster = [1, 2, 3, 4];

    let (states, keys) = announce(&params, &roster);
    let (states, commitments, peer_shares) = share(states, &keys);
    let (states, mut accusations) = verify_shares(states, &commitments, &peer_shares);

    // Member 3 accuses member 2, revealing a key it never announced.
    let mut forged = BTreeMap::new();
    forged.insert(2, EphemeralPrivateKey::<Suite>::generate(OsRng));
    accusations[2] = SecretSharesAccusationsMessage::new(3, forged).unwrap();

    let (states, points) = resolve_shares(states, &accusations);
    for member in [1, 2, 4] {
        let ledger = states[member - 1].ledger();
        assert_eq!(ledger.get(3).map(|entry| entry.reason), Some(Reason::KeyMismatch));
        assert!(!ledger.is_disqualified(2));
    }

    let outputs = complete(states, &points);
    assert_consistent(&outputs, &[1, 2, 4], 3);
}

#[test]
fn empty_accusations_change_nothing() {
    init_logging();

    let params = ThresholdParameters::<Suite>::new(3, 2).unwrap();
    let roster = [1, 2, 3];

    let (states, keys) = announce(&params, &roster);
    let (states, commitments, peer_shares) = share(states, &keys);
    let (states, _) = verify_shares(states, &commitments, &peer_shares);

    let accusations: Vec<_> = roster
        .iter()
        .map(|index| SecretSharesAccusationsMessage::new(*index, BTreeMap::new()).unwrap())
        .collect();
    let (states, _) = resolve_shares(states, &accusations);

    for state in states.iter() {
        assert!(state.ledger().disqualified().is_empty());
        assert_eq!(state.disputes(Phase::Shares).accusations().count(), 0);
    }
}

#[test]
fn tampered_points_are_reconstructed() {
    init_logging();

    let params = ThresholdParameters::<Suite>::new(4, 3).unwrap();
    let roster = [1, 2, 3, 4];

    let (states, keys) = announce(&params, &roster);
    let (states, commitments, peer_shares) = share(states, &keys);
    let (states, accusations) = verify_shares(states, &commitments, &peer_shares);
    let (states, mut points) = resolve_shares(states, &accusations);

    let expected: G = points
        .iter()
        .map(|message| message.public_key_share_points()[0])
        .sum();

    // Member 4 publishes points inconsistent with the shares it sent.
    let mut tampered = points[3].public_key_share_points().to_vec();
    tampered[1] += G::generator();
    points[3] = MemberPublicKeySharePointsMessage::new(4, tampered, &params).unwrap();

    let (states, accusations) = verify_points(states, &points);
    for member in [1, 2, 3] {
        assert_eq!(
            accusations[member - 1]
                .accused_members_keys()
                .keys()
                .copied()
                .collect::<Vec<_>>(),
            vec![4]
        );
    }

    let (states, reveals) = resolve_points(states, &accusations);
    for member in [1, 2, 3] {
        let entry = *states[member - 1].ledger().get(4).unwrap();
        assert_eq!(entry.phase, Phase::Points);
        assert_eq!(entry.reason, Reason::AccusedGuilty);
        assert!(reveals[member - 1]
            .disqualified_members_keys()
            .contains_key(&4));
    }

    let outputs = finish(states, &reveals);
    let group_key = assert_consistent(&outputs, &[1, 2, 3], 3);

    // Member 4 stays in the qualified set: its contribution is part of the key.
    assert_eq!(group_key.key().into_affine(), expected.into_affine());
}

#[test]
fn silent_member_is_disqualified() {
    init_logging();

    let params = ThresholdParameters::<Suite>::new(4, 3).unwrap();
    let roster = [1, 2, 3, 4];

    let (states, keys) = announce(&params, &roster);
    let (states, mut commitments, peer_shares) = share(states, &keys);

    // Member 4's commitments never reach the group.
    commitments.retain(|message| message.sender_id() != 4);

    let (states, accusations) = verify_shares(states, &commitments, &peer_shares);
    for member in [1, 2, 3] {
        let entry = *states[member - 1].ledger().get(4).unwrap();
        assert_eq!(entry.phase, Phase::Shares);
        assert_eq!(entry.reason, Reason::Inactive);
    }

    let (states, points) = resolve_shares(states, &accusations);
    let outputs = complete(states, &points);
    assert_consistent(&outputs, &[1, 2, 3], 3);
}

#[test]
fn too_many_disqualified_members() {
    init_logging();

    let params = ThresholdParameters::<Suite>::new(3, 3).unwrap();
    let roster = [1, 2, 3];

    let (states, keys) = announce(&params, &roster);
    let (states, mut commitments, peer_shares) = share(states, &keys);
    commitments.retain(|message| message.sender_id() != 3);

    let (states, accusations) = verify_shares(states, &commitments, &peer_shares);
    let (states, points) = resolve_shares(states, &accusations);
    let outputs = complete(states, &points);

    for member in [1, 2] {
        assert_eq!(
            outputs[member - 1].as_ref().unwrap_err(),
            &gjkr::Error::TooManyDisqualifiedMembers(vec![3])
        );
    }
}

#[test]
fn forged_reveal_is_ignored_during_reconstruction() {
    init_logging();

    let params = ThresholdParameters::<Suite>::new(5, 3).unwrap();
    let roster = [1, 2, 3, 4, 5];

    let (states, keys) = announce(&params, &roster);
    let (states, commitments, peer_shares) = share(states, &keys);
    let (states, accusations) = verify_shares(states, &commitments, &peer_shares);
    let (states, mut points) = resolve_shares(states, &accusations);

    let expected: G = points
        .iter()
        .map(|message| message.public_key_share_points()[0])
        .sum();

    // Member 5 publishes points inconsistent with the shares it sent.
    let mut tampered = points[4].public_key_share_points().to_vec();
    tampered[2] += G::generator();
    points[4] = MemberPublicKeySharePointsMessage::new(5, tampered, &params).unwrap();

    let (states, accusations) = verify_points(states, &points);
    let (states, mut reveals) = resolve_points(states, &accusations);

    // Member 4 reveals a key toward member 5 that it never announced.
    let mut forged = BTreeMap::new();
    forged.insert(5, EphemeralPrivateKey::<Suite>::generate(OsRng));
    reveals[3] = DisqualifiedMembersKeysMessage::new(4, forged).unwrap();

    let outputs = finish(states, &reveals);
    let group_key = assert_consistent(&outputs, &[1, 2, 3, 4], 3);

    assert_eq!(group_key.key().into_affine(), expected.into_affine());
    let ledger = &outputs[0].as_ref().unwrap().ledger;
    assert_eq!(ledger.disqualified.keys().copied().collect::<Vec<_>>(), vec![5]);
    assert_eq!(ledger.disqualified[&5].phase, Phase::Points);
    assert_eq!(ledger.disqualified[&5].reason, Reason::AccusedGuilty);
}

#[test]
fn conflicting_accusations_disqualify_their_sender() {
    init_logging();

    let params = ThresholdParameters::<Suite>::new(4, 3).unwrap();
    let roster = [1, 2, 3, 4];

    let (states, keys) = announce(&params, &roster);
    let (states, commitments, peer_shares) = share(states, &keys);
    let (states, mut accusations) = verify_shares(states, &commitments, &peer_shares);

    // Member 3 broadcasts a second, different set of accusations.
    let mut second = BTreeMap::new();
    second.insert(2, EphemeralPrivateKey::<Suite>::generate(OsRng));
    accusations.push(SecretSharesAccusationsMessage::new(3, second).unwrap());

    let (states, points) = resolve_shares(states, &accusations);
    for member in [1, 2, 4] {
        let ledger = states[member - 1].ledger();
        let entry = ledger.get(3).unwrap();
        assert_eq!(entry.phase, Phase::Shares);
        assert_eq!(entry.reason, Reason::ConflictingMessages);
        assert!(!ledger.is_disqualified(2));
        assert_eq!(states[member - 1].disputes(Phase::Shares).accusations().count(), 0);
    }

    let outputs = complete(states, &points);
    assert_consistent(&outputs, &[1, 2, 4], 3);
    assert_eq!(outputs[0].as_ref().unwrap().ledger.survivors, vec![1, 2, 4]);
}

#[test]
fn false_points_accusation_disqualifies_the_accuser() {
    init_logging();

    let params = ThresholdParameters::<Suite>::new(4, 3).unwrap();
    let roster = [1, 2, 3, 4];

    let (states, keys) = announce(&params, &roster);
    let (states, commitments, peer_shares) = share(states, &keys);
    let (states, accusations) = verify_shares(states, &commitments, &peer_shares);
    let (states, points) = resolve_shares(states, &accusations);

    let expected: G = points
        .iter()
        .map(|message| message.public_key_share_points()[0])
        .sum();

    let (states, mut accusations) = verify_points(states, &points);

    // Member 4 accuses member 2 of publishing bad points, with a forged key.
    let mut forged = BTreeMap::new();
    forged.insert(2, EphemeralPrivateKey::<Suite>::generate(OsRng));
    accusations[3] = PointsAccusationsMessage::new(4, forged).unwrap();

    let (states, reveals) = resolve_points(states, &accusations);
    for member in [1, 2, 3] {
        let ledger = states[member - 1].ledger();
        let entry = ledger.get(4).unwrap();
        assert_eq!(entry.phase, Phase::Points);
        assert_eq!(entry.reason, Reason::KeyMismatch);
        assert!(!ledger.is_disqualified(2));
        assert!(reveals[member - 1]
            .disqualified_members_keys()
            .contains_key(&4));
    }

    let outputs = finish(states, &reveals);
    let group_key = assert_consistent(&outputs, &[1, 2, 3], 3);

    // Member 4 was qualified after the shares phase: its contribution is reconstructed.
    assert_eq!(group_key.key().into_affine(), expected.into_affine());
}
