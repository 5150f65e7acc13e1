//! Everything a member has seen broadcast during a session.
//!
//! Dispute resolution must reach the same verdict on every member, so it only
//! reads from the [`Transcript`], never from a member's private state.

use std::collections::BTreeMap;

use ark_ec::CurveGroup;

use crate::ciphersuite::CipherSuite;
use crate::dkg::messages::{
    EphemeralPublicKeyMessage, MemberCommitmentsMessage, MemberId,
    MemberPublicKeySharePointsMessage, PeerSharesMessage,
};
use crate::keys::EphemeralPublicKey;
use crate::{DkgResult, Error};

/// The outcome of recording a message in the [`Transcript`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Recorded {
    /// First message of its kind from this sender.
    New,
    /// Exact copy of a message already recorded; ignored.
    Duplicate,
    /// Differs from a message already recorded; the first one is kept.
    Conflict,
}

fn record<K: Ord, V>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    same: impl Fn(&V, &V) -> bool,
) -> Recorded {
    match map.get(&key) {
        Some(existing) if same(existing, &value) => Recorded::Duplicate,
        Some(_) => Recorded::Conflict,
        None => {
            map.insert(key, value);
            Recorded::New
        }
    }
}

fn same_points<G: CurveGroup>(a: &[G], b: &[G]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.into_affine() == y.into_affine())
}

/// Record of the public messages of one session, indexed by sender (and
/// receiver for pairwise messages).
#[derive(Clone, Debug)]
pub struct Transcript<C: CipherSuite> {
    roster: Vec<MemberId>,
    ephemeral_public_keys: BTreeMap<(MemberId, MemberId), EphemeralPublicKey<C>>,
    commitments: BTreeMap<MemberId, Vec<C::G>>,
    public_key_share_points: BTreeMap<MemberId, Vec<C::G>>,
    peer_shares: BTreeMap<(MemberId, MemberId), PeerSharesMessage<C>>,
}

impl<C: CipherSuite> Transcript<C> {
    /// Start an empty transcript for the members of `roster`.
    pub fn new(roster: &[MemberId]) -> DkgResult<Self> {
        let mut sorted = roster.to_vec();
        sorted.sort_unstable();
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                return Err(Error::DuplicateMember(pair[0]));
            }
        }
        if sorted.first() == Some(&0) {
            return Err(Error::IndexIsZero);
        }

        Ok(Self {
            roster: sorted,
            ephemeral_public_keys: BTreeMap::new(),
            commitments: BTreeMap::new(),
            public_key_share_points: BTreeMap::new(),
            peer_shares: BTreeMap::new(),
        })
    }

    /// The members of the session, in increasing order.
    pub fn roster(&self) -> &[MemberId] {
        &self.roster
    }

    /// Whether `member` belongs to the session.
    pub fn is_member(&self, member: MemberId) -> bool {
        self.roster.binary_search(&member).is_ok()
    }

    fn check_members(&self, members: &[MemberId]) -> DkgResult<()> {
        match members.iter().find(|member| !self.is_member(**member)) {
            Some(member) => Err(Error::UnknownMember(*member)),
            None => Ok(()),
        }
    }

    pub(crate) fn record_ephemeral_public_key(
        &mut self,
        message: &EphemeralPublicKeyMessage<C>,
    ) -> DkgResult<Recorded> {
        let (sender, receiver) = (message.sender_id(), message.receiver_id());
        self.check_members(&[sender, receiver])?;

        Ok(record(
            &mut self.ephemeral_public_keys,
            (sender, receiver),
            message.ephemeral_public_key().clone(),
            |a, b| a.0.into_affine() == b.0.into_affine(),
        ))
    }

    pub(crate) fn record_commitments(
        &mut self,
        message: &MemberCommitmentsMessage<C>,
    ) -> DkgResult<Recorded> {
        self.check_members(&[message.sender_id()])?;

        Ok(record(
            &mut self.commitments,
            message.sender_id(),
            message.commitments().to_vec(),
            |a, b| same_points(a, b),
        ))
    }

    pub(crate) fn record_peer_shares(
        &mut self,
        message: &PeerSharesMessage<C>,
    ) -> DkgResult<Recorded> {
        let (sender, receiver) = (message.sender_id(), message.receiver_id());
        self.check_members(&[sender, receiver])?;

        Ok(record(
            &mut self.peer_shares,
            (sender, receiver),
            message.clone(),
            |a, b| a == b,
        ))
    }

    pub(crate) fn record_public_key_share_points(
        &mut self,
        message: &MemberPublicKeySharePointsMessage<C>,
    ) -> DkgResult<Recorded> {
        self.check_members(&[message.sender_id()])?;

        Ok(record(
            &mut self.public_key_share_points,
            message.sender_id(),
            message.public_key_share_points().to_vec(),
            |a, b| same_points(a, b),
        ))
    }

    /// The public key `sender` generated for `receiver`.
    pub fn ephemeral_public_key(
        &self,
        sender: MemberId,
        receiver: MemberId,
    ) -> Option<&EphemeralPublicKey<C>> {
        self.ephemeral_public_keys.get(&(sender, receiver))
    }

    /// The commitments broadcast by `sender`.
    pub fn commitments(&self, sender: MemberId) -> Option<&[C::G]> {
        self.commitments.get(&sender).map(Vec::as_slice)
    }

    /// The public key share points broadcast by `sender`.
    pub fn public_key_share_points(&self, sender: MemberId) -> Option<&[C::G]> {
        self.public_key_share_points.get(&sender).map(Vec::as_slice)
    }

    /// The encrypted shares `sender` computed for `receiver`.
    pub fn peer_shares(
        &self,
        sender: MemberId,
        receiver: MemberId,
    ) -> Option<&PeerSharesMessage<C>> {
        self.peer_shares.get(&(sender, receiver))
    }
}
