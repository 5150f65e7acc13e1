//! The state machine run by every member of a GJKR session.
//!
//! Each round consumes the messages broadcast during the previous one and
//! returns the member's next state along with the messages it must send.
//! A member never aborts because of another member's behavior: malformed,
//! conflicting or missing messages disqualify their sender, and accusations
//! are resolved identically by every member from the broadcast [`Transcript`].

use std::collections::BTreeMap;

use ark_ec::Group;
use ark_ff::Zero;
use rand::{CryptoRng, RngCore};
use rayon::prelude::*;
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::ciphersuite::CipherSuite;
use crate::dkg::accusation::DisputeBoard;
use crate::dkg::ledger::{DisqualificationLedger, LedgerSnapshot, Phase, Reason};
use crate::dkg::messages::{
    DisqualifiedMembersKeysMessage, EphemeralPublicKeyMessage, MemberCommitmentsMessage,
    MemberId, MemberPublicKeySharePointsMessage, PeerSharesMessage, PointsAccusationsMessage,
    SecretSharesAccusationsMessage,
};
use crate::dkg::polynomial::{Pedersen, Polynomial, ShareVerifier};
use crate::dkg::rounds::{
    DkgState, EphemeralKeyExchange, PointsJustification, PointsVerification, Reconstruction,
    SharesJustification, SharesVerification,
};
use crate::dkg::transcript::{Recorded, Transcript};
use crate::keys::{
    EphemeralKeyPair, EphemeralPrivateKey, GroupKey, IndividualSigningKey, SymmetricKey,
};
use crate::parameters::ThresholdParameters;
use crate::utils::{calculate_lagrange_coefficients, Scalar};
use crate::{DkgResult, Error};

/// State machine structures for holding intermediate values during a
/// distributed key generation protocol run, to prevent misuse.
#[derive(Clone, Debug)]
pub struct DistributedKeyGeneration<S: DkgState, C: CipherSuite> {
    state: Box<ActualState<C>>,
    data: S,
}

/// Shared state which occurs across all rounds of a session.
#[derive(Clone, Debug)]
struct ActualState<C: CipherSuite> {
    /// The parameters of this session.
    parameters: ThresholdParameters<C>,
    /// The index of the member.
    index: MemberId,
    /// The ephemeral key pairs generated toward every other member.
    ephemeral_keys: BTreeMap<MemberId, EphemeralKeyPair<C>>,
    /// The symmetric keys shared with every other qualified member.
    symmetric_keys: BTreeMap<MemberId, SymmetricKey<C>>,
    /// The polynomial whose constant term is this member's contribution.
    secret_polynomial: Polynomial<C>,
    /// The polynomial hiding the secret one in the Pedersen commitments.
    blinding_polynomial: Polynomial<C>,
    /// The valid shares `(s_ji, t_ji)` received from every other member `j`.
    received_shares: BTreeMap<MemberId, (Scalar<C>, Scalar<C>)>,
    transcript: Transcript<C>,
    ledger: DisqualificationLedger,
    verifier: Pedersen<C>,
    shares_disputes: DisputeBoard<C>,
    points_disputes: DisputeBoard<C>,
}

/// The result of a session, from the point of view of one member.
#[derive(Clone, Debug)]
pub struct DkgOutput<C: CipherSuite> {
    /// The public key of the group.
    pub group_public_key: GroupKey<C>,
    /// This member's secret share of the group private key.
    pub signing_share: IndividualSigningKey<C>,
    /// Who got disqualified, when, and why.
    pub ledger: LedgerSnapshot,
}

impl<C: CipherSuite> ActualState<C> {
    fn peers(&self) -> Vec<MemberId> {
        self.transcript
            .roster()
            .iter()
            .copied()
            .filter(|member| *member != self.index)
            .collect()
    }

    fn board(&mut self, phase: Phase) -> &mut DisputeBoard<C> {
        match phase {
            Phase::Shares => &mut self.shares_disputes,
            Phase::Points => &mut self.points_disputes,
        }
    }

    /// Record a message received from `sender`, disqualifying it if the
    /// message is malformed or conflicts with a previous one.
    fn admit(
        &mut self,
        sender: MemberId,
        phase: Phase,
        check: DkgResult<()>,
        record: impl FnOnce(&mut Transcript<C>) -> DkgResult<Recorded>,
    ) {
        if sender == self.index {
            return;
        }
        if !self.transcript.is_member(sender) {
            debug!(index = self.index, sender, "ignoring message from a non-member");
            return;
        }
        if self.ledger.is_disqualified(sender) {
            debug!(index = self.index, sender, "ignoring message from a disqualified member");
            return;
        }

        if let Err(error) = check {
            warn!(index = self.index, sender, %error, "received an invalid message");
            self.ledger.disqualify(sender, phase, Reason::InvalidMessage);
            return;
        }

        match record(&mut self.transcript) {
            Ok(Recorded::New) | Ok(Recorded::Duplicate) => {}
            Ok(Recorded::Conflict) => {
                self.ledger
                    .disqualify(sender, phase, Reason::ConflictingMessages);
            }
            Err(error) => {
                warn!(index = self.index, sender, %error, "received an invalid message");
                self.ledger.disqualify(sender, phase, Reason::InvalidMessage);
            }
        }
    }

    /// Disqualify every qualified peer for which `has_sent` does not hold.
    fn disqualify_inactive(
        &mut self,
        phase: Phase,
        has_sent: impl Fn(&Transcript<C>, MemberId) -> bool,
    ) {
        for peer in self.peers() {
            if !self.ledger.is_disqualified(peer) && !has_sent(&self.transcript, peer) {
                self.ledger.disqualify(peer, phase, Reason::Inactive);
            }
        }
    }

    fn own_private_key(&self, peer: MemberId) -> DkgResult<EphemeralPrivateKey<C>> {
        self.ephemeral_keys
            .get(&peer)
            .map(|key_pair| key_pair.private_key.clone())
            .ok_or(Error::MissingEphemeralKey {
                sender: self.index,
                receiver: peer,
            })
    }

    /// Accuse every member of `accused`, revealing our key toward each of them.
    fn accuse(
        &mut self,
        phase: Phase,
        accused: &[MemberId],
    ) -> DkgResult<BTreeMap<MemberId, EphemeralPrivateKey<C>>> {
        let index = self.index;
        let mut keys = BTreeMap::new();

        for peer in accused.iter() {
            let key = self.own_private_key(*peer)?;
            let board = self.board(phase);
            if board.accuse(index, *peer) {
                board.reveal(index, *peer, key.clone());
            }
            keys.insert(*peer, key);
        }

        Ok(keys)
    }

    /// Register the accusations broadcast by the other members.
    ///
    /// Each qualified member must broadcast exactly one accusations message,
    /// even an empty one.
    fn record_accusations<'a>(
        &mut self,
        phase: Phase,
        messages: impl IntoIterator<
            Item = (
                MemberId,
                DkgResult<()>,
                &'a BTreeMap<MemberId, EphemeralPrivateKey<C>>,
            ),
        >,
    ) {
        let mut received: BTreeMap<MemberId, &'a BTreeMap<MemberId, EphemeralPrivateKey<C>>> =
            BTreeMap::new();

        for (sender, check, keys) in messages {
            if sender == self.index
                || !self.transcript.is_member(sender)
                || self.ledger.is_disqualified(sender)
            {
                continue;
            }
            if let Err(error) = check {
                warn!(index = self.index, sender, %error, "received invalid accusations");
                self.ledger.disqualify(sender, phase, Reason::InvalidMessage);
                continue;
            }

            match received.get(&sender) {
                Some(previous) if *previous == keys => {}
                Some(_) => {
                    self.ledger
                        .disqualify(sender, phase, Reason::ConflictingMessages);
                }
                None => {
                    received.insert(sender, keys);
                }
            }
        }

        for peer in self.peers() {
            if !self.ledger.is_disqualified(peer) && !received.contains_key(&peer) {
                self.ledger.disqualify(peer, phase, Reason::Inactive);
            }
        }

        for (accuser, keys) in received {
            if self.ledger.is_disqualified(accuser) {
                continue;
            }
            let board = self.board(phase);
            for (accused, key) in keys.iter() {
                if board.accuse(accuser, *accused) {
                    board.reveal(accuser, *accused, key.clone());
                }
            }
        }
    }

    /// Resolve the accusations of `phase` and apply the verdicts to the ledger.
    fn resolve_disputes(&mut self, phase: Phase) {
        let board = match phase {
            Phase::Shares => &mut self.shares_disputes,
            Phase::Points => &mut self.points_disputes,
        };
        let resolutions = board.resolve(&self.transcript, &self.verifier);

        for resolution in resolutions.iter() {
            for (member, reason) in resolution.penalties() {
                self.ledger.disqualify(member, phase, reason);
            }
        }

        if self.ledger.is_disqualified(self.index) {
            warn!(index = self.index, ?phase, "this member has been disqualified");
        }
    }

    /// Decrypt and verify the shares `sender` sent to this member.
    fn check_received_shares(&self, sender: MemberId) -> Option<(Scalar<C>, Scalar<C>)> {
        let key = self.symmetric_keys.get(&sender)?;
        let message = self.transcript.peer_shares(sender, self.index)?;
        let commitments = self.transcript.commitments(sender)?;

        if !message.can_decrypt(key) {
            debug!(index = self.index, sender, "cannot decrypt received shares");
            return None;
        }
        let (share_s, share_t) = message.decrypt_shares(key).ok()?;

        self.verifier
            .verify_shares(self.index, &share_s, &share_t, commitments)
            .then_some((share_s, share_t))
    }

    /// Recover the share `member` sent to `revealer`, using the key revealed by the latter.
    fn recover_share(
        &self,
        member: MemberId,
        revealer: MemberId,
        key: &EphemeralPrivateKey<C>,
        commitments: &[C::G],
    ) -> DkgResult<Scalar<C>> {
        let public_key = self
            .transcript
            .ephemeral_public_key(revealer, member)
            .ok_or(Error::MissingEphemeralKey {
                sender: revealer,
                receiver: member,
            })?;
        if !key.matches(public_key) {
            return Err(Error::KeyMismatch {
                sender: revealer,
                receiver: member,
            });
        }

        let peer_public_key = self
            .transcript
            .ephemeral_public_key(member, revealer)
            .ok_or(Error::MissingEphemeralKey {
                sender: member,
                receiver: revealer,
            })?;
        let symmetric_key = SymmetricKey::derive(key, peer_public_key)?;
        let (share_s, share_t) = self
            .transcript
            .peer_shares(member, revealer)
            .ok_or(Error::DecryptionError)?
            .decrypt_shares(&symmetric_key)?;

        if self
            .verifier
            .verify_shares(revealer, &share_s, &share_t, commitments)
        {
            Ok(share_s)
        } else {
            Err(Error::InvalidShare(member))
        }
    }

    /// Reconstruct `g^{z_m}` for a member `m` disqualified during the points phase.
    fn reconstruct_contribution(
        &self,
        member: MemberId,
        reveals: &[DisqualifiedMembersKeysMessage<C>],
    ) -> DkgResult<C::G> {
        let commitments = self
            .transcript
            .commitments(member)
            .ok_or(Error::InsufficientShares(member))?;

        let mut shares: BTreeMap<MemberId, Scalar<C>> = BTreeMap::new();
        if let Some((share_s, _)) = self.received_shares.get(&member) {
            shares.insert(self.index, *share_s);
        }

        for reveal in reveals.iter() {
            let revealer = reveal.sender_id();
            if revealer == member
                || shares.contains_key(&revealer)
                || !self.transcript.is_member(revealer)
                || self.ledger.is_disqualified(revealer)
                || reveal.check().is_err()
            {
                continue;
            }

            let key = match reveal.disqualified_members_keys().get(&member) {
                Some(key) => key,
                None => continue,
            };
            match self.recover_share(member, revealer, key, commitments) {
                Ok(share) => {
                    shares.insert(revealer, share);
                }
                Err(error) => warn!(revealer, member, %error, "ignoring unusable revealed key"),
            }
        }

        if shares.len() < self.parameters.t as usize {
            return Err(Error::InsufficientShares(member));
        }

        let indices: Vec<MemberId> = shares.keys().copied().collect();
        let mut secret = Scalar::<C>::zero();
        for (index, share) in shares.iter() {
            secret += calculate_lagrange_coefficients::<C>(*index, &indices)? * share;
        }

        let contribution = C::G::generator() * secret;
        secret.zeroize();
        shares.values_mut().for_each(Zeroize::zeroize);

        debug!(index = self.index, member, "reconstructed contribution");

        Ok(contribution)
    }
}

impl<S: DkgState, C: CipherSuite> DistributedKeyGeneration<S, C> {
    /// The index of this member.
    pub fn index(&self) -> MemberId {
        self.state.index
    }

    /// The parameters of this session.
    pub fn parameters(&self) -> &ThresholdParameters<C> {
        &self.state.parameters
    }

    /// The members disqualified so far.
    pub fn ledger(&self) -> &DisqualificationLedger {
        &self.state.ledger
    }

    /// Every message recorded so far.
    pub fn transcript(&self) -> &Transcript<C> {
        &self.state.transcript
    }

    /// The accusations of `phase`.
    pub fn disputes(&self, phase: Phase) -> &DisputeBoard<C> {
        match phase {
            Phase::Shares => &self.state.shares_disputes,
            Phase::Points => &self.state.points_disputes,
        }
    }
}

impl<C: CipherSuite> DistributedKeyGeneration<EphemeralKeyExchange, C> {
    /// Join a session as member `index` of `roster`.
    ///
    /// # Returns
    ///
    /// The initial state of this member, along with one ephemeral public key
    /// message toward every other member, to be broadcast.
    pub fn new(
        parameters: &ThresholdParameters<C>,
        index: MemberId,
        roster: &[MemberId],
        mut rng: impl RngCore + CryptoRng,
    ) -> DkgResult<(Self, Vec<EphemeralPublicKeyMessage<C>>)> {
        if index == 0 {
            return Err(Error::IndexIsZero);
        }
        if roster.len() != parameters.n as usize {
            return Err(Error::InvalidNumberOfParticipants(
                roster.len(),
                parameters.n,
            ));
        }

        let mut transcript = Transcript::new(roster)?;
        if !transcript.is_member(index) {
            return Err(Error::UnknownMember(index));
        }

        let peers: Vec<MemberId> = transcript
            .roster()
            .iter()
            .copied()
            .filter(|member| *member != index)
            .collect();

        let mut ephemeral_keys = BTreeMap::new();
        let mut messages = Vec::with_capacity(peers.len());
        for peer in peers {
            let key_pair = EphemeralKeyPair::<C>::generate(&mut rng);
            let message =
                EphemeralPublicKeyMessage::new(index, peer, key_pair.public_key.clone())?;
            transcript.record_ephemeral_public_key(&message)?;

            ephemeral_keys.insert(peer, key_pair);
            messages.push(message);
        }

        debug!(index, peers = messages.len(), "generated ephemeral keys");

        let state = ActualState {
            parameters: *parameters,
            index,
            ephemeral_keys,
            symmetric_keys: BTreeMap::new(),
            secret_polynomial: Polynomial::random(parameters.t as usize, &mut rng),
            blinding_polynomial: Polynomial::random(parameters.t as usize, &mut rng),
            received_shares: BTreeMap::new(),
            transcript,
            ledger: DisqualificationLedger::new(),
            verifier: Pedersen::new(),
            shares_disputes: DisputeBoard::new(Phase::Shares),
            points_disputes: DisputeBoard::new(Phase::Points),
        };

        Ok((
            DistributedKeyGeneration {
                state: Box::new(state),
                data: EphemeralKeyExchange {},
            },
            messages,
        ))
    }

    /// Derive the symmetric keys shared with the other members from the
    /// broadcast ephemeral public keys, then commit to this member's
    /// polynomials and encrypt a pair of shares for every qualified peer.
    ///
    /// A member that did not broadcast a key toward every other member is
    /// disqualified as inactive.
    ///
    /// # Returns
    ///
    /// The next state, the commitments to broadcast and the encrypted shares
    /// to deliver to every member.
    #[allow(clippy::wrong_self_convention)]
    pub fn to_sharing(
        mut self,
        ephemeral_keys: &[EphemeralPublicKeyMessage<C>],
        mut rng: impl RngCore + CryptoRng,
    ) -> DkgResult<(
        DistributedKeyGeneration<SharesVerification, C>,
        MemberCommitmentsMessage<C>,
        Vec<PeerSharesMessage<C>>,
    )> {
        // Sanity check
        assert_eq!(self.data, EphemeralKeyExchange {});

        let index = self.state.index;

        for message in ephemeral_keys.iter() {
            self.state
                .admit(message.sender_id(), Phase::Shares, message.check(), |transcript| {
                    transcript.record_ephemeral_public_key(message)
                });
        }

        let roster = self.state.transcript.roster().to_vec();
        for sender in roster.iter() {
            let complete = roster.iter().all(|receiver| {
                receiver == sender
                    || self
                        .state
                        .transcript
                        .ephemeral_public_key(*sender, *receiver)
                        .is_some()
            });
            if !complete {
                self.state
                    .ledger
                    .disqualify(*sender, Phase::Shares, Reason::Inactive);
            }
        }

        for peer in self.state.peers() {
            if self.state.ledger.is_disqualified(peer) {
                continue;
            }

            let peer_public_key = self
                .state
                .transcript
                .ephemeral_public_key(peer, index)
                .ok_or(Error::MissingEphemeralKey {
                    sender: peer,
                    receiver: index,
                })?;
            let own_private_key = &self
                .state
                .ephemeral_keys
                .get(&peer)
                .ok_or(Error::MissingEphemeralKey {
                    sender: index,
                    receiver: peer,
                })?
                .private_key;

            let symmetric_key = SymmetricKey::derive(own_private_key, peer_public_key)?;
            self.state.symmetric_keys.insert(peer, symmetric_key);
        }

        let commitments = self
            .state
            .verifier
            .commit(&self.state.secret_polynomial, &self.state.blinding_polynomial);
        let commitments = MemberCommitmentsMessage::new(index, commitments, &self.state.parameters)?;
        self.state.transcript.record_commitments(&commitments)?;

        let mut peer_shares = Vec::with_capacity(self.state.symmetric_keys.len());
        for (peer, key) in self.state.symmetric_keys.iter() {
            let mut share_s = self.state.secret_polynomial.evaluate(*peer);
            let mut share_t = self.state.blinding_polynomial.evaluate(*peer);

            let message = PeerSharesMessage::new(index, *peer, &share_s, &share_t, key, &mut rng);
            share_s.zeroize();
            share_t.zeroize();

            peer_shares.push(message?);
        }
        for message in peer_shares.iter() {
            self.state.transcript.record_peer_shares(message)?;
        }

        debug!(index, shares = peer_shares.len(), "committed and encrypted shares");

        Ok((
            DistributedKeyGeneration {
                state: self.state,
                data: SharesVerification {},
            },
            commitments,
            peer_shares,
        ))
    }
}

impl<C: CipherSuite> DistributedKeyGeneration<SharesVerification, C> {
    /// Check the shares received from every qualified member against its commitments.
    ///
    /// `peer_shares` holds every encrypted share of the session, not only the
    /// ones addressed to this member: they are kept as evidence for the
    /// resolution of accusations.
    ///
    /// # Returns
    ///
    /// The next state and the accusations to broadcast. A member whose shares
    /// are missing, cannot be decrypted or do not verify is accused.
    pub fn verify_shares(
        mut self,
        commitments: &[MemberCommitmentsMessage<C>],
        peer_shares: &[PeerSharesMessage<C>],
    ) -> DkgResult<(
        DistributedKeyGeneration<SharesJustification, C>,
        SecretSharesAccusationsMessage<C>,
    )> {
        // Sanity check
        assert_eq!(self.data, SharesVerification {});

        let index = self.state.index;
        let parameters = self.state.parameters;

        for message in commitments.iter() {
            self.state.admit(
                message.sender_id(),
                Phase::Shares,
                message.check(&parameters),
                |transcript| transcript.record_commitments(message),
            );
        }
        for message in peer_shares.iter() {
            self.state
                .admit(message.sender_id(), Phase::Shares, message.check(), |transcript| {
                    transcript.record_peer_shares(message)
                });
        }
        self.state
            .disqualify_inactive(Phase::Shares, |transcript, peer| {
                transcript.commitments(peer).is_some()
            });

        let state = &self.state;
        let checked: Vec<(MemberId, Option<(Scalar<C>, Scalar<C>)>)> = state
            .peers()
            .into_par_iter()
            .filter(|peer| !state.ledger.is_disqualified(*peer))
            .map(|peer| (peer, state.check_received_shares(peer)))
            .collect();

        let mut accused = Vec::new();
        for (peer, shares) in checked {
            match shares {
                Some(shares) => {
                    self.state.received_shares.insert(peer, shares);
                }
                None => accused.push(peer),
            }
        }

        let keys = self.state.accuse(Phase::Shares, &accused)?;
        let accusations = SecretSharesAccusationsMessage::new(index, keys)?;

        debug!(index, accused = ?accused, "verified received shares");

        Ok((
            DistributedKeyGeneration {
                state: self.state,
                data: SharesJustification {},
            },
            accusations,
        ))
    }
}

impl<C: CipherSuite> DistributedKeyGeneration<SharesJustification, C> {
    /// Resolve the accusations of the shares phase, then publish this
    /// member's public key share points.
    ///
    /// A member that did not broadcast its accusations (even an empty set)
    /// is disqualified as inactive.
    ///
    /// # Returns
    ///
    /// The next state and the public key share points to broadcast.
    pub fn resolve_shares_accusations(
        mut self,
        accusations: &[SecretSharesAccusationsMessage<C>],
    ) -> DkgResult<(
        DistributedKeyGeneration<PointsVerification, C>,
        MemberPublicKeySharePointsMessage<C>,
    )> {
        // Sanity check
        assert_eq!(self.data, SharesJustification {});

        let index = self.state.index;

        self.state.record_accusations(
            Phase::Shares,
            accusations.iter().map(|message| {
                (
                    message.sender_id(),
                    message.check(),
                    message.accused_members_keys(),
                )
            }),
        );
        self.state.resolve_disputes(Phase::Shares);

        // Disqualified members are no longer part of the signing share.
        for member in self.state.ledger.disqualified() {
            if let Some((mut share_s, mut share_t)) = self.state.received_shares.remove(&member) {
                share_s.zeroize();
                share_t.zeroize();
            }
        }

        let points = self.state.secret_polynomial.public_points();
        let points = MemberPublicKeySharePointsMessage::new(index, points, &self.state.parameters)?;
        self.state.transcript.record_public_key_share_points(&points)?;

        debug!(
            index,
            disqualified = ?self.state.ledger.disqualified_in(Phase::Shares),
            "resolved shares accusations"
        );

        Ok((
            DistributedKeyGeneration {
                state: self.state,
                data: PointsVerification {},
            },
            points,
        ))
    }
}

impl<C: CipherSuite> DistributedKeyGeneration<PointsVerification, C> {
    /// Check the public key share points of every qualified member against
    /// the share received from it.
    ///
    /// # Returns
    ///
    /// The next state and the accusations to broadcast.
    pub fn verify_points(
        mut self,
        points: &[MemberPublicKeySharePointsMessage<C>],
    ) -> DkgResult<(
        DistributedKeyGeneration<PointsJustification, C>,
        PointsAccusationsMessage<C>,
    )> {
        // Sanity check
        assert_eq!(self.data, PointsVerification {});

        let index = self.state.index;
        let parameters = self.state.parameters;

        for message in points.iter() {
            self.state.admit(
                message.sender_id(),
                Phase::Points,
                message.check(&parameters),
                |transcript| transcript.record_public_key_share_points(message),
            );
        }
        self.state
            .disqualify_inactive(Phase::Points, |transcript, peer| {
                transcript.public_key_share_points(peer).is_some()
            });

        let state = &self.state;
        let accused: Vec<MemberId> = state
            .peers()
            .into_par_iter()
            .filter(|peer| !state.ledger.is_disqualified(*peer))
            .filter(|peer| {
                match (
                    state.received_shares.get(peer),
                    state.transcript.public_key_share_points(*peer),
                ) {
                    (Some((share_s, _)), Some(points)) => {
                        !state.verifier.verify_points(index, share_s, points)
                    }
                    _ => false,
                }
            })
            .collect();

        let keys = self.state.accuse(Phase::Points, &accused)?;
        let accusations = PointsAccusationsMessage::new(index, keys)?;

        debug!(index, accused = ?accused, "verified public key share points");

        Ok((
            DistributedKeyGeneration {
                state: self.state,
                data: PointsJustification {},
            },
            accusations,
        ))
    }
}

impl<C: CipherSuite> DistributedKeyGeneration<PointsJustification, C> {
    /// Resolve the accusations of the points phase.
    ///
    /// # Returns
    ///
    /// The next state and this member's ephemeral private keys toward every
    /// member disqualified during the points phase, to be broadcast so that
    /// their contributions can be reconstructed.
    pub fn resolve_points_accusations(
        mut self,
        accusations: &[PointsAccusationsMessage<C>],
    ) -> DkgResult<(
        DistributedKeyGeneration<Reconstruction, C>,
        DisqualifiedMembersKeysMessage<C>,
    )> {
        // Sanity check
        assert_eq!(self.data, PointsJustification {});

        let index = self.state.index;

        self.state.record_accusations(
            Phase::Points,
            accusations.iter().map(|message| {
                (
                    message.sender_id(),
                    message.check(),
                    message.accused_members_keys(),
                )
            }),
        );
        self.state.resolve_disputes(Phase::Points);

        let mut keys = BTreeMap::new();
        for member in self.state.ledger.disqualified_in(Phase::Points) {
            if member != index {
                keys.insert(member, self.state.own_private_key(member)?);
            }
        }
        let reveal = DisqualifiedMembersKeysMessage::new(index, keys)?;

        debug!(
            index,
            disqualified = ?self.state.ledger.disqualified_in(Phase::Points),
            "resolved points accusations"
        );

        Ok((
            DistributedKeyGeneration {
                state: self.state,
                data: Reconstruction {},
            },
            reveal,
        ))
    }
}

impl<C: CipherSuite> DistributedKeyGeneration<Reconstruction, C> {
    /// Calculate this member's long-lived secret signing share and the
    /// group's public key.
    ///
    /// The signing share is the sum of the shares received from the members
    /// that survived the shares phase. The group key sums their public key
    /// share points, reconstructing from `reveals` the contribution of those
    /// disqualified during the points phase.
    pub fn finish(
        mut self,
        reveals: &[DisqualifiedMembersKeysMessage<C>],
    ) -> DkgResult<DkgOutput<C>> {
        // Sanity check
        assert_eq!(self.data, Reconstruction {});

        let index = self.state.index;
        let roster = self.state.transcript.roster().to_vec();

        let survivors = self.state.ledger.survivors(&roster);
        if survivors.len() < self.state.parameters.t as usize {
            return Err(Error::TooManyDisqualifiedMembers(
                self.state.ledger.disqualified(),
            ));
        }

        let disqualified_in_shares = self.state.ledger.disqualified_in(Phase::Shares);
        let disqualified_in_points = self.state.ledger.disqualified_in(Phase::Points);

        let signing_share = self.calculate_signing_key(&roster, &disqualified_in_shares)?;

        let mut group_key = C::G::zero();
        for member in survivors.iter() {
            let points = self
                .state
                .transcript
                .public_key_share_points(*member)
                .ok_or(Error::InsufficientShares(*member))?;
            group_key += points.first().copied().unwrap_or_else(C::G::zero);
        }
        for member in disqualified_in_points.iter() {
            group_key += self.state.reconstruct_contribution(*member, reveals)?;
        }

        for (share_s, share_t) in self.state.received_shares.values_mut() {
            share_s.zeroize();
            share_t.zeroize();
        }

        debug!(index, survivors = ?survivors, "session finished");

        Ok(DkgOutput {
            group_public_key: GroupKey(group_key),
            signing_share,
            ledger: self.state.ledger.snapshot(&roster),
        })
    }

    /// Sum the shares received from every member of the qualified set.
    fn calculate_signing_key(
        &self,
        roster: &[MemberId],
        disqualified_in_shares: &[MemberId],
    ) -> DkgResult<IndividualSigningKey<C>> {
        let index = self.state.index;
        let mut key = Scalar::<C>::zero();

        for member in roster.iter() {
            if disqualified_in_shares.contains(member) {
                continue;
            }
            if *member == index {
                key += self.state.secret_polynomial.evaluate(index);
                continue;
            }

            let (share_s, _) = self
                .state
                .received_shares
                .get(member)
                .ok_or(Error::InsufficientShares(*member))?;
            key += share_s;
        }

        Ok(IndividualSigningKey { index, key })
    }
}
