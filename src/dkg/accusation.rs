//! Accusations and their resolution.
//!
//! An accusation carries its own evidence: the accuser's ephemeral private
//! key toward the accused. With it, any member can recompute the symmetric key
//! of the disputed conversation, decrypt the [`PeerSharesMessage`] found in
//! the [`Transcript`], and decide who lied.
//!
//! [`PeerSharesMessage`]: crate::dkg::PeerSharesMessage

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::ciphersuite::CipherSuite;
use crate::dkg::ledger::{Phase, Reason};
use crate::dkg::messages::MemberId;
use crate::dkg::polynomial::ShareVerifier;
use crate::dkg::transcript::Transcript;
use crate::keys::{EphemeralPrivateKey, SymmetricKey};

/// The outcome of an accusation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The accused sent shares which could not be decrypted or verified.
    AccusedGuilty,
    /// The accusation was unfounded, or its evidence was forged.
    AccuserGuilty {
        /// Whether the revealed key did not match the broadcast public key.
        key_mismatch: bool,
    },
    /// Neither party's evidence can be trusted.
    BothGuilty,
}

impl Verdict {
    /// The members disqualified by this verdict, and why.
    pub fn penalties(&self, accuser: MemberId, accused: MemberId) -> Vec<(MemberId, Reason)> {
        match self {
            Verdict::AccusedGuilty => vec![(accused, Reason::AccusedGuilty)],
            Verdict::AccuserGuilty { key_mismatch: true } => vec![(accuser, Reason::KeyMismatch)],
            Verdict::AccuserGuilty { key_mismatch: false } => {
                vec![(accuser, Reason::FalseAccusation)]
            }
            Verdict::BothGuilty => vec![
                (accuser, Reason::AmbiguousEvidence),
                (accused, Reason::AmbiguousEvidence),
            ],
        }
    }
}

/// Where an ordered (accuser, accused) pair stands within one phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum AccusationState {
    /// No accusation was made.
    #[default]
    Unaccused,
    /// The accusation was broadcast.
    Accused,
    /// The accuser's key toward the accused has been revealed.
    Resolving,
    /// Every member reached this verdict.
    Resolved(Verdict),
}

/// A resolved accusation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// The accusing member.
    pub accuser: MemberId,
    /// The accused member.
    pub accused: MemberId,
    /// Who was found guilty.
    pub verdict: Verdict,
}

impl Resolution {
    /// The members disqualified by this resolution, and why.
    pub fn penalties(&self) -> Vec<(MemberId, Reason)> {
        self.verdict.penalties(self.accuser, self.accused)
    }
}

/// Decide on an accusation of `accuser` against `accused`.
///
/// The decision only depends on its arguments, so that every member holding
/// the same transcript reaches the same verdict:
///
/// - an accusation against oneself, or against a non-member, is false;
/// - a revealed key which does not derive the public key broadcast by the
///   accuser toward the accused condemns the accuser, or both members when
///   the accused's own public evidence is missing too;
/// - otherwise the accused is guilty if its shares toward the accuser are
///   missing, cannot be decrypted, or do not verify against its commitments
///   (shares phase) or public key share points (points phase).
///
/// When the revealed key is wrong and the accused's evidence is missing too,
/// neither side can be trusted and both are disqualified
/// ([`Verdict::BothGuilty`]). An accused member can always avoid this by
/// broadcasting its own ephemeral key, encrypted shares and public values.
pub fn resolve_accusation<C: CipherSuite, V: ShareVerifier<C>>(
    phase: Phase,
    accuser: MemberId,
    accused: MemberId,
    revealed_key: &EphemeralPrivateKey<C>,
    transcript: &Transcript<C>,
    verifier: &V,
) -> Verdict {
    if accuser == accused || !transcript.is_member(accused) {
        warn!(accuser, accused, "accusation against an invalid member");
        return Verdict::AccuserGuilty {
            key_mismatch: false,
        };
    }

    let key_matches = transcript
        .ephemeral_public_key(accuser, accused)
        .is_some_and(|public_key| revealed_key.matches(public_key));

    let peer_public_key = transcript.ephemeral_public_key(accused, accuser);
    let peer_shares = transcript.peer_shares(accused, accuser);
    let public_values = match phase {
        Phase::Shares => transcript.commitments(accused),
        Phase::Points => transcript.public_key_share_points(accused),
    };

    if !key_matches {
        if peer_public_key.is_none() || peer_shares.is_none() || public_values.is_none() {
            warn!(
                accuser,
                accused,
                ?phase,
                "revealed key does not match and the accused's evidence is missing"
            );
            return Verdict::BothGuilty;
        }

        warn!(accuser, accused, ?phase, "revealed key does not match its public key");
        return Verdict::AccuserGuilty { key_mismatch: true };
    }

    let (peer_public_key, peer_shares, public_values) =
        match (peer_public_key, peer_shares, public_values) {
            (Some(key), Some(shares), Some(values)) => (key, shares, values),
            _ => {
                debug!(accuser, accused, ?phase, "accused's evidence is missing");
                return Verdict::AccusedGuilty;
            }
        };

    let symmetric_key = match SymmetricKey::derive(revealed_key, peer_public_key) {
        Ok(key) => key,
        Err(_) => return Verdict::AccusedGuilty,
    };

    let valid = match peer_shares.decrypt_shares(&symmetric_key) {
        Ok((share_s, share_t)) => match phase {
            Phase::Shares => verifier.verify_shares(accuser, &share_s, &share_t, public_values),
            Phase::Points => verifier.verify_points(accuser, &share_s, public_values),
        },
        Err(_) => false,
    };

    if valid {
        Verdict::AccuserGuilty {
            key_mismatch: false,
        }
    } else {
        Verdict::AccusedGuilty
    }
}

/// The accusations of one phase.
///
/// Accusations made during the shares phase have no bearing on those of the
/// points phase: each phase has its own board.
#[derive(Clone, Debug)]
pub struct DisputeBoard<C: CipherSuite> {
    phase: Phase,
    states: BTreeMap<(MemberId, MemberId), AccusationState>,
    revealed_keys: BTreeMap<(MemberId, MemberId), EphemeralPrivateKey<C>>,
}

impl<C: CipherSuite> DisputeBoard<C> {
    /// Create an empty board for `phase`.
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            states: BTreeMap::new(),
            revealed_keys: BTreeMap::new(),
        }
    }

    /// The phase of this board.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The state of the accusation of `accuser` against `accused`.
    pub fn state(&self, accuser: MemberId, accused: MemberId) -> AccusationState {
        self.states
            .get(&(accuser, accused))
            .copied()
            .unwrap_or_default()
    }

    /// All accusations made on this board, with their states.
    pub fn accusations(&self) -> impl Iterator<Item = (&(MemberId, MemberId), &AccusationState)> {
        self.states.iter()
    }

    /// Record that `accuser` accused `accused`. Returns `false` if it already did.
    pub(crate) fn accuse(&mut self, accuser: MemberId, accused: MemberId) -> bool {
        if self.state(accuser, accused) != AccusationState::Unaccused {
            return false;
        }

        warn!(accuser, accused, phase = ?self.phase, "accusation");
        self.states
            .insert((accuser, accused), AccusationState::Accused);

        true
    }

    /// Attach the accuser's revealed key to a pending accusation.
    pub(crate) fn reveal(
        &mut self,
        accuser: MemberId,
        accused: MemberId,
        key: EphemeralPrivateKey<C>,
    ) {
        if self.state(accuser, accused) == AccusationState::Accused {
            self.revealed_keys.insert((accuser, accused), key);
            self.states
                .insert((accuser, accused), AccusationState::Resolving);
        }
    }

    /// Resolve every accusation whose key has been revealed.
    ///
    /// Accusations are independent from one another and are resolved in
    /// parallel; the resolutions are returned in (accuser, accused) order.
    pub(crate) fn resolve<V: ShareVerifier<C>>(
        &mut self,
        transcript: &Transcript<C>,
        verifier: &V,
    ) -> Vec<Resolution> {
        let phase = self.phase;
        let pending: Vec<(&(MemberId, MemberId), &EphemeralPrivateKey<C>)> = self
            .revealed_keys
            .iter()
            .filter(|(pair, _)| self.states.get(*pair) == Some(&AccusationState::Resolving))
            .collect();

        let resolutions: Vec<Resolution> = pending
            .par_iter()
            .map(|((accuser, accused), key)| Resolution {
                accuser: *accuser,
                accused: *accused,
                verdict: resolve_accusation(phase, *accuser, *accused, key, transcript, verifier),
            })
            .collect();

        for resolution in resolutions.iter() {
            self.states.insert(
                (resolution.accuser, resolution.accused),
                AccusationState::Resolved(resolution.verdict),
            );
        }

        resolutions
    }
}
