//! The disqualification ledger of a session.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::dkg::messages::MemberId;

/// The phase of a session during which a member got disqualified.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Ephemeral key exchange, commitments, secret shares and their accusations.
    Shares,
    /// Public key share points and their accusations.
    Points,
}

/// Why a member got disqualified.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reason {
    /// The member did not send a message it was due to send.
    Inactive,
    /// The member sent a malformed message.
    InvalidMessage,
    /// The member sent two different messages for the same round.
    ConflictingMessages,
    /// An accusation against the member was upheld.
    AccusedGuilty,
    /// The member accused somebody who behaved honestly.
    FalseAccusation,
    /// The member revealed a private key not matching its broadcast public key.
    KeyMismatch,
    /// Both parties of an accusation were caught with contradicting evidence.
    AmbiguousEvidence,
}

/// A ledger entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Disqualification {
    /// When the member got disqualified.
    pub phase: Phase,
    /// Why the member got disqualified.
    pub reason: Reason,
}

/// Append-only record of the disqualified members of a session.
///
/// Disqualification is never reversed, and disqualifying a member twice
/// leaves the first entry untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisqualificationLedger {
    entries: BTreeMap<MemberId, Disqualification>,
}

impl DisqualificationLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disqualify `member`. Returns whether the member was newly disqualified.
    pub fn disqualify(&mut self, member: MemberId, phase: Phase, reason: Reason) -> bool {
        if let Some(existing) = self.entries.get(&member) {
            debug!(member, ?existing, ?reason, "member already disqualified");
            return false;
        }

        warn!(member, ?phase, ?reason, "disqualifying member");
        self.entries
            .insert(member, Disqualification { phase, reason });

        true
    }

    /// Whether `member` has been disqualified.
    pub fn is_disqualified(&self, member: MemberId) -> bool {
        self.entries.contains_key(&member)
    }

    /// The entry of `member`, if it has been disqualified.
    pub fn get(&self, member: MemberId) -> Option<&Disqualification> {
        self.entries.get(&member)
    }

    /// The members disqualified during `phase`, in increasing order.
    pub fn disqualified_in(&self, phase: Phase) -> Vec<MemberId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.phase == phase)
            .map(|(member, _)| *member)
            .collect()
    }

    /// All disqualified members, in increasing order.
    pub fn disqualified(&self) -> Vec<MemberId> {
        self.entries.keys().copied().collect()
    }

    /// The members of `roster` that are not disqualified, in increasing order.
    pub fn survivors(&self, roster: &[MemberId]) -> Vec<MemberId> {
        let mut survivors: Vec<MemberId> = roster
            .iter()
            .copied()
            .filter(|member| !self.is_disqualified(*member))
            .collect();
        survivors.sort_unstable();

        survivors
    }

    /// Freeze the ledger for the final group key assembly.
    pub fn snapshot(&self, roster: &[MemberId]) -> LedgerSnapshot {
        LedgerSnapshot {
            disqualified: self.entries.clone(),
            survivors: self.survivors(roster),
        }
    }
}

/// The final state of a [`DisqualificationLedger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// The disqualified members, with the phase and reason of their disqualification.
    pub disqualified: BTreeMap<MemberId, Disqualification>,
    /// The members that were never disqualified.
    pub survivors: Vec<MemberId>,
}
