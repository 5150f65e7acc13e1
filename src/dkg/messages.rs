//! The payloads exchanged by members during each round of a session.
//!
//! Every message is an immutable value: fields are only reachable through
//! accessors, and constructors reject malformed shapes (self-addressed
//! messages, sequences whose length differs from the reconstruction
//! threshold) before anything can be broadcast. Messages coming from the
//! network are deserialized without those guarantees, so receivers run
//! [`check`](MemberCommitmentsMessage::check)-style validation on them and
//! treat a failure as misbehavior of the sender.

use crate::ciphersuite::CipherSuite;
use crate::keys::{EphemeralPrivateKey, EphemeralPublicKey};
use crate::parameters::ThresholdParameters;
use crate::serialization::impl_serialization_traits;
use crate::{DkgResult, Error};

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use std::collections::BTreeMap;

/// A small positive integer identifying a member within one session.
pub type MemberId = u32;

fn check_pair(sender_id: MemberId, receiver_id: MemberId) -> DkgResult<()> {
    if sender_id == 0 || receiver_id == 0 {
        return Err(Error::IndexIsZero);
    }
    if sender_id == receiver_id {
        return Err(Error::SelfAddressedMessage(sender_id));
    }

    Ok(())
}

fn check_revealed_keys<C: CipherSuite>(
    sender_id: MemberId,
    keys: &BTreeMap<MemberId, EphemeralPrivateKey<C>>,
) -> DkgResult<()> {
    if sender_id == 0 {
        return Err(Error::IndexIsZero);
    }
    for member in keys.keys() {
        check_pair(sender_id, *member)?;
    }

    Ok(())
}

/// Carries the ephemeral public key generated by the sender specifically for
/// the receiver.
///
/// The receiver performs ECDH between this key and its own ephemeral private
/// key toward the sender, obtaining the symmetric key of their conversation.
/// It is broadcast so that every member knows the public key before any
/// secret is exchanged, and can later validate a revealed private key.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct EphemeralPublicKeyMessage<C: CipherSuite> {
    sender_id: MemberId,
    receiver_id: MemberId,
    ephemeral_public_key: EphemeralPublicKey<C>,
}

impl_serialization_traits!(EphemeralPublicKeyMessage<CipherSuite>);

impl<C: CipherSuite> EphemeralPublicKeyMessage<C> {
    /// Build a new message, rejecting self-addressed ones.
    pub fn new(
        sender_id: MemberId,
        receiver_id: MemberId,
        ephemeral_public_key: EphemeralPublicKey<C>,
    ) -> DkgResult<Self> {
        check_pair(sender_id, receiver_id)?;

        Ok(Self {
            sender_id,
            receiver_id,
            ephemeral_public_key,
        })
    }

    /// The member that generated the key pair.
    pub fn sender_id(&self) -> MemberId {
        self.sender_id
    }

    /// The member the key pair was generated for.
    pub fn receiver_id(&self) -> MemberId {
        self.receiver_id
    }

    /// The public half of the sender's key pair toward the receiver.
    pub fn ephemeral_public_key(&self) -> &EphemeralPublicKey<C> {
        &self.ephemeral_public_key
    }

    /// Validate a message received from the network.
    pub fn check(&self) -> DkgResult<()> {
        check_pair(self.sender_id, self.receiver_id)
    }
}

/// Carries the sender's Pedersen commitments `C_k = g^{a_k} h^{b_k}` to the
/// coefficients of its two secret polynomials.
///
/// The commitment at position `k` corresponds to the coefficients of degree `k`.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct MemberCommitmentsMessage<C: CipherSuite> {
    sender_id: MemberId,
    commitments: Vec<C::G>,
}

impl_serialization_traits!(MemberCommitmentsMessage<CipherSuite>);

impl<C: CipherSuite> MemberCommitmentsMessage<C> {
    /// Build a new message, enforcing that exactly `t` commitments are provided.
    pub fn new(
        sender_id: MemberId,
        commitments: Vec<C::G>,
        parameters: &ThresholdParameters<C>,
    ) -> DkgResult<Self> {
        let message = Self {
            sender_id,
            commitments,
        };
        message.check(parameters)?;

        Ok(message)
    }

    /// The member that committed to its polynomials.
    pub fn sender_id(&self) -> MemberId {
        self.sender_id
    }

    /// The commitments, ordered by coefficient degree.
    pub fn commitments(&self) -> &[C::G] {
        &self.commitments
    }

    /// Validate a message received from the network.
    pub fn check(&self, parameters: &ThresholdParameters<C>) -> DkgResult<()> {
        if self.sender_id == 0 {
            return Err(Error::IndexIsZero);
        }
        if self.commitments.len() != parameters.t as usize {
            return Err(Error::InvalidCommitmentLength {
                expected: parameters.t as usize,
                actual: self.commitments.len(),
            });
        }

        Ok(())
    }
}

/// Carries the shares `s_ij` and `t_ij` computed by the sender `i` for the
/// receiver `j`, each encrypted under their pairwise symmetric key.
///
/// Only the receiver can read the shares, but the ciphertexts are kept by
/// every member so that an accusation can be audited once a key is revealed.
/// See [`PeerSharesMessage::new`] for how it is built.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct PeerSharesMessage<C: CipherSuite> {
    pub(crate) sender_id: MemberId,
    pub(crate) receiver_id: MemberId,
    pub(crate) encrypted_share_s: Vec<u8>,
    pub(crate) encrypted_share_t: Vec<u8>,
    pub(crate) _phantom: core::marker::PhantomData<C>,
}

impl_serialization_traits!(PeerSharesMessage<CipherSuite>);

impl<C: CipherSuite> PeerSharesMessage<C> {
    /// The member that computed the shares.
    pub fn sender_id(&self) -> MemberId {
        self.sender_id
    }

    /// The member the shares were computed for.
    pub fn receiver_id(&self) -> MemberId {
        self.receiver_id
    }

    /// The encrypted share of the secret polynomial.
    pub fn encrypted_share_s(&self) -> &[u8] {
        &self.encrypted_share_s
    }

    /// The encrypted share of the blinding polynomial.
    pub fn encrypted_share_t(&self) -> &[u8] {
        &self.encrypted_share_t
    }

    /// Validate a message received from the network.
    pub fn check(&self) -> DkgResult<()> {
        check_pair(self.sender_id, self.receiver_id)
    }
}

/// Carries all of the sender's accusations after checking the shares it received.
///
/// For every accused member, the sender reveals the ephemeral private key it
/// generated toward that member, so that everybody can decrypt the disputed
/// [`PeerSharesMessage`]. An empty map means the sender accuses nobody.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct SecretSharesAccusationsMessage<C: CipherSuite> {
    sender_id: MemberId,
    accused_members_keys: BTreeMap<MemberId, EphemeralPrivateKey<C>>,
}

impl_serialization_traits!(SecretSharesAccusationsMessage<CipherSuite>);

impl<C: CipherSuite> SecretSharesAccusationsMessage<C> {
    /// Build a new message. A member cannot accuse itself.
    pub fn new(
        sender_id: MemberId,
        accused_members_keys: BTreeMap<MemberId, EphemeralPrivateKey<C>>,
    ) -> DkgResult<Self> {
        check_revealed_keys(sender_id, &accused_members_keys)?;

        Ok(Self {
            sender_id,
            accused_members_keys,
        })
    }

    /// The accusing member.
    pub fn sender_id(&self) -> MemberId {
        self.sender_id
    }

    /// The accused members along with the sender's revealed key toward each of them.
    pub fn accused_members_keys(&self) -> &BTreeMap<MemberId, EphemeralPrivateKey<C>> {
        &self.accused_members_keys
    }

    /// Validate a message received from the network.
    pub fn check(&self) -> DkgResult<()> {
        check_revealed_keys(self.sender_id, &self.accused_members_keys)
    }
}

/// Carries the sender's public key share points `A_k = g^{a_k}`.
///
/// Analogous to [`MemberCommitmentsMessage`], for the second verification round.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct MemberPublicKeySharePointsMessage<C: CipherSuite> {
    sender_id: MemberId,
    public_key_share_points: Vec<C::G>,
}

impl_serialization_traits!(MemberPublicKeySharePointsMessage<CipherSuite>);

impl<C: CipherSuite> MemberPublicKeySharePointsMessage<C> {
    /// Build a new message, enforcing that exactly `t` points are provided.
    pub fn new(
        sender_id: MemberId,
        public_key_share_points: Vec<C::G>,
        parameters: &ThresholdParameters<C>,
    ) -> DkgResult<Self> {
        let message = Self {
            sender_id,
            public_key_share_points,
        };
        message.check(parameters)?;

        Ok(message)
    }

    /// The member publishing its points.
    pub fn sender_id(&self) -> MemberId {
        self.sender_id
    }

    /// The points, ordered by coefficient degree.
    pub fn public_key_share_points(&self) -> &[C::G] {
        &self.public_key_share_points
    }

    /// Validate a message received from the network.
    pub fn check(&self, parameters: &ThresholdParameters<C>) -> DkgResult<()> {
        if self.sender_id == 0 {
            return Err(Error::IndexIsZero);
        }
        if self.public_key_share_points.len() != parameters.t as usize {
            return Err(Error::InvalidPointsLength {
                expected: parameters.t as usize,
                actual: self.public_key_share_points.len(),
            });
        }

        Ok(())
    }
}

/// Carries all of the sender's accusations after validating the public key
/// share points of the other members.
///
/// Same shape and semantics as [`SecretSharesAccusationsMessage`].
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct PointsAccusationsMessage<C: CipherSuite> {
    sender_id: MemberId,
    accused_members_keys: BTreeMap<MemberId, EphemeralPrivateKey<C>>,
}

impl_serialization_traits!(PointsAccusationsMessage<CipherSuite>);

impl<C: CipherSuite> PointsAccusationsMessage<C> {
    /// Build a new message. A member cannot accuse itself.
    pub fn new(
        sender_id: MemberId,
        accused_members_keys: BTreeMap<MemberId, EphemeralPrivateKey<C>>,
    ) -> DkgResult<Self> {
        check_revealed_keys(sender_id, &accused_members_keys)?;

        Ok(Self {
            sender_id,
            accused_members_keys,
        })
    }

    /// The accusing member.
    pub fn sender_id(&self) -> MemberId {
        self.sender_id
    }

    /// The accused members along with the sender's revealed key toward each of them.
    pub fn accused_members_keys(&self) -> &BTreeMap<MemberId, EphemeralPrivateKey<C>> {
        &self.accused_members_keys
    }

    /// Validate a message received from the network.
    pub fn check(&self) -> DkgResult<()> {
        check_revealed_keys(self.sender_id, &self.accused_members_keys)
    }
}

/// Carries the sender's ephemeral private keys toward every member that got
/// disqualified while resolving points accusations.
///
/// With those keys the group decrypts the shares the disqualified members
/// handed out, and reconstructs their contribution to the group key.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct DisqualifiedMembersKeysMessage<C: CipherSuite> {
    sender_id: MemberId,
    disqualified_members_keys: BTreeMap<MemberId, EphemeralPrivateKey<C>>,
}

impl_serialization_traits!(DisqualifiedMembersKeysMessage<CipherSuite>);

impl<C: CipherSuite> DisqualifiedMembersKeysMessage<C> {
    /// Build a new message. A member never reveals a key toward itself.
    pub fn new(
        sender_id: MemberId,
        disqualified_members_keys: BTreeMap<MemberId, EphemeralPrivateKey<C>>,
    ) -> DkgResult<Self> {
        check_revealed_keys(sender_id, &disqualified_members_keys)?;

        Ok(Self {
            sender_id,
            disqualified_members_keys,
        })
    }

    /// The revealing member.
    pub fn sender_id(&self) -> MemberId {
        self.sender_id
    }

    /// The disqualified members along with the sender's revealed key toward each of them.
    pub fn disqualified_members_keys(&self) -> &BTreeMap<MemberId, EphemeralPrivateKey<C>> {
        &self.disqualified_members_keys
    }

    /// Validate a message received from the network.
    pub fn check(&self) -> DkgResult<()> {
        check_revealed_keys(self.sender_id, &self.disqualified_members_keys)
    }
}
