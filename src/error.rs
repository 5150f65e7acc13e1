use thiserror::Error;

use crate::dkg::MemberId;

/// Errors that may happen during a GJKR distributed key generation session.
///
/// None of these variants is meant to abort the group protocol: construction
/// failures are caught before anything is broadcast, and failures caused by
/// other members are turned into accusations or disqualifications by the
/// session state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Serialization error
    #[error("an error happened while serializing")]
    SerializationError,
    /// Deserialization error
    #[error("an error happened while deserializing")]
    DeserializationError,
    /// Point compression error
    #[error("an error happened while compressing a point")]
    CompressionError,
    /// Member indices start at 1
    #[error("a member index cannot be zero")]
    IndexIsZero,
    /// A point-to-point message has the same sender and receiver
    #[error("member {0} cannot address a message to itself")]
    SelfAddressedMessage(MemberId),
    /// A commitments vector does not match the reconstruction threshold
    #[error("expected {expected} commitments, got {actual}")]
    InvalidCommitmentLength {
        /// The group-agreed threshold.
        expected: usize,
        /// The length that was provided.
        actual: usize,
    },
    /// A public key share points vector does not match the reconstruction threshold
    #[error("expected {expected} public key share points, got {actual}")]
    InvalidPointsLength {
        /// The group-agreed threshold.
        expected: usize,
        /// The length that was provided.
        actual: usize,
    },
    /// The key derivation function could not expand the shared secret
    #[error("KDF expansion failed unexpectedly")]
    KdfError,
    /// Share encryption failure
    #[error("could not encrypt share")]
    EncryptionError,
    /// Encrypted share decryption failure
    #[error("could not decrypt encrypted share")]
    DecryptionError,
    /// The decrypted plaintext is not a canonical scalar
    #[error("decrypted share is malformed")]
    MalformedShare,
    /// A revealed ephemeral private key does not match its broadcast public key
    #[error("revealed key of member {sender} toward member {receiver} does not match its public key")]
    KeyMismatch {
        /// The member that revealed the key.
        sender: MemberId,
        /// The member the key pair was generated for.
        receiver: MemberId,
    },
    /// Decrypted shares do not match the commitments of their sender
    #[error("shares sent by member {0} do not match its commitments")]
    InvalidShare(MemberId),
    /// Invalid group size or threshold
    #[error("invalid threshold parameters: n = {0}, t = {1}")]
    InvalidThresholdParameters(u32, u32),
    /// The roster does not match the session parameters
    #[error("the number of members {0} does not match the session parameters {1}")]
    InvalidNumberOfParticipants(usize, u32),
    /// The roster lists the same member twice
    #[error("member {0} appears twice in the roster")]
    DuplicateMember(MemberId),
    /// The member is not part of the roster
    #[error("member {0} is not part of this session")]
    UnknownMember(MemberId),
    /// No ephemeral public key has been broadcast for this pair
    #[error("no ephemeral public key from member {sender} toward member {receiver}")]
    MissingEphemeralKey {
        /// The member expected to broadcast the key.
        sender: MemberId,
        /// The member the key was meant for.
        receiver: MemberId,
    },
    /// Too many members were disqualified to continue the session, with their indices
    #[error("too many disqualified members to continue the session: {0:?}")]
    TooManyDisqualifiedMembers(Vec<MemberId>),
    /// Not enough shares were revealed to reconstruct a disqualified member's contribution
    #[error("not enough shares to reconstruct the contribution of member {0}")]
    InsufficientShares(MemberId),
    /// Lagrange interpolation was given duplicate indices
    #[error("duplicate shares provided")]
    DuplicateShares,
}

/// Type alias for a Result returning a GJKR [`Error`] on failure.
pub type DkgResult<T> = Result<T, Error>;
