pub(crate) mod accusation;
pub(crate) mod ledger;
pub(crate) mod member;
pub(crate) mod messages;
pub(crate) mod peer_shares;
pub(crate) mod polynomial;
pub(crate) mod rounds;
pub(crate) mod transcript;

pub use accusation::{resolve_accusation, AccusationState, DisputeBoard, Resolution, Verdict};
pub use ledger::{Disqualification, DisqualificationLedger, LedgerSnapshot, Phase, Reason};
pub use member::{DistributedKeyGeneration, DkgOutput};
pub use messages::{
    DisqualifiedMembersKeysMessage, EphemeralPublicKeyMessage, MemberCommitmentsMessage,
    MemberId, MemberPublicKeySharePointsMessage, PeerSharesMessage, PointsAccusationsMessage,
    SecretSharesAccusationsMessage,
};
pub use polynomial::{evaluate_hiding, Pedersen, Polynomial, ShareVerifier};
pub use rounds::{
    DkgState, EphemeralKeyExchange, PointsJustification, PointsVerification, Reconstruction,
    SharesJustification, SharesVerification,
};
pub use transcript::{Recorded, Transcript};
