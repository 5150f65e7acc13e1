//! The rounds of a GJKR distributed key generation session, enforced at
//! compile time with the [typestate](http://cliffle.com/blog/rust-typestate/)
//! pattern.

/// Every member has broadcast one ephemeral public key per other member.
/// The members now derive their pairwise symmetric keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EphemeralKeyExchange {}

/// Every member has broadcast its commitments and sent its encrypted shares.
/// The members now check the shares they received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharesVerification {}

/// Every member has broadcast its accusations about the shares it received.
/// The members now resolve them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharesJustification {}

/// Every qualified member has broadcast its public key share points.
/// The members now check them against the shares they received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointsVerification {}

/// Every member has broadcast its accusations about the public key share points.
/// The members now resolve them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointsJustification {}

/// Every member has revealed its keys toward the members disqualified during
/// the points phase. The members now reconstruct their contributions and
/// compute the group key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconstruction {}

/// Module to implement trait sealing so that [`DkgState`] cannot be
/// implemented for externally declared types.
mod private {
    pub trait Sealed {}

    impl Sealed for super::EphemeralKeyExchange {}
    impl Sealed for super::SharesVerification {}
    impl Sealed for super::SharesJustification {}
    impl Sealed for super::PointsVerification {}
    impl Sealed for super::PointsJustification {}
    impl Sealed for super::Reconstruction {}
}

/// Marker trait to designate valid rounds in the distributed key generation
/// protocol's state machine.  It is implemented using the [sealed trait design
/// pattern][sealed] pattern to prevent external types from implementing further
/// valid states.
///
/// [sealed]: https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
pub trait DkgState: private::Sealed + Clone + core::fmt::Debug {}

impl DkgState for EphemeralKeyExchange {}
impl DkgState for SharesVerification {}
impl DkgState for SharesJustification {}
impl DkgState for PointsVerification {}
impl DkgState for PointsJustification {}
impl DkgState for Reconstruction {}
