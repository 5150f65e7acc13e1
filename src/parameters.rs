//! Configurable parameters for an instance of a GJKR distributed key generation session.

use core::marker::PhantomData;

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::ciphersuite::CipherSuite;
use crate::serialization::impl_serialization_traits;
use crate::{DkgResult, Error};

/// The group size and reconstruction threshold of a session.
///
/// Commitments and public key share points broadcast during the session
/// must contain exactly `t` elements.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, CanonicalSerialize, CanonicalDeserialize)]
pub struct ThresholdParameters<C: CipherSuite> {
    /// The number of members in the group.
    pub n: u32,
    /// The number of shares required to reconstruct a secret.
    pub t: u32,
    _phantom: PhantomData<C>,
}

impl_serialization_traits!(ThresholdParameters<CipherSuite>);

impl<C: CipherSuite> ThresholdParameters<C> {
    /// Initialize a new set of threshold parameters.
    ///
    /// Will error if one of the following condition is met:
    ///  - n equals 0
    ///  - t equals 0
    ///  - n < t
    pub fn new(n: u32, t: u32) -> DkgResult<Self> {
        if n == 0 || t == 0 || n < t {
            return Err(Error::InvalidThresholdParameters(n, t));
        }

        Ok(Self {
            n,
            t,
            _phantom: PhantomData,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::Secp256k1Sha256;
    use crate::{FromBytes, ToBytes};

    use rand::{rngs::OsRng, RngCore};

    #[test]
    fn test_serialization() {
        let mut rng = OsRng;

        for _ in 0..100 {
            let n = rng.next_u32() | 1;
            let t = core::cmp::max(1, n / 2);
            let params = ThresholdParameters::<Secp256k1Sha256>::new(n, t).unwrap();
            let bytes = params.to_bytes().unwrap();
            assert_eq!(params, ThresholdParameters::from_bytes(&bytes).unwrap());
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert_eq!(
            ThresholdParameters::<Secp256k1Sha256>::new(0, 0),
            Err(Error::InvalidThresholdParameters(0, 0))
        );
        assert!(ThresholdParameters::<Secp256k1Sha256>::new(3, 0).is_err());
        assert!(ThresholdParameters::<Secp256k1Sha256>::new(3, 4).is_err());
        assert!(ThresholdParameters::<Secp256k1Sha256>::new(4, 3).is_ok());
    }
}
