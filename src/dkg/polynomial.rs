//! Secret polynomials and the Pedersen / Feldman checks performed on the
//! shares evaluated from them.
//!
//! The dispute resolution logic only depends on the [`ShareVerifier`] trait;
//! [`Pedersen`] is the implementation used by the session state machine.

use core::marker::PhantomData;

use ark_ec::{CurveGroup, Group};
use ark_ff::{UniformRand, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::ciphersuite::CipherSuite;
use crate::dkg::messages::MemberId;
use crate::utils::Scalar;

/// A struct for holding the secret coefficients of a polynomial, in order
/// to ensure that they are overwritten with zeroes when it falls out of scope.
#[derive(Clone, Debug, CanonicalSerialize, CanonicalDeserialize, Zeroize)]
pub struct Polynomial<C: CipherSuite>(pub(crate) Vec<Scalar<C>>);

impl<C: CipherSuite> Drop for Polynomial<C> {
    fn drop(&mut self) {
        self.0.iter_mut().zeroize();
    }
}

impl<C: CipherSuite> Polynomial<C> {
    /// Sample a polynomial with `coefficients` random coefficients, i.e. of
    /// degree `coefficients - 1`.
    pub fn random(coefficients: usize, mut rng: impl RngCore + CryptoRng) -> Self {
        Self((0..coefficients).map(|_| Scalar::<C>::rand(&mut rng)).collect())
    }

    /// Evaluate the polynomial at the index of a member.
    pub fn evaluate(&self, index: MemberId) -> Scalar<C> {
        let term: Scalar<C> = index.into();
        let mut sum = Scalar::<C>::zero();

        // Evaluate using Horner's method.
        for (k, coefficient) in self.0.iter().rev().enumerate() {
            // The secret is the constant term in the polynomial
            sum += coefficient;

            if k != (self.0.len() - 1) {
                sum *= term;
            }
        }

        sum
    }

    /// The constant term of the polynomial.
    pub fn constant_term(&self) -> Scalar<C> {
        self.0.first().copied().unwrap_or_else(Scalar::<C>::zero)
    }

    /// The public points `A_k = g^{a_k}` of every coefficient.
    pub fn public_points(&self) -> Vec<C::G> {
        self.0
            .iter()
            .map(|coefficient| C::G::generator() * coefficient)
            .collect()
    }
}

/// Evaluate `\sum_k points[k] * index^k` without knowing the committed coefficients.
pub fn evaluate_hiding<C: CipherSuite>(points: &[C::G], index: MemberId) -> C::G {
    let term: Scalar<C> = index.into();
    let mut sum = C::G::zero();

    // Evaluate using Horner's method.
    for (k, point) in points.iter().rev().enumerate() {
        sum += point;

        if k != (points.len() - 1) {
            sum *= term;
        }
    }

    sum
}

/// Verification of decrypted shares against the public values broadcast by
/// their sender.
///
/// Implementations must be deterministic, since every member reaches its
/// disqualification verdicts through them.
pub trait ShareVerifier<C: CipherSuite>: Send + Sync {
    /// Whether the shares `(share_s, share_t)` sent to `receiver` are consistent
    /// with the sender's commitments.
    fn verify_shares(
        &self,
        receiver: MemberId,
        share_s: &Scalar<C>,
        share_t: &Scalar<C>,
        commitments: &[C::G],
    ) -> bool;

    /// Whether the share `share_s` sent to `receiver` is consistent with the
    /// sender's public key share points.
    fn verify_points(&self, receiver: MemberId, share_s: &Scalar<C>, points: &[C::G]) -> bool;
}

/// The Pedersen commitment scheme over the generators `g` and
/// `h` = [`CipherSuite::blinding_generator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pedersen<C: CipherSuite> {
    h: C::G,
    _phantom: PhantomData<C>,
}

impl<C: CipherSuite> Default for Pedersen<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CipherSuite> Pedersen<C> {
    /// Instantiate the scheme for this [`CipherSuite`].
    pub fn new() -> Self {
        Self {
            h: C::blinding_generator(),
            _phantom: PhantomData,
        }
    }

    /// Commit to the coefficients of `secret` using those of `blinding`:
    /// `C_k = g^{a_k} h^{b_k}`.
    pub fn commit(&self, secret: &Polynomial<C>, blinding: &Polynomial<C>) -> Vec<C::G> {
        secret
            .0
            .iter()
            .zip(blinding.0.iter())
            .map(|(a, b)| C::G::generator() * a + self.h * b)
            .collect()
    }
}

impl<C: CipherSuite> ShareVerifier<C> for Pedersen<C> {
    /// g^{s_ij} h^{t_ij} ?= \prod_{k=0}^{t-1} C_{ik}^{j^k}
    fn verify_shares(
        &self,
        receiver: MemberId,
        share_s: &Scalar<C>,
        share_t: &Scalar<C>,
        commitments: &[C::G],
    ) -> bool {
        if commitments.is_empty() {
            return false;
        }

        let lhs = C::G::generator() * share_s + self.h * share_t;
        let rhs = evaluate_hiding::<C>(commitments, receiver);

        lhs.into_affine() == rhs.into_affine()
    }

    /// g^{s_ij} ?= \prod_{k=0}^{t-1} A_{ik}^{j^k}
    fn verify_points(&self, receiver: MemberId, share_s: &Scalar<C>, points: &[C::G]) -> bool {
        if points.is_empty() {
            return false;
        }

        let lhs = C::G::generator() * share_s;
        let rhs = evaluate_hiding::<C>(points, receiver);

        lhs.into_affine() == rhs.into_affine()
    }
}
