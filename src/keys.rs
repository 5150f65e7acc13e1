//! Ephemeral key exchange between two members of a session.
//!
//! Every member generates one [`EphemeralKeyPair`] per other member. The
//! public halves are broadcast so that, should a member later reveal one of
//! its private halves as evidence, anybody can check the revealed key against
//! what was announced before any secret was exchanged.
//!
//! This module currently derives symmetric keys with HKDF instantiated from
//! SHA-256 over the compressed Diffie-Hellman point.

use core::fmt::Debug;
use core::marker::PhantomData;
use core::ops::Deref;

use aead::generic_array::typenum::Unsigned;
use aead::{Aead, AeadCore, Key, KeyInit, KeySizeUser, Nonce};
use ark_ec::{CurveGroup, Group};
use ark_ff::{UniformRand, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::ciphersuite::CipherSuite;
use crate::dkg::MemberId;
use crate::serialization::impl_serialization_traits;
use crate::utils::{calculate_lagrange_coefficients, Scalar};
use crate::{DkgResult, Error};

/// An ephemeral Diffie-Hellman private key wrapper type around a PrimeField.
///
/// It is only ever transmitted when revealed as evidence in an accusation.
#[derive(Clone, Debug, Eq, PartialEq, CanonicalSerialize, CanonicalDeserialize, Zeroize)]
pub struct EphemeralPrivateKey<C: CipherSuite>(pub(crate) Scalar<C>);

impl_serialization_traits!(EphemeralPrivateKey<CipherSuite>);

impl<C: CipherSuite> Drop for EphemeralPrivateKey<C> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<C: CipherSuite> EphemeralPrivateKey<C> {
    /// Sample a new private key.
    pub fn generate(mut rng: impl RngCore + CryptoRng) -> Self {
        Self(Scalar::<C>::rand(&mut rng))
    }

    /// Derive the corresponding public key for this private key.
    pub fn to_public(&self) -> EphemeralPublicKey<C> {
        EphemeralPublicKey(C::G::generator() * self.0)
    }

    /// Whether this private key is the one `public_key` was derived from.
    pub fn matches(&self, public_key: &EphemeralPublicKey<C>) -> bool {
        self.to_public() == *public_key
    }
}

/// An ephemeral Diffie-Hellman public key wrapper type around a CurveGroup.
#[derive(Clone, Debug, Eq, PartialEq, CanonicalSerialize, CanonicalDeserialize)]
pub struct EphemeralPublicKey<C: CipherSuite>(pub(crate) C::G);

impl_serialization_traits!(EphemeralPublicKey<CipherSuite>);

impl<C: CipherSuite> Deref for EphemeralPublicKey<C> {
    type Target = C::G;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A one-time key pair generated by a member for exactly one peer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EphemeralKeyPair<C: CipherSuite> {
    /// The private half, held exclusively by its generator.
    pub private_key: EphemeralPrivateKey<C>,
    /// The public half, broadcast to the whole group.
    pub public_key: EphemeralPublicKey<C>,
}

impl<C: CipherSuite> EphemeralKeyPair<C> {
    /// Generate a new key pair from a cryptographically secure source of randomness.
    pub fn generate(rng: impl RngCore + CryptoRng) -> Self {
        let private_key = EphemeralPrivateKey::<C>::generate(rng);
        let public_key = private_key.to_public();

        Self {
            private_key,
            public_key,
        }
    }
}

/// A symmetric key shared by two members, obtained by hashing the result of
/// an ECDH exchange between their ephemeral keys.
///
/// It is never serialized: both members derive it on their own, and so does
/// anyone a private half has been revealed to.
#[derive(Clone, Zeroize)]
pub struct SymmetricKey<C: CipherSuite> {
    key: Vec<u8>,
    #[zeroize(skip)]
    _phantom: PhantomData<C>,
}

impl<C: CipherSuite> Debug for SymmetricKey<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SymmetricKey(..)")
    }
}

impl<C: CipherSuite> Drop for SymmetricKey<C> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<C: CipherSuite> SymmetricKey<C> {
    /// Derive the symmetric key shared with the owner of `peer_public_key`.
    ///
    /// This will perform an HMAC-based Extract-and-Expand Key Derivation Function (HKDF)
    /// over the compressed Diffie-Hellman point. The obtained Output Key Material is
    /// sized for this `CipherSuite`'s cipher.
    pub fn derive(
        own_private_key: &EphemeralPrivateKey<C>,
        peer_public_key: &EphemeralPublicKey<C>,
    ) -> DkgResult<Self> {
        let dh_key = (peer_public_key.0 * own_private_key.0).into_affine();

        let mut dh_key_bytes = Vec::with_capacity(dh_key.compressed_size());
        dh_key
            .serialize_compressed(&mut dh_key_bytes)
            .map_err(|_| Error::CompressionError)?;

        let hkdf = Hkdf::<Sha256>::new(None, &dh_key_bytes);
        dh_key_bytes.zeroize();

        let mut key = vec![0u8; <C::Cipher as KeySizeUser>::key_size()];
        hkdf.expand(C::context_string().as_bytes(), &mut key)
            .map_err(|_| Error::KdfError)?;

        Ok(Self {
            key,
            _phantom: PhantomData,
        })
    }

    fn cipher(&self) -> C::Cipher {
        // The key length is fixed by `derive`, so this cannot panic.
        C::Cipher::new(Key::<C::Cipher>::from_slice(&self.key))
    }

    /// Encrypt `plaintext` under a fresh random nonce, which is prepended to the ciphertext.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        rng: impl RngCore + CryptoRng,
    ) -> DkgResult<Vec<u8>> {
        let nonce = C::Cipher::generate_nonce(rng);

        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext)
            .map_err(|_| Error::EncryptionError)?;

        let mut bytes = nonce.to_vec();
        bytes.extend(ciphertext);

        Ok(bytes)
    }

    /// Authenticate and decrypt a ciphertext produced by [`SymmetricKey::encrypt`].
    pub fn decrypt(&self, bytes: &[u8]) -> DkgResult<Vec<u8>> {
        let nonce_size = <C::Cipher as AeadCore>::NonceSize::USIZE;
        if bytes.len() < nonce_size {
            return Err(Error::DecryptionError);
        }

        let (nonce, ciphertext) = bytes.split_at(nonce_size);

        self.cipher()
            .decrypt(Nonce::<C::Cipher>::from_slice(nonce), ciphertext)
            .map_err(|_| Error::DecryptionError)
    }
}

/// A public verification share for a member.
///
/// It is the public half of an [`IndividualSigningKey`].
#[derive(Clone, Debug, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct IndividualVerifyingKey<C: CipherSuite> {
    /// The member index to which this key belongs.
    pub index: MemberId,
    /// The public verification share.
    pub share: C::G,
}

impl_serialization_traits!(IndividualVerifyingKey<CipherSuite>);

impl<C: CipherSuite> PartialEq for IndividualVerifyingKey<C> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.share.into_affine() == other.share.into_affine()
    }
}

/// A member's long-lived secret share of the group private key.
#[derive(Clone, Debug, Eq, PartialEq, CanonicalSerialize, CanonicalDeserialize, Zeroize)]
pub struct IndividualSigningKey<C: CipherSuite> {
    /// The member index to which this key belongs.
    pub(crate) index: MemberId,
    /// The member's secret share of the group signing key.
    pub(crate) key: Scalar<C>,
}

impl_serialization_traits!(IndividualSigningKey<CipherSuite>);

impl<C: CipherSuite> Drop for IndividualSigningKey<C> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<C: CipherSuite> IndividualSigningKey<C> {
    /// The member index to which this key belongs.
    pub fn index(&self) -> MemberId {
        self.index
    }

    /// Derive the corresponding public key for this secret key.
    pub fn to_public(&self) -> IndividualVerifyingKey<C> {
        IndividualVerifyingKey {
            index: self.index,
            share: C::G::generator() * self.key,
        }
    }
}

impl<C: CipherSuite> From<&IndividualSigningKey<C>> for IndividualVerifyingKey<C> {
    fn from(source: &IndividualSigningKey<C>) -> IndividualVerifyingKey<C> {
        source.to_public()
    }
}

/// The public key of the group, whose private half is shared among the members.
#[derive(Clone, Copy, Debug, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct GroupKey<C: CipherSuite>(pub(crate) C::G);

impl_serialization_traits!(GroupKey<CipherSuite>);

impl<C: CipherSuite> PartialEq for GroupKey<C> {
    fn eq(&self, other: &Self) -> bool {
        self.0.into_affine() == other.0.into_affine()
    }
}

impl<C: CipherSuite> GroupKey<C> {
    /// The group element of this key.
    pub fn key(&self) -> C::G {
        self.0
    }

    /// Recompute the group key from at least `t` verification shares, by
    /// Lagrange interpolation at zero.
    ///
    /// Any `t` members of a session must yield the key output by the session.
    pub fn from_verifying_keys(keys: &[IndividualVerifyingKey<C>]) -> DkgResult<Self> {
        let indices: Vec<MemberId> = keys.iter().map(|key| key.index).collect();

        let mut group_key = C::G::zero();
        for key in keys.iter() {
            let coeff = calculate_lagrange_coefficients::<C>(key.index, &indices)?;
            group_key += key.share * coeff;
        }

        Ok(Self(group_key))
    }
}
