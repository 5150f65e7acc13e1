//! Encryption and decryption of the two secret shares carried by a
//! [`PeerSharesMessage`].
//!
//! Each share is serialized as a compressed scalar and encrypted on its own
//! under the pairwise [`SymmetricKey`], with a fresh nonce.

use core::marker::PhantomData;

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::ciphersuite::CipherSuite;
use crate::dkg::messages::{MemberId, PeerSharesMessage};
use crate::keys::SymmetricKey;
use crate::utils::Scalar;
use crate::{DkgResult, Error};

fn encrypt_share<C: CipherSuite>(
    share: &Scalar<C>,
    key: &SymmetricKey<C>,
    rng: impl RngCore + CryptoRng,
) -> DkgResult<Vec<u8>> {
    let mut share_bytes = Vec::with_capacity(share.compressed_size());
    share
        .serialize_compressed(&mut share_bytes)
        .map_err(|_| Error::SerializationError)?;

    let encrypted = key.encrypt(&share_bytes, rng);
    share_bytes.zeroize();

    encrypted
}

fn decrypt_share<C: CipherSuite>(
    encrypted_share: &[u8],
    key: &SymmetricKey<C>,
) -> DkgResult<Scalar<C>> {
    let mut bytes = key.decrypt(encrypted_share)?;

    let share = Scalar::<C>::deserialize_compressed(&bytes[..]).map_err(|_| Error::MalformedShare);
    bytes.zeroize();

    share
}

impl<C: CipherSuite> PeerSharesMessage<C> {
    /// Encrypt the shares `s_ij` and `t_ij` computed by `sender_id` for `receiver_id`.
    ///
    /// If either encryption fails, no message is built.
    pub fn new(
        sender_id: MemberId,
        receiver_id: MemberId,
        share_s: &Scalar<C>,
        share_t: &Scalar<C>,
        key: &SymmetricKey<C>,
        mut rng: impl RngCore + CryptoRng,
    ) -> DkgResult<Self> {
        let message = Self {
            sender_id,
            receiver_id,
            encrypted_share_s: encrypt_share(share_s, key, &mut rng)?,
            encrypted_share_t: encrypt_share(share_t, key, &mut rng)?,
            _phantom: PhantomData,
        };
        message.check()?;

        Ok(message)
    }

    /// Decrypt the share of the secret polynomial.
    pub fn decrypt_share_s(&self, key: &SymmetricKey<C>) -> DkgResult<Scalar<C>> {
        decrypt_share(&self.encrypted_share_s, key)
    }

    /// Decrypt the share of the blinding polynomial.
    pub fn decrypt_share_t(&self, key: &SymmetricKey<C>) -> DkgResult<Scalar<C>> {
        decrypt_share(&self.encrypted_share_t, key)
    }

    /// Decrypt both shares at once.
    pub fn decrypt_shares(&self, key: &SymmetricKey<C>) -> DkgResult<(Scalar<C>, Scalar<C>)> {
        Ok((self.decrypt_share_s(key)?, self.decrypt_share_t(key)?))
    }

    /// Checks whether both shares can be decrypted with the provided key.
    ///
    /// A malicious member may send a message that cannot be decrypted. It
    /// must be caught here and turned into an accusation instead of being
    /// fed to share verification.
    pub fn can_decrypt(&self, key: &SymmetricKey<C>) -> bool {
        self.decrypt_shares(key).is_ok()
    }
}
