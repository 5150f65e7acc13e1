use core::fmt::Debug;
use core::marker::{Send, Sync};

use zeroize::Zeroize;

use aead::{Aead, KeyInit};
use ark_ec::CurveGroup;

/// A trait defining the prime-order group of operation and the symmetric cipher
/// of this GJKR protocol instantiation.
pub trait CipherSuite:
    Copy + Clone + PartialEq + Eq + Debug + Send + Sync + Zeroize + 'static
{
    /// The prime-order group on which this [`CipherSuite`] operates.
    ///
    /// Ephemeral keys, commitments and public key share points all live in this group.
    type G: CurveGroup;

    /// The authenticated cipher used to encrypt peer shares under the
    /// symmetric key derived from an ephemeral Diffie-Hellman exchange.
    type Cipher: Aead + KeyInit;

    //////////////////////////////////////////////////////////////////////////////////////////////

    // Required methods

    /// A method returning this [`CipherSuite`]'s custom context string, used as
    /// the info string of the key derivation function.
    fn context_string() -> String;

    /// The second generator `h` of the Pedersen commitment scheme.
    ///
    /// Nobody may know the discrete logarithm of `h` with respect to the group
    /// generator, so implementations should derive it by hashing into the group.
    fn blinding_generator() -> Self::G;
}
