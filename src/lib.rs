// -*- mode: rust; -*-
//
// This file is part of gjkr.
// Copyright (c) 2024 GJKR Developers
// See LICENSE for licensing information.
//
// Authors:
// - GJKR developers <dev@gjkr.rs>

//! This library provides a Rust implementation of the secure messaging and
//! dispute resolution layer of the **[GJKR]** distributed key generation
//! protocol by Gennaro, Jarecki, Krawczyk and Rabin.
//!
//! A group of `n` mutually distrusting members jointly produces a threshold
//! public/private key pair: any `t` of them can later reconstruct the private
//! key, but no single member ever learns it. Secret shares are exchanged under
//! symmetric keys derived from per-pair ephemeral Diffie-Hellman keys, every
//! share is checked against Pedersen commitments, and every complaint carries
//! the evidence (a revealed ephemeral private key) allowing all the other
//! members to decide on their own, and identically, who misbehaved.
//!
//! # Usage
//!
//! Members need to agree upon a [`CipherSuite`], [`ThresholdParameters`](parameters::ThresholdParameters)
//! and a roster of non-zero member indices. The broadcast layer delivering the
//! messages is out of scope of this crate.
//!
//! ```rust
//! use gjkr::dkg::{DistributedKeyGeneration, EphemeralKeyExchange};
//! use gjkr::parameters::ThresholdParameters;
//! use gjkr::testing::Secp256k1Sha256;
//! use gjkr::DkgResult;
//! use rand::rngs::OsRng;
//!
//! type Dkg<R> = DistributedKeyGeneration<R, Secp256k1Sha256>;
//!
//! # fn do_test() -> DkgResult<()> {
//! let params = ThresholdParameters::new(3, 2)?;
//! let roster = [1, 2, 3];
//! let mut rng = OsRng;
//!
//! let mut states = Vec::new();
//! let mut ephemeral_keys = Vec::new();
//! for index in roster {
//!     let (state, messages) = Dkg::<EphemeralKeyExchange>::new(&params, index, &roster, &mut rng)?;
//!     states.push(state);
//!     ephemeral_keys.extend(messages);
//! }
//!
//! // Broadcast `ephemeral_keys`, then derive the pairwise symmetric keys and
//! // commit to the secret polynomials.
//! let mut next_states = Vec::new();
//! let mut commitments = Vec::new();
//! let mut peer_shares = Vec::new();
//! for state in states {
//!     let (state, commitment, shares) = state.to_sharing(&ephemeral_keys, &mut rng)?;
//!     next_states.push(state);
//!     commitments.push(commitment);
//!     peer_shares.extend(shares);
//! }
//!
//! // Every member now checks the shares it received and broadcasts its accusations.
//! for state in next_states {
//!     let (_state, accusations) = state.verify_shares(&commitments, &peer_shares)?;
//!     assert!(accusations.accused_members_keys().is_empty());
//! }
//! # Ok(()) } fn main() { assert!(do_test().is_ok()); }
//! ```
//!
//! The remaining rounds (accusation resolution, public key share points,
//! points accusations, disqualified members' keys) follow the same pattern;
//! see [`dkg::DistributedKeyGeneration`].
//!
//! [GJKR]: https://link.springer.com/article/10.1007/s00145-006-0347-3

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(future_incompatible)]
#![allow(clippy::type_complexity)]

mod error;
pub use error::{DkgResult, Error};

/// A module defining the ephemeral key types and the pairwise symmetric keys derived from them.
pub mod keys;
/// A module defining the [`ThresholdParameters`](crate::parameters::ThresholdParameters) type used by a GJKR session.
pub mod parameters;

mod ciphersuite;
pub use ciphersuite::CipherSuite;

mod serialization;
pub use serialization::{FromBytes, ToBytes};

pub(crate) mod utils;
pub use utils::Scalar;

/// A module defining the messages, the dispute resolution logic and the round
/// state machine of a GJKR distributed key generation session.
pub mod dkg;

/// This module provides a concrete implementation of a GJKR CipherSuite over Secp256k1,
/// with AES-128-GCM as symmetric cipher.
/// It is made available for testing and benchmarking purposes.
pub mod testing {
    use super::*;

    use aes_gcm::Aes128Gcm;
    use ark_ec::AffineRepr;
    use ark_ff::PrimeField;
    use ark_secp256k1::{Affine, Fq, Projective as G};

    use sha2::{Digest, Sha256};

    use zeroize::Zeroize;

    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Zeroize)]
    /// An example instance of GJKR over Secp256k1 with AES-128-GCM as symmetric cipher.
    pub struct Secp256k1Sha256;

    impl CipherSuite for Secp256k1Sha256 {
        type G = G;

        type Cipher = Aes128Gcm;

        fn context_string() -> String {
            "GJKR_SECP256K1_SHA256".to_owned()
        }

        // Try-and-increment: secp256k1 has cofactor 1, so any point on the
        // curve generates the whole group.
        fn blinding_generator() -> G {
            let mut counter = 0u32;
            loop {
                let mut hasher = Sha256::new();
                hasher.update(Self::context_string().as_bytes());
                hasher.update(b"pedersen");
                hasher.update(counter.to_le_bytes());

                let x = Fq::from_be_bytes_mod_order(&hasher.finalize());
                if let Some(point) = Affine::get_point_from_x_unchecked(x, false) {
                    return point.into_group();
                }

                counter += 1;
            }
        }
    }
}
