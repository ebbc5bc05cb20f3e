//! # samlmd-crypto
//!
//! Digest, signing and verification primitives for XML-DSig, built on
//! aws-lc-rs.
//!
//! The XML layer only ever sees two seams: [`SignatureProvider`] to produce a
//! signature value over canonical bytes and [`SignatureVerifier`] to check one.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod hash;
pub mod keys;
pub mod pem;
pub mod signature;

pub use algorithm::{HashAlgorithm, SignatureAlgorithm};
pub use hash::{hash, sha256, sha384, sha512};
pub use keys::{EcdsaSigningKey, RsaSigningKey};
pub use pem::{pem_to_der, private_key_from_pem, PrivateKeyDer};
pub use signature::{PublicKey, SignatureError, SignatureProvider, SignatureVerifier};
