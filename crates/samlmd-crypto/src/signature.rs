//! Signing and verification contracts.

use aws_lc_rs::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use thiserror::Error;

use crate::algorithm::SignatureAlgorithm;

/// Error type for signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification failed.
    #[error("signature verification failed")]
    Verification,

    /// Invalid key format.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Algorithm not supported.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),
}

/// Produces signature values over canonical bytes.
pub trait SignatureProvider: Send + Sync {
    /// Signs the given data.
    ///
    /// ## Errors
    ///
    /// Returns an error if signing fails.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError>;

    /// Returns the signature algorithm.
    fn algorithm(&self) -> SignatureAlgorithm;
}

/// Checks signature values over canonical bytes.
pub trait SignatureVerifier: Send + Sync {
    /// Returns `Ok(true)` if `signature` is a valid signature of `data`.
    ///
    /// ## Errors
    ///
    /// Returns an error if the key cannot be used with the algorithm.
    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, SignatureError>;

    /// Returns the signature algorithm.
    fn algorithm(&self) -> SignatureAlgorithm;
}

/// A public key bound to one signature algorithm.
///
/// RSA keys are `RSAPublicKey` DER; EC keys are uncompressed SEC1 points.
/// Both are what the `subjectPublicKey` bit string of a certificate holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    algorithm: SignatureAlgorithm,
    key: Vec<u8>,
}

impl PublicKey {
    /// Wraps raw public key bytes.
    #[must_use]
    pub fn new(algorithm: SignatureAlgorithm, key: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            key: key.into(),
        }
    }

    /// Returns the same key bound to another algorithm of the same family.
    ///
    /// ## Errors
    ///
    /// Returns an error if the algorithm family differs.
    pub fn with_algorithm(&self, algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        if algorithm.is_rsa() != self.algorithm.is_rsa() {
            return Err(SignatureError::UnsupportedAlgorithm(format!(
                "{algorithm:?} cannot be used with a {:?} key",
                self.algorithm
            )));
        }
        Ok(Self::new(algorithm, self.key.clone()))
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl SignatureVerifier for PublicKey {
    fn verify(&self, data: &[u8], sig: &[u8]) -> Result<bool, SignatureError> {
        let verification_alg: &'static dyn VerificationAlgorithm = match self.algorithm {
            SignatureAlgorithm::Rs1 => &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
            SignatureAlgorithm::Rs256 => &signature::RSA_PKCS1_2048_8192_SHA256,
            SignatureAlgorithm::Rs384 => &signature::RSA_PKCS1_2048_8192_SHA384,
            SignatureAlgorithm::Rs512 => &signature::RSA_PKCS1_2048_8192_SHA512,
            SignatureAlgorithm::Es256 => &signature::ECDSA_P256_SHA256_FIXED,
            SignatureAlgorithm::Es384 => &signature::ECDSA_P384_SHA384_FIXED,
            SignatureAlgorithm::Es512 => &signature::ECDSA_P521_SHA512_FIXED,
        };

        let public_key = UnparsedPublicKey::new(verification_alg, &self.key);
        Ok(public_key.verify(data, sig).is_ok())
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_error_verification_is_generic() {
        let error = SignatureError::Verification;
        assert_eq!(error.to_string(), "signature verification failed");
    }

    #[test]
    fn garbage_key_does_not_verify() {
        let key = PublicKey::new(SignatureAlgorithm::Es256, vec![0x04; 65]);
        assert!(!key.verify(b"data", &[0u8; 64]).unwrap());
    }

    #[test]
    fn algorithm_family_is_preserved() {
        let key = PublicKey::new(SignatureAlgorithm::Rs256, vec![1, 2, 3]);
        assert!(key.with_algorithm(SignatureAlgorithm::Rs512).is_ok());
        assert!(key.with_algorithm(SignatureAlgorithm::Es256).is_err());
    }
}
