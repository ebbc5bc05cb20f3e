//! Signing keys backed by aws-lc-rs.
//!
//! ## Supported Algorithms
//!
//! ### RSA
//! - RS256, RS384, RS512 (PKCS#1 v1.5)
//!
//! ### ECDSA
//! - ES256 (P-256), ES384 (P-384), ES512 (P-521)
//!
//! ECDSA signatures are produced in the fixed-width `r || s` form that
//! XML-DSig expects, not ASN.1.

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{
        self, EcdsaKeyPair, EcdsaSigningAlgorithm, KeyPair, RsaKeyPair,
        ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED_SIGNING,
        ECDSA_P521_SHA512_FIXED_SIGNING,
    },
};

use crate::algorithm::SignatureAlgorithm;
use crate::signature::{PublicKey, SignatureError, SignatureProvider};

/// RSA key pair for signing.
pub struct RsaSigningKey {
    key_pair: RsaKeyPair,
    algorithm: SignatureAlgorithm,
}

impl RsaSigningKey {
    /// Creates a new RSA signing key from a PKCS#8 DER-encoded private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, too small, or the algorithm is
    /// not an RSA algorithm usable for signing.
    pub fn from_pkcs8(pkcs8_der: &[u8], algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        check_rsa_algorithm(algorithm)?;

        let key_pair = RsaKeyPair::from_pkcs8(pkcs8_der)
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA PKCS#8 key: {e}")))?;

        Self::from_key_pair(key_pair, algorithm)
    }

    /// Creates a new RSA signing key from a PKCS#1 `RSAPrivateKey` DER blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, too small, or the algorithm is
    /// not an RSA algorithm usable for signing.
    pub fn from_der(der: &[u8], algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        check_rsa_algorithm(algorithm)?;

        let key_pair = RsaKeyPair::from_der(der)
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA DER key: {e}")))?;

        Self::from_key_pair(key_pair, algorithm)
    }

    fn from_key_pair(key_pair: RsaKeyPair, algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        let key_bits = key_pair.public_modulus_len() * 8;
        if key_bits < SignatureAlgorithm::MIN_RSA_BITS {
            return Err(SignatureError::InvalidKey(format!(
                "RSA key of {key_bits} bits is below the minimum of {} bits",
                SignatureAlgorithm::MIN_RSA_BITS
            )));
        }

        Ok(Self { key_pair, algorithm })
    }

    /// Returns the public half of this key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(self.algorithm, self.key_pair.public_key().as_ref())
    }
}

impl SignatureProvider for RsaSigningKey {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let rng = SystemRandom::new();
        let mut signature = vec![0u8; self.key_pair.public_modulus_len()];

        let padding = match self.algorithm {
            SignatureAlgorithm::Rs256 => &signature::RSA_PKCS1_SHA256,
            SignatureAlgorithm::Rs384 => &signature::RSA_PKCS1_SHA384,
            SignatureAlgorithm::Rs512 => &signature::RSA_PKCS1_SHA512,
            other => {
                return Err(SignatureError::UnsupportedAlgorithm(format!(
                    "{other:?} not supported for RSA signing"
                )));
            }
        };

        self.key_pair
            .sign(padding, &rng, data, &mut signature)
            .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;

        Ok(signature)
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }
}

/// ECDSA key pair for signing.
pub struct EcdsaSigningKey {
    key_pair: EcdsaKeyPair,
    algorithm: SignatureAlgorithm,
}

impl EcdsaSigningKey {
    /// Creates a new ECDSA signing key from a PKCS#8 DER-encoded private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the algorithm is not ECDSA.
    pub fn from_pkcs8(pkcs8_der: &[u8], algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        let signing_alg = ecdsa_signing_algorithm(algorithm)?;

        let key_pair = EcdsaKeyPair::from_pkcs8(signing_alg, pkcs8_der)
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid ECDSA PKCS#8 key: {e}")))?;

        Ok(Self { key_pair, algorithm })
    }

    /// Generates a fresh key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm is not ECDSA or generation fails.
    pub fn generate(algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        let signing_alg = ecdsa_signing_algorithm(algorithm)?;

        let key_pair = EcdsaKeyPair::generate(signing_alg)
            .map_err(|e| SignatureError::KeyGeneration(format!("ECDSA key generation failed: {e}")))?;

        Ok(Self { key_pair, algorithm })
    }

    /// Returns the public half of this key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(self.algorithm, self.key_pair.public_key().as_ref())
    }
}

impl SignatureProvider for EcdsaSigningKey {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let rng = SystemRandom::new();

        let signature = self
            .key_pair
            .sign(&rng, data)
            .map_err(|e| SignatureError::Signing(format!("ECDSA signing failed: {e}")))?;

        Ok(signature.as_ref().to_vec())
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }
}

fn check_rsa_algorithm(algorithm: SignatureAlgorithm) -> Result<(), SignatureError> {
    if !algorithm.is_rsa() || algorithm.is_legacy() {
        return Err(SignatureError::UnsupportedAlgorithm(format!(
            "{algorithm:?} is not an RSA signing algorithm"
        )));
    }
    Ok(())
}

fn ecdsa_signing_algorithm(
    algorithm: SignatureAlgorithm,
) -> Result<&'static EcdsaSigningAlgorithm, SignatureError> {
    match algorithm {
        SignatureAlgorithm::Es256 => Ok(&ECDSA_P256_SHA256_FIXED_SIGNING),
        SignatureAlgorithm::Es384 => Ok(&ECDSA_P384_SHA384_FIXED_SIGNING),
        SignatureAlgorithm::Es512 => Ok(&ECDSA_P521_SHA512_FIXED_SIGNING),
        other => Err(SignatureError::UnsupportedAlgorithm(format!(
            "{other:?} is not an ECDSA algorithm"
        ))),
    }
}
