//! XML Signature validation.
//!
//! Provides functionality for validating enveloped signatures retained on
//! parsed or freshly signed elements.

use samlmd_crypto::{PublicKey, SignatureVerifier};
use tracing::debug;

use crate::error::{SamlError, SamlResult};

use super::{digest_algorithm_from_uri, AttachedSignature, SignatureAlgorithm};

/// XML signature validator.
///
/// Validates signatures using configured trusted certificates and keys. The
/// certificate embedded in a signature is never trusted on its own.
pub struct XmlSignatureValidator {
    /// Trusted certificates for signature validation (DER format).
    trusted_certificates: Vec<Vec<u8>>,
    /// Trusted raw public keys.
    trusted_keys: Vec<PublicKey>,
    /// Whether to allow SHA-1 signatures (deprecated but sometimes needed).
    allow_sha1: bool,
}

impl XmlSignatureValidator {
    /// Creates a new validator with the given trusted certificates.
    pub fn new(trusted_certificates: Vec<Vec<u8>>) -> Self {
        Self {
            trusted_certificates,
            trusted_keys: Vec::new(),
            allow_sha1: false,
        }
    }

    /// Creates a validator from PEM-encoded certificates.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Crypto`] if a PEM block is not a certificate.
    pub fn from_pem(certificates_pem: &[&str]) -> SamlResult<Self> {
        let mut certs = Vec::new();
        for pem in certificates_pem {
            let der = samlmd_crypto::pem_to_der(pem, "CERTIFICATE")
                .ok_or_else(|| SamlError::Crypto("Invalid certificate PEM".to_string()))?;
            certs.push(der);
        }
        Ok(Self::new(certs))
    }

    /// Trusts a raw public key in addition to the certificates.
    #[must_use]
    pub fn with_public_key(mut self, key: PublicKey) -> Self {
        self.trusted_keys.push(key);
        self
    }

    /// Allows SHA-1 based signatures (not recommended).
    #[must_use]
    pub const fn allow_sha1(mut self, allow: bool) -> Self {
        self.allow_sha1 = allow;
        self
    }

    /// Validates an attached signature.
    ///
    /// `expected_id` is the `ID` of the element owning the signature; the
    /// reference must point at it, or be empty.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureInvalid`] naming the first failed check.
    pub fn validate(&self, attached: &AttachedSignature, expected_id: Option<&str>) -> SamlResult<()> {
        let signature = attached.signature();

        let algorithm = signature.algorithm().ok_or_else(|| {
            invalid(format!("unsupported signature method {}", signature.signature_method))
        })?;
        if algorithm.is_deprecated() && !self.allow_sha1 {
            return Err(invalid("SHA-1 signatures are not allowed"));
        }

        let canonicalization = signature.canonicalization().ok_or_else(|| {
            invalid(format!(
                "unsupported canonicalization {}",
                signature.canonicalization_method
            ))
        })?;

        match signature.reference_id() {
            None if signature.reference_uri.is_empty() => {}
            Some(id) if Some(id) == expected_id => {}
            _ => {
                return Err(invalid(format!(
                    "reference {} does not point at the signed element",
                    signature.reference_uri
                )));
            }
        }

        self.verify_digest(attached)?;

        let canonical_signed_info = canonicalization
            .apply_with_prefixes(&signature.signed_info, &signature.canonicalization_prefixes)
            .ok_or_else(|| invalid("inclusive canonicalization is not supported"))?;

        self.verify_signature(&canonical_signed_info, &signature.signature_value, algorithm)
    }

    /// Verifies the digest value in the signature.
    fn verify_digest(&self, attached: &AttachedSignature) -> SamlResult<()> {
        let signature = attached.signature();
        let hash_algorithm = digest_algorithm_from_uri(&signature.digest_method)
            .ok_or_else(|| invalid(format!("unsupported digest {}", signature.digest_method)))?;
        if hash_algorithm.is_legacy() && !self.allow_sha1 {
            return Err(invalid("SHA-1 digests are not allowed"));
        }

        let signed_content = attached
            .signed_content()
            .ok_or_else(|| invalid("reference uses an unsupported transform"))?;
        let calculated = samlmd_crypto::hash(hash_algorithm, signed_content);
        if calculated != signature.digest_value {
            return Err(invalid("Digest value mismatch"));
        }
        Ok(())
    }

    /// Verifies the signature value against every trusted key.
    fn verify_signature(
        &self,
        signed_info: &[u8],
        signature_value: &[u8],
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<()> {
        let key_algorithm = algorithm.key_algorithm();
        let mut candidates = Vec::new();
        for cert_der in &self.trusted_certificates {
            candidates.push(extract_public_key_from_cert(cert_der, key_algorithm)?);
        }
        candidates.extend(
            self.trusted_keys
                .iter()
                .filter_map(|key| key.with_algorithm(key_algorithm).ok()),
        );

        if candidates.is_empty() {
            return Err(invalid("no trusted certificate or key is configured"));
        }

        for key in &candidates {
            if key.verify(signed_info, signature_value)? {
                debug!(algorithm = algorithm.uri(), "signature verified");
                return Ok(());
            }
        }

        Err(invalid(
            "Signature verification failed with all trusted keys",
        ))
    }
}

fn invalid(reason: impl Into<String>) -> SamlError {
    SamlError::SignatureInvalid(reason.into())
}

/// Extracts the public key from an X.509 certificate.
fn extract_public_key_from_cert(
    cert_der: &[u8],
    algorithm: samlmd_crypto::SignatureAlgorithm,
) -> SamlResult<PublicKey> {
    let (_, cert) = x509_parser::parse_x509_certificate(cert_der)
        .map_err(|e| SamlError::Crypto(format!("Failed to parse certificate: {e}")))?;

    Ok(PublicKey::new(
        algorithm,
        cert.public_key().subject_public_key.data.to_vec(),
    ))
}
