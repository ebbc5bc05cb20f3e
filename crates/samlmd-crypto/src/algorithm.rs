//! Hash and signature algorithm identifiers.
//!
//! XML-DSig deployments in the SAML world still rely heavily on SHA-256 and
//! P-256, so both are first-class here. SHA-1 is recognised only so that
//! legacy documents can be identified and, when explicitly allowed, verified.

/// Digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-1, accepted for verification of legacy documents only.
    Sha1,

    /// SHA-256.
    Sha256,

    /// SHA-384.
    Sha384,

    /// SHA-512.
    Sha512,
}

impl HashAlgorithm {
    /// Returns the output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns the algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Returns true for digests that must not be used for new signatures.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::Sha1)
    }
}

/// Signature algorithms usable for XML-DSig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-1. Verification only.
    Rs1,

    /// RSA PKCS#1 v1.5 with SHA-256.
    Rs256,

    /// RSA PKCS#1 v1.5 with SHA-384.
    Rs384,

    /// RSA PKCS#1 v1.5 with SHA-512.
    Rs512,

    /// ECDSA using P-256 and SHA-256.
    Es256,

    /// ECDSA using P-384 and SHA-384.
    Es384,

    /// ECDSA using P-521 and SHA-512.
    Es512,
}

impl SignatureAlgorithm {
    /// Returns the hash algorithm used by this signature algorithm.
    #[must_use]
    pub const fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::Rs1 => HashAlgorithm::Sha1,
            Self::Rs256 | Self::Es256 => HashAlgorithm::Sha256,
            Self::Rs384 | Self::Es384 => HashAlgorithm::Sha384,
            Self::Rs512 | Self::Es512 => HashAlgorithm::Sha512,
        }
    }

    /// Returns whether this is an ECDSA algorithm.
    #[must_use]
    pub const fn is_ecdsa(self) -> bool {
        matches!(self, Self::Es256 | Self::Es384 | Self::Es512)
    }

    /// Returns whether this is an RSA algorithm.
    #[must_use]
    pub const fn is_rsa(self) -> bool {
        matches!(self, Self::Rs1 | Self::Rs256 | Self::Rs384 | Self::Rs512)
    }

    /// Smallest RSA modulus, in bits, accepted for signing.
    pub const MIN_RSA_BITS: usize = 2048;

    /// Returns true if this algorithm relies on SHA-1.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        self.hash_algorithm().is_legacy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_is_legacy() {
        assert!(SignatureAlgorithm::Rs1.is_legacy());
        assert!(!SignatureAlgorithm::Rs256.is_legacy());
        assert_eq!(HashAlgorithm::Sha1.output_len(), 20);
    }

    #[test]
    fn algorithm_families() {
        assert!(SignatureAlgorithm::Rs384.is_rsa());
        assert!(!SignatureAlgorithm::Rs384.is_ecdsa());
        assert!(SignatureAlgorithm::Es512.is_ecdsa());
        assert_eq!(
            SignatureAlgorithm::Es384.hash_algorithm(),
            HashAlgorithm::Sha384
        );
    }
}
