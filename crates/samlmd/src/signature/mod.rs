//! XML Signature support for SAML.
//!
//! This module provides enveloped XML Digital Signature (XML-DSig) support
//! for signable metadata and assertion elements.
//!
//! # Signing Algorithms
//!
//! The following signature algorithms are supported:
//! - RSA-SHA256 (recommended)
//! - RSA-SHA384
//! - RSA-SHA512
//! - ECDSA-SHA256
//! - ECDSA-SHA384
//! - ECDSA-SHA512
//!
//! Legacy SHA-1 signatures can be verified when explicitly allowed but are
//! never produced.

mod signer;
mod slot;
mod validator;

pub use signer::*;
pub use slot::*;
pub use validator::*;

use base64::Engine;
use samlmd_crypto::HashAlgorithm;

use crate::error::{SamlError, SamlResult};
use crate::types::{digest_algorithms, transform_algorithms, uri_enum, EXC_C14N_NS, XMLDSIG_NS};
use crate::xml::{self, XmlElement};

uri_enum! {
    /// `SignatureMethod` algorithms.
    #[derive(Default)]
    pub enum SignatureAlgorithm {
        /// RSA PKCS#1 v1.5 with SHA-256.
        #[default]
        RsaSha256 = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
        /// RSA PKCS#1 v1.5 with SHA-384.
        RsaSha384 = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384",
        /// RSA PKCS#1 v1.5 with SHA-512.
        RsaSha512 = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512",
        /// ECDSA over P-256.
        EcdsaSha256 = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256",
        /// ECDSA over P-384.
        EcdsaSha384 = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384",
        /// ECDSA over P-521.
        EcdsaSha512 = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha512",
        /// Verification only, and only when allowed.
        RsaSha1 = "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
    }
}

impl SignatureAlgorithm {
    /// Returns the corresponding digest algorithm URI.
    #[must_use]
    pub const fn digest_uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 | Self::EcdsaSha256 => digest_algorithms::SHA256,
            Self::RsaSha384 | Self::EcdsaSha384 => digest_algorithms::SHA384,
            Self::RsaSha512 | Self::EcdsaSha512 => digest_algorithms::SHA512,
            Self::RsaSha1 => digest_algorithms::SHA1,
        }
    }

    /// Returns the key algorithm used to compute the signature value.
    #[must_use]
    pub const fn key_algorithm(&self) -> samlmd_crypto::SignatureAlgorithm {
        match self {
            Self::RsaSha256 => samlmd_crypto::SignatureAlgorithm::Rs256,
            Self::RsaSha384 => samlmd_crypto::SignatureAlgorithm::Rs384,
            Self::RsaSha512 => samlmd_crypto::SignatureAlgorithm::Rs512,
            Self::EcdsaSha256 => samlmd_crypto::SignatureAlgorithm::Es256,
            Self::EcdsaSha384 => samlmd_crypto::SignatureAlgorithm::Es384,
            Self::EcdsaSha512 => samlmd_crypto::SignatureAlgorithm::Es512,
            Self::RsaSha1 => samlmd_crypto::SignatureAlgorithm::Rs1,
        }
    }

    /// Maps a key algorithm to its XML-DSig signature method.
    #[must_use]
    pub const fn from_key_algorithm(algorithm: samlmd_crypto::SignatureAlgorithm) -> Self {
        match algorithm {
            samlmd_crypto::SignatureAlgorithm::Rs1 => Self::RsaSha1,
            samlmd_crypto::SignatureAlgorithm::Rs256 => Self::RsaSha256,
            samlmd_crypto::SignatureAlgorithm::Rs384 => Self::RsaSha384,
            samlmd_crypto::SignatureAlgorithm::Rs512 => Self::RsaSha512,
            samlmd_crypto::SignatureAlgorithm::Es256 => Self::EcdsaSha256,
            samlmd_crypto::SignatureAlgorithm::Es384 => Self::EcdsaSha384,
            samlmd_crypto::SignatureAlgorithm::Es512 => Self::EcdsaSha512,
        }
    }

    /// Returns the digest algorithm paired with this signature method.
    #[must_use]
    pub const fn hash_algorithm(&self) -> HashAlgorithm {
        self.key_algorithm().hash_algorithm()
    }

    /// Returns true for RSA signature methods.
    #[must_use]
    pub const fn is_rsa(&self) -> bool {
        self.key_algorithm().is_rsa()
    }

    /// Returns true for ECDSA signature methods.
    #[must_use]
    pub const fn is_ecdsa(&self) -> bool {
        self.key_algorithm().is_ecdsa()
    }

    /// Returns true if the method relies on SHA-1.
    #[must_use]
    pub const fn is_deprecated(&self) -> bool {
        self.key_algorithm().is_legacy()
    }
}

/// Maps a `DigestMethod` URI to a hash algorithm.
#[must_use]
pub fn digest_algorithm_from_uri(uri: &str) -> Option<HashAlgorithm> {
    match uri {
        digest_algorithms::SHA256 => Some(HashAlgorithm::Sha256),
        digest_algorithms::SHA384 => Some(HashAlgorithm::Sha384),
        digest_algorithms::SHA512 => Some(HashAlgorithm::Sha512),
        digest_algorithms::SHA1 => Some(HashAlgorithm::Sha1),
        _ => None,
    }
}

uri_enum! {
    /// `CanonicalizationMethod` algorithms.
    #[derive(Default)]
    pub enum CanonicalizationAlgorithm {
        /// Exclusive C14N, the only one used when signing.
        #[default]
        ExclusiveC14N = "http://www.w3.org/2001/10/xml-exc-c14n#",
        /// Exclusive C14N keeping comments.
        ExclusiveC14NWithComments = "http://www.w3.org/2001/10/xml-exc-c14n#WithComments",
        /// Inclusive C14N 1.0.
        C14N = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315",
        /// Inclusive C14N 1.0 keeping comments.
        C14NWithComments = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments",
    }
}

impl CanonicalizationAlgorithm {
    /// Canonicalizes `element`, or returns `None` for the inclusive
    /// algorithms, which are recognised but not implemented.
    #[must_use]
    pub fn apply(&self, element: &XmlElement) -> Option<Vec<u8>> {
        self.apply_with_prefixes(element, &[])
    }

    /// Like [`apply`](Self::apply), rendering the `PrefixList` entries of
    /// an `InclusiveNamespaces` parameter wherever they are in scope.
    #[must_use]
    pub fn apply_with_prefixes(&self, element: &XmlElement, inclusive_prefixes: &[String]) -> Option<Vec<u8>> {
        match self {
            Self::ExclusiveC14N => Some(xml::canonicalize_exclusive(element, false, inclusive_prefixes)),
            Self::ExclusiveC14NWithComments => {
                Some(xml::canonicalize_exclusive(element, true, inclusive_prefixes))
            }
            Self::C14N | Self::C14NWithComments => None,
        }
    }
}

/// A parsed `<ds:Signature>` element.
///
/// Algorithm identifiers are kept as the URIs found in the document; whether
/// they are acceptable is decided at verification time.
#[derive(Debug, Clone)]
pub struct XmlSignature {
    /// `CanonicalizationMethod/@Algorithm`.
    pub canonicalization_method: String,
    /// `PrefixList` of the `InclusiveNamespaces` under `CanonicalizationMethod`.
    pub canonicalization_prefixes: Vec<String>,
    /// `SignatureMethod/@Algorithm`.
    pub signature_method: String,
    /// `Reference/@URI`, empty when absent.
    pub reference_uri: String,
    /// `Transform/@Algorithm` values in order.
    pub transforms: Vec<String>,
    /// `PrefixList` of the `InclusiveNamespaces` under the reference's
    /// canonicalization transform.
    pub reference_prefixes: Vec<String>,
    /// `DigestMethod/@Algorithm`.
    pub digest_method: String,
    /// Decoded `DigestValue`.
    pub digest_value: Vec<u8>,
    /// Decoded `SignatureValue`.
    pub signature_value: Vec<u8>,
    /// Decoded `X509Certificate` values from `KeyInfo`.
    pub x509_certificates: Vec<Vec<u8>>,
    /// The `SignedInfo` subtree as it appeared in the document.
    pub signed_info: XmlElement,
}

fn structure(reason: impl Into<String>) -> SamlError {
    SamlError::SignatureStructure(reason.into())
}

fn ds_child<'a>(parent: &'a XmlElement, local_name: &str) -> Option<&'a XmlElement> {
    parent
        .child_elements()
        .find(|child| child.is(XMLDSIG_NS, local_name))
}

fn algorithm_of(parent: &XmlElement, local_name: &str) -> SamlResult<String> {
    ds_child(parent, local_name)
        .and_then(|method| method.attribute("Algorithm"))
        .map(str::to_string)
        .ok_or_else(|| structure(format!("{local_name} with an Algorithm is required")))
}

/// Tokens of an `ec:InclusiveNamespaces/@PrefixList` child, if any.
fn inclusive_prefixes(parent: &XmlElement) -> Vec<String> {
    parent
        .child_elements()
        .find(|child| child.is(EXC_C14N_NS, "InclusiveNamespaces"))
        .and_then(|list| list.attribute("PrefixList"))
        .map(|list| list.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn decode_base64(local_name: &str, text: &str) -> SamlResult<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(structure(format!("{local_name} is empty")));
    }
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| structure(format!("{local_name} is not base64: {e}")))
}

impl XmlSignature {
    /// Reads the signature structure from a `ds:Signature` element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureStructure`] if the element does not
    /// have the XML-DSig shape: `SignedInfo`, `SignatureValue`, optional
    /// `KeyInfo`, then `Object`s, with exactly one `Reference`.
    pub fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        if !element.is(XMLDSIG_NS, "Signature") {
            return Err(structure(format!(
                "expected ds:Signature, found {}",
                element.expanded_name()
            )));
        }

        let mut children = element.child_elements();
        let signed_info = children
            .next()
            .filter(|child| child.is(XMLDSIG_NS, "SignedInfo"))
            .ok_or_else(|| structure("SignedInfo must be the first child"))?;
        let signature_value = children
            .next()
            .filter(|child| child.is(XMLDSIG_NS, "SignatureValue"))
            .ok_or_else(|| structure("SignatureValue must follow SignedInfo"))?;

        let mut x509_certificates = Vec::new();
        let mut seen_key_info = false;
        let mut seen_object = false;
        for child in children {
            if child.is(XMLDSIG_NS, "KeyInfo") && !seen_key_info && !seen_object {
                seen_key_info = true;
                for data in child.child_elements().filter(|e| e.is(XMLDSIG_NS, "X509Data")) {
                    for cert in data.child_elements().filter(|e| e.is(XMLDSIG_NS, "X509Certificate")) {
                        x509_certificates.push(decode_base64("X509Certificate", &cert.text())?);
                    }
                }
            } else if child.is(XMLDSIG_NS, "Object") {
                seen_object = true;
            } else {
                return Err(structure(format!("unexpected child {}", child.expanded_name())));
            }
        }

        let canonicalization_method = algorithm_of(signed_info, "CanonicalizationMethod")?;
        let canonicalization_prefixes = ds_child(signed_info, "CanonicalizationMethod")
            .map(inclusive_prefixes)
            .unwrap_or_default();
        let signature_method = algorithm_of(signed_info, "SignatureMethod")?;

        let mut references = signed_info
            .child_elements()
            .filter(|child| child.is(XMLDSIG_NS, "Reference"));
        let reference = references
            .next()
            .ok_or_else(|| structure("SignedInfo has no Reference"))?;
        if references.next().is_some() {
            return Err(structure("SignedInfo must contain exactly one Reference"));
        }

        let mut transforms = Vec::new();
        let mut reference_prefixes = Vec::new();
        for transform in ds_child(reference, "Transforms")
            .into_iter()
            .flat_map(XmlElement::child_elements)
        {
            if !transform.is(XMLDSIG_NS, "Transform") {
                return Err(structure("Transforms may only contain Transform"));
            }
            let algorithm = transform
                .attribute("Algorithm")
                .ok_or_else(|| structure("Transform without Algorithm"))?;
            if algorithm != transform_algorithms::ENVELOPED_SIGNATURE {
                reference_prefixes = inclusive_prefixes(transform);
            }
            transforms.push(algorithm.to_string());
        }

        let digest_method = algorithm_of(reference, "DigestMethod")?;
        let digest_value = ds_child(reference, "DigestValue")
            .ok_or_else(|| structure("Reference has no DigestValue"))?;

        Ok(Self {
            canonicalization_method,
            canonicalization_prefixes,
            signature_method,
            reference_uri: reference.attribute("URI").unwrap_or_default().to_string(),
            transforms,
            reference_prefixes,
            digest_method,
            digest_value: decode_base64("DigestValue", &digest_value.text())?,
            signature_value: decode_base64("SignatureValue", &signature_value.text())?,
            x509_certificates,
            signed_info: signed_info.clone(),
        })
    }

    /// Returns the signature method, if it is one this crate knows.
    #[must_use]
    pub fn algorithm(&self) -> Option<SignatureAlgorithm> {
        SignatureAlgorithm::from_uri(&self.signature_method)
    }

    /// Returns the canonicalization method, if known.
    #[must_use]
    pub fn canonicalization(&self) -> Option<CanonicalizationAlgorithm> {
        CanonicalizationAlgorithm::from_uri(&self.canonicalization_method)
    }

    /// Returns the ID the reference points at, or `None` for `URI=""`.
    #[must_use]
    pub fn reference_id(&self) -> Option<&str> {
        self.reference_uri.strip_prefix('#')
    }

    /// Canonicalization the reference transforms ask for.
    ///
    /// Returns `None` if a transform is neither the enveloped-signature
    /// transform nor an exclusive canonicalization.
    #[must_use]
    pub fn reference_canonicalization(&self) -> Option<CanonicalizationAlgorithm> {
        let mut chosen = CanonicalizationAlgorithm::ExclusiveC14N;
        for transform in &self.transforms {
            if transform == transform_algorithms::ENVELOPED_SIGNATURE {
                continue;
            }
            match CanonicalizationAlgorithm::from_uri(transform) {
                Some(
                    c14n @ (CanonicalizationAlgorithm::ExclusiveC14N
                    | CanonicalizationAlgorithm::ExclusiveC14NWithComments),
                ) => chosen = c14n,
                _ => return None,
            }
        }
        Some(chosen)
    }
}

/// Configuration for signature creation.
///
/// The signature method follows from the signing key.
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    /// The canonicalization algorithm to use.
    pub canonicalization: CanonicalizationAlgorithm,
    /// Whether to include the X.509 certificate in the signature.
    pub include_certificate: bool,
    /// Prefixes written as the reference transform's `InclusiveNamespaces`
    /// `PrefixList`, for content that names them only inside values such
    /// as `xsi:type`.
    pub inclusive_prefixes: Vec<String>,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            canonicalization: CanonicalizationAlgorithm::ExclusiveC14N,
            include_certificate: true,
            inclusive_prefixes: Vec::new(),
        }
    }
}

impl SignatureConfig {
    /// Creates a configuration using the given canonicalization.
    #[must_use]
    pub const fn with_canonicalization(canonicalization: CanonicalizationAlgorithm) -> Self {
        Self {
            canonicalization,
            include_certificate: true,
            inclusive_prefixes: Vec::new(),
        }
    }
}
