//! XML Signature creation.
//!
//! Provides functionality for signing SAML elements using enveloped
//! XML-DSig.

use base64::Engine;
use samlmd_crypto::{
    private_key_from_pem, EcdsaSigningKey, PrivateKeyDer, RsaSigningKey, SignatureProvider,
};
use tracing::debug;

use crate::element::SamlElement;
use crate::error::{SamlError, SamlResult};
use crate::metadata::{KeyInfo, X509Certificate};
use crate::types::{transform_algorithms, EXC_C14N_NS, XMLDSIG_NS};
use crate::xml::XmlElement;

use super::slot::signature_position;
use super::{AttachedSignature, SignatureAlgorithm, SignatureConfig, XmlSignature};

/// XML element signer.
///
/// Signs elements with the configured key, optionally embedding the
/// signer's certificate in `KeyInfo`.
pub struct XmlSigner {
    /// Computes signature values.
    provider: Box<dyn SignatureProvider>,
    /// The X.509 certificate in DER format (optional).
    certificate_der: Option<Vec<u8>>,
    /// Signature configuration.
    config: SignatureConfig,
}

impl XmlSigner {
    /// Creates a signer around a key.
    pub fn new(provider: impl SignatureProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            certificate_der: None,
            config: SignatureConfig::default(),
        }
    }

    /// Creates a new signer from PEM-encoded key and certificate.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Crypto`] if the key cannot be loaded for
    /// `algorithm`, or if `algorithm` is SHA-1 based.
    pub fn from_pem(
        private_key_pem: &str,
        certificate_pem: Option<&str>,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<Self> {
        if algorithm.is_deprecated() {
            return Err(SamlError::Crypto(format!(
                "{} cannot be used to create signatures",
                algorithm.uri()
            )));
        }

        let key_algorithm = algorithm.key_algorithm();
        let signer = match private_key_from_pem(private_key_pem)? {
            PrivateKeyDer::Pkcs8(der) if algorithm.is_ecdsa() => {
                Self::new(EcdsaSigningKey::from_pkcs8(&der, key_algorithm)?)
            }
            PrivateKeyDer::Pkcs8(der) => Self::new(RsaSigningKey::from_pkcs8(&der, key_algorithm)?),
            PrivateKeyDer::Pkcs1(der) if algorithm.is_rsa() => {
                Self::new(RsaSigningKey::from_der(&der, key_algorithm)?)
            }
            PrivateKeyDer::Pkcs1(_) => {
                return Err(SamlError::Crypto(
                    "an RSA PRIVATE KEY cannot be used with ECDSA".to_string(),
                ));
            }
        };

        let certificate_der = certificate_pem
            .map(|pem| {
                samlmd_crypto::pem_to_der(pem, "CERTIFICATE")
                    .ok_or_else(|| SamlError::Crypto("Invalid certificate PEM".to_string()))
            })
            .transpose()?;

        Ok(match certificate_der {
            Some(der) => signer.with_certificate(der),
            None => signer,
        })
    }

    /// Embeds `certificate_der` in produced signatures.
    #[must_use]
    pub fn with_certificate(mut self, certificate_der: Vec<u8>) -> Self {
        self.certificate_der = Some(certificate_der);
        self
    }

    /// Sets the signature configuration.
    #[must_use]
    pub fn with_config(mut self, config: SignatureConfig) -> Self {
        self.config = config;
        self
    }

    /// The signature method produced by this signer.
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::from_key_algorithm(self.provider.algorithm())
    }

    /// Creates an enveloped signature over `unsigned`.
    ///
    /// The reference is `#id` when the element has an ID and the whole
    /// document otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureCreation`] if the configured
    /// canonicalization is not supported or the key fails to sign.
    pub fn sign_element(&self, unsigned: &XmlElement, id: Option<&str>) -> SamlResult<AttachedSignature> {
        let algorithm = self.algorithm();
        let canonicalization = self.config.canonicalization;

        let prefixes = &self.config.inclusive_prefixes;
        let signed_content = canonicalization.apply_with_prefixes(unsigned, prefixes).ok_or_else(|| {
            SamlError::SignatureCreation(format!(
                "{} is not supported for signing",
                canonicalization.uri()
            ))
        })?;

        let digest = samlmd_crypto::hash(algorithm.hash_algorithm(), &signed_content);
        let reference_uri = id.map_or_else(String::new, |id| format!("#{id}"));
        let signed_info = build_signed_info(&reference_uri, &digest, algorithm, canonicalization.uri(), prefixes);

        let canonical_signed_info = canonicalization.apply(&signed_info).ok_or_else(|| {
            SamlError::SignatureCreation("SignedInfo could not be canonicalized".to_string())
        })?;
        let signature_value = self
            .provider
            .sign(&canonical_signed_info)
            .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;

        let certificate = if self.config.include_certificate {
            self.certificate_der.as_deref()
        } else {
            None
        };
        let element = build_signature_element(signed_info, &signature_value, certificate);
        let signature = XmlSignature::from_xml(&element)?;

        debug!(
            reference = %reference_uri,
            algorithm = algorithm.uri(),
            "created enveloped signature"
        );
        Ok(AttachedSignature::new(signature, element, Some(signed_content)))
    }

    /// Signs `element` exactly as it stands, whitespace included, and
    /// inserts the signature at its schema position.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::AlreadySigned`] if `element` already has a
    /// `ds:Signature` child, otherwise as [`sign_element`](Self::sign_element).
    pub fn sign_in_place(&self, element: &mut XmlElement, id: Option<&str>) -> SamlResult<AttachedSignature> {
        if element.child_elements().any(|child| child.is(XMLDSIG_NS, "Signature")) {
            return Err(SamlError::AlreadySigned);
        }
        let attached = self.sign_element(element, id)?;
        let position = signature_position(element.child_elements());
        element.insert_child_element(position, attached.element().clone());
        Ok(attached)
    }
}

fn ds(local_name: &str) -> XmlElement {
    XmlElement::new(XMLDSIG_NS, local_name)
}

fn method(local_name: &str, algorithm: &str) -> XmlElement {
    let mut element = ds(local_name);
    element.set_attribute("Algorithm", algorithm);
    element
}

/// Builds the SignedInfo element.
fn build_signed_info(
    reference_uri: &str,
    digest: &[u8],
    algorithm: SignatureAlgorithm,
    canonicalization_uri: &str,
    inclusive_prefixes: &[String],
) -> XmlElement {
    let mut signed_info = ds("SignedInfo");
    signed_info.append_child(method("CanonicalizationMethod", canonicalization_uri));
    signed_info.append_child(method("SignatureMethod", algorithm.uri()));

    let reference = signed_info.append_child(ds("Reference"));
    reference.set_attribute("URI", reference_uri);

    let transforms = reference.append_child(ds("Transforms"));
    transforms.append_child(method("Transform", transform_algorithms::ENVELOPED_SIGNATURE));
    let transform = transforms.append_child(method("Transform", canonicalization_uri));
    if !inclusive_prefixes.is_empty() {
        transform
            .append_child(XmlElement::new(EXC_C14N_NS, "InclusiveNamespaces"))
            .set_attribute("PrefixList", inclusive_prefixes.join(" "));
    }

    reference.append_child(method("DigestMethod", algorithm.digest_uri()));
    reference
        .append_child(ds("DigestValue"))
        .set_text(base64::engine::general_purpose::STANDARD.encode(digest));

    signed_info
}

/// Builds the complete Signature element.
fn build_signature_element(
    signed_info: XmlElement,
    signature_value: &[u8],
    certificate_der: Option<&[u8]>,
) -> XmlElement {
    let mut signature = ds("Signature");
    signature.append_child(signed_info);
    signature
        .append_child(ds("SignatureValue"))
        .set_text(base64::engine::general_purpose::STANDARD.encode(signature_value));

    if let Some(der) = certificate_der {
        KeyInfo::from_certificate(X509Certificate::from_der(der)).append_to(&mut signature);
    }
    signature
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::CanonicalizationAlgorithm;
    use crate::types::MD_NS;
    use samlmd_crypto::SignatureAlgorithm as KeyAlgorithm;

    fn signer() -> XmlSigner {
        XmlSigner::new(EcdsaSigningKey::generate(KeyAlgorithm::Es256).unwrap())
    }

    fn document() -> XmlElement {
        let mut root = XmlElement::new(MD_NS, "EntityDescriptor");
        root.set_attribute("entityID", "https://sp.example.com");
        root.set_attribute("ID", "_e1");
        root
    }

    #[test]
    fn signature_references_the_id() {
        let attached = signer().sign_element(&document(), Some("_e1")).unwrap();
        let signature = attached.signature();
        assert_eq!(signature.reference_uri, "#_e1");
        assert_eq!(signature.algorithm(), Some(SignatureAlgorithm::EcdsaSha256));
        assert_eq!(signature.transforms[0], transform_algorithms::ENVELOPED_SIGNATURE);
        assert_eq!(
            signature.digest_value,
            samlmd_crypto::sha256(attached.signed_content().unwrap())
        );
    }

    #[test]
    fn missing_id_references_the_document() {
        let attached = signer().sign_element(&document(), None).unwrap();
        assert_eq!(attached.signature().reference_uri, "");
        assert_eq!(attached.signature().reference_id(), None);
    }

    #[test]
    fn certificate_is_embedded_when_configured() {
        let with_cert = signer().with_certificate(vec![1, 2, 3]);
        let attached = with_cert.sign_element(&document(), Some("_e1")).unwrap();
        assert_eq!(attached.signature().x509_certificates, [vec![1, 2, 3]]);

        let without = signer().with_certificate(vec![1, 2, 3]).with_config(SignatureConfig {
            include_certificate: false,
            ..SignatureConfig::default()
        });
        let attached = without.sign_element(&document(), Some("_e1")).unwrap();
        assert!(attached.signature().x509_certificates.is_empty());
    }

    #[test]
    fn inclusive_canonicalization_is_refused() {
        let signer = signer().with_config(SignatureConfig::with_canonicalization(
            CanonicalizationAlgorithm::C14N,
        ));
        let err = signer.sign_element(&document(), Some("_e1")).unwrap_err();
        assert!(matches!(err, SamlError::SignatureCreation(_)));
    }

    #[test]
    fn prefix_list_is_written_and_honoured() {
        let mut root = document();
        root.declare_namespace(Some("xs"), crate::types::XS_NS);
        let signer = signer().with_config(SignatureConfig {
            inclusive_prefixes: vec!["xs".to_string()],
            ..SignatureConfig::default()
        });
        let attached = signer.sign_element(&root, Some("_e1")).unwrap();
        assert_eq!(attached.signature().reference_prefixes, ["xs"]);
        let content = String::from_utf8(attached.signed_content().unwrap().to_vec()).unwrap();
        assert!(content.contains(r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#));

        let plain = self::signer().sign_element(&root, Some("_e1")).unwrap();
        let content = String::from_utf8(plain.signed_content().unwrap().to_vec()).unwrap();
        assert!(!content.contains("xmlns:xs"));
    }

    #[test]
    fn in_place_signature_covers_whitespace() {
        let mut root = crate::xml::parse(concat!(
            "<saml:Assertion xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" ID=\"_a\">\n",
            "  <saml:Issuer>https://idp.example.com</saml:Issuer>\n",
            "  <saml:Subject/>\n",
            "</saml:Assertion>"
        ))
        .unwrap();
        let key = EcdsaSigningKey::generate(KeyAlgorithm::Es256).unwrap();
        let validator = crate::signature::XmlSignatureValidator::new(Vec::new()).with_public_key(key.public_key());
        let signer = XmlSigner::new(key);

        signer.sign_in_place(&mut root, Some("_a")).unwrap();
        let names: Vec<_> = root.child_elements().map(|e| e.local_name.as_str()).collect();
        assert_eq!(names, ["Issuer", "Signature", "Subject"]);

        let text = crate::xml::write(&root).unwrap();
        assert!(text.contains("</saml:Issuer>\n  "));
        let (slot, _) = crate::signature::extract_signature(&crate::xml::parse(&text).unwrap()).unwrap();
        validator.validate(slot.signature().unwrap(), Some("_a")).unwrap();

        assert!(matches!(
            signer.sign_in_place(&mut root, Some("_a")),
            Err(SamlError::AlreadySigned)
        ));
    }

    #[test]
    fn sha1_keys_are_refused() {
        let err = XmlSigner::from_pem("", None, SignatureAlgorithm::RsaSha1)
            .err()
            .unwrap();
        assert!(matches!(err, SamlError::Crypto(_)));
    }
}
