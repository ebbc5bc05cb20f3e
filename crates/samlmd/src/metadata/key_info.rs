//! XML-DSig key material: `ds:KeyInfo` and its common children.

use base64::Engine;
use chrono::{DateTime, Utc};

use crate::chunk::Chunk;
use crate::dispatch::{known_child, ChildPolicy, DispatchTable, Resolved};
use crate::element::{expect, new_element, text_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::types::XMLDSIG_NS;
use crate::validation::{require_non_empty, require_non_empty_list};
use crate::xml::XmlElement;

/// A base64 DER certificate (`ds:X509Certificate`).
///
/// The text is kept as written, line breaks included, so re-serialization
/// does not disturb signed metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Certificate {
    value: String,
    der: Vec<u8>,
}

impl X509Certificate {
    /// Creates a certificate from its base64 text.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if the text is empty or not base64.
    pub fn new(value: impl Into<String>) -> SamlResult<Self> {
        let value = value.into();
        require_non_empty(Self::LOCAL_NAME, &value)?;
        let compact: String = value.split_whitespace().collect();
        let der = base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| SamlError::validation(Self::LOCAL_NAME, format!("invalid base64: {e}")))?;
        Ok(Self { value, der })
    }

    /// Wraps DER bytes.
    #[must_use]
    pub fn from_der(der: &[u8]) -> Self {
        Self {
            value: base64::engine::general_purpose::STANDARD.encode(der),
            der: der.to_vec(),
        }
    }

    /// The base64 text as written.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The decoded certificate.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The certificate subject as an RFC 4514 string.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Crypto`] if the bytes are not a certificate.
    pub fn subject(&self) -> SamlResult<String> {
        let (_, cert) = parse_certificate(&self.der)?;
        Ok(cert.subject().to_string())
    }

    /// The end of the certificate's validity period.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Crypto`] if the bytes are not a certificate.
    pub fn not_after(&self) -> SamlResult<DateTime<Utc>> {
        let (_, cert) = parse_certificate(&self.der)?;
        let timestamp = cert.validity().not_after.timestamp();
        DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| SamlError::Crypto(format!("notAfter {timestamp} is out of range")))
    }
}

fn parse_certificate(
    der: &[u8],
) -> SamlResult<(&[u8], x509_parser::certificate::X509Certificate<'_>)> {
    x509_parser::parse_x509_certificate(der)
        .map_err(|e| SamlError::Crypto(format!("Failed to parse certificate: {e}")))
}

impl SamlElement for X509Certificate {
    const NAMESPACE: &'static str = XMLDSIG_NS;
    const LOCAL_NAME: &'static str = "X509Certificate";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        Self::new(element.text())
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_text(self.value.as_str());
        element
    }
}

text_element!(
    /// A key name hint (`ds:KeyName`).
    KeyName,
    XMLDSIG_NS,
    "KeyName",
    require_non_empty
);

/// A child of `ds:X509Data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum X509DataContent {
    /// An encoded certificate.
    Certificate(X509Certificate),
    /// Issuer serial, SKI, CRL and anything else.
    Other(Chunk),
}

static X509_DATA_CHILDREN: DispatchTable<X509DataContent> = DispatchTable {
    context: "X509Data",
    namespace: XMLDSIG_NS,
    policy: ChildPolicy::Permissive,
    entries: &[known_child!(X509Certificate => X509DataContent::Certificate)],
};

/// `ds:X509Data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Data {
    content: Vec<X509DataContent>,
}

impl X509Data {
    /// Creates the element from its children in order.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `content` is empty.
    pub fn new(content: Vec<X509DataContent>) -> SamlResult<Self> {
        require_non_empty_list(Self::LOCAL_NAME, &content)?;
        Ok(Self { content })
    }

    /// X509Data holding a single certificate.
    #[must_use]
    pub fn from_certificate(certificate: X509Certificate) -> Self {
        Self {
            content: vec![X509DataContent::Certificate(certificate)],
        }
    }

    /// Children in document order.
    #[must_use]
    pub fn content(&self) -> &[X509DataContent] {
        &self.content
    }

    /// The certificates among the children.
    pub fn certificates(&self) -> impl Iterator<Item = &X509Certificate> {
        self.content.iter().filter_map(|child| match child {
            X509DataContent::Certificate(cert) => Some(cert),
            X509DataContent::Other(_) => None,
        })
    }
}

impl SamlElement for X509Data {
    const NAMESPACE: &'static str = XMLDSIG_NS;
    const LOCAL_NAME: &'static str = "X509Data";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let content = element
            .child_elements()
            .map(|child| {
                X509_DATA_CHILDREN.resolve(child).map(|resolved| match resolved {
                    Resolved::Known(content) => content,
                    Resolved::Unknown(chunk) => X509DataContent::Other(chunk),
                })
            })
            .collect::<SamlResult<Vec<_>>>()?;
        Self::new(content)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        for child in &self.content {
            match child {
                X509DataContent::Certificate(cert) => cert.append_to(&mut element),
                X509DataContent::Other(chunk) => chunk.append_to(&mut element),
            };
        }
        element
    }
}

/// A child of `ds:KeyInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInfoContent {
    /// `ds:KeyName`.
    KeyName(KeyName),
    /// `ds:X509Data`.
    X509Data(X509Data),
    /// `ds:KeyValue`, `ds:RetrievalMethod`, encrypted keys and the rest.
    Other(Chunk),
}

static KEY_INFO_CHILDREN: DispatchTable<KeyInfoContent> = DispatchTable {
    context: "KeyInfo",
    namespace: XMLDSIG_NS,
    policy: ChildPolicy::Permissive,
    entries: &[
        known_child!(KeyName => KeyInfoContent::KeyName),
        known_child!(X509Data => KeyInfoContent::X509Data),
    ],
};

/// `ds:KeyInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    id: Option<String>,
    content: Vec<KeyInfoContent>,
}

impl KeyInfo {
    /// Creates the element from its children in order.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `content` is empty.
    pub fn new(content: Vec<KeyInfoContent>) -> SamlResult<Self> {
        require_non_empty_list(Self::LOCAL_NAME, &content)?;
        Ok(Self { id: None, content })
    }

    /// KeyInfo carrying one certificate in an X509Data.
    #[must_use]
    pub fn from_certificate(certificate: X509Certificate) -> Self {
        Self {
            id: None,
            content: vec![KeyInfoContent::X509Data(X509Data::from_certificate(certificate))],
        }
    }

    /// Sets the `Id` attribute.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `id` is empty.
    pub fn with_id(mut self, id: impl Into<String>) -> SamlResult<Self> {
        let id = id.into();
        require_non_empty("Id", &id)?;
        self.id = Some(id);
        Ok(self)
    }

    /// The `Id` attribute.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Children in document order.
    #[must_use]
    pub fn content(&self) -> &[KeyInfoContent] {
        &self.content
    }

    /// Key names among the children.
    pub fn key_names(&self) -> impl Iterator<Item = &KeyName> {
        self.content.iter().filter_map(|child| match child {
            KeyInfoContent::KeyName(name) => Some(name),
            _ => None,
        })
    }

    /// Every certificate in every X509Data child.
    pub fn certificates(&self) -> impl Iterator<Item = &X509Certificate> {
        self.content
            .iter()
            .filter_map(|child| match child {
                KeyInfoContent::X509Data(data) => Some(data),
                _ => None,
            })
            .flat_map(X509Data::certificates)
    }
}

impl SamlElement for KeyInfo {
    const NAMESPACE: &'static str = XMLDSIG_NS;
    const LOCAL_NAME: &'static str = "KeyInfo";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let content = element
            .child_elements()
            .map(|child| {
                KEY_INFO_CHILDREN.resolve(child).map(|resolved| match resolved {
                    Resolved::Known(content) => content,
                    Resolved::Unknown(chunk) => KeyInfoContent::Other(chunk),
                })
            })
            .collect::<SamlResult<Vec<_>>>()?;

        let key_info = Self::new(content)?;
        match element.attribute("Id") {
            Some(id) => key_info.with_id(id),
            None => Ok(key_info),
        }
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_optional_attribute("Id", self.id.as_deref());
        for child in &self.content {
            match child {
                KeyInfoContent::KeyName(name) => name.append_to(&mut element),
                KeyInfoContent::X509Data(data) => data.append_to(&mut element),
                KeyInfoContent::Other(chunk) => chunk.append_to(&mut element),
            };
        }
        element
    }
}
