//! `md:KeyDescriptor` and `md:EncryptionMethod`.

use std::fmt;

use crate::chunk::Chunk;
use crate::dispatch::{known_child, ChildPolicy, DispatchTable, UnknownChildren};
use crate::element::{expect, new_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::types::{MD_NS, XMLDSIG_NS};
use crate::validation::{require_child, required_attribute, require_uri, set_once};
use crate::xml::XmlElement;

use super::{KeyInfo, X509Certificate};

/// The `use` attribute of a key descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyUse {
    /// Key used to verify signatures.
    Signing,
    /// Key used to encrypt to the entity.
    Encryption,
}

impl KeyUse {
    /// Returns the attribute value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Signing => "signing",
            Self::Encryption => "encryption",
        }
    }

    /// Parses the attribute value.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] for any other value.
    pub fn parse(value: &str) -> SamlResult<Self> {
        match value {
            "signing" => Ok(Self::Signing),
            "encryption" => Ok(Self::Encryption),
            other => Err(SamlError::validation(
                "use",
                format!("'{other}' is neither signing nor encryption"),
            )),
        }
    }
}

impl fmt::Display for KeyUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An encryption algorithm the entity supports.
///
/// Parameters such as `xenc:KeySize` or `ds:DigestMethod` are kept as
/// chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionMethod {
    algorithm: String,
    parameters: Vec<Chunk>,
}

impl EncryptionMethod {
    /// Creates the element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `algorithm` is not a URI.
    pub fn new(algorithm: impl Into<String>) -> SamlResult<Self> {
        let algorithm = algorithm.into();
        require_uri("Algorithm", &algorithm)?;
        Ok(Self {
            algorithm,
            parameters: Vec::new(),
        })
    }

    /// Appends a parameter element.
    #[must_use]
    pub fn with_parameter(mut self, parameter: Chunk) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// The algorithm URI.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Algorithm parameters in document order.
    #[must_use]
    pub fn parameters(&self) -> &[Chunk] {
        &self.parameters
    }
}

impl SamlElement for EncryptionMethod {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "EncryptionMethod";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let mut method = Self::new(required_attribute(element, "Algorithm")?)?;
        method.parameters = element.child_elements().map(Chunk::from_xml).collect();
        Ok(method)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_attribute("Algorithm", self.algorithm.as_str());
        for parameter in &self.parameters {
            parameter.append_to(&mut element);
        }
        element
    }
}

enum KeyDescriptorChild {
    KeyInfo(KeyInfo),
    EncryptionMethod(EncryptionMethod),
}

static KEY_DESCRIPTOR_CHILDREN: DispatchTable<KeyDescriptorChild> = DispatchTable {
    context: "KeyDescriptor",
    namespace: MD_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(KeyInfo => KeyDescriptorChild::KeyInfo),
        known_child!(EncryptionMethod => KeyDescriptorChild::EncryptionMethod),
    ],
};

/// A key the entity uses, with its intended use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    key_use: Option<KeyUse>,
    key_info: KeyInfo,
    encryption_methods: Vec<EncryptionMethod>,
    unknown: UnknownChildren,
}

impl KeyDescriptor {
    /// A key valid for any use.
    #[must_use]
    pub fn new(key_info: KeyInfo) -> Self {
        Self {
            key_use: None,
            key_info,
            encryption_methods: Vec::new(),
            unknown: UnknownChildren::default(),
        }
    }

    /// A signing key described by its certificate.
    #[must_use]
    pub fn signing(certificate: X509Certificate) -> Self {
        Self::new(KeyInfo::from_certificate(certificate)).with_use(KeyUse::Signing)
    }

    /// An encryption key described by its certificate.
    #[must_use]
    pub fn encryption(certificate: X509Certificate) -> Self {
        Self::new(KeyInfo::from_certificate(certificate)).with_use(KeyUse::Encryption)
    }

    /// Restricts the key to one use.
    #[must_use]
    pub const fn with_use(mut self, key_use: KeyUse) -> Self {
        self.key_use = Some(key_use);
        self
    }

    /// Adds a supported encryption method.
    #[must_use]
    pub fn with_encryption_method(mut self, method: EncryptionMethod) -> Self {
        self.encryption_methods.push(method);
        self
    }

    /// The `use` attribute.
    #[must_use]
    pub const fn key_use(&self) -> Option<KeyUse> {
        self.key_use
    }

    /// Returns true if the key may be used for `key_use`.
    #[must_use]
    pub fn is_usable_for(&self, key_use: KeyUse) -> bool {
        self.key_use.map_or(true, |declared| declared == key_use)
    }

    /// The key.
    #[must_use]
    pub const fn key_info(&self) -> &KeyInfo {
        &self.key_info
    }

    /// Supported encryption methods.
    #[must_use]
    pub fn encryption_methods(&self) -> &[EncryptionMethod] {
        &self.encryption_methods
    }

    /// Foreign children kept verbatim.
    #[must_use]
    pub const fn unknown_children(&self) -> &UnknownChildren {
        &self.unknown
    }
}

impl SamlElement for KeyDescriptor {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "KeyDescriptor";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let key_use = element.attribute("use").map(KeyUse::parse).transpose()?;

        require_child(element.child_elements(), XMLDSIG_NS, "KeyInfo")?;
        let (children, unknown) = KEY_DESCRIPTOR_CHILDREN.resolve_all(element.child_elements())?;
        let mut key_info = None;
        let mut encryption_methods = Vec::new();
        for child in children {
            match child {
                KeyDescriptorChild::KeyInfo(info) => set_once(&mut key_info, info, "KeyInfo")?,
                KeyDescriptorChild::EncryptionMethod(method) => encryption_methods.push(method),
            }
        }
        let key_info =
            key_info.ok_or_else(|| SamlError::validation("KeyInfo", "exactly one is required"))?;

        Ok(Self {
            key_use,
            key_info,
            encryption_methods,
            unknown,
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_optional_attribute("use", self.key_use.map(|u| u.as_str()));
        self.key_info.append_to(&mut element);
        for method in &self.encryption_methods {
            method.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}
