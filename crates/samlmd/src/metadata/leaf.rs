//! Single-valued metadata elements.

use std::marker::PhantomData;

use crate::chunk::Chunk;
use crate::element::{expect, new_element, text_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::types::{StandardNameIdFormat, MD_NS, XML_NS};
use crate::validation::{
    entity_id, require_non_empty, require_non_empty_list, require_uri, required_attribute,
};
use crate::xml::XmlElement;

text_element!(
    /// A name identifier format the entity supports.
    NameIdFormat,
    MD_NS,
    "NameIDFormat",
    require_uri
);

impl NameIdFormat {
    /// Returns the well-known format this URI names, if any.
    #[must_use]
    pub fn known_format(&self) -> Option<StandardNameIdFormat> {
        StandardNameIdFormat::from_uri(self.value())
    }
}

impl From<StandardNameIdFormat> for NameIdFormat {
    fn from(format: StandardNameIdFormat) -> Self {
        Self {
            value: format.uri().to_string(),
        }
    }
}

text_element!(
    /// An attribute profile the authority supports.
    AttributeProfile,
    MD_NS,
    "AttributeProfile",
    require_uri
);

text_element!(
    /// Entity identifier of an affiliation member.
    AffiliateMember,
    MD_NS,
    "AffiliateMember",
    entity_id
);

text_element!(
    /// `md:Company` of a contact.
    Company,
    MD_NS,
    "Company",
    require_non_empty
);

text_element!(
    /// `md:GivenName` of a contact.
    GivenName,
    MD_NS,
    "GivenName",
    require_non_empty
);

text_element!(
    /// `md:SurName` of a contact.
    SurName,
    MD_NS,
    "SurName",
    require_non_empty
);

text_element!(
    /// A contact address, usually a `mailto:` URI.
    EmailAddress,
    MD_NS,
    "EmailAddress",
    require_non_empty
);

text_element!(
    /// A contact telephone number.
    TelephoneNumber,
    MD_NS,
    "TelephoneNumber",
    require_non_empty
);

/// Names one of the `xml:lang`-tagged string elements.
pub trait LocalizedKind {
    /// Local name of the element.
    const LOCAL_NAME: &'static str;

    /// Checks the text content.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] naming the element.
    fn check(value: &str) -> SamlResult<()> {
        require_non_empty(Self::LOCAL_NAME, value)
    }
}

/// A string tagged with the language it is written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Localized<K> {
    lang: String,
    value: String,
    kind: PhantomData<K>,
}

impl<K: LocalizedKind> Localized<K> {
    /// Creates the element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `lang` is empty or the text is
    /// rejected.
    pub fn new(lang: impl Into<String>, value: impl Into<String>) -> SamlResult<Self> {
        let lang = lang.into();
        let value = value.into();
        require_non_empty("xml:lang", &lang)?;
        K::check(&value)?;
        Ok(Self {
            lang,
            value,
            kind: PhantomData,
        })
    }

    /// The `xml:lang` tag.
    #[must_use]
    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// The text.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl<K: LocalizedKind> SamlElement for Localized<K> {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = K::LOCAL_NAME;

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let lang = element
            .attribute_ns(XML_NS, "lang")
            .ok_or_else(|| SamlError::validation("xml:lang", "is required"))?;
        Self::new(lang, element.text())
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_attribute_ns(XML_NS, "lang", self.lang.as_str());
        element.set_text(self.value.as_str());
        element
    }
}

macro_rules! localized_kind {
    ($(#[$meta:meta])* $kind:ident, $alias:ident, $local_name:literal) => {
        #[doc = concat!("Marker for `md:", $local_name, "`.")]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $kind;

        impl LocalizedKind for $kind {
            const LOCAL_NAME: &'static str = $local_name;
        }

        $(#[$meta])*
        pub type $alias = Localized<$kind>;
    };
}

localized_kind!(
    /// Legal name of an organization.
    OrganizationNameKind,
    OrganizationName,
    "OrganizationName"
);
localized_kind!(
    /// Display name of an organization.
    OrganizationDisplayNameKind,
    OrganizationDisplayName,
    "OrganizationDisplayName"
);
localized_kind!(
    /// Name of an attribute consuming service.
    ServiceNameKind,
    ServiceName,
    "ServiceName"
);
localized_kind!(
    /// Description of an attribute consuming service.
    ServiceDescriptionKind,
    ServiceDescription,
    "ServiceDescription"
);

/// Marker for `md:OrganizationURL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizationUrlKind;

impl LocalizedKind for OrganizationUrlKind {
    const LOCAL_NAME: &'static str = "OrganizationURL";

    fn check(value: &str) -> SamlResult<()> {
        require_uri(Self::LOCAL_NAME, value)
    }
}

/// Web page of an organization.
pub type OrganizationUrl = Localized<OrganizationUrlKind>;

/// Where more metadata for the entity can be found, in another schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalMetadataLocation {
    namespace: String,
    location: String,
}

impl AdditionalMetadataLocation {
    /// Creates the element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] unless both values are URIs.
    pub fn new(namespace: impl Into<String>, location: impl Into<String>) -> SamlResult<Self> {
        let namespace = namespace.into();
        let location = location.into();
        require_uri("namespace", &namespace)?;
        require_uri(Self::LOCAL_NAME, &location)?;
        Ok(Self {
            namespace,
            location,
        })
    }

    /// Namespace of the metadata found there.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The location URI.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl SamlElement for AdditionalMetadataLocation {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "AdditionalMetadataLocation";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        Self::new(required_attribute(element, "namespace")?, element.text())
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_attribute("namespace", self.namespace.as_str());
        element.set_text(self.location.as_str());
        element
    }
}

/// `md:Extensions`: arbitrary elements from other schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extensions {
    children: Vec<Chunk>,
}

impl Extensions {
    /// Creates the element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `children` is empty.
    pub fn new(children: Vec<Chunk>) -> SamlResult<Self> {
        require_non_empty_list(Self::LOCAL_NAME, &children)?;
        Ok(Self { children })
    }

    /// Extension elements in document order.
    #[must_use]
    pub fn children(&self) -> &[Chunk] {
        &self.children
    }

    /// Finds the first extension with this name.
    #[must_use]
    pub fn find(&self, namespace: &str, local_name: &str) -> Option<&Chunk> {
        self.children
            .iter()
            .find(|chunk| chunk.namespace() == namespace && chunk.local_name() == local_name)
    }
}

impl SamlElement for Extensions {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "Extensions";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        Self::new(element.child_elements().map(Chunk::from_xml).collect())
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        for child in &self.children {
            child.append_to(&mut element);
        }
        element
    }
}
