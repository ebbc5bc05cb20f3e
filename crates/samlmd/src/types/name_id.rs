//! SAML Name ID types.
//!
//! Name identifiers are used to identify subjects in SAML assertions.

use crate::element::{expect, new_element, SamlElement};
use crate::error::SamlResult;
use crate::validation::{require_non_empty, require_uri};
use crate::xml::XmlElement;

use super::{StandardNameIdFormat, SAML_NS};

/// SAML Name ID.
///
/// Represents the identifier of a subject in a SAML assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameId {
    value: String,
    format: Option<String>,
    name_qualifier: Option<String>,
    sp_name_qualifier: Option<String>,
    sp_provided_id: Option<String>,
}

impl NameId {
    /// Creates a new name ID with the given value.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`](crate::SamlError::Validation) if
    /// `value` is empty.
    pub fn new(value: impl Into<String>) -> SamlResult<Self> {
        let value = value.into();
        require_non_empty("NameID", &value)?;
        Ok(Self {
            value,
            format: None,
            name_qualifier: None,
            sp_name_qualifier: None,
            sp_provided_id: None,
        })
    }

    /// Creates a new email name ID.
    ///
    /// # Errors
    ///
    /// See [`NameId::new`].
    pub fn email(email: impl Into<String>) -> SamlResult<Self> {
        Ok(Self::new(email)?.with_format(StandardNameIdFormat::Email))
    }

    /// Creates a new persistent name ID.
    ///
    /// # Errors
    ///
    /// See [`NameId::new`].
    pub fn persistent(value: impl Into<String>) -> SamlResult<Self> {
        Ok(Self::new(value)?.with_format(StandardNameIdFormat::Persistent))
    }

    /// Creates a new transient name ID with a random value.
    #[must_use]
    pub fn transient() -> Self {
        Self {
            value: format!("_{}", uuid::Uuid::new_v4()),
            format: Some(StandardNameIdFormat::Transient.uri().to_string()),
            name_qualifier: None,
            sp_name_qualifier: None,
            sp_provided_id: None,
        }
    }

    /// Sets the format for this name ID.
    #[must_use]
    pub fn with_format(mut self, format: StandardNameIdFormat) -> Self {
        self.format = Some(format.uri().to_string());
        self
    }

    /// Sets a format outside the standard set.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`](crate::SamlError::Validation) if
    /// `format` is not a URI.
    pub fn with_format_uri(mut self, format: impl Into<String>) -> SamlResult<Self> {
        let format = format.into();
        require_uri("Format", &format)?;
        self.format = Some(format);
        Ok(self)
    }

    /// Sets the name qualifier.
    #[must_use]
    pub fn with_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.name_qualifier = Some(qualifier.into());
        self
    }

    /// Sets the SP name qualifier.
    #[must_use]
    pub fn with_sp_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.sp_name_qualifier = Some(qualifier.into());
        self
    }

    /// Sets the SP provided ID.
    #[must_use]
    pub fn with_sp_provided_id(mut self, id: impl Into<String>) -> Self {
        self.sp_provided_id = Some(id.into());
        self
    }

    /// The identifier value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The format URI as written.
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// The security or administrative domain that qualifies the name.
    #[must_use]
    pub fn name_qualifier(&self) -> Option<&str> {
        self.name_qualifier.as_deref()
    }

    /// The service provider's entity ID that qualifies the name.
    #[must_use]
    pub fn sp_name_qualifier(&self) -> Option<&str> {
        self.sp_name_qualifier.as_deref()
    }

    /// A provider identifier for the SP that was used.
    #[must_use]
    pub fn sp_provided_id(&self) -> Option<&str> {
        self.sp_provided_id.as_deref()
    }

    /// Returns the parsed name ID format.
    #[must_use]
    pub fn parsed_format(&self) -> StandardNameIdFormat {
        self.format
            .as_deref()
            .and_then(StandardNameIdFormat::from_uri)
            .unwrap_or_default()
    }

    /// Reads the `NameIDType` attributes and text of any element.
    fn read(element: &XmlElement, field: &str) -> SamlResult<Self> {
        let value = element.text();
        require_non_empty(field, &value)?;
        let mut name_id = Self {
            value,
            format: None,
            name_qualifier: element.attribute("NameQualifier").map(str::to_string),
            sp_name_qualifier: element.attribute("SPNameQualifier").map(str::to_string),
            sp_provided_id: element.attribute("SPProvidedID").map(str::to_string),
        };
        if let Some(format) = element.attribute("Format") {
            name_id = name_id.with_format_uri(format)?;
        }
        Ok(name_id)
    }

    fn write(&self, element: &mut XmlElement) {
        element.set_optional_attribute("NameQualifier", self.name_qualifier.as_deref());
        element.set_optional_attribute("SPNameQualifier", self.sp_name_qualifier.as_deref());
        element.set_optional_attribute("Format", self.format.as_deref());
        element.set_optional_attribute("SPProvidedID", self.sp_provided_id.as_deref());
        element.set_text(self.value.as_str());
    }
}

impl SamlElement for NameId {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "NameID";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        Self::read(element, Self::LOCAL_NAME)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.write(&mut element);
        element
    }
}

/// The entity that issued an assertion (`saml:Issuer`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issuer {
    name: NameId,
}

impl Issuer {
    /// Creates an issuer from an entity ID.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`](crate::SamlError::Validation) if
    /// `entity_id` is empty.
    pub fn new(entity_id: impl Into<String>) -> SamlResult<Self> {
        let entity_id = entity_id.into();
        require_non_empty(Self::LOCAL_NAME, &entity_id)?;
        Ok(Self {
            name: NameId {
                value: entity_id,
                format: None,
                name_qualifier: None,
                sp_name_qualifier: None,
                sp_provided_id: None,
            },
        })
    }

    /// Uses a fully qualified name as the issuer.
    #[must_use]
    pub const fn from_name_id(name: NameId) -> Self {
        Self { name }
    }

    /// The issuer's entity ID.
    #[must_use]
    pub fn value(&self) -> &str {
        self.name.value()
    }

    /// The issuer with its qualifiers.
    #[must_use]
    pub const fn name_id(&self) -> &NameId {
        &self.name
    }
}

impl SamlElement for Issuer {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "Issuer";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        NameId::read(element, Self::LOCAL_NAME).map(Self::from_name_id)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.name.write(&mut element);
        element
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SamlError;
    use crate::xml::parse;

    #[test]
    fn name_id_email() {
        let name_id = NameId::email("user@example.com").unwrap();
        assert_eq!(name_id.value(), "user@example.com");
        assert_eq!(name_id.parsed_format(), StandardNameIdFormat::Email);
    }

    #[test]
    fn name_id_persistent() {
        let name_id = NameId::persistent("abc123").unwrap();
        assert_eq!(name_id.value(), "abc123");
        assert_eq!(name_id.parsed_format(), StandardNameIdFormat::Persistent);
    }

    #[test]
    fn transient_values_are_unique() {
        let a = NameId::transient();
        let b = NameId::transient();
        assert_ne!(a.value(), b.value());
        assert_eq!(a.parsed_format(), StandardNameIdFormat::Transient);
    }

    #[test]
    fn name_id_with_qualifiers() {
        let name_id = NameId::new("user")
            .unwrap()
            .with_format(StandardNameIdFormat::Persistent)
            .with_name_qualifier("idp.example.com")
            .with_sp_name_qualifier("sp.example.com");

        assert_eq!(name_id.name_qualifier(), Some("idp.example.com"));
        assert_eq!(name_id.sp_name_qualifier(), Some("sp.example.com"));

        let reparsed = NameId::from_xml(&name_id.to_xml()).unwrap();
        assert_eq!(reparsed, name_id);
    }

    #[test]
    fn custom_format_is_kept() {
        let xml = r#"<saml:NameID xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" Format="urn:example:opaque">x</saml:NameID>"#;
        let name_id = NameId::from_xml_str(xml).unwrap();
        assert_eq!(name_id.format(), Some("urn:example:opaque"));
        assert_eq!(name_id.parsed_format(), StandardNameIdFormat::Unspecified);
    }

    #[test]
    fn empty_issuer_is_rejected() {
        let err = Issuer::from_xml(&parse(r#"<saml:Issuer xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"> </saml:Issuer>"#).unwrap())
            .unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "Issuer"));
    }

    #[test]
    fn issuer_is_not_a_name_id() {
        let issuer = Issuer::new("https://idp.example.com").unwrap();
        assert!(matches!(
            NameId::from_xml(&issuer.to_xml()),
            Err(SamlError::SchemaMismatch { .. })
        ));
        assert_eq!(Issuer::from_xml(&issuer.to_xml()).unwrap(), issuer);
    }
}
