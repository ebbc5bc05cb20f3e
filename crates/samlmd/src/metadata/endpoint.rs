//! Protocol endpoints (`md:EndpointType` and `md:IndexedEndpointType`).
//!
//! Each endpoint element is an [`Endpoint`] or [`IndexedEndpoint`]
//! parameterized by a kind marker that fixes its local name and whether it
//! may carry a `ResponseLocation`.

use std::marker::PhantomData;

use crate::chunk::Chunk;
use crate::element::{expect, new_element, SamlElement};
use crate::error::SamlResult;
use crate::types::{SamlBinding, MD_NS};
use crate::lexical::Lexical;
use crate::validation::{forbid, require_uri, required_attribute};
use crate::xml::{XmlAttribute, XmlElement};

use super::ForeignAttributes;

/// Compile-time description of one endpoint element.
pub trait EndpointKind {
    /// Local name of the element.
    const LOCAL_NAME: &'static str;
    /// Whether `ResponseLocation` may be present.
    const ALLOWS_RESPONSE_LOCATION: bool;
}

/// A protocol endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint<K> {
    binding: String,
    location: String,
    response_location: Option<String>,
    attributes: ForeignAttributes,
    children: Vec<Chunk>,
    kind: PhantomData<K>,
}

impl<K: EndpointKind> Endpoint<K> {
    /// Creates an endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] unless both values are URIs.
    pub fn new(binding: impl Into<String>, location: impl Into<String>) -> SamlResult<Self> {
        Self::from_parts(binding.into(), location.into(), None)
    }

    /// Creates an endpoint for a standard binding.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `location` is not a URI.
    pub fn for_binding(binding: SamlBinding, location: impl Into<String>) -> SamlResult<Self> {
        Self::new(binding.uri(), location)
    }

    /// Sets the `ResponseLocation`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] for kinds that forbid the attribute
    /// or when `response_location` is not a URI.
    pub fn with_response_location(mut self, response_location: impl Into<String>) -> SamlResult<Self> {
        let response_location = response_location.into();
        check_response_location::<K>(Some(&response_location))?;
        self.response_location = Some(response_location);
        Ok(self)
    }

    /// Adds a namespace-qualified extension attribute.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if the attribute is unqualified.
    pub fn with_attribute(mut self, attribute: XmlAttribute) -> SamlResult<Self> {
        self.attributes.insert(attribute)?;
        Ok(self)
    }

    /// Adds an extension child element.
    #[must_use]
    pub fn with_child(mut self, child: Chunk) -> Self {
        self.children.push(child);
        self
    }

    fn from_parts(
        binding: String,
        location: String,
        response_location: Option<String>,
    ) -> SamlResult<Self> {
        check_response_location::<K>(response_location.as_ref())?;
        require_uri("Binding", &binding)?;
        require_uri("Location", &location)?;
        Ok(Self {
            binding,
            location,
            response_location,
            attributes: ForeignAttributes::new(),
            children: Vec::new(),
            kind: PhantomData,
        })
    }

    /// The binding URI.
    #[must_use]
    pub fn binding(&self) -> &str {
        &self.binding
    }

    /// The binding, if it is one of the standard ones.
    #[must_use]
    pub fn saml_binding(&self) -> Option<SamlBinding> {
        SamlBinding::from_uri(&self.binding)
    }

    /// Where requests are sent.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Where responses are sent, when it differs from the location.
    #[must_use]
    pub fn response_location(&self) -> Option<&str> {
        self.response_location.as_deref()
    }

    /// Extension attributes.
    #[must_use]
    pub const fn attributes(&self) -> &ForeignAttributes {
        &self.attributes
    }

    /// Extension children.
    #[must_use]
    pub fn children(&self) -> &[Chunk] {
        &self.children
    }

    /// Reads the endpoint attributes and children of `element`, whatever its
    /// name.
    fn read(element: &XmlElement) -> SamlResult<Self> {
        let response_location = element.attribute("ResponseLocation").map(str::to_string);
        let mut endpoint = Self::from_parts(
            required_attribute(element, "Binding")?.to_string(),
            required_attribute(element, "Location")?.to_string(),
            response_location,
        )?;
        endpoint.attributes = ForeignAttributes::read(element, MD_NS);
        endpoint.children = element.child_elements().map(Chunk::from_xml).collect();
        Ok(endpoint)
    }

    fn write(&self, element: &mut XmlElement) {
        element.set_attribute("Binding", self.binding.as_str());
        element.set_attribute("Location", self.location.as_str());
        element.set_optional_attribute("ResponseLocation", self.response_location.as_deref());
        self.attributes.write(element);
        for child in &self.children {
            child.append_to(element);
        }
    }
}

fn check_response_location<K: EndpointKind>(response_location: Option<&String>) -> SamlResult<()> {
    if !K::ALLOWS_RESPONSE_LOCATION {
        forbid("ResponseLocation", response_location)?;
    }
    if let Some(value) = response_location {
        require_uri("ResponseLocation", value)?;
    }
    Ok(())
}

impl<K: EndpointKind> SamlElement for Endpoint<K> {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = K::LOCAL_NAME;

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        Self::read(element)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.write(&mut element);
        element
    }
}

/// An endpoint selected by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEndpoint<K> {
    endpoint: Endpoint<K>,
    index: Lexical<u16>,
    is_default: Option<Lexical<bool>>,
}

impl<K: EndpointKind> IndexedEndpoint<K> {
    /// Wraps an endpoint with its index.
    #[must_use]
    pub const fn new(endpoint: Endpoint<K>, index: u16) -> Self {
        Self {
            endpoint,
            index: Lexical::new(index),
            is_default: None,
        }
    }

    /// Sets `isDefault`.
    #[must_use]
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = Some(Lexical::new(is_default));
        self
    }

    /// The endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint<K> {
        &self.endpoint
    }

    /// The `index` attribute.
    #[must_use]
    pub fn index(&self) -> u16 {
        self.index.get()
    }

    /// The `isDefault` attribute as written.
    #[must_use]
    pub fn is_default(&self) -> Option<bool> {
        self.is_default.as_ref().map(Lexical::get)
    }
}

impl<K> std::ops::Deref for IndexedEndpoint<K> {
    type Target = Endpoint<K>;

    fn deref(&self) -> &Self::Target {
        &self.endpoint
    }
}

impl<K: EndpointKind> SamlElement for IndexedEndpoint<K> {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = K::LOCAL_NAME;

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let index = Lexical::required(element, "index")?;
        let endpoint = Endpoint::read(element)?;
        Ok(Self {
            endpoint,
            index,
            is_default: Lexical::optional(element, "isDefault")?,
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.endpoint.write(&mut element);
        element.set_attribute("index", self.index.to_string());
        element.set_optional_attribute("isDefault", self.is_default.as_ref());
        element
    }
}

/// Picks the endpoint a peer should use when none is requested: the first
/// one marked default, else the first one not marked non-default, else the
/// first one.
pub fn default_endpoint<K>(endpoints: &[IndexedEndpoint<K>]) -> Option<&IndexedEndpoint<K>> {
    endpoints
        .iter()
        .find(|e| e.is_default.as_ref().is_some_and(Lexical::get))
        .or_else(|| endpoints.iter().find(|e| e.is_default.is_none()))
        .or_else(|| endpoints.first())
}

/// Finds the endpoint with `index`.
pub fn endpoint_by_index<K>(endpoints: &[IndexedEndpoint<K>], index: u16) -> Option<&IndexedEndpoint<K>> {
    endpoints.iter().find(|e| e.index.get() == index)
}

macro_rules! endpoint_kinds {
    ($($(#[$meta:meta])* $kind:ident => $alias:ident<$wrapper:ident>($local_name:literal, $allows:literal);)*) => {
        $(
            #[doc = concat!("Marker for `md:", $local_name, "`.")]
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $kind;

            impl EndpointKind for $kind {
                const LOCAL_NAME: &'static str = $local_name;
                const ALLOWS_RESPONSE_LOCATION: bool = $allows;
            }

            $(#[$meta])*
            pub type $alias = $wrapper<$kind>;
        )*
    };
}

endpoint_kinds! {
    /// Where an identity provider receives authentication requests.
    SingleSignOnServiceKind => SingleSignOnService<Endpoint>("SingleSignOnService", false);
    /// Where logout messages are received.
    SingleLogoutServiceKind => SingleLogoutService<Endpoint>("SingleLogoutService", true);
    /// Where name identifier management messages are received.
    ManageNameIdServiceKind => ManageNameIdService<Endpoint>("ManageNameIDService", true);
    /// Where name identifier mapping requests are received.
    NameIdMappingServiceKind => NameIdMappingService<Endpoint>("NameIDMappingService", false);
    /// Where assertions are requested by ID.
    AssertionIdRequestServiceKind => AssertionIdRequestService<Endpoint>("AssertionIDRequestService", false);
    /// Where attribute queries are received.
    AttributeServiceKind => AttributeService<Endpoint>("AttributeService", false);
    /// Where authentication queries are received.
    AuthnQueryServiceKind => AuthnQueryService<Endpoint>("AuthnQueryService", false);
    /// Where authorization decision queries are received.
    AuthzServiceKind => AuthzService<Endpoint>("AuthzService", false);
    /// Where artifacts are resolved.
    ArtifactResolutionServiceKind => ArtifactResolutionService<IndexedEndpoint>("ArtifactResolutionService", false);
    /// Where a service provider receives assertions.
    AssertionConsumerServiceKind => AssertionConsumerService<IndexedEndpoint>("AssertionConsumerService", true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SamlError;
    use crate::xml::parse;

    const SSO: &str = "https://idp.example.com/sso";

    #[test]
    fn response_location_is_forbidden_on_sso() {
        let endpoint = SingleSignOnService::for_binding(SamlBinding::HttpRedirect, SSO).unwrap();
        let err = endpoint.with_response_location("https://idp.example.com/r").unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "ResponseLocation"));

        let xml = r#"<md:SingleSignOnService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://idp.example.com/sso" ResponseLocation="https://idp.example.com/r"/>"#;
        let err = SingleSignOnService::from_xml_str(xml).unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "ResponseLocation"));
    }

    #[test]
    fn forbidden_response_location_is_reported_before_bad_binding() {
        let xml = r#"<md:SingleSignOnService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" Binding="" Location="https://idp.example.com/sso" ResponseLocation="https://idp.example.com/r"/>"#;
        let err = SingleSignOnService::from_xml_str(xml).unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "ResponseLocation"));
    }

    #[test]
    fn response_location_is_allowed_on_logout() {
        let endpoint = SingleLogoutService::for_binding(SamlBinding::HttpPost, "https://sp.example.com/slo")
            .unwrap()
            .with_response_location("https://sp.example.com/slo/response")
            .unwrap();
        assert_eq!(endpoint.response_location(), Some("https://sp.example.com/slo/response"));
        assert_eq!(endpoint.saml_binding(), Some(SamlBinding::HttpPost));
    }

    #[test]
    fn omitted_response_location_is_accepted() {
        let endpoint = SingleSignOnService::new("urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST", SSO).unwrap();
        assert_eq!(endpoint.response_location(), None);
    }

    #[test]
    fn location_must_be_a_uri() {
        let err = SingleSignOnService::for_binding(SamlBinding::HttpPost, "/sso").unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "Location"));
    }

    #[test]
    fn extension_attributes_and_children_round_trip() {
        let xml = r#"<md:SingleLogoutService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:ext="urn:ext" Binding="urn:oasis:names:tc:SAML:2.0:bindings:SOAP" Location="https://sp.example.com/soap" ext:weight="2"><ext:Hint>x</ext:Hint></md:SingleLogoutService>"#;
        let original = parse(xml).unwrap();
        let endpoint = SingleLogoutService::from_xml(&original).unwrap();
        assert_eq!(endpoint.attributes().get("urn:ext", "weight"), Some("2"));
        assert_eq!(endpoint.children().len(), 1);
        assert!(endpoint.to_xml().structurally_eq(&original));
    }

    #[test]
    fn indexed_endpoint_round_trip() {
        let xml = r#"<md:AssertionConsumerService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://sp.example.com/acs" index="3" isDefault="true"/>"#;
        let original = parse(xml).unwrap();
        let acs = AssertionConsumerService::from_xml(&original).unwrap();
        assert_eq!(acs.index(), 3);
        assert_eq!(acs.is_default(), Some(true));
        assert_eq!(acs.location(), "https://sp.example.com/acs");
        assert!(acs.to_xml().structurally_eq(&original));
    }

    #[test]
    fn index_is_required_and_numeric() {
        let xml = r#"<md:AssertionConsumerService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://sp.example.com/acs"/>"#;
        assert!(AssertionConsumerService::from_xml_str(xml).is_err());
        let xml = xml.replace("/>", " index=\"-1\"/>");
        assert!(AssertionConsumerService::from_xml_str(&xml).is_err());
    }

    #[test]
    fn default_selection() {
        let acs = |index, default| {
            let endpoint = Endpoint::for_binding(SamlBinding::HttpPost, "https://sp.example.com/acs").unwrap();
            let indexed = AssertionConsumerService::new(endpoint, index);
            match default {
                Some(flag) => indexed.with_default(flag),
                None => indexed,
            }
        };

        let endpoints = [acs(0, Some(false)), acs(1, None), acs(2, Some(true))];
        assert_eq!(default_endpoint(&endpoints).map(|e| e.index()), Some(2));

        let endpoints = [acs(0, Some(false)), acs(1, None)];
        assert_eq!(default_endpoint(&endpoints).map(|e| e.index()), Some(1));

        let endpoints = [acs(5, Some(false))];
        assert_eq!(default_endpoint(&endpoints).map(|e| e.index()), Some(5));
        assert!(endpoint_by_index(&endpoints, 4).is_none());
    }

    #[test]
    fn kind_mismatch_is_a_schema_error() {
        let xml = r#"<md:SingleLogoutService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" Binding="urn:oasis:names:tc:SAML:2.0:bindings:SOAP" Location="https://sp.example.com/soap"/>"#;
        assert!(matches!(
            SingleSignOnService::from_xml_str(xml),
            Err(SamlError::SchemaMismatch { .. })
        ));
    }
}
