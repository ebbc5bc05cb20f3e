//! `md:SPSSODescriptor`.

use crate::dispatch::{known_child, ChildPolicy, DispatchTable, UnknownChildren};
use crate::element::{expect, new_element, SamlElement};
use crate::error::SamlResult;
use crate::signature::{extract_signature, Signable};
use crate::types::MD_NS;
use crate::lexical::Lexical;
use crate::validation::{require_child, require_non_empty_list};
use crate::xml::XmlElement;

use super::role::{signable_descriptor, DescriptorChild, RoleDescriptorBase, SsoDescriptorBase};
use super::{
    default_endpoint, endpoint_by_index, ArtifactResolutionService, AssertionConsumerService,
    AttributeConsumingService, ContactPerson, Extensions, KeyDescriptor, ManageNameIdService,
    NameIdFormat, Organization, SingleLogoutService,
};

static SP_CHILDREN: DispatchTable<DescriptorChild> = DispatchTable {
    context: "SPSSODescriptor",
    namespace: MD_NS,
    policy: ChildPolicy::Permissive,
    entries: &[
        known_child!(Extensions => DescriptorChild::Extensions),
        known_child!(KeyDescriptor => DescriptorChild::KeyDescriptor),
        known_child!(Organization => DescriptorChild::Organization),
        known_child!(ContactPerson => DescriptorChild::ContactPerson),
        known_child!(ArtifactResolutionService => DescriptorChild::ArtifactResolutionService),
        known_child!(SingleLogoutService => DescriptorChild::SingleLogoutService),
        known_child!(ManageNameIdService => DescriptorChild::ManageNameIdService),
        known_child!(NameIdFormat => DescriptorChild::NameIdFormat),
        known_child!(AssertionConsumerService => DescriptorChild::AssertionConsumerService),
        known_child!(AttributeConsumingService => DescriptorChild::AttributeConsumingService),
    ],
};

/// The service provider role of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SpSsoDescriptor {
    sso: SsoDescriptorBase,
    authn_requests_signed: Option<Lexical<bool>>,
    want_assertions_signed: Option<Lexical<bool>>,
    assertion_consumer_services: Vec<AssertionConsumerService>,
    attribute_consuming_services: Vec<AttributeConsumingService>,
    unknown: UnknownChildren,
}

impl SpSsoDescriptor {
    /// Creates the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`](crate::SamlError::Validation) if
    /// `assertion_consumer_services` is empty.
    pub fn new(
        sso: SsoDescriptorBase,
        assertion_consumer_services: Vec<AssertionConsumerService>,
    ) -> SamlResult<Self> {
        require_non_empty_list("AssertionConsumerService", &assertion_consumer_services)?;
        Ok(Self {
            sso,
            authn_requests_signed: None,
            want_assertions_signed: None,
            assertion_consumer_services,
            attribute_consuming_services: Vec::new(),
            unknown: UnknownChildren::default(),
        })
    }

    /// Sets `AuthnRequestsSigned`.
    #[must_use]
    pub fn with_authn_requests_signed(mut self, signed: bool) -> Self {
        self.authn_requests_signed = Some(Lexical::new(signed));
        self
    }

    /// Sets `WantAssertionsSigned`.
    #[must_use]
    pub fn with_want_assertions_signed(mut self, want: bool) -> Self {
        self.want_assertions_signed = Some(Lexical::new(want));
        self
    }

    /// Adds an attribute consuming service.
    #[must_use]
    pub fn with_attribute_consuming_service(mut self, service: AttributeConsumingService) -> Self {
        self.attribute_consuming_services.push(service);
        self
    }

    /// The role attributes and children.
    #[must_use]
    pub const fn role(&self) -> &RoleDescriptorBase {
        self.sso.role()
    }

    /// The SSO endpoint lists.
    #[must_use]
    pub const fn sso(&self) -> &SsoDescriptorBase {
        &self.sso
    }

    /// Whether the provider signs its authentication requests; absent means
    /// false.
    #[must_use]
    pub fn authn_requests_signed(&self) -> bool {
        self.authn_requests_signed.as_ref().map_or(false, Lexical::get)
    }

    /// Whether the provider wants signed assertions; absent means false.
    #[must_use]
    pub fn want_assertions_signed(&self) -> bool {
        self.want_assertions_signed.as_ref().map_or(false, Lexical::get)
    }

    /// Assertion consumer endpoints in document order.
    #[must_use]
    pub fn assertion_consumer_services(&self) -> &[AssertionConsumerService] {
        &self.assertion_consumer_services
    }

    /// The endpoint used when a request names none.
    #[must_use]
    pub fn default_assertion_consumer_service(&self) -> Option<&AssertionConsumerService> {
        default_endpoint(&self.assertion_consumer_services)
    }

    /// The assertion consumer endpoint with `index`.
    #[must_use]
    pub fn assertion_consumer_service(&self, index: u16) -> Option<&AssertionConsumerService> {
        endpoint_by_index(&self.assertion_consumer_services, index)
    }

    /// Attribute consuming services.
    #[must_use]
    pub fn attribute_consuming_services(&self) -> &[AttributeConsumingService] {
        &self.attribute_consuming_services
    }

    /// Children kept as chunks.
    #[must_use]
    pub const fn unknown_children(&self) -> &UnknownChildren {
        &self.unknown
    }

    fn unsigned_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.role().write_attributes(&mut element);
        element.set_optional_attribute("AuthnRequestsSigned", self.authn_requests_signed.as_ref());
        element.set_optional_attribute("WantAssertionsSigned", self.want_assertions_signed.as_ref());
        self.sso.write_children(&mut element);
        for service in &self.assertion_consumer_services {
            service.append_to(&mut element);
        }
        for service in &self.attribute_consuming_services {
            service.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

signable_descriptor!(SpSsoDescriptor, |this| this.sso.role(), |this| this.sso.role_mut());

impl SamlElement for SpSsoDescriptor {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "SPSSODescriptor";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let (signature, children) = extract_signature(element)?;
        require_child(children.iter().copied(), MD_NS, "AssertionConsumerService")?;

        let mut sso = SsoDescriptorBase::new(RoleDescriptorBase::read(element, signature)?);
        let (resolved, unknown) = SP_CHILDREN.resolve_all(children)?;
        let mut assertion_consumer_services = Vec::new();
        let mut attribute_consuming_services = Vec::new();
        for child in resolved {
            let Some(child) = sso.accept(child)? else {
                continue;
            };
            match child {
                DescriptorChild::AssertionConsumerService(service) => {
                    assertion_consumer_services.push(service);
                }
                DescriptorChild::AttributeConsumingService(service) => {
                    attribute_consuming_services.push(service);
                }
                other => return Err(other.unexpected()),
            }
        }

        let mut descriptor = Self::new(sso, assertion_consumer_services)?;
        descriptor.authn_requests_signed = Lexical::optional(element, "AuthnRequestsSigned")?;
        descriptor.want_assertions_signed = Lexical::optional(element, "WantAssertionsSigned")?;
        descriptor.attribute_consuming_services = attribute_consuming_services;
        descriptor.unknown = unknown;
        Ok(descriptor)
    }

    fn to_xml(&self) -> XmlElement {
        self.to_signed_xml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SamlError;
    use crate::types::SamlBinding;
    use crate::xml::parse;

    const SP: &str = r#"<md:SPSSODescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol" validUntil="2099-01-01T01:00:00+01:00" AuthnRequestsSigned="true" WantAssertionsSigned="1"><md:SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://sp.example.com/slo"/><md:AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://sp.example.com/acs" index="0" isDefault="false"/><md:AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Artifact" Location="https://sp.example.com/acs/artifact" index="01"/><md:AttributeConsumingService index="0"><md:ServiceName xml:lang="en">Portal</md:ServiceName><md:RequestedAttribute Name="mail"/></md:AttributeConsumingService></md:SPSSODescriptor>"#;

    #[test]
    fn round_trip() {
        let original = parse(SP).unwrap();
        let sp = SpSsoDescriptor::from_xml(&original).unwrap();
        assert!(sp.authn_requests_signed());
        assert!(sp.want_assertions_signed());
        assert_eq!(sp.sso().single_logout_services().len(), 1);
        assert_eq!(sp.attribute_consuming_services().len(), 1);
        assert!(sp.to_xml().structurally_eq(&original));
    }

    #[test]
    fn schema_values_keep_their_source_spelling() {
        let sp = SpSsoDescriptor::from_xml_str(SP).unwrap();
        let written = sp.to_xml();
        assert_eq!(written.attribute("WantAssertionsSigned"), Some("1"));
        assert_eq!(written.attribute("validUntil"), Some("2099-01-01T01:00:00+01:00"));
        let indexes: Vec<_> = written
            .child_elements()
            .filter(|e| e.local_name == "AssertionConsumerService")
            .filter_map(|e| e.attribute("index"))
            .collect();
        assert_eq!(indexes, ["0", "01"]);
    }

    #[test]
    fn default_consumer_skips_explicit_non_default() {
        let sp = SpSsoDescriptor::from_xml_str(SP).unwrap();
        assert_eq!(sp.default_assertion_consumer_service().map(|acs| acs.index()), Some(1));
        assert_eq!(
            sp.assertion_consumer_service(0).map(|acs| acs.location()),
            Some("https://sp.example.com/acs")
        );
        assert!(sp.assertion_consumer_service(7).is_none());
    }

    #[test]
    fn requires_an_assertion_consumer_service() {
        let xml = r#"<md:SPSSODescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"/>"#;
        let err = SpSsoDescriptor::from_xml_str(xml).unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "AssertionConsumerService"));
    }

    #[test]
    fn consumer_with_response_location_is_accepted() {
        let acs = AssertionConsumerService::new(
            crate::metadata::Endpoint::for_binding(SamlBinding::HttpPost, "https://sp.example.com/acs")
                .unwrap()
                .with_response_location("https://sp.example.com/acs/done")
                .unwrap(),
            0,
        );
        let sp = SpSsoDescriptor::new(SsoDescriptorBase::new(RoleDescriptorBase::saml2()), vec![acs]).unwrap();
        assert_eq!(SpSsoDescriptor::from_xml(&sp.to_xml()).unwrap(), sp);
    }
}
