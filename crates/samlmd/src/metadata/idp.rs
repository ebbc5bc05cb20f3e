//! `md:IDPSSODescriptor`.

use crate::dispatch::{known_child, ChildPolicy, DispatchTable, UnknownChildren};
use crate::element::{expect, new_element, SamlElement};
use crate::error::SamlResult;
use crate::signature::{extract_signature, Signable};
use crate::types::{Attribute, SamlBinding, MD_NS};
use crate::lexical::Lexical;
use crate::validation::{require_child, require_non_empty_list};
use crate::xml::XmlElement;

use super::role::{signable_descriptor, DescriptorChild, RoleDescriptorBase, SsoDescriptorBase};
use super::{
    ArtifactResolutionService, AssertionIdRequestService, AttributeProfile, ContactPerson,
    Extensions, KeyDescriptor, ManageNameIdService, NameIdFormat, NameIdMappingService,
    Organization, SingleLogoutService, SingleSignOnService,
};

static IDP_CHILDREN: DispatchTable<DescriptorChild> = DispatchTable {
    context: "IDPSSODescriptor",
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
        known_child!(SingleSignOnService => DescriptorChild::SingleSignOnService),
        known_child!(NameIdMappingService => DescriptorChild::NameIdMappingService),
        known_child!(AssertionIdRequestService => DescriptorChild::AssertionIdRequestService),
        known_child!(AttributeProfile => DescriptorChild::AttributeProfile),
        known_child!(Attribute => DescriptorChild::Attribute),
    ],
};

/// The identity provider role of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct IdpSsoDescriptor {
    sso: SsoDescriptorBase,
    want_authn_requests_signed: Option<Lexical<bool>>,
    single_sign_on_services: Vec<SingleSignOnService>,
    name_id_mapping_services: Vec<NameIdMappingService>,
    assertion_id_request_services: Vec<AssertionIdRequestService>,
    attribute_profiles: Vec<AttributeProfile>,
    attributes: Vec<Attribute>,
    unknown: UnknownChildren,
}

impl IdpSsoDescriptor {
    /// Creates the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`](crate::SamlError::Validation) if
    /// `single_sign_on_services` is empty.
    pub fn new(
        sso: SsoDescriptorBase,
        single_sign_on_services: Vec<SingleSignOnService>,
    ) -> SamlResult<Self> {
        require_non_empty_list("SingleSignOnService", &single_sign_on_services)?;
        Ok(Self {
            sso,
            want_authn_requests_signed: None,
            single_sign_on_services,
            name_id_mapping_services: Vec::new(),
            assertion_id_request_services: Vec::new(),
            attribute_profiles: Vec::new(),
            attributes: Vec::new(),
            unknown: UnknownChildren::default(),
        })
    }

    /// Sets `WantAuthnRequestsSigned`.
    #[must_use]
    pub fn with_want_authn_requests_signed(mut self, want: bool) -> Self {
        self.want_authn_requests_signed = Some(Lexical::new(want));
        self
    }

    /// Adds a name identifier mapping endpoint.
    #[must_use]
    pub fn with_name_id_mapping_service(mut self, service: NameIdMappingService) -> Self {
        self.name_id_mapping_services.push(service);
        self
    }

    /// Adds an assertion request endpoint.
    #[must_use]
    pub fn with_assertion_id_request_service(mut self, service: AssertionIdRequestService) -> Self {
        self.assertion_id_request_services.push(service);
        self
    }

    /// Adds a supported attribute profile.
    #[must_use]
    pub fn with_attribute_profile(mut self, profile: AttributeProfile) -> Self {
        self.attribute_profiles.push(profile);
        self
    }

    /// Adds an attribute the provider can supply.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
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

    /// Whether the provider wants signed authentication requests; absent
    /// means false.
    #[must_use]
    pub fn want_authn_requests_signed(&self) -> bool {
        self.want_authn_requests_signed.as_ref().map_or(false, Lexical::get)
    }

    /// Single sign-on endpoints in document order.
    #[must_use]
    pub fn single_sign_on_services(&self) -> &[SingleSignOnService] {
        &self.single_sign_on_services
    }

    /// The first single sign-on endpoint for `binding`.
    #[must_use]
    pub fn single_sign_on_service(&self, binding: SamlBinding) -> Option<&SingleSignOnService> {
        self.single_sign_on_services
            .iter()
            .find(|service| service.binding() == binding.uri())
    }

    /// Name identifier mapping endpoints.
    #[must_use]
    pub fn name_id_mapping_services(&self) -> &[NameIdMappingService] {
        &self.name_id_mapping_services
    }

    /// Assertion request endpoints.
    #[must_use]
    pub fn assertion_id_request_services(&self) -> &[AssertionIdRequestService] {
        &self.assertion_id_request_services
    }

    /// Supported attribute profiles.
    #[must_use]
    pub fn attribute_profiles(&self) -> &[AttributeProfile] {
        &self.attribute_profiles
    }

    /// Attributes the provider can supply.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Children kept as chunks.
    #[must_use]
    pub const fn unknown_children(&self) -> &UnknownChildren {
        &self.unknown
    }

    fn unsigned_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.role().write_attributes(&mut element);
        element.set_optional_attribute("WantAuthnRequestsSigned", self.want_authn_requests_signed.as_ref());
        self.sso.write_children(&mut element);
        for service in &self.single_sign_on_services {
            service.append_to(&mut element);
        }
        for service in &self.name_id_mapping_services {
            service.append_to(&mut element);
        }
        for service in &self.assertion_id_request_services {
            service.append_to(&mut element);
        }
        for profile in &self.attribute_profiles {
            profile.append_to(&mut element);
        }
        for attribute in &self.attributes {
            attribute.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

signable_descriptor!(IdpSsoDescriptor, |this| this.sso.role(), |this| this.sso.role_mut());

impl SamlElement for IdpSsoDescriptor {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "IDPSSODescriptor";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let (signature, children) = extract_signature(element)?;
        require_child(children.iter().copied(), MD_NS, "SingleSignOnService")?;

        let mut sso = SsoDescriptorBase::new(RoleDescriptorBase::read(element, signature)?);
        let (resolved, unknown) = IDP_CHILDREN.resolve_all(children)?;
        let mut single_sign_on_services = Vec::new();
        let mut name_id_mapping_services = Vec::new();
        let mut assertion_id_request_services = Vec::new();
        let mut attribute_profiles = Vec::new();
        let mut attributes = Vec::new();
        for child in resolved {
            let Some(child) = sso.accept(child)? else {
                continue;
            };
            match child {
                DescriptorChild::SingleSignOnService(service) => single_sign_on_services.push(service),
                DescriptorChild::NameIdMappingService(service) => name_id_mapping_services.push(service),
                DescriptorChild::AssertionIdRequestService(service) => {
                    assertion_id_request_services.push(service);
                }
                DescriptorChild::AttributeProfile(profile) => attribute_profiles.push(profile),
                DescriptorChild::Attribute(attribute) => attributes.push(attribute),
                other => return Err(other.unexpected()),
            }
        }

        let mut descriptor = Self::new(sso, single_sign_on_services)?;
        descriptor.want_authn_requests_signed = Lexical::optional(element, "WantAuthnRequestsSigned")?;
        descriptor.name_id_mapping_services = name_id_mapping_services;
        descriptor.assertion_id_request_services = assertion_id_request_services;
        descriptor.attribute_profiles = attribute_profiles;
        descriptor.attributes = attributes;
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
    use crate::types::StandardNameIdFormat;
    use crate::xml::parse;

    const IDP: &str = r#"<md:IDPSSODescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_idp" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol" WantAuthnRequestsSigned="true"><md:KeyDescriptor use="signing"><ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:KeyName>idp-signing</ds:KeyName></ds:KeyInfo></md:KeyDescriptor><md:SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example.com/slo" ResponseLocation="https://idp.example.com/slo/response"/><md:NameIDFormat>urn:oasis:names:tc:SAML:2.0:nameid-format:persistent</md:NameIDFormat><md:FutureService Binding="urn:x" Location="https://idp.example.com/future"/><md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example.com/sso"/><md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://idp.example.com/sso/post"/><saml:Attribute Name="mail"/></md:IDPSSODescriptor>"#;

    #[test]
    fn round_trip_keeps_unknown_child_in_place() {
        let original = parse(IDP).unwrap();
        let idp = IdpSsoDescriptor::from_xml(&original).unwrap();

        assert!(idp.want_authn_requests_signed());
        assert_eq!(idp.role().id(), Some("_idp"));
        assert_eq!(idp.single_sign_on_services().len(), 2);
        assert_eq!(
            idp.single_sign_on_service(SamlBinding::HttpPost).map(|s| s.location()),
            Some("https://idp.example.com/sso/post")
        );
        assert_eq!(
            idp.sso().name_id_formats()[0].known_format(),
            Some(StandardNameIdFormat::Persistent)
        );
        assert_eq!(idp.unknown_children().len(), 1);
        assert_eq!(idp.attributes()[0].name(), "mail");

        let written = idp.to_xml();
        assert!(written.structurally_eq(&original));
        let names: Vec<_> = written.child_elements().map(|e| e.local_name.as_str()).collect();
        assert_eq!(
            names,
            [
                "KeyDescriptor",
                "SingleLogoutService",
                "NameIDFormat",
                "FutureService",
                "SingleSignOnService",
                "SingleSignOnService",
                "Attribute",
            ]
        );
    }

    #[test]
    fn requires_a_single_sign_on_service() {
        let xml = r#"<md:IDPSSODescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"><md:NameIDFormat>urn:oasis:names:tc:SAML:2.0:nameid-format:transient</md:NameIDFormat></md:IDPSSODescriptor>"#;
        let err = IdpSsoDescriptor::from_xml_str(xml).unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "SingleSignOnService"));

        let err = IdpSsoDescriptor::new(SsoDescriptorBase::new(RoleDescriptorBase::saml2()), Vec::new())
            .unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "SingleSignOnService"));
    }

    #[test]
    fn two_organizations_are_rejected() {
        let organization = r#"<md:Organization><md:OrganizationName xml:lang="en">A</md:OrganizationName><md:OrganizationDisplayName xml:lang="en">A</md:OrganizationDisplayName><md:OrganizationURL xml:lang="en">https://a.example</md:OrganizationURL></md:Organization>"#;
        let xml = IDP.replacen(
            "<md:SingleLogoutService",
            &format!("{organization}{organization}<md:SingleLogoutService"),
            1,
        );
        let err = IdpSsoDescriptor::from_xml_str(&xml).unwrap_err();
        assert!(matches!(err, SamlError::MultipleElements { local_name } if local_name == "Organization"));
    }

    #[test]
    fn built_descriptor_parses_back() {
        let sso = SsoDescriptorBase::new(RoleDescriptorBase::saml2().with_id("_built").unwrap())
            .with_name_id_format(StandardNameIdFormat::Email.into());
        let idp = IdpSsoDescriptor::new(
            sso,
            vec![SingleSignOnService::for_binding(SamlBinding::HttpRedirect, "https://idp.example.com/sso").unwrap()],
        )
        .unwrap()
        .with_want_authn_requests_signed(false);

        assert!(!idp.is_signed());
        assert_eq!(IdpSsoDescriptor::from_xml(&idp.to_xml()).unwrap(), idp);
    }
}
