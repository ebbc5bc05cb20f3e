//! State shared by every role descriptor.
//!
//! [`RoleDescriptorBase`] carries the `md:RoleDescriptorType` attributes and
//! leading children; [`SsoDescriptorBase`] adds the `md:SSODescriptorType`
//! endpoint lists. Concrete descriptors dispatch into [`DescriptorChild`]
//! and hand each value to the base layers before handling their own.

use crate::element::SamlElement;
use crate::error::{SamlError, SamlResult};
use crate::signature::SignatureSlot;
use crate::types::{Attribute, MD_NS, SAML20_PROTOCOL};
use crate::validation::{
    require_non_empty, require_non_empty_list, require_uri, required_attribute, set_once,
    split_tokens,
};
use crate::xml::{XmlAttribute, XmlElement};

use super::{
    ArtifactResolutionService, AssertionConsumerService, AssertionIdRequestService,
    AttributeConsumingService, AttributeProfile, AttributeService, AuthnQueryService, AuthzService,
    ContactPerson, Extensions, ForeignAttributes, KeyDescriptor, KeyUse, ManageNameIdService,
    NameIdFormat, NameIdMappingService, Organization, SingleLogoutService, SingleSignOnService,
    Validity,
};

/// A child of any role descriptor.
#[derive(Debug)]
pub(super) enum DescriptorChild {
    Extensions(Extensions),
    KeyDescriptor(KeyDescriptor),
    Organization(Organization),
    ContactPerson(ContactPerson),
    ArtifactResolutionService(ArtifactResolutionService),
    SingleLogoutService(SingleLogoutService),
    ManageNameIdService(ManageNameIdService),
    NameIdFormat(NameIdFormat),
    SingleSignOnService(SingleSignOnService),
    NameIdMappingService(NameIdMappingService),
    AssertionIdRequestService(AssertionIdRequestService),
    AttributeProfile(AttributeProfile),
    Attribute(Attribute),
    AssertionConsumerService(AssertionConsumerService),
    AttributeConsumingService(AttributeConsumingService),
    AttributeService(AttributeService),
    AuthnQueryService(AuthnQueryService),
    AuthzService(AuthzService),
}

impl DescriptorChild {
    fn name(&self) -> (&'static str, &'static str) {
        fn of<T: SamlElement>(_: &T) -> (&'static str, &'static str) {
            (T::NAMESPACE, T::LOCAL_NAME)
        }
        match self {
            Self::Extensions(v) => of(v),
            Self::KeyDescriptor(v) => of(v),
            Self::Organization(v) => of(v),
            Self::ContactPerson(v) => of(v),
            Self::ArtifactResolutionService(v) => of(v),
            Self::SingleLogoutService(v) => of(v),
            Self::ManageNameIdService(v) => of(v),
            Self::NameIdFormat(v) => of(v),
            Self::SingleSignOnService(v) => of(v),
            Self::NameIdMappingService(v) => of(v),
            Self::AssertionIdRequestService(v) => of(v),
            Self::AttributeProfile(v) => of(v),
            Self::Attribute(v) => of(v),
            Self::AssertionConsumerService(v) => of(v),
            Self::AttributeConsumingService(v) => of(v),
            Self::AttributeService(v) => of(v),
            Self::AuthnQueryService(v) => of(v),
            Self::AuthzService(v) => of(v),
        }
    }

    /// The error for a child the descriptor's table should not have produced.
    pub(super) fn unexpected(self) -> SamlError {
        let (namespace, local_name) = self.name();
        SamlError::UnexpectedElement {
            namespace: namespace.to_string(),
            local_name: local_name.to_string(),
        }
    }
}

/// Attributes and leading children common to all role descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleDescriptorBase {
    id: Option<String>,
    validity: Validity,
    protocols: Vec<String>,
    error_url: Option<String>,
    attributes: ForeignAttributes,
    signature: SignatureSlot,
    extensions: Option<Extensions>,
    key_descriptors: Vec<KeyDescriptor>,
    organization: Option<Organization>,
    contacts: Vec<ContactPerson>,
}

impl RoleDescriptorBase {
    /// Creates a base supporting `protocols`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if the list is empty or an entry is
    /// not a URI.
    pub fn new(protocols: Vec<String>) -> SamlResult<Self> {
        require_non_empty_list("protocolSupportEnumeration", &protocols)?;
        for protocol in &protocols {
            require_uri("protocolSupportEnumeration", protocol)?;
        }
        Ok(Self {
            id: None,
            validity: Validity::new(),
            protocols,
            error_url: None,
            attributes: ForeignAttributes::new(),
            signature: SignatureSlot::unsigned(),
            extensions: None,
            key_descriptors: Vec::new(),
            organization: None,
            contacts: Vec::new(),
        })
    }

    /// A base supporting SAML 2.0 only.
    #[must_use]
    pub fn saml2() -> Self {
        Self {
            id: None,
            validity: Validity::new(),
            protocols: vec![SAML20_PROTOCOL.to_string()],
            error_url: None,
            attributes: ForeignAttributes::new(),
            signature: SignatureSlot::unsigned(),
            extensions: None,
            key_descriptors: Vec::new(),
            organization: None,
            contacts: Vec::new(),
        }
    }

    /// Sets the `ID` attribute.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `id` is empty.
    pub fn with_id(mut self, id: impl Into<String>) -> SamlResult<Self> {
        let id = id.into();
        require_non_empty("ID", &id)?;
        self.id = Some(id);
        Ok(self)
    }

    /// Sets `validUntil` and `cacheDuration`.
    #[must_use]
    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    /// Sets the `errorURL` attribute.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `url` is not a URI.
    pub fn with_error_url(mut self, url: impl Into<String>) -> SamlResult<Self> {
        let url = url.into();
        require_uri("errorURL", &url)?;
        self.error_url = Some(url);
        Ok(self)
    }

    /// Adds a namespace-qualified attribute.
    ///
    /// # Errors
    ///
    /// See [`ForeignAttributes::insert`].
    pub fn with_attribute(mut self, attribute: XmlAttribute) -> SamlResult<Self> {
        self.attributes.insert(attribute)?;
        Ok(self)
    }

    /// Sets the extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Adds a key descriptor.
    #[must_use]
    pub fn with_key_descriptor(mut self, key_descriptor: KeyDescriptor) -> Self {
        self.key_descriptors.push(key_descriptor);
        self
    }

    /// Sets the organization.
    #[must_use]
    pub fn with_organization(mut self, organization: Organization) -> Self {
        self.organization = Some(organization);
        self
    }

    /// Adds a contact.
    #[must_use]
    pub fn with_contact(mut self, contact: ContactPerson) -> Self {
        self.contacts.push(contact);
        self
    }

    /// The `ID` attribute.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// `validUntil` and `cacheDuration`.
    #[must_use]
    pub const fn validity(&self) -> &Validity {
        &self.validity
    }

    /// The supported protocol URIs.
    #[must_use]
    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    /// Returns true if `protocol` is listed.
    #[must_use]
    pub fn supports_protocol(&self, protocol: &str) -> bool {
        self.protocols.iter().any(|p| p == protocol)
    }

    /// The `errorURL` attribute.
    #[must_use]
    pub fn error_url(&self) -> Option<&str> {
        self.error_url.as_deref()
    }

    /// Namespace-qualified attributes.
    #[must_use]
    pub const fn attributes(&self) -> &ForeignAttributes {
        &self.attributes
    }

    /// The extensions.
    #[must_use]
    pub const fn extensions(&self) -> Option<&Extensions> {
        self.extensions.as_ref()
    }

    /// Key descriptors in document order.
    #[must_use]
    pub fn key_descriptors(&self) -> &[KeyDescriptor] {
        &self.key_descriptors
    }

    /// Key descriptors usable for `key_use`.
    pub fn keys_for(&self, key_use: KeyUse) -> impl Iterator<Item = &KeyDescriptor> {
        self.key_descriptors
            .iter()
            .filter(move |descriptor| descriptor.is_usable_for(key_use))
    }

    /// The organization.
    #[must_use]
    pub const fn organization(&self) -> Option<&Organization> {
        self.organization.as_ref()
    }

    /// Contacts in document order.
    #[must_use]
    pub fn contacts(&self) -> &[ContactPerson] {
        &self.contacts
    }

    pub(super) const fn signature_slot(&self) -> &SignatureSlot {
        &self.signature
    }

    pub(super) fn signature_slot_mut(&mut self) -> &mut SignatureSlot {
        &mut self.signature
    }

    /// Reads the shared attributes of `element`.
    pub(super) fn read(element: &XmlElement, signature: SignatureSlot) -> SamlResult<Self> {
        let protocols = split_tokens(
            "protocolSupportEnumeration",
            required_attribute(element, "protocolSupportEnumeration")?,
        )?;
        let mut base = Self::new(protocols)?;
        if let Some(id) = element.attribute("ID") {
            base = base.with_id(id)?;
        }
        if let Some(url) = element.attribute("errorURL") {
            base = base.with_error_url(url)?;
        }
        base.validity = Validity::read(element)?;
        base.attributes = ForeignAttributes::read(element, MD_NS);
        base.signature = signature;
        Ok(base)
    }

    /// Takes a shared child, or hands it back.
    pub(super) fn accept(&mut self, child: DescriptorChild) -> SamlResult<Option<DescriptorChild>> {
        match child {
            DescriptorChild::Extensions(extensions) => {
                set_once(&mut self.extensions, extensions, "Extensions")?;
            }
            DescriptorChild::KeyDescriptor(descriptor) => self.key_descriptors.push(descriptor),
            DescriptorChild::Organization(organization) => {
                set_once(&mut self.organization, organization, "Organization")?;
            }
            DescriptorChild::ContactPerson(contact) => self.contacts.push(contact),
            other => return Ok(Some(other)),
        }
        Ok(None)
    }

    pub(super) fn write_attributes(&self, element: &mut XmlElement) {
        element.set_optional_attribute("ID", self.id.as_deref());
        self.validity.write(element);
        element.set_attribute("protocolSupportEnumeration", self.protocols.join(" "));
        element.set_optional_attribute("errorURL", self.error_url.as_deref());
        self.attributes.write(element);
    }

    pub(super) fn write_children(&self, element: &mut XmlElement) {
        if let Some(extensions) = &self.extensions {
            extensions.append_to(element);
        }
        for descriptor in &self.key_descriptors {
            descriptor.append_to(element);
        }
        if let Some(organization) = &self.organization {
            organization.append_to(element);
        }
        for contact in &self.contacts {
            contact.append_to(element);
        }
    }
}

/// State shared by the identity and service provider descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct SsoDescriptorBase {
    role: RoleDescriptorBase,
    artifact_resolution_services: Vec<ArtifactResolutionService>,
    single_logout_services: Vec<SingleLogoutService>,
    manage_name_id_services: Vec<ManageNameIdService>,
    name_id_formats: Vec<NameIdFormat>,
}

impl SsoDescriptorBase {
    /// Wraps the role attributes.
    #[must_use]
    pub const fn new(role: RoleDescriptorBase) -> Self {
        Self {
            role,
            artifact_resolution_services: Vec::new(),
            single_logout_services: Vec::new(),
            manage_name_id_services: Vec::new(),
            name_id_formats: Vec::new(),
        }
    }

    /// Adds an artifact resolution endpoint.
    #[must_use]
    pub fn with_artifact_resolution_service(mut self, service: ArtifactResolutionService) -> Self {
        self.artifact_resolution_services.push(service);
        self
    }

    /// Adds a logout endpoint.
    #[must_use]
    pub fn with_single_logout_service(mut self, service: SingleLogoutService) -> Self {
        self.single_logout_services.push(service);
        self
    }

    /// Adds a name identifier management endpoint.
    #[must_use]
    pub fn with_manage_name_id_service(mut self, service: ManageNameIdService) -> Self {
        self.manage_name_id_services.push(service);
        self
    }

    /// Adds a supported name identifier format.
    #[must_use]
    pub fn with_name_id_format(mut self, format: NameIdFormat) -> Self {
        self.name_id_formats.push(format);
        self
    }

    /// The role attributes.
    #[must_use]
    pub const fn role(&self) -> &RoleDescriptorBase {
        &self.role
    }

    /// Artifact resolution endpoints.
    #[must_use]
    pub fn artifact_resolution_services(&self) -> &[ArtifactResolutionService] {
        &self.artifact_resolution_services
    }

    /// Logout endpoints.
    #[must_use]
    pub fn single_logout_services(&self) -> &[SingleLogoutService] {
        &self.single_logout_services
    }

    /// Name identifier management endpoints.
    #[must_use]
    pub fn manage_name_id_services(&self) -> &[ManageNameIdService] {
        &self.manage_name_id_services
    }

    /// Supported name identifier formats.
    #[must_use]
    pub fn name_id_formats(&self) -> &[NameIdFormat] {
        &self.name_id_formats
    }

    pub(super) fn role_mut(&mut self) -> &mut RoleDescriptorBase {
        &mut self.role
    }

    pub(super) fn accept(&mut self, child: DescriptorChild) -> SamlResult<Option<DescriptorChild>> {
        let Some(child) = self.role.accept(child)? else {
            return Ok(None);
        };
        match child {
            DescriptorChild::ArtifactResolutionService(service) => {
                self.artifact_resolution_services.push(service);
            }
            DescriptorChild::SingleLogoutService(service) => self.single_logout_services.push(service),
            DescriptorChild::ManageNameIdService(service) => self.manage_name_id_services.push(service),
            DescriptorChild::NameIdFormat(format) => self.name_id_formats.push(format),
            other => return Ok(Some(other)),
        }
        Ok(None)
    }

    pub(super) fn write_children(&self, element: &mut XmlElement) {
        self.role.write_children(element);
        for service in &self.artifact_resolution_services {
            service.append_to(element);
        }
        for service in &self.single_logout_services {
            service.append_to(element);
        }
        for service in &self.manage_name_id_services {
            service.append_to(element);
        }
        for format in &self.name_id_formats {
            format.append_to(element);
        }
    }
}

/// Implements [`Signable`](crate::signature::Signable) for a descriptor
/// through the path to its [`RoleDescriptorBase`].
macro_rules! signable_descriptor {
    ($ty:ty, |$this:ident| $role:expr, |$this_mut:ident| $role_mut:expr) => {
        impl $crate::signature::Signable for $ty {
            fn id(&self) -> Option<&str> {
                let $this = self;
                $role.id()
            }

            fn signature_slot(&self) -> &$crate::signature::SignatureSlot {
                let $this = self;
                $role.signature_slot()
            }

            fn signature_slot_mut(&mut self) -> &mut $crate::signature::SignatureSlot {
                let $this_mut = self;
                $role_mut.signature_slot_mut()
            }

            fn to_unsigned_xml(&self) -> $crate::xml::XmlElement {
                self.unsigned_xml()
            }
        }
    };
}

pub(super) use signable_descriptor;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    #[test]
    fn protocols_must_be_uris() {
        let err = RoleDescriptorBase::new(vec![SAML20_PROTOCOL.into(), "not a uri".into()]).unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "protocolSupportEnumeration"));

        let err = RoleDescriptorBase::new(Vec::new()).unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "protocolSupportEnumeration"));
    }

    #[test]
    fn reads_token_list_across_whitespace_runs() {
        let element = parse(
            "<md:X xmlns:md=\"urn:oasis:names:tc:SAML:2.0:metadata\" ID=\"_r\" protocolSupportEnumeration=\"  urn:oasis:names:tc:SAML:2.0:protocol\n\turn:oasis:names:tc:SAML:1.1:protocol \"/>",
        )
        .unwrap();
        let base = RoleDescriptorBase::read(&element, SignatureSlot::unsigned()).unwrap();
        assert_eq!(base.protocols().len(), 2);
        assert!(base.supports_protocol(SAML20_PROTOCOL));
        assert_eq!(base.id(), Some("_r"));
    }

    #[test]
    fn blank_protocol_list_is_rejected() {
        let element = parse(r#"<md:X xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" protocolSupportEnumeration="   "/>"#).unwrap();
        let err = RoleDescriptorBase::read(&element, SignatureSlot::unsigned()).unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "protocolSupportEnumeration"));
    }

    #[test]
    fn second_extensions_is_rejected() {
        let extensions = Extensions::from_xml_str(
            r#"<md:Extensions xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"><x:a xmlns:x="urn:x"/></md:Extensions>"#,
        )
        .unwrap();
        let mut base = RoleDescriptorBase::saml2();
        assert!(base.accept(DescriptorChild::Extensions(extensions.clone())).unwrap().is_none());
        let err = base.accept(DescriptorChild::Extensions(extensions)).unwrap_err();
        assert!(matches!(err, SamlError::MultipleElements { local_name } if local_name == "Extensions"));
    }
}
