//! Authority roles: `md:AttributeAuthorityDescriptor`,
//! `md:AuthnAuthorityDescriptor` and `md:PDPDescriptor`.

use crate::dispatch::{known_child, ChildPolicy, DispatchTable, UnknownChildren};
use crate::element::{expect, new_element, SamlElement};
use crate::error::SamlResult;
use crate::signature::{extract_signature, Signable};
use crate::types::{Attribute, MD_NS};
use crate::validation::{require_child, require_non_empty_list};
use crate::xml::XmlElement;

use super::role::{signable_descriptor, DescriptorChild, RoleDescriptorBase};
use super::{
    AssertionIdRequestService, AttributeProfile, AttributeService, AuthnQueryService, AuthzService,
    ContactPerson, Extensions, KeyDescriptor, NameIdFormat, Organization,
};

static ATTRIBUTE_AUTHORITY_CHILDREN: DispatchTable<DescriptorChild> = DispatchTable {
    context: "AttributeAuthorityDescriptor",
    namespace: MD_NS,
    policy: ChildPolicy::Permissive,
    entries: &[
        known_child!(Extensions => DescriptorChild::Extensions),
        known_child!(KeyDescriptor => DescriptorChild::KeyDescriptor),
        known_child!(Organization => DescriptorChild::Organization),
        known_child!(ContactPerson => DescriptorChild::ContactPerson),
        known_child!(AttributeService => DescriptorChild::AttributeService),
        known_child!(AssertionIdRequestService => DescriptorChild::AssertionIdRequestService),
        known_child!(NameIdFormat => DescriptorChild::NameIdFormat),
        known_child!(AttributeProfile => DescriptorChild::AttributeProfile),
        known_child!(Attribute => DescriptorChild::Attribute),
    ],
};

/// The attribute authority role of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeAuthorityDescriptor {
    role: RoleDescriptorBase,
    attribute_services: Vec<AttributeService>,
    assertion_id_request_services: Vec<AssertionIdRequestService>,
    name_id_formats: Vec<NameIdFormat>,
    attribute_profiles: Vec<AttributeProfile>,
    attributes: Vec<Attribute>,
    unknown: UnknownChildren,
}

impl AttributeAuthorityDescriptor {
    /// Creates the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`](crate::SamlError::Validation) if
    /// `attribute_services` is empty.
    pub fn new(role: RoleDescriptorBase, attribute_services: Vec<AttributeService>) -> SamlResult<Self> {
        require_non_empty_list("AttributeService", &attribute_services)?;
        Ok(Self {
            role,
            attribute_services,
            assertion_id_request_services: Vec::new(),
            name_id_formats: Vec::new(),
            attribute_profiles: Vec::new(),
            attributes: Vec::new(),
            unknown: UnknownChildren::default(),
        })
    }

    /// Adds an assertion request endpoint.
    #[must_use]
    pub fn with_assertion_id_request_service(mut self, service: AssertionIdRequestService) -> Self {
        self.assertion_id_request_services.push(service);
        self
    }

    /// Adds a supported name identifier format.
    #[must_use]
    pub fn with_name_id_format(mut self, format: NameIdFormat) -> Self {
        self.name_id_formats.push(format);
        self
    }

    /// Adds a supported attribute profile.
    #[must_use]
    pub fn with_attribute_profile(mut self, profile: AttributeProfile) -> Self {
        self.attribute_profiles.push(profile);
        self
    }

    /// Adds an attribute the authority can supply.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// The role attributes and children.
    #[must_use]
    pub const fn role(&self) -> &RoleDescriptorBase {
        &self.role
    }

    /// Attribute query endpoints.
    #[must_use]
    pub fn attribute_services(&self) -> &[AttributeService] {
        &self.attribute_services
    }

    /// Assertion request endpoints.
    #[must_use]
    pub fn assertion_id_request_services(&self) -> &[AssertionIdRequestService] {
        &self.assertion_id_request_services
    }

    /// Supported name identifier formats.
    #[must_use]
    pub fn name_id_formats(&self) -> &[NameIdFormat] {
        &self.name_id_formats
    }

    /// Supported attribute profiles.
    #[must_use]
    pub fn attribute_profiles(&self) -> &[AttributeProfile] {
        &self.attribute_profiles
    }

    /// Attributes the authority can supply.
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
        self.role.write_attributes(&mut element);
        self.role.write_children(&mut element);
        for service in &self.attribute_services {
            service.append_to(&mut element);
        }
        for service in &self.assertion_id_request_services {
            service.append_to(&mut element);
        }
        for format in &self.name_id_formats {
            format.append_to(&mut element);
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

signable_descriptor!(AttributeAuthorityDescriptor, |this| &this.role, |this| &mut this.role);

impl SamlElement for AttributeAuthorityDescriptor {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "AttributeAuthorityDescriptor";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let (signature, children) = extract_signature(element)?;
        require_child(children.iter().copied(), MD_NS, "AttributeService")?;

        let mut role = RoleDescriptorBase::read(element, signature)?;
        let (resolved, unknown) = ATTRIBUTE_AUTHORITY_CHILDREN.resolve_all(children)?;
        let mut attribute_services = Vec::new();
        let mut assertion_id_request_services = Vec::new();
        let mut name_id_formats = Vec::new();
        let mut attribute_profiles = Vec::new();
        let mut attributes = Vec::new();
        for child in resolved {
            let Some(child) = role.accept(child)? else {
                continue;
            };
            match child {
                DescriptorChild::AttributeService(service) => attribute_services.push(service),
                DescriptorChild::AssertionIdRequestService(service) => {
                    assertion_id_request_services.push(service);
                }
                DescriptorChild::NameIdFormat(format) => name_id_formats.push(format),
                DescriptorChild::AttributeProfile(profile) => attribute_profiles.push(profile),
                DescriptorChild::Attribute(attribute) => attributes.push(attribute),
                other => return Err(other.unexpected()),
            }
        }

        let mut descriptor = Self::new(role, attribute_services)?;
        descriptor.assertion_id_request_services = assertion_id_request_services;
        descriptor.name_id_formats = name_id_formats;
        descriptor.attribute_profiles = attribute_profiles;
        descriptor.attributes = attributes;
        descriptor.unknown = unknown;
        Ok(descriptor)
    }

    fn to_xml(&self) -> XmlElement {
        self.to_signed_xml()
    }
}

/// Defines an authority descriptor whose content is one required endpoint
/// list followed by assertion request endpoints and name identifier formats.
macro_rules! query_authority {
    (
        $(#[$meta:meta])*
        $name:ident, $local_name:literal, $table:ident,
        $service:ident => $variant:ident, $services:ident
    ) => {
        static $table: DispatchTable<DescriptorChild> = DispatchTable {
            context: $local_name,
            namespace: MD_NS,
            policy: ChildPolicy::Permissive,
            entries: &[
                known_child!(Extensions => DescriptorChild::Extensions),
                known_child!(KeyDescriptor => DescriptorChild::KeyDescriptor),
                known_child!(Organization => DescriptorChild::Organization),
                known_child!(ContactPerson => DescriptorChild::ContactPerson),
                known_child!($service => DescriptorChild::$variant),
                known_child!(AssertionIdRequestService => DescriptorChild::AssertionIdRequestService),
                known_child!(NameIdFormat => DescriptorChild::NameIdFormat),
            ],
        };

        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            role: RoleDescriptorBase,
            $services: Vec<$service>,
            assertion_id_request_services: Vec<AssertionIdRequestService>,
            name_id_formats: Vec<NameIdFormat>,
            unknown: UnknownChildren,
        }

        impl $name {
            #[doc = concat!("Creates the descriptor.\n\n# Errors\n\nReturns a validation error if `", stringify!($services), "` is empty.")]
            pub fn new(role: RoleDescriptorBase, $services: Vec<$service>) -> SamlResult<Self> {
                require_non_empty_list(<$service as SamlElement>::LOCAL_NAME, &$services)?;
                Ok(Self {
                    role,
                    $services,
                    assertion_id_request_services: Vec::new(),
                    name_id_formats: Vec::new(),
                    unknown: UnknownChildren::default(),
                })
            }

            /// Adds an assertion request endpoint.
            #[must_use]
            pub fn with_assertion_id_request_service(mut self, service: AssertionIdRequestService) -> Self {
                self.assertion_id_request_services.push(service);
                self
            }

            /// Adds a supported name identifier format.
            #[must_use]
            pub fn with_name_id_format(mut self, format: NameIdFormat) -> Self {
                self.name_id_formats.push(format);
                self
            }

            /// The role attributes and children.
            #[must_use]
            pub const fn role(&self) -> &RoleDescriptorBase {
                &self.role
            }

            #[doc = concat!("`md:", stringify!($service), "` endpoints.")]
            #[must_use]
            pub fn $services(&self) -> &[$service] {
                &self.$services
            }

            /// Assertion request endpoints.
            #[must_use]
            pub fn assertion_id_request_services(&self) -> &[AssertionIdRequestService] {
                &self.assertion_id_request_services
            }

            /// Supported name identifier formats.
            #[must_use]
            pub fn name_id_formats(&self) -> &[NameIdFormat] {
                &self.name_id_formats
            }

            /// Children kept as chunks.
            #[must_use]
            pub const fn unknown_children(&self) -> &UnknownChildren {
                &self.unknown
            }

            fn unsigned_xml(&self) -> XmlElement {
                let mut element = new_element::<Self>();
                self.role.write_attributes(&mut element);
                self.role.write_children(&mut element);
                for service in &self.$services {
                    service.append_to(&mut element);
                }
                for service in &self.assertion_id_request_services {
                    service.append_to(&mut element);
                }
                for format in &self.name_id_formats {
                    format.append_to(&mut element);
                }
                self.unknown.weave_into(&mut element);
                element
            }
        }

        signable_descriptor!($name, |this| &this.role, |this| &mut this.role);

        impl SamlElement for $name {
            const NAMESPACE: &'static str = MD_NS;
            const LOCAL_NAME: &'static str = $local_name;

            fn from_xml(element: &XmlElement) -> SamlResult<Self> {
                expect::<Self>(element)?;
                let (signature, children) = extract_signature(element)?;
                require_child(children.iter().copied(), MD_NS, <$service as SamlElement>::LOCAL_NAME)?;

                let mut role = RoleDescriptorBase::read(element, signature)?;
                let (resolved, unknown) = $table.resolve_all(children)?;
                let mut $services = Vec::new();
                let mut assertion_id_request_services = Vec::new();
                let mut name_id_formats = Vec::new();
                for child in resolved {
                    let Some(child) = role.accept(child)? else {
                        continue;
                    };
                    match child {
                        DescriptorChild::$variant(service) => $services.push(service),
                        DescriptorChild::AssertionIdRequestService(service) => {
                            assertion_id_request_services.push(service);
                        }
                        DescriptorChild::NameIdFormat(format) => name_id_formats.push(format),
                        other => return Err(other.unexpected()),
                    }
                }

                let mut descriptor = Self::new(role, $services)?;
                descriptor.assertion_id_request_services = assertion_id_request_services;
                descriptor.name_id_formats = name_id_formats;
                descriptor.unknown = unknown;
                Ok(descriptor)
            }

            fn to_xml(&self) -> XmlElement {
                self.to_signed_xml()
            }
        }
    };
}

query_authority! {
    /// The authentication authority role of an entity.
    AuthnAuthorityDescriptor, "AuthnAuthorityDescriptor", AUTHN_AUTHORITY_CHILDREN,
    AuthnQueryService => AuthnQueryService, authn_query_services
}

query_authority! {
    /// The policy decision point role of an entity.
    PdpDescriptor, "PDPDescriptor", PDP_CHILDREN,
    AuthzService => AuthzService, authz_services
}
