//! `md:EntityDescriptor` and `md:EntitiesDescriptor`.

use chrono::{DateTime, Utc};

use crate::chunk::Chunk;
use crate::dispatch::{known_child, ChildPolicy, DispatchEntry, DispatchTable, UnknownChildren};
use crate::element::{expect, new_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::signature::{extract_signature, Signable, SignatureSlot};
use crate::types::MD_NS;
use crate::validation::{self, require_non_empty, require_non_empty_list, required_attribute, set_once};
use crate::xml::{XmlAttribute, XmlElement};

use super::{
    AdditionalMetadataLocation, AffiliationDescriptor, AttributeAuthorityDescriptor,
    AuthnAuthorityDescriptor, ContactPerson, Extensions, ForeignAttributes, IdpSsoDescriptor,
    Organization, PdpDescriptor, RoleDescriptorBase, SpSsoDescriptor, Validity,
};

/// One role of an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleDescriptor {
    /// `md:IDPSSODescriptor`.
    IdpSso(IdpSsoDescriptor),
    /// `md:SPSSODescriptor`.
    SpSso(SpSsoDescriptor),
    /// `md:AttributeAuthorityDescriptor`.
    AttributeAuthority(AttributeAuthorityDescriptor),
    /// `md:AuthnAuthorityDescriptor`.
    AuthnAuthority(AuthnAuthorityDescriptor),
    /// `md:PDPDescriptor`.
    Pdp(PdpDescriptor),
    /// `md:RoleDescriptor` extended through `xsi:type`, kept verbatim.
    Other(Chunk),
}

impl RoleDescriptor {
    /// Local name of the element.
    #[must_use]
    pub fn local_name(&self) -> &str {
        match self {
            Self::IdpSso(_) => IdpSsoDescriptor::LOCAL_NAME,
            Self::SpSso(_) => SpSsoDescriptor::LOCAL_NAME,
            Self::AttributeAuthority(_) => AttributeAuthorityDescriptor::LOCAL_NAME,
            Self::AuthnAuthority(_) => AuthnAuthorityDescriptor::LOCAL_NAME,
            Self::Pdp(_) => PdpDescriptor::LOCAL_NAME,
            Self::Other(chunk) => chunk.local_name(),
        }
    }

    /// The shared role attributes, for the typed roles.
    #[must_use]
    pub const fn base(&self) -> Option<&RoleDescriptorBase> {
        match self {
            Self::IdpSso(role) => Some(role.role()),
            Self::SpSso(role) => Some(role.role()),
            Self::AttributeAuthority(role) => Some(role.role()),
            Self::AuthnAuthority(role) => Some(role.role()),
            Self::Pdp(role) => Some(role.role()),
            Self::Other(_) => None,
        }
    }

    /// The typed role as a signable value.
    #[must_use]
    pub fn as_signable(&self) -> Option<&dyn Signable> {
        match self {
            Self::IdpSso(role) => Some(role),
            Self::SpSso(role) => Some(role),
            Self::AttributeAuthority(role) => Some(role),
            Self::AuthnAuthority(role) => Some(role),
            Self::Pdp(role) => Some(role),
            Self::Other(_) => None,
        }
    }

    /// Returns true if the role carries its own signature.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.as_signable().map_or(false, |role| role.is_signed())
    }

    /// Serializes the role.
    #[must_use]
    pub fn to_xml(&self) -> XmlElement {
        match self {
            Self::IdpSso(role) => role.to_xml(),
            Self::SpSso(role) => role.to_xml(),
            Self::AttributeAuthority(role) => role.to_xml(),
            Self::AuthnAuthority(role) => role.to_xml(),
            Self::Pdp(role) => role.to_xml(),
            Self::Other(chunk) => chunk.to_xml(),
        }
    }
}

macro_rules! role_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RoleDescriptor {
                fn from(role: $ty) -> Self {
                    Self::$variant(role)
                }
            }
        )*
    };
}

role_from! {
    IdpSsoDescriptor => IdpSso,
    SpSsoDescriptor => SpSso,
    AttributeAuthorityDescriptor => AttributeAuthority,
    AuthnAuthorityDescriptor => AuthnAuthority,
    PdpDescriptor => Pdp,
}

/// What an entity describes: its roles, or an affiliation.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityContent {
    /// One or more role descriptors.
    Roles(Vec<RoleDescriptor>),
    /// An affiliation of other entities.
    Affiliation(AffiliationDescriptor),
}

enum EntityChild {
    Extensions(Extensions),
    Role(RoleDescriptor),
    Affiliation(AffiliationDescriptor),
    Organization(Organization),
    Contact(ContactPerson),
    Location(AdditionalMetadataLocation),
}

const ROLE_NAMES: [&str; 6] = [
    "RoleDescriptor",
    "IDPSSODescriptor",
    "SPSSODescriptor",
    "AuthnAuthorityDescriptor",
    "AttributeAuthorityDescriptor",
    "PDPDescriptor",
];

static ENTITY_CHILDREN: DispatchTable<EntityChild> = DispatchTable {
    context: "EntityDescriptor",
    namespace: MD_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(Extensions => EntityChild::Extensions),
        DispatchEntry {
            namespace: MD_NS,
            local_name: "RoleDescriptor",
            parse: |element| Ok(EntityChild::Role(RoleDescriptor::Other(Chunk::from_xml(element)))),
        },
        known_child!(IdpSsoDescriptor => |role| EntityChild::Role(RoleDescriptor::IdpSso(role))),
        known_child!(SpSsoDescriptor => |role| EntityChild::Role(RoleDescriptor::SpSso(role))),
        known_child!(AuthnAuthorityDescriptor => |role| EntityChild::Role(RoleDescriptor::AuthnAuthority(role))),
        known_child!(AttributeAuthorityDescriptor => |role| EntityChild::Role(RoleDescriptor::AttributeAuthority(role))),
        known_child!(PdpDescriptor => |role| EntityChild::Role(RoleDescriptor::Pdp(role))),
        known_child!(AffiliationDescriptor => EntityChild::Affiliation),
        known_child!(Organization => EntityChild::Organization),
        known_child!(ContactPerson => EntityChild::Contact),
        known_child!(AdditionalMetadataLocation => EntityChild::Location),
    ],
};

/// Metadata for a single entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    entity_id: String,
    id: Option<String>,
    validity: Validity,
    attributes: ForeignAttributes,
    signature: SignatureSlot,
    extensions: Option<Extensions>,
    content: EntityContent,
    organization: Option<Organization>,
    contacts: Vec<ContactPerson>,
    additional_metadata_locations: Vec<AdditionalMetadataLocation>,
    unknown: UnknownChildren,
}

impl EntityDescriptor {
    /// Creates the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `entity_id` is not a valid entity
    /// ID or `content` holds no roles.
    pub fn new(entity_id: impl Into<String>, content: EntityContent) -> SamlResult<Self> {
        let entity_id = entity_id.into();
        validation::entity_id("entityID", &entity_id)?;
        if let EntityContent::Roles(roles) = &content {
            require_non_empty_list("RoleDescriptor", roles)?;
        }
        Ok(Self {
            entity_id,
            id: None,
            validity: Validity::new(),
            attributes: ForeignAttributes::new(),
            signature: SignatureSlot::unsigned(),
            extensions: None,
            content,
            organization: None,
            contacts: Vec::new(),
            additional_metadata_locations: Vec::new(),
            unknown: UnknownChildren::default(),
        })
    }

    /// Creates a descriptor for `roles`.
    ///
    /// # Errors
    ///
    /// See [`EntityDescriptor::new`].
    pub fn with_roles(entity_id: impl Into<String>, roles: Vec<RoleDescriptor>) -> SamlResult<Self> {
        Self::new(entity_id, EntityContent::Roles(roles))
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

    /// Adds an alternate metadata location.
    #[must_use]
    pub fn with_additional_metadata_location(mut self, location: AdditionalMetadataLocation) -> Self {
        self.additional_metadata_locations.push(location);
        self
    }

    /// The `entityID` attribute.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// `validUntil` and `cacheDuration`.
    #[must_use]
    pub const fn validity(&self) -> &Validity {
        &self.validity
    }

    /// Returns true if this descriptor, or any role in it, has expired.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.validity.is_expired(now)
            || self
                .roles()
                .iter()
                .filter_map(RoleDescriptor::base)
                .any(|role| role.validity().is_expired(now))
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

    /// The roles or affiliation.
    #[must_use]
    pub const fn content(&self) -> &EntityContent {
        &self.content
    }

    /// Role descriptors in document order; empty for an affiliation.
    #[must_use]
    pub fn roles(&self) -> &[RoleDescriptor] {
        match &self.content {
            EntityContent::Roles(roles) => roles,
            EntityContent::Affiliation(_) => &[],
        }
    }

    /// The affiliation, if the entity is one.
    #[must_use]
    pub const fn affiliation(&self) -> Option<&AffiliationDescriptor> {
        match &self.content {
            EntityContent::Affiliation(affiliation) => Some(affiliation),
            EntityContent::Roles(_) => None,
        }
    }

    /// Identity provider roles.
    pub fn idp_sso_descriptors(&self) -> impl Iterator<Item = &IdpSsoDescriptor> {
        self.roles().iter().filter_map(|role| match role {
            RoleDescriptor::IdpSso(idp) => Some(idp),
            _ => None,
        })
    }

    /// Service provider roles.
    pub fn sp_sso_descriptors(&self) -> impl Iterator<Item = &SpSsoDescriptor> {
        self.roles().iter().filter_map(|role| match role {
            RoleDescriptor::SpSso(sp) => Some(sp),
            _ => None,
        })
    }

    /// Attribute authority roles.
    pub fn attribute_authority_descriptors(&self) -> impl Iterator<Item = &AttributeAuthorityDescriptor> {
        self.roles().iter().filter_map(|role| match role {
            RoleDescriptor::AttributeAuthority(authority) => Some(authority),
            _ => None,
        })
    }

    /// Authentication authority roles.
    pub fn authn_authority_descriptors(&self) -> impl Iterator<Item = &AuthnAuthorityDescriptor> {
        self.roles().iter().filter_map(|role| match role {
            RoleDescriptor::AuthnAuthority(authority) => Some(authority),
            _ => None,
        })
    }

    /// Policy decision point roles.
    pub fn pdp_descriptors(&self) -> impl Iterator<Item = &PdpDescriptor> {
        self.roles().iter().filter_map(|role| match role {
            RoleDescriptor::Pdp(pdp) => Some(pdp),
            _ => None,
        })
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

    /// Alternate metadata locations.
    #[must_use]
    pub fn additional_metadata_locations(&self) -> &[AdditionalMetadataLocation] {
        &self.additional_metadata_locations
    }

    /// Children kept as chunks.
    #[must_use]
    pub const fn unknown_children(&self) -> &UnknownChildren {
        &self.unknown
    }
}

/// Checks the role/affiliation choice before any child is parsed.
fn check_entity_content(children: &[&XmlElement]) -> SamlResult<()> {
    let has_role = children
        .iter()
        .any(|child| child.namespace == MD_NS && ROLE_NAMES.contains(&child.local_name.as_str()));
    let has_affiliation = children.iter().any(|child| child.is(MD_NS, "AffiliationDescriptor"));
    match (has_role, has_affiliation) {
        (true, true) => Err(SamlError::validation(
            "AffiliationDescriptor",
            "cannot be combined with role descriptors",
        )),
        (false, false) => Err(SamlError::validation(
            "RoleDescriptor",
            "at least one role descriptor or an AffiliationDescriptor is required",
        )),
        _ => Ok(()),
    }
}

impl Signable for EntityDescriptor {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn signature_slot(&self) -> &SignatureSlot {
        &self.signature
    }

    fn signature_slot_mut(&mut self) -> &mut SignatureSlot {
        &mut self.signature
    }

    fn to_unsigned_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_attribute("entityID", self.entity_id.as_str());
        element.set_optional_attribute("ID", self.id.as_deref());
        self.validity.write(&mut element);
        self.attributes.write(&mut element);
        if let Some(extensions) = &self.extensions {
            extensions.append_to(&mut element);
        }
        match &self.content {
            EntityContent::Roles(roles) => {
                for role in roles {
                    element.append_child(role.to_xml());
                }
            }
            EntityContent::Affiliation(affiliation) => {
                affiliation.append_to(&mut element);
            }
        }
        if let Some(organization) = &self.organization {
            organization.append_to(&mut element);
        }
        for contact in &self.contacts {
            contact.append_to(&mut element);
        }
        for location in &self.additional_metadata_locations {
            location.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

impl SamlElement for EntityDescriptor {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "EntityDescriptor";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let entity_id = required_attribute(element, "entityID")?;
        let (signature, children) = extract_signature(element)?;
        check_entity_content(&children)?;

        let (resolved, unknown) = ENTITY_CHILDREN.resolve_all(children)?;
        let mut extensions = None;
        let mut roles = Vec::new();
        let mut affiliation = None;
        let mut organization = None;
        let mut contacts = Vec::new();
        let mut locations = Vec::new();
        for child in resolved {
            match child {
                EntityChild::Extensions(ext) => set_once(&mut extensions, ext, "Extensions")?,
                EntityChild::Role(role) => roles.push(role),
                EntityChild::Affiliation(aff) => set_once(&mut affiliation, aff, "AffiliationDescriptor")?,
                EntityChild::Organization(org) => set_once(&mut organization, org, "Organization")?,
                EntityChild::Contact(contact) => contacts.push(contact),
                EntityChild::Location(location) => locations.push(location),
            }
        }

        let content = match affiliation {
            Some(affiliation) => EntityContent::Affiliation(affiliation),
            None => EntityContent::Roles(roles),
        };
        let mut entity = Self::new(entity_id, content)?;
        if let Some(id) = element.attribute("ID") {
            entity = entity.with_id(id)?;
        }
        entity.validity = Validity::read(element)?;
        entity.attributes = ForeignAttributes::read(element, MD_NS);
        entity.signature = signature;
        entity.extensions = extensions;
        entity.organization = organization;
        entity.contacts = contacts;
        entity.additional_metadata_locations = locations;
        entity.unknown = unknown;
        Ok(entity)
    }

    fn to_xml(&self) -> XmlElement {
        self.to_signed_xml()
    }
}

/// A member of an entities group.
#[derive(Debug, Clone, PartialEq)]
pub enum EntitiesMember {
    /// A single entity.
    Entity(EntityDescriptor),
    /// A nested group.
    Entities(EntitiesDescriptor),
}

impl EntitiesMember {
    fn to_xml(&self) -> XmlElement {
        match self {
            Self::Entity(entity) => entity.to_xml(),
            Self::Entities(entities) => entities.to_xml(),
        }
    }
}

enum EntitiesChild {
    Extensions(Extensions),
    Member(EntitiesMember),
}

static ENTITIES_CHILDREN: DispatchTable<EntitiesChild> = DispatchTable {
    context: "EntitiesDescriptor",
    namespace: MD_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(Extensions => EntitiesChild::Extensions),
        known_child!(EntityDescriptor => |entity| EntitiesChild::Member(EntitiesMember::Entity(entity))),
        known_child!(EntitiesDescriptor => |group| EntitiesChild::Member(EntitiesMember::Entities(group))),
    ],
};

/// A group of entity descriptors, possibly nested.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitiesDescriptor {
    name: Option<String>,
    id: Option<String>,
    validity: Validity,
    signature: SignatureSlot,
    extensions: Option<Extensions>,
    members: Vec<EntitiesMember>,
    unknown: UnknownChildren,
}

impl EntitiesDescriptor {
    /// Creates the group.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `members` is empty.
    pub fn new(members: Vec<EntitiesMember>) -> SamlResult<Self> {
        require_non_empty_list("EntityDescriptor", &members)?;
        Ok(Self {
            name: None,
            id: None,
            validity: Validity::new(),
            signature: SignatureSlot::unsigned(),
            extensions: None,
            members,
            unknown: UnknownChildren::default(),
        })
    }

    /// Sets the `Name` attribute.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `name` is empty.
    pub fn with_name(mut self, name: impl Into<String>) -> SamlResult<Self> {
        let name = name.into();
        require_non_empty("Name", &name)?;
        self.name = Some(name);
        Ok(self)
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

    /// Sets the extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// The `Name` attribute.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `validUntil` and `cacheDuration`.
    #[must_use]
    pub const fn validity(&self) -> &Validity {
        &self.validity
    }

    /// The extensions.
    #[must_use]
    pub const fn extensions(&self) -> Option<&Extensions> {
        self.extensions.as_ref()
    }

    /// Direct members in document order.
    #[must_use]
    pub fn members(&self) -> &[EntitiesMember] {
        &self.members
    }

    /// Every entity in the group and its nested groups, depth first.
    #[must_use]
    pub fn entities(&self) -> EntityIter<'_> {
        EntityIter {
            stack: vec![self.members.iter()],
        }
    }

    /// Finds an entity anywhere in the group by `entityID`.
    #[must_use]
    pub fn find_entity(&self, entity_id: &str) -> Option<&EntityDescriptor> {
        self.entities().find(|entity| entity.entity_id() == entity_id)
    }

    /// Children kept as chunks.
    #[must_use]
    pub const fn unknown_children(&self) -> &UnknownChildren {
        &self.unknown
    }
}

/// Depth-first iterator over the entities of an [`EntitiesDescriptor`].
#[derive(Debug)]
pub struct EntityIter<'a> {
    stack: Vec<std::slice::Iter<'a, EntitiesMember>>,
}

impl<'a> Iterator for EntityIter<'a> {
    type Item = &'a EntityDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(EntitiesMember::Entity(entity)) => return Some(entity),
                Some(EntitiesMember::Entities(group)) => self.stack.push(group.members.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

impl Signable for EntitiesDescriptor {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn signature_slot(&self) -> &SignatureSlot {
        &self.signature
    }

    fn signature_slot_mut(&mut self) -> &mut SignatureSlot {
        &mut self.signature
    }

    fn to_unsigned_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.validity.write(&mut element);
        element.set_optional_attribute("ID", self.id.as_deref());
        element.set_optional_attribute("Name", self.name.as_deref());
        if let Some(extensions) = &self.extensions {
            extensions.append_to(&mut element);
        }
        for member in &self.members {
            element.append_child(member.to_xml());
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

impl SamlElement for EntitiesDescriptor {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "EntitiesDescriptor";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let (signature, children) = extract_signature(element)?;
        let has_member = children
            .iter()
            .any(|child| child.is(MD_NS, "EntityDescriptor") || child.is(MD_NS, "EntitiesDescriptor"));
        if !has_member {
            return Err(SamlError::validation(
                "EntityDescriptor",
                "at least one EntityDescriptor or EntitiesDescriptor is required",
            ));
        }

        let (resolved, unknown) = ENTITIES_CHILDREN.resolve_all(children)?;
        let mut extensions = None;
        let mut members = Vec::new();
        for child in resolved {
            match child {
                EntitiesChild::Extensions(ext) => set_once(&mut extensions, ext, "Extensions")?,
                EntitiesChild::Member(member) => members.push(member),
            }
        }

        let mut group = Self::new(members)?;
        if let Some(name) = element.attribute("Name") {
            group = group.with_name(name)?;
        }
        if let Some(id) = element.attribute("ID") {
            group = group.with_id(id)?;
        }
        group.validity = Validity::read(element)?;
        group.signature = signature;
        group.extensions = extensions;
        group.unknown = unknown;
        Ok(group)
    }

    fn to_xml(&self) -> XmlElement {
        self.to_signed_xml()
    }
}
