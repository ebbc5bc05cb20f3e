//! `md:AffiliationDescriptor`.

use crate::dispatch::{known_child, ChildPolicy, DispatchTable, UnknownChildren};
use crate::element::{expect, new_element, SamlElement};
use crate::error::SamlResult;
use crate::signature::{extract_signature, Signable, SignatureSlot};
use crate::types::MD_NS;
use crate::validation::{
    entity_id, require_child, require_non_empty, require_non_empty_list, required_attribute, set_once,
};
use crate::xml::XmlElement;

use super::{AffiliateMember, Extensions, ForeignAttributes, KeyDescriptor, Validity};

enum AffiliationChild {
    Extensions(Extensions),
    Member(AffiliateMember),
    KeyDescriptor(KeyDescriptor),
}

static AFFILIATION_CHILDREN: DispatchTable<AffiliationChild> = DispatchTable {
    context: "AffiliationDescriptor",
    namespace: MD_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(Extensions => AffiliationChild::Extensions),
        known_child!(AffiliateMember => AffiliationChild::Member),
        known_child!(KeyDescriptor => AffiliationChild::KeyDescriptor),
    ],
};

/// A group of entities acting under one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct AffiliationDescriptor {
    owner_id: String,
    id: Option<String>,
    validity: Validity,
    attributes: ForeignAttributes,
    signature: SignatureSlot,
    extensions: Option<Extensions>,
    members: Vec<AffiliateMember>,
    key_descriptors: Vec<KeyDescriptor>,
    unknown: UnknownChildren,
}

impl AffiliationDescriptor {
    /// Creates the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`](crate::SamlError::Validation) if the
    /// owner is not a valid entity ID or `members` is empty.
    pub fn new(owner_id: impl Into<String>, members: Vec<AffiliateMember>) -> SamlResult<Self> {
        let owner_id = owner_id.into();
        entity_id("affiliationOwnerID", &owner_id)?;
        require_non_empty_list("AffiliateMember", &members)?;
        Ok(Self {
            owner_id,
            id: None,
            validity: Validity::new(),
            attributes: ForeignAttributes::new(),
            signature: SignatureSlot::unsigned(),
            extensions: None,
            members,
            key_descriptors: Vec::new(),
            unknown: UnknownChildren::default(),
        })
    }

    /// Sets the `ID` attribute.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`](crate::SamlError::Validation) if
    /// `id` is empty.
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

    /// Adds a key descriptor.
    #[must_use]
    pub fn with_key_descriptor(mut self, key_descriptor: KeyDescriptor) -> Self {
        self.key_descriptors.push(key_descriptor);
        self
    }

    /// The `affiliationOwnerID` attribute.
    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// `validUntil` and `cacheDuration`.
    #[must_use]
    pub const fn validity(&self) -> &Validity {
        &self.validity
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

    /// Member entity IDs in document order.
    #[must_use]
    pub fn members(&self) -> &[AffiliateMember] {
        &self.members
    }

    /// Returns true if `entity_id` is a member.
    #[must_use]
    pub fn has_member(&self, entity_id: &str) -> bool {
        self.members.iter().any(|member| member.value() == entity_id)
    }

    /// Key descriptors.
    #[must_use]
    pub fn key_descriptors(&self) -> &[KeyDescriptor] {
        &self.key_descriptors
    }
}

impl Signable for AffiliationDescriptor {
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
        element.set_attribute("affiliationOwnerID", self.owner_id.as_str());
        element.set_optional_attribute("ID", self.id.as_deref());
        self.validity.write(&mut element);
        self.attributes.write(&mut element);
        if let Some(extensions) = &self.extensions {
            extensions.append_to(&mut element);
        }
        for member in &self.members {
            member.append_to(&mut element);
        }
        for descriptor in &self.key_descriptors {
            descriptor.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}

impl SamlElement for AffiliationDescriptor {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "AffiliationDescriptor";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let owner_id = required_attribute(element, "affiliationOwnerID")?;
        let (signature, children) = extract_signature(element)?;
        require_child(children.iter().copied(), MD_NS, "AffiliateMember")?;

        let (resolved, unknown) = AFFILIATION_CHILDREN.resolve_all(children)?;
        let mut extensions = None;
        let mut members = Vec::new();
        let mut key_descriptors = Vec::new();
        for child in resolved {
            match child {
                AffiliationChild::Extensions(ext) => set_once(&mut extensions, ext, "Extensions")?,
                AffiliationChild::Member(member) => members.push(member),
                AffiliationChild::KeyDescriptor(descriptor) => key_descriptors.push(descriptor),
            }
        }

        let mut affiliation = Self::new(owner_id, members)?;
        if let Some(id) = element.attribute("ID") {
            affiliation = affiliation.with_id(id)?;
        }
        affiliation.validity = Validity::read(element)?;
        affiliation.attributes = ForeignAttributes::read(element, MD_NS);
        affiliation.signature = signature;
        affiliation.extensions = extensions;
        affiliation.key_descriptors = key_descriptors;
        affiliation.unknown = unknown;
        Ok(affiliation)
    }

    fn to_xml(&self) -> XmlElement {
        self.to_signed_xml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SamlError;
    use crate::xml::parse;

    const AFFILIATION: &str = r#"<md:AffiliationDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" affiliationOwnerID="https://owner.example.com" ID="_aff" cacheDuration="PT1H"><md:AffiliateMember>https://a.example.com</md:AffiliateMember><md:AffiliateMember>https://b.example.com</md:AffiliateMember></md:AffiliationDescriptor>"#;

    #[test]
    fn round_trip() {
        let original = parse(AFFILIATION).unwrap();
        let affiliation = AffiliationDescriptor::from_xml(&original).unwrap();
        assert_eq!(affiliation.owner_id(), "https://owner.example.com");
        assert!(affiliation.has_member("https://b.example.com"));
        assert_eq!(affiliation.validity().cache_duration(), Some("PT1H"));
        assert_eq!(Signable::id(&affiliation), Some("_aff"));
        assert!(affiliation.to_xml().structurally_eq(&original));
    }

    #[test]
    fn members_are_required() {
        let xml = r#"<md:AffiliationDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" affiliationOwnerID="https://owner.example.com"/>"#;
        let err = AffiliationDescriptor::from_xml_str(xml).unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "AffiliateMember"));

        let err = AffiliationDescriptor::new("https://owner.example.com", Vec::new()).unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "AffiliateMember"));
    }

    #[test]
    fn empty_member_is_rejected() {
        let xml = AFFILIATION.replace(">https://a.example.com<", "><");
        let err = AffiliationDescriptor::from_xml_str(&xml).unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "AffiliateMember"));
    }

    #[test]
    fn empty_owner_is_rejected() {
        let err = AffiliationDescriptor::new("", vec![AffiliateMember::new("https://a.example.com").unwrap()])
            .unwrap_err();
        assert!(matches!(err, SamlError::Validation { field, .. } if field == "affiliationOwnerID"));
    }

    #[test]
    fn closed_to_unknown_metadata_children() {
        let xml = AFFILIATION.replace("</md:AffiliationDescriptor>", "<md:Surprise/></md:AffiliationDescriptor>");
        let err = AffiliationDescriptor::from_xml_str(&xml).unwrap_err();
        assert!(matches!(err, SamlError::UnexpectedElement { local_name, .. } if local_name == "Surprise"));
    }
}
