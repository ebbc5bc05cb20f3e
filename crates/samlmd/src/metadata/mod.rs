//! SAML 2.0 metadata elements (`urn:oasis:names:tc:SAML:2.0:metadata`).
//!
//! Leaves validate their content on construction. Composites dispatch their
//! children through a per-type table; closed composites reject unknown
//! metadata children, permissive ones keep them as [`Chunk`](crate::Chunk)s
//! in place. Role, affiliation, entity and entities descriptors are
//! [`Signable`](crate::Signable).
//!
//! # Example
//!
//! ```rust,ignore
//! use samlmd::metadata::MetadataDocument;
//!
//! let document = MetadataDocument::from_xml_str(&xml)?;
//! for entity in document.entities() {
//!     for idp in entity.idp_sso_descriptors() {
//!         println!("{} -> {}", entity.entity_id(), idp.single_sign_on_services()[0].location());
//!     }
//! }
//! ```

mod affiliation;
mod attribute_consuming;
mod authority;
mod common;
mod endpoint;
mod entity;
mod idp;
mod key_descriptor;
mod key_info;
mod leaf;
mod organization;
mod role;
mod sp;

pub use affiliation::*;
pub use attribute_consuming::*;
pub use authority::*;
pub use common::*;
pub use endpoint::*;
pub use entity::*;
pub use idp::*;
pub use key_descriptor::*;
pub use key_info::*;
pub use leaf::*;
pub use organization::*;
pub use role::{RoleDescriptorBase, SsoDescriptorBase};
pub use sp::*;

use crate::element::SamlElement;
use crate::error::{SamlError, SamlResult};
use crate::signature::{AttachedSignature, Signable};
use crate::types::MD_NS;
use crate::xml::{self, XmlElement};

/// A metadata document: a single entity or a group of them.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataDocument {
    /// Root `md:EntityDescriptor`.
    Entity(EntityDescriptor),
    /// Root `md:EntitiesDescriptor`.
    Entities(EntitiesDescriptor),
}

impl MetadataDocument {
    /// Parses a document by its root element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SchemaMismatch`] if the root is neither
    /// descriptor, otherwise the descriptor's parse error.
    pub fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        if element.is(MD_NS, EntityDescriptor::LOCAL_NAME) {
            return EntityDescriptor::from_xml(element).map(Self::Entity);
        }
        if element.is(MD_NS, EntitiesDescriptor::LOCAL_NAME) {
            return EntitiesDescriptor::from_xml(element).map(Self::Entities);
        }
        Err(SamlError::SchemaMismatch {
            expected: format!("{{{MD_NS}}}EntityDescriptor or {{{MD_NS}}}EntitiesDescriptor"),
            found: element.expanded_name(),
        })
    }

    /// Parses a document from text.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed XML, otherwise see
    /// [`MetadataDocument::from_xml`].
    pub fn from_xml_str(text: &str) -> SamlResult<Self> {
        Self::from_xml(&xml::parse(text)?)
    }

    /// Serializes the document.
    #[must_use]
    pub fn to_xml(&self) -> XmlElement {
        match self {
            Self::Entity(entity) => entity.to_xml(),
            Self::Entities(entities) => entities.to_xml(),
        }
    }

    /// Every entity in the document, depth first.
    pub fn entities(&self) -> Box<dyn Iterator<Item = &EntityDescriptor> + '_> {
        match self {
            Self::Entity(entity) => Box::new(std::iter::once(entity)),
            Self::Entities(entities) => Box::new(entities.entities()),
        }
    }

    /// Finds an entity by `entityID`.
    #[must_use]
    pub fn find_entity(&self, entity_id: &str) -> Option<&EntityDescriptor> {
        self.entities().find(|entity| entity.entity_id() == entity_id)
    }

    /// The root signature, if present.
    #[must_use]
    pub fn signature(&self) -> Option<&AttachedSignature> {
        match self {
            Self::Entity(entity) => entity.signature(),
            Self::Entities(entities) => entities.signature(),
        }
    }

    /// The root element as a signable value.
    #[must_use]
    pub fn root(&self) -> &dyn Signable {
        match self {
            Self::Entity(entity) => entity,
            Self::Entities(entities) => entities,
        }
    }

    /// Mutable access to the root for signing.
    pub fn root_mut(&mut self) -> &mut dyn Signable {
        match self {
            Self::Entity(entity) => entity,
            Self::Entities(entities) => entities,
        }
    }
}
