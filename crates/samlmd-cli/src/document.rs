//! Loading the documents the commands operate on.

use std::path::Path;

use samlmd::metadata::MetadataDocument;
use samlmd::xml::{self, XmlElement};
use samlmd::{Assertion, SamlElement, Signable, SAML_NS};
use tracing::debug;

/// A metadata document or a standalone assertion.
#[derive(Debug, Clone)]
pub enum Document {
    /// Root `md:EntityDescriptor` or `md:EntitiesDescriptor`.
    Metadata(MetadataDocument),
    /// Root `saml:Assertion`.
    Assertion(Assertion),
}

impl Document {
    /// Reads and parses `path`.
    pub fn load(path: &Path) -> crate::CliResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let document = Self::parse(&text)?;
        debug!(path = %path.display(), kind = document.kind(), "loaded document");
        Ok(document)
    }

    /// Parses a document by its root element.
    pub fn parse(text: &str) -> crate::CliResult<Self> {
        let root = xml::parse(text)?;
        Self::from_root(&root)
    }

    /// Types an already parsed root element.
    pub fn from_root(root: &XmlElement) -> crate::CliResult<Self> {
        if root.is(SAML_NS, Assertion::LOCAL_NAME) {
            return Ok(Self::Assertion(Assertion::from_xml(root)?));
        }
        Ok(Self::Metadata(MetadataDocument::from_xml(root)?))
    }

    /// Local name of the root element.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Metadata(MetadataDocument::Entity(_)) => "EntityDescriptor",
            Self::Metadata(MetadataDocument::Entities(_)) => "EntitiesDescriptor",
            Self::Assertion(_) => Assertion::LOCAL_NAME,
        }
    }

    /// The root as a signable value.
    #[must_use]
    pub fn root(&self) -> &dyn Signable {
        match self {
            Self::Metadata(document) => document.root(),
            Self::Assertion(assertion) => assertion,
        }
    }

    /// Mutable access to the root for signing.
    pub fn root_mut(&mut self) -> &mut dyn Signable {
        match self {
            Self::Metadata(document) => document.root_mut(),
            Self::Assertion(assertion) => assertion,
        }
    }

    /// Serializes the document.
    #[must_use]
    pub fn to_xml(&self) -> XmlElement {
        self.root().to_signed_xml()
    }

    /// Serializes the document as text.
    pub fn to_text(&self, pretty: bool) -> crate::CliResult<String> {
        let root = self.to_xml();
        let text = if pretty { xml::write_pretty(&root)? } else { xml::write(&root)? };
        Ok(text)
    }
}
