//! Typed object model for SAML 2.0 metadata and assertions.
//!
//! This crate reads and writes SAML XML as strongly typed values:
//!
//! - **Metadata** - entity and entities descriptors, every standard role
//!   descriptor, endpoints, keys, organizations and contacts
//! - **Assertions** - issuers, subjects, conditions, authentication and
//!   attribute statements
//! - **Opaque chunks** - unrecognized or extension content kept verbatim
//!   and written back in place
//! - **XML signature** - enveloped signing and verification of any
//!   [`Signable`] element
//!
//! # Architecture
//!
//! - [`xml`] - namespace-resolved element tree, reader, writer and
//!   canonicalization
//! - [`element`] - the [`SamlElement`] contract every typed element meets
//! - [`dispatch`] - per-composite child tables mapping qualified names to
//!   parsers
//! - [`metadata`] - `urn:oasis:names:tc:SAML:2.0:metadata` elements
//! - [`types`] - assertion-namespace elements and shared constants
//! - [`signature`] - XML-DSig signing and validation
//! - [`error`] - error types
//!
//! # Example
//!
//! ```rust,ignore
//! use samlmd::metadata::EntityDescriptor;
//! use samlmd::{SamlElement, Signable, XmlSigner};
//!
//! let mut entity = EntityDescriptor::from_xml_str(&xml)?;
//! entity.sign(&XmlSigner::from_pem(&key_pem, Some(&cert_pem), SignatureAlgorithm::RsaSha256)?)?;
//! println!("{}", entity.to_xml_string()?);
//! ```
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Metadata](https://docs.oasis-open.org/security/saml/v2.0/saml-metadata-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chunk;
pub mod dispatch;
pub mod element;
pub mod error;
pub mod lexical;
pub mod metadata;
pub mod signature;
pub mod types;
pub mod validation;
pub mod xml;

pub use chunk::Chunk;
pub use element::SamlElement;
pub use error::{SamlError, SamlResult};
pub use lexical::Lexical;
pub use metadata::MetadataDocument;
pub use signature::{Signable, SignatureAlgorithm, XmlSignatureValidator, XmlSigner};
pub use types::*;
