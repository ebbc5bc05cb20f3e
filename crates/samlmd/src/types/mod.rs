//! SAML 2.0 assertion-namespace types and shared constants.
//!
//! Name identifiers, attributes and assertions live in the
//! `urn:oasis:names:tc:SAML:2.0:assertion` namespace and are reused by the
//! metadata model.

mod assertion;
mod attribute;
mod constants;
mod name_id;

pub use assertion::*;
pub use attribute::*;
pub use constants::*;
pub use name_id::*;
