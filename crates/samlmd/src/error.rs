//! SAML error types.
//!
//! Every unmarshalling, construction and signature failure is reported as a
//! [`SamlError`]. The first violation found is returned; nothing is
//! aggregated and nothing is recovered from.

use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML object model errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// The node handed to an element parser has the wrong qualified name.
    #[error("expected element {expected}, found {found}")]
    SchemaMismatch {
        /// `{namespace}local` of the element the parser handles.
        expected: String,
        /// `{namespace}local` of the node that was supplied.
        found: String,
    },

    /// A constructor invariant was violated.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Attribute or child element that failed validation.
        field: String,
        /// Human-readable description of the violation.
        reason: String,
    },

    /// A child that may occur at most once occurred more than once.
    #[error("multiple {local_name} elements where at most one is allowed")]
    MultipleElements {
        /// Local name of the repeated child.
        local_name: String,
    },

    /// A closed composite met a same-namespace child it does not recognise.
    #[error("unexpected element {{{namespace}}}{local_name}")]
    UnexpectedElement {
        /// Namespace URI of the offending child.
        namespace: String,
        /// Local name of the offending child.
        local_name: String,
    },

    /// An embedded `ds:Signature` does not have the XML-DSig shape.
    #[error("malformed signature: {0}")]
    SignatureStructure(String),

    /// The element already carries a signature.
    #[error("element is already signed")]
    AlreadySigned,

    /// XML signature validation failed.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// XML signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// XML writing error.
    #[error("XML writing error: {0}")]
    XmlWrite(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl SamlError {
    /// Builds a [`SamlError::Validation`].
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Builds a [`SamlError::MultipleElements`].
    pub fn multiple(local_name: impl Into<String>) -> Self {
        Self::MultipleElements {
            local_name: local_name.into(),
        }
    }

    /// Returns true for errors caused by the document rather than the caller.
    #[must_use]
    pub const fn is_document_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch { .. }
                | Self::Validation { .. }
                | Self::MultipleElements { .. }
                | Self::UnexpectedElement { .. }
                | Self::SignatureStructure(_)
                | Self::XmlParse(_)
                | Self::Base64Decode(_)
        )
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<samlmd_crypto::SignatureError> for SamlError {
    fn from(err: samlmd_crypto::SignatureError) -> Self {
        Self::Crypto(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_errors_are_told_apart() {
        assert!(SamlError::validation("Location", "must be an absolute URI").is_document_error());
        assert!(SamlError::multiple("Organization").is_document_error());
        assert!(!SamlError::AlreadySigned.is_document_error());
        assert!(!SamlError::SignatureInvalid("digest".into()).is_document_error());
    }

    #[test]
    fn messages_name_the_offender() {
        let err = SamlError::multiple("Organization");
        assert_eq!(
            err.to_string(),
            "multiple Organization elements where at most one is allowed"
        );

        let err = SamlError::UnexpectedElement {
            namespace: "urn:x".to_string(),
            local_name: "Foo".to_string(),
        };
        assert_eq!(err.to_string(), "unexpected element {urn:x}Foo");
    }
}
