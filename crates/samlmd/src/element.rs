//! The contract shared by every typed SAML element.

use crate::error::{SamlError, SamlResult};
use crate::xml::{self, XmlElement};

/// A typed element with a fixed qualified name.
///
/// Implementations validate in `from_xml` by calling the same checks their
/// constructors run, so a parsed value is never less valid than a built one.
pub trait SamlElement: Sized {
    /// Namespace URI of the element.
    const NAMESPACE: &'static str;

    /// Local name of the element.
    const LOCAL_NAME: &'static str;

    /// Parses the element from `element`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SchemaMismatch`] if `element` has another name,
    /// otherwise the first validation failure met while reading it.
    fn from_xml(element: &XmlElement) -> SamlResult<Self>;

    /// Serializes the element as a detached node.
    fn to_xml(&self) -> XmlElement;

    /// Serializes the element as the last child of `parent` and returns it.
    fn append_to<'a>(&self, parent: &'a mut XmlElement) -> &'a mut XmlElement {
        parent.append_child(self.to_xml())
    }

    /// Parses a document whose root is this element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed XML, otherwise whatever
    /// [`SamlElement::from_xml`] returns.
    fn from_xml_str(xml: &str) -> SamlResult<Self> {
        Self::from_xml(&xml::parse(xml)?)
    }

    /// Serializes the element as a compact document.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlWrite`] if writing fails.
    fn to_xml_string(&self) -> SamlResult<String> {
        xml::write(&self.to_xml())
    }
}

/// Checks that `element` is `{namespace}local_name`.
///
/// # Errors
///
/// Returns [`SamlError::SchemaMismatch`] naming both qualified names.
pub fn expect_element(element: &XmlElement, namespace: &str, local_name: &str) -> SamlResult<()> {
    if element.is(namespace, local_name) {
        return Ok(());
    }
    Err(SamlError::SchemaMismatch {
        expected: format!("{{{namespace}}}{local_name}"),
        found: element.expanded_name(),
    })
}

/// Checks that `element` has the qualified name of `T`.
///
/// # Errors
///
/// Returns [`SamlError::SchemaMismatch`] on mismatch.
pub fn expect<T: SamlElement>(element: &XmlElement) -> SamlResult<()> {
    expect_element(element, T::NAMESPACE, T::LOCAL_NAME)
}

/// Creates an empty element named after `T`.
pub(crate) fn new_element<T: SamlElement>() -> XmlElement {
    XmlElement::new(T::NAMESPACE, T::LOCAL_NAME)
}

/// Declares a leaf element whose content is a single validated string.
///
/// `$check` is called as `$check(local_name, &value)` by both the
/// constructor and `from_xml`.
macro_rules! text_element {
    ($(#[$meta:meta])* $name:ident, $namespace:expr, $local_name:literal, $check:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name {
            value: String,
        }

        impl $name {
            /// Creates the element from its text content.
            ///
            /// # Errors
            ///
            /// Returns [`SamlError::Validation`](crate::error::SamlError::Validation)
            /// if the text is rejected.
            pub fn new(value: impl Into<String>) -> $crate::error::SamlResult<Self> {
                let value = value.into();
                $check($local_name, &value)?;
                Ok(Self { value })
            }

            /// The text content.
            #[must_use]
            pub fn value(&self) -> &str {
                &self.value
            }
        }

        impl $crate::element::SamlElement for $name {
            const NAMESPACE: &'static str = $namespace;
            const LOCAL_NAME: &'static str = $local_name;

            fn from_xml(element: &$crate::xml::XmlElement) -> $crate::error::SamlResult<Self> {
                $crate::element::expect::<Self>(element)?;
                Self::new(element.text())
            }

            fn to_xml(&self) -> $crate::xml::XmlElement {
                let mut element = $crate::element::new_element::<Self>();
                element.set_text(self.value.as_str());
                element
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.value)
            }
        }
    };
}

pub(crate) use text_element;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MD_NS, SAML_NS};

    #[test]
    fn mismatch_names_both_elements() {
        let element = XmlElement::new(SAML_NS, "Issuer");
        let err = expect_element(&element, MD_NS, "EntityDescriptor").unwrap_err();
        match err {
            SamlError::SchemaMismatch { expected, found } => {
                assert_eq!(expected, format!("{{{MD_NS}}}EntityDescriptor"));
                assert_eq!(found, format!("{{{SAML_NS}}}Issuer"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn matching_name_passes() {
        let element = XmlElement::new(MD_NS, "Extensions");
        assert!(expect_element(&element, MD_NS, "Extensions").is_ok());
    }
}
