//! Verbatim storage for elements the model does not type.

use crate::xml::XmlElement;

/// An unrecognized element kept exactly as it was read.
///
/// Attributes, namespace declarations, text (including whitespace) and
/// nested elements are preserved, so writing a chunk back reproduces the
/// original subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    element: XmlElement,
}

impl Chunk {
    /// Captures `element`. Never fails.
    #[must_use]
    pub fn from_xml(element: &XmlElement) -> Self {
        Self {
            element: element.clone(),
        }
    }

    /// Wraps an element built by the caller.
    #[must_use]
    pub const fn new(element: XmlElement) -> Self {
        Self { element }
    }

    /// Namespace URI of the wrapped element.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.element.namespace
    }

    /// Local name of the wrapped element.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.element.local_name
    }

    /// The wrapped subtree.
    #[must_use]
    pub const fn element(&self) -> &XmlElement {
        &self.element
    }

    /// Consumes the chunk and returns the subtree.
    #[must_use]
    pub fn into_element(self) -> XmlElement {
        self.element
    }

    /// Returns a copy of the subtree.
    #[must_use]
    pub fn to_xml(&self) -> XmlElement {
        self.element.clone()
    }

    /// Appends a copy of the subtree to `parent` and returns it.
    pub fn append_to<'a>(&self, parent: &'a mut XmlElement) -> &'a mut XmlElement {
        parent.append_child(self.to_xml())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{parse, write};

    #[test]
    fn subtree_round_trips_byte_for_byte() {
        let xml = r#"<ext:Info xmlns:ext="urn:example:ext" level="2">  keep <ext:Inner a="b">x</ext:Inner> spacing </ext:Info>"#;
        let chunk = Chunk::from_xml(&parse(xml).unwrap());

        assert_eq!(chunk.namespace(), "urn:example:ext");
        assert_eq!(chunk.local_name(), "Info");
        assert_eq!(write(&chunk.to_xml()).unwrap(), xml);
    }

    #[test]
    fn append_places_chunk_last() {
        let mut parent = XmlElement::new("urn:p", "Parent");
        parent.append_child(XmlElement::new("urn:p", "First"));
        let chunk = Chunk::new(XmlElement::new("urn:x", "Other"));

        let appended = chunk.append_to(&mut parent);
        assert!(appended.is("urn:x", "Other"));
        assert!(parent.child_elements().last().unwrap().is("urn:x", "Other"));
    }
}
