//! Owned XML tree used as the marshalling boundary.
//!
//! Elements carry their resolved namespace URI together with the prefix they
//! were written with, so a parsed tree can be written back with the same
//! prefixes. Only the declarations an element made itself are kept; the
//! writer re-declares anything else it needs.

mod c14n;
mod reader;
mod writer;

pub use c14n::{canonicalize, canonicalize_exclusive, canonicalize_with_comments, DEFAULT_NAMESPACE_TOKEN};
pub use reader::parse;
pub use writer::{write, write_pretty};

use crate::types::{preferred_prefix, XML_NS};

/// A namespace-qualified attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Namespace URI, empty for unqualified attributes.
    pub namespace: String,
    /// Prefix used when writing. `None` for unqualified attributes.
    pub prefix: Option<String>,
    /// Local name.
    pub local_name: String,
    /// Unescaped value.
    pub value: String,
}

impl XmlAttribute {
    /// Creates an unqualified attribute.
    pub fn new(local_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            prefix: None,
            local_name: local_name.into(),
            value: value.into(),
        }
    }

    /// Creates a namespace-qualified attribute with the conventional prefix.
    pub fn qualified(
        namespace: impl Into<String>,
        local_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let namespace = namespace.into();
        let prefix = preferred_prefix(&namespace).unwrap_or("ns1").to_string();
        Self {
            namespace,
            prefix: Some(prefix),
            local_name: local_name.into(),
            value: value.into(),
        }
    }

    /// Returns true if the attribute has this namespace and local name.
    #[must_use]
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace == namespace && self.local_name == local_name
    }

    /// Returns `prefix:local` or just `local`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) if !self.namespace.is_empty() => format!("{prefix}:{}", self.local_name),
            _ => self.local_name.clone(),
        }
    }
}

/// A namespace declaration (`xmlns` or `xmlns:prefix`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDeclaration {
    /// Declared prefix, `None` for the default namespace.
    pub prefix: Option<String>,
    /// Bound URI. Empty undeclares the default namespace.
    pub uri: String,
}

/// A child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Nested element.
    Element(XmlElement),
    /// Character data, unescaped.
    Text(String),
    /// Comment body.
    Comment(String),
}

impl XmlNode {
    /// Returns the element if this node is one.
    #[must_use]
    pub const fn as_element(&self) -> Option<&XmlElement> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// An element node with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Namespace URI, empty if the element is in no namespace.
    pub namespace: String,
    /// Prefix used when writing, `None` for the default namespace.
    pub prefix: Option<String>,
    /// Local name.
    pub local_name: String,
    /// Attributes in document order, namespace declarations excluded.
    pub attributes: Vec<XmlAttribute>,
    /// Namespace declarations made on this element.
    pub namespace_declarations: Vec<NamespaceDeclaration>,
    /// Child nodes in document order.
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Creates an empty element using the conventional prefix for `namespace`.
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let prefix = preferred_prefix(&namespace).map(str::to_string);
        Self {
            namespace,
            prefix,
            local_name: local_name.into(),
            attributes: Vec::new(),
            namespace_declarations: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Replaces the prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_string);
        self
    }

    /// Returns true if the element has this namespace and local name.
    #[must_use]
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace == namespace && self.local_name == local_name
    }

    /// Returns `{namespace}local`, used in diagnostics.
    #[must_use]
    pub fn expanded_name(&self) -> String {
        format!("{{{}}}{}", self.namespace, self.local_name)
    }

    /// Returns `prefix:local` or just `local`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// Returns the value of an unqualified attribute.
    #[must_use]
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attribute_ns("", local_name)
    }

    /// Returns the value of a namespace-qualified attribute.
    #[must_use]
    pub fn attribute_ns(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.is(namespace, local_name))
            .map(|a| a.value.as_str())
    }

    /// Sets an unqualified attribute, replacing any previous value.
    pub fn set_attribute(&mut self, local_name: &str, value: impl Into<String>) {
        self.put_attribute(XmlAttribute::new(local_name, value));
    }

    /// Sets a namespace-qualified attribute, replacing any previous value.
    pub fn set_attribute_ns(&mut self, namespace: &str, local_name: &str, value: impl Into<String>) {
        self.put_attribute(XmlAttribute::qualified(namespace, local_name, value));
    }

    /// Sets an unqualified attribute when `value` is present.
    pub fn set_optional_attribute(&mut self, local_name: &str, value: Option<impl ToString>) {
        if let Some(value) = value {
            self.set_attribute(local_name, value.to_string());
        }
    }

    /// Inserts an attribute, replacing one with the same expanded name.
    pub fn put_attribute(&mut self, attribute: XmlAttribute) {
        match self
            .attributes
            .iter_mut()
            .find(|a| a.is(&attribute.namespace, &attribute.local_name))
        {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    /// Attributes qualified with a namespace other than `own` and `xml`.
    pub fn foreign_attributes<'a>(&'a self, own: &'a str) -> impl Iterator<Item = &'a XmlAttribute> {
        self.attributes
            .iter()
            .filter(move |a| !a.namespace.is_empty() && a.namespace != own && a.namespace != XML_NS)
    }

    /// Declares a namespace on this element unless the same binding exists.
    pub fn declare_namespace(&mut self, prefix: Option<&str>, uri: &str) {
        let prefix = prefix.map(str::to_string);
        if let Some(existing) = self
            .namespace_declarations
            .iter_mut()
            .find(|d| d.prefix == prefix)
        {
            existing.uri = uri.to_string();
            return;
        }
        self.namespace_declarations.push(NamespaceDeclaration {
            prefix,
            uri: uri.to_string(),
        });
    }

    /// Iterates over child elements, skipping text and comments.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Appends `child` and returns a handle to it.
    pub fn append_child(&mut self, child: XmlElement) -> &mut XmlElement {
        self.children.push(XmlNode::Element(child));
        match self.children.last_mut() {
            Some(XmlNode::Element(element)) => element,
            _ => unreachable!("an element was pushed on the line above"),
        }
    }

    /// Inserts `child` before the `index`-th child element.
    ///
    /// An index past the last element appends.
    pub fn insert_child_element(&mut self, index: usize, child: XmlElement) {
        let position = self
            .children
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, XmlNode::Element(_)))
            .nth(index)
            .map_or(self.children.len(), |(position, _)| position);
        self.children.insert(position, XmlNode::Element(child));
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![XmlNode::Text(text.into())];
    }

    /// Concatenation of the direct text children.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Compares two trees ignoring prefixes, declaration placement,
    /// attribute order, comments and whitespace-only text.
    #[must_use]
    pub fn structurally_eq(&self, other: &Self) -> bool {
        if !self.is(&other.namespace, &other.local_name) {
            return false;
        }

        let attributes_match = self.attributes.len() == other.attributes.len()
            && self.attributes.iter().all(|a| {
                other
                    .attributes
                    .iter()
                    .any(|b| b.is(&a.namespace, &a.local_name) && b.value == a.value)
            });
        if !attributes_match {
            return false;
        }

        let ours = significant_children(self);
        let theirs = significant_children(other);
        ours.len() == theirs.len()
            && ours.iter().zip(theirs.iter()).all(|pair| match pair {
                (Significant::Element(a), Significant::Element(b)) => a.structurally_eq(b),
                (Significant::Text(a), Significant::Text(b)) => a == b,
                _ => false,
            })
    }
}

enum Significant<'a> {
    Element(&'a XmlElement),
    Text(String),
}

/// Children with adjacent text merged and whitespace-only text dropped.
fn significant_children(element: &XmlElement) -> Vec<Significant<'_>> {
    let mut out = Vec::new();
    let mut pending = String::new();
    for node in &element.children {
        match node {
            XmlNode::Text(text) => pending.push_str(text),
            XmlNode::Comment(_) => {}
            XmlNode::Element(child) => {
                flush_text(&mut pending, &mut out);
                out.push(Significant::Element(child));
            }
        }
    }
    flush_text(&mut pending, &mut out);
    out
}

fn flush_text<'a>(pending: &mut String, out: &mut Vec<Significant<'a>>) {
    if !pending.trim().is_empty() {
        out.push(Significant::Text(std::mem::take(pending)));
    }
    pending.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MD_NS, SAML_NS};

    #[test]
    fn new_element_uses_conventional_prefix() {
        let element = XmlElement::new(MD_NS, "EntityDescriptor");
        assert_eq!(element.qualified_name(), "md:EntityDescriptor");
        assert_eq!(element.expanded_name(), format!("{{{MD_NS}}}EntityDescriptor"));
    }

    #[test]
    fn set_attribute_replaces() {
        let mut element = XmlElement::new(MD_NS, "SingleSignOnService");
        element.set_attribute("Location", "https://a");
        element.set_attribute("Location", "https://b");
        assert_eq!(element.attributes.len(), 1);
        assert_eq!(element.attribute("Location"), Some("https://b"));
    }

    #[test]
    fn append_child_returns_child() {
        let mut parent = XmlElement::new(MD_NS, "Organization");
        parent
            .append_child(XmlElement::new(MD_NS, "OrganizationName"))
            .set_text("Example");
        assert_eq!(parent.child_elements().count(), 1);
        assert_eq!(parent.child_elements().next().map(XmlElement::text).as_deref(), Some("Example"));
    }

    #[test]
    fn insert_child_element_counts_elements_only() {
        let mut parent = XmlElement::new(SAML_NS, "Assertion");
        parent.children.push(XmlNode::Text("\n".into()));
        parent.append_child(XmlElement::new(SAML_NS, "Issuer"));
        parent.append_child(XmlElement::new(SAML_NS, "Subject"));
        parent.insert_child_element(1, XmlElement::new(SAML_NS, "Marker"));

        let names: Vec<_> = parent.child_elements().map(|e| e.local_name.as_str()).collect();
        assert_eq!(names, ["Issuer", "Marker", "Subject"]);
    }

    #[test]
    fn structural_equality_ignores_whitespace_and_prefixes() {
        let mut a = XmlElement::new(MD_NS, "Extensions");
        a.children.push(XmlNode::Text("\n  ".into()));
        a.append_child(XmlElement::new("urn:ext", "Thing"));

        let mut b = XmlElement::new(MD_NS, "Extensions").with_prefix(None);
        b.append_child(XmlElement::new("urn:ext", "Thing").with_prefix(Some("x")));
        b.children.push(XmlNode::Comment("note".into()));

        assert!(a.structurally_eq(&b));

        b.set_attribute("extra", "1");
        assert!(!a.structurally_eq(&b));
    }
}
