//! Child element dispatch by qualified name.
//!
//! Every composite declares a static [`DispatchTable`] listing the children
//! it types and whether unrecognized children in its own namespace are kept
//! as [`Chunk`]s or rejected. Foreign-namespace children that the table does
//! not list always become chunks.

use std::collections::HashMap;

use tracing::debug;

use crate::chunk::Chunk;
use crate::error::{SamlError, SamlResult};
use crate::xml::{XmlElement, XmlNode};

/// What a composite does with same-namespace children it does not list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildPolicy {
    /// The schema fixes the child set; anything else is an error.
    Closed,
    /// Unknown children are preserved as chunks.
    Permissive,
}

/// One row of a dispatch table.
pub struct DispatchEntry<C: 'static> {
    /// Namespace URI of the child.
    pub namespace: &'static str,
    /// Local name of the child.
    pub local_name: &'static str,
    /// Parser producing the composite's child value.
    pub parse: fn(&XmlElement) -> SamlResult<C>,
}

/// The known-child table of one composite.
pub struct DispatchTable<C: 'static> {
    /// Name of the composite, used in diagnostics.
    pub context: &'static str,
    /// Namespace the policy applies to.
    pub namespace: &'static str,
    /// Handling of unlisted same-namespace children.
    pub policy: ChildPolicy,
    /// Known children. Lookup is first match on the exact name pair.
    pub entries: &'static [DispatchEntry<C>],
}

/// Outcome of dispatching one child.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<C> {
    /// A child the table types.
    Known(C),
    /// A child kept verbatim.
    Unknown(Chunk),
}

impl<C> DispatchTable<C> {
    /// Finds the entry for `{namespace}local_name`.
    #[must_use]
    pub fn lookup(&self, namespace: &str, local_name: &str) -> Option<&DispatchEntry<C>> {
        self.entries
            .iter()
            .find(|entry| entry.namespace == namespace && entry.local_name == local_name)
    }

    /// Dispatches a single child.
    ///
    /// # Errors
    ///
    /// Returns the child parser's error, or
    /// [`SamlError::UnexpectedElement`] for an unlisted same-namespace child
    /// of a closed composite.
    pub fn resolve(&self, child: &XmlElement) -> SamlResult<Resolved<C>> {
        if let Some(entry) = self.lookup(&child.namespace, &child.local_name) {
            return (entry.parse)(child).map(Resolved::Known);
        }

        if child.namespace == self.namespace && self.policy == ChildPolicy::Closed {
            return Err(SamlError::UnexpectedElement {
                namespace: child.namespace.clone(),
                local_name: child.local_name.clone(),
            });
        }

        debug!(
            context = self.context,
            element = %child.expanded_name(),
            "keeping unrecognized child as chunk"
        );
        Ok(Resolved::Unknown(Chunk::from_xml(child)))
    }

    /// Dispatches `children` in order, separating typed values from chunks.
    ///
    /// Each chunk is recorded with the typed sibling it followed so it can be
    /// written back next to that sibling.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`DispatchTable::resolve`].
    pub fn resolve_all<'a>(
        &self,
        children: impl IntoIterator<Item = &'a XmlElement>,
    ) -> SamlResult<(Vec<C>, UnknownChildren)> {
        let mut known = Vec::new();
        let mut unknown = UnknownChildren::default();
        let mut seen: HashMap<(&str, &str), usize> = HashMap::new();
        let mut anchor = Anchor::Start;
        for child in children {
            match self.resolve(child)? {
                Resolved::Known(value) => {
                    let count = seen
                        .entry((child.namespace.as_str(), child.local_name.as_str()))
                        .or_insert(0);
                    anchor = Anchor::After {
                        namespace: child.namespace.clone(),
                        local_name: child.local_name.clone(),
                        occurrence: *count,
                    };
                    *count += 1;
                    known.push(value);
                }
                Resolved::Unknown(chunk) => unknown.entries.push((anchor.clone(), chunk)),
            }
        }
        Ok((known, unknown))
    }
}

/// Builds a [`DispatchEntry`] for a [`SamlElement`](crate::element::SamlElement)
/// type, wrapping the parsed value with `$wrap`.
///
/// ```rust,ignore
/// static ENTRIES: &[DispatchEntry<KeyDescriptorChild>] = &[
///     known_child!(KeyInfo => KeyDescriptorChild::KeyInfo),
///     known_child!(EncryptionMethod => KeyDescriptorChild::EncryptionMethod),
/// ];
/// ```
macro_rules! known_child {
    ($ty:ty => $wrap:expr) => {
        $crate::dispatch::DispatchEntry {
            namespace: <$ty as $crate::element::SamlElement>::NAMESPACE,
            local_name: <$ty as $crate::element::SamlElement>::LOCAL_NAME,
            parse: |element| <$ty as $crate::element::SamlElement>::from_xml(element).map($wrap),
        }
    };
}

pub(crate) use known_child;

/// Where a chunk sat among the typed children it was read with.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Anchor {
    /// Before every typed child.
    Start,
    /// After the `occurrence`-th (from zero) typed child with this name.
    After {
        namespace: String,
        local_name: String,
        occurrence: usize,
    },
    /// After every typed child.
    End,
}

impl Anchor {
    /// Node index in `element` where a chunk with this anchor goes.
    fn position(&self, element: &XmlElement) -> usize {
        let elements = element
            .children
            .iter()
            .enumerate()
            .filter_map(|(index, node)| node.as_element().map(|child| (index, child)));
        match self {
            Self::Start => elements.map(|(index, _)| index).next(),
            Self::After {
                namespace,
                local_name,
                occurrence,
            } => elements
                .filter(|(_, child)| child.is(namespace, local_name))
                .nth(*occurrence)
                .map(|(index, _)| index + 1),
            Self::End => None,
        }
        .unwrap_or(element.children.len())
    }
}

/// Chunks captured while parsing a composite, each with the typed sibling
/// it followed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownChildren {
    entries: Vec<(Anchor, Chunk)>,
}

impl UnknownChildren {
    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of captured chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over the chunks in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|(_, chunk)| chunk)
    }

    /// Adds a chunk written after all typed children.
    pub fn push(&mut self, chunk: Chunk) {
        self.entries.push((Anchor::End, chunk));
    }

    /// Re-inserts the chunks into `element`, which holds the typed children.
    ///
    /// Each chunk goes directly after the typed sibling it followed when it
    /// was read, wherever the writer placed that sibling; chunks sharing a
    /// sibling keep their document order. A chunk whose sibling is missing
    /// is appended.
    pub fn weave_into(&self, element: &mut XmlElement) {
        let mut previous: Option<(&Anchor, usize)> = None;
        for (anchor, chunk) in &self.entries {
            let position = match previous {
                Some((last, index)) if last == anchor => index + 1,
                _ => anchor.position(element),
            };
            element.children.insert(position, XmlNode::Element(chunk.to_xml()));
            previous = Some((anchor, position));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MD_NS;
    use crate::xml::parse;

    fn parse_name(element: &XmlElement) -> SamlResult<String> {
        Ok(element.text())
    }

    static ENTRIES: &[DispatchEntry<String>] = &[
        DispatchEntry {
            namespace: MD_NS,
            local_name: "NameIDFormat",
            parse: parse_name,
        },
        DispatchEntry {
            namespace: MD_NS,
            local_name: "SingleSignOnService",
            parse: parse_name,
        },
    ];

    static CLOSED: DispatchTable<String> = DispatchTable {
        context: "Closed",
        namespace: MD_NS,
        policy: ChildPolicy::Closed,
        entries: ENTRIES,
    };

    static PERMISSIVE: DispatchTable<String> = DispatchTable {
        context: "Permissive",
        namespace: MD_NS,
        policy: ChildPolicy::Permissive,
        entries: ENTRIES,
    };

    const DOC: &str = r#"<md:Parent xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"><md:NameIDFormat>a</md:NameIDFormat><md:Mystery/><x:Ext xmlns:x="urn:x"/><md:NameIDFormat>b</md:NameIDFormat></md:Parent>"#;

    #[test]
    fn lookup_is_exact() {
        assert!(CLOSED.lookup(MD_NS, "NameIDFormat").is_some());
        assert!(CLOSED.lookup(MD_NS, "nameidformat").is_none());
        assert!(CLOSED.lookup("urn:other", "NameIDFormat").is_none());
    }

    #[test]
    fn closed_rejects_unknown_same_namespace_child() {
        let root = parse(DOC).unwrap();
        match CLOSED.resolve_all(root.child_elements()) {
            Err(SamlError::UnexpectedElement { namespace, local_name }) => {
                assert_eq!(namespace, MD_NS);
                assert_eq!(local_name, "Mystery");
            }
            other => panic!("unexpected result: {:?}", other.map(|(k, _)| k)),
        }
    }

    #[test]
    fn permissive_keeps_chunks_in_place() {
        let root = parse(DOC).unwrap();
        let (known, unknown) = PERMISSIVE.resolve_all(root.child_elements()).unwrap();
        assert_eq!(known, ["a", "b"]);
        assert_eq!(unknown.len(), 2);

        let mut rebuilt = XmlElement::new(MD_NS, "Parent");
        for value in &known {
            rebuilt
                .append_child(XmlElement::new(MD_NS, "NameIDFormat"))
                .set_text(value.as_str());
        }
        unknown.weave_into(&mut rebuilt);

        let names: Vec<_> = rebuilt.child_elements().map(|e| e.local_name.as_str()).collect();
        assert_eq!(names, ["NameIDFormat", "Mystery", "Ext", "NameIDFormat"]);
        assert!(rebuilt.structurally_eq(&root));
    }

    #[test]
    fn chunks_follow_their_sibling_when_typed_children_are_reordered() {
        let root = parse(concat!(
            r#"<md:Parent xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:x="urn:x">"#,
            "<x:Lead/><md:SingleSignOnService>s</md:SingleSignOnService><x:A/><x:B/>",
            "<md:NameIDFormat>a</md:NameIDFormat><md:NameIDFormat>b</md:NameIDFormat><x:C/>",
            "</md:Parent>"
        ))
        .unwrap();
        let (known, unknown) = PERMISSIVE.resolve_all(root.child_elements()).unwrap();
        assert_eq!(known, ["s", "a", "b"]);

        // Written back with every NameIDFormat ahead of the service.
        let mut rebuilt = XmlElement::new(MD_NS, "Parent");
        for value in ["a", "b"] {
            rebuilt.append_child(XmlElement::new(MD_NS, "NameIDFormat")).set_text(value);
        }
        rebuilt.append_child(XmlElement::new(MD_NS, "SingleSignOnService")).set_text("s");
        unknown.weave_into(&mut rebuilt);

        let names: Vec<_> = rebuilt.child_elements().map(|e| e.local_name.as_str()).collect();
        assert_eq!(
            names,
            ["Lead", "NameIDFormat", "NameIDFormat", "C", "SingleSignOnService", "A", "B"]
        );
    }

    #[test]
    fn pushed_chunks_go_last() {
        let mut unknown = UnknownChildren::default();
        unknown.push(Chunk::from_xml(&parse(r#"<x:Tail xmlns:x="urn:x"/>"#).unwrap()));
        let mut rebuilt = XmlElement::new(MD_NS, "Parent");
        rebuilt.append_child(XmlElement::new(MD_NS, "NameIDFormat"));
        unknown.weave_into(&mut rebuilt);
        let names: Vec<_> = rebuilt.child_elements().map(|e| e.local_name.as_str()).collect();
        assert_eq!(names, ["NameIDFormat", "Tail"]);
    }

    #[test]
    fn foreign_child_is_a_chunk_even_when_closed() {
        let child = parse(r#"<x:Ext xmlns:x="urn:x"/>"#).unwrap();
        assert!(matches!(CLOSED.resolve(&child), Ok(Resolved::Unknown(_))));
    }
}
