//! Exclusive XML Canonicalization 1.0 over [`XmlElement`] trees.
//!
//! Only namespace declarations that are visibly utilized by an element or
//! its attributes are rendered, so the output of a subtree does not depend
//! on where it sits in a larger document. Prefixes named in an
//! `InclusiveNamespaces PrefixList` are the exception: they are rendered
//! wherever they are in scope, as inclusive canonicalization would.

use super::{XmlElement, XmlNode};
use crate::types::XML_NS;

/// `PrefixList` token for the default namespace.
pub const DEFAULT_NAMESPACE_TOKEN: &str = "#default";

/// Canonicalizes `element` without comments.
#[must_use]
pub fn canonicalize(element: &XmlElement) -> Vec<u8> {
    canonicalize_exclusive(element, false, &[])
}

/// Canonicalizes `element` keeping comments.
#[must_use]
pub fn canonicalize_with_comments(element: &XmlElement) -> Vec<u8> {
    canonicalize_exclusive(element, true, &[])
}

/// Canonicalizes `element` treating `inclusive_prefixes` as visibly
/// utilized wherever a declaration for them is in scope.
///
/// Only declarations made inside `element` count as in scope; bindings
/// inherited from outside the subtree are not known to an [`XmlElement`].
#[must_use]
pub fn canonicalize_exclusive(
    element: &XmlElement,
    with_comments: bool,
    inclusive_prefixes: &[String],
) -> Vec<u8> {
    let forced: Vec<&str> = inclusive_prefixes
        .iter()
        .map(|token| match token.as_str() {
            DEFAULT_NAMESPACE_TOKEN => "",
            prefix => prefix,
        })
        .collect();
    let mut context = Context {
        rendered: Vec::new(),
        in_scope: Vec::new(),
        forced,
        with_comments,
    };
    let mut out = String::new();
    render_element(element, &mut context, &mut out);
    out.into_bytes()
}

struct Context<'a> {
    // Declarations emitted by output ancestors.
    rendered: Vec<Vec<(String, String)>>,
    // Declarations made by ancestors in the source tree.
    in_scope: Vec<Vec<(String, String)>>,
    forced: Vec<&'a str>,
    with_comments: bool,
}

fn lookup<'a>(rendered: &'a [Vec<(String, String)>], prefix: &str) -> Option<&'a str> {
    rendered
        .iter()
        .rev()
        .flat_map(|frame| frame.iter())
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| uri.as_str())
}

fn render_element(element: &XmlElement, context: &mut Context<'_>, out: &mut String) {
    let declared: Vec<(String, String)> = element
        .namespace_declarations
        .iter()
        .map(|d| (d.prefix.clone().unwrap_or_default(), d.uri.clone()))
        .collect();

    // Visibly utilized prefixes, "" standing for the default namespace.
    let mut utilized: Vec<(String, String)> = Vec::new();
    let element_prefix = if element.namespace.is_empty() {
        String::new()
    } else {
        element.prefix.clone().unwrap_or_default()
    };
    utilized.push((element_prefix.clone(), element.namespace.clone()));

    let mut attributes: Vec<(&str, &str, String, &str)> = Vec::new();
    for attribute in &element.attributes {
        let name = if attribute.namespace.is_empty() {
            attribute.local_name.clone()
        } else if attribute.namespace == XML_NS {
            format!("xml:{}", attribute.local_name)
        } else {
            let prefix = attribute.prefix.clone().unwrap_or_else(|| "ns1".to_string());
            if !utilized.iter().any(|(p, _)| *p == prefix) {
                utilized.push((prefix.clone(), attribute.namespace.clone()));
            }
            format!("{prefix}:{}", attribute.local_name)
        };
        attributes.push((
            attribute.namespace.as_str(),
            attribute.local_name.as_str(),
            name,
            attribute.value.as_str(),
        ));
    }

    for prefix in &context.forced {
        if utilized.iter().any(|(p, _)| p == *prefix) {
            continue;
        }
        let bound = declared
            .iter()
            .find(|(p, _)| p == *prefix)
            .map(|(_, uri)| uri.as_str())
            .or_else(|| lookup(&context.in_scope, prefix));
        if let Some(uri) = bound {
            utilized.push(((*prefix).to_string(), uri.to_string()));
        }
    }

    let mut declarations: Vec<(String, String)> = utilized
        .into_iter()
        .filter(|(prefix, uri)| match lookup(&context.rendered, prefix) {
            Some(existing) => existing != uri,
            // An empty default namespace needs no declaration unless a
            // non-empty one is in force.
            None => !(prefix.is_empty() && uri.is_empty()),
        })
        .collect();
    declarations.sort_by(|a, b| a.0.cmp(&b.0));
    declarations.dedup_by(|a, b| a.0 == b.0);

    // Unqualified attributes first, then by namespace URI and local name.
    attributes.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let qname = if element_prefix.is_empty() {
        element.local_name.clone()
    } else {
        format!("{element_prefix}:{}", element.local_name)
    };

    out.push('<');
    out.push_str(&qname);
    for (prefix, uri) in &declarations {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
        }
        escape_attribute(uri, out);
        out.push('"');
    }
    for (_, _, name, value) in &attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attribute(value, out);
        out.push('"');
    }
    out.push('>');

    context.rendered.push(declarations);
    context.in_scope.push(declared);
    for child in &element.children {
        match child {
            XmlNode::Element(child) => render_element(child, context, out),
            XmlNode::Text(text) => escape_text(text, out),
            XmlNode::Comment(comment) if context.with_comments => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            XmlNode::Comment(_) => {}
        }
    }
    context.in_scope.pop();
    context.rendered.pop();

    out.push_str("</");
    out.push_str(&qname);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    fn c14n(xml: &str) -> String {
        String::from_utf8(canonicalize(&parse(xml).unwrap())).unwrap()
    }

    #[test]
    fn sorts_attributes_and_expands_empty_elements() {
        assert_eq!(
            c14n(r#"<a z="1" b="2"><c/></a>"#),
            r#"<a b="2" z="1"><c></c></a>"#
        );
    }

    #[test]
    fn drops_unused_declarations() {
        assert_eq!(
            c14n(r#"<p:a xmlns:p="urn:p" xmlns:q="urn:q"><p:b/></p:a>"#),
            r#"<p:a xmlns:p="urn:p"><p:b></p:b></p:a>"#
        );
    }

    #[test]
    fn subtree_output_is_context_free() {
        let doc = parse(r#"<p:a xmlns:p="urn:p"><p:b x="1"/></p:a>"#).unwrap();
        let inner = doc.child_elements().next().unwrap();
        assert_eq!(
            String::from_utf8(canonicalize(inner)).unwrap(),
            r#"<p:b xmlns:p="urn:p" x="1"></p:b>"#
        );
    }

    #[test]
    fn qualified_attributes_sort_after_unqualified() {
        assert_eq!(
            c14n(r#"<a xmlns:x="urn:x" x:k="1" b="2"/>"#),
            r#"<a xmlns:x="urn:x" b="2" x:k="1"></a>"#
        );
    }

    #[test]
    fn escapes_special_characters() {
        assert_eq!(
            c14n("<a v=\"&quot;&#9;\">&gt;&amp;</a>"),
            "<a v=\"&quot;&#x9;\">&gt;&amp;</a>"
        );
    }

    #[test]
    fn comments_are_optional() {
        let doc = parse("<a><!--c-->t</a>").unwrap();
        assert_eq!(String::from_utf8(canonicalize(&doc)).unwrap(), "<a>t</a>");
        assert_eq!(
            String::from_utf8(canonicalize_with_comments(&doc)).unwrap(),
            "<a><!--c-->t</a>"
        );
    }

    #[test]
    fn inclusive_prefixes_render_where_in_scope() {
        let doc = parse(concat!(
            r#"<p:a xmlns:p="urn:p" xmlns:xs="urn:xs">"#,
            r#"<p:v xmlns:xsi="urn:xsi" xsi:type="xs:string">t</p:v></p:a>"#
        ))
        .unwrap();
        assert_eq!(
            String::from_utf8(canonicalize(&doc)).unwrap(),
            concat!(
                r#"<p:a xmlns:p="urn:p"><p:v xmlns:xsi="urn:xsi" xsi:type="xs:string">"#,
                "t</p:v></p:a>"
            )
        );
        assert_eq!(
            String::from_utf8(canonicalize_exclusive(&doc, false, &["xs".to_string()])).unwrap(),
            concat!(
                r#"<p:a xmlns:p="urn:p" xmlns:xs="urn:xs"><p:v xmlns:xsi="urn:xsi" xsi:type="xs:string">"#,
                "t</p:v></p:a>"
            )
        );
    }

    #[test]
    fn inclusive_prefixes_follow_nested_declarations() {
        let doc = parse(r#"<a><b xmlns:xs="urn:xs"><c/></b></a>"#).unwrap();
        assert_eq!(
            String::from_utf8(canonicalize_exclusive(&doc, false, &["xs".to_string()])).unwrap(),
            r#"<a><b xmlns:xs="urn:xs"><c></c></b></a>"#
        );
    }

    #[test]
    fn default_token_forces_the_default_namespace() {
        let doc = parse(r#"<p:a xmlns:p="urn:p" xmlns="urn:d"><p:b/></p:a>"#).unwrap();
        assert_eq!(
            String::from_utf8(canonicalize_exclusive(
                &doc,
                false,
                &[DEFAULT_NAMESPACE_TOKEN.to_string()]
            ))
            .unwrap(),
            r#"<p:a xmlns="urn:d" xmlns:p="urn:p"><p:b></p:b></p:a>"#
        );
    }

    #[test]
    fn default_namespace_is_rendered_once() {
        assert_eq!(
            c14n(r#"<a xmlns="urn:d"><b/></a>"#),
            r#"<a xmlns="urn:d"><b></b></a>"#
        );
    }
}
