//! Parsing text into an [`XmlElement`] tree.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::reader::NsReader;

use super::{NamespaceDeclaration, XmlAttribute, XmlElement, XmlNode};
use crate::error::{SamlError, SamlResult};
use crate::types::{XML_NS, XSI_NS};

/// Parses a document and returns its root element.
///
/// Whitespace and comments are preserved as child nodes. The prolog,
/// processing instructions and DOCTYPE are dropped.
///
/// # Errors
///
/// Returns [`SamlError::XmlParse`] for malformed input, unbound prefixes, or
/// anything other than exactly one root element.
pub fn parse(xml: &str) -> SamlResult<XmlElement> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut scopes: Vec<Vec<NamespaceDeclaration>> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        let namespace = resolved_namespace(resolved)?;

        match event {
            Event::Start(start) => {
                let element = build_element(&reader, namespace, &start, &scopes)?;
                scopes.push(element.namespace_declarations.clone());
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = build_element(&reader, namespace, &start, &scopes)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                scopes.pop();
                let element = stack
                    .pop()
                    .ok_or_else(|| SamlError::XmlParse("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|e| SamlError::XmlParse(e.to_string()))?;
                push_text(&mut stack, &value)?;
            }
            Event::CData(data) => {
                let value = std::str::from_utf8(&data)
                    .map_err(|e| SamlError::XmlParse(e.to_string()))?;
                push_text(&mut stack, value)?;
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    let body = String::from_utf8_lossy(&comment).into_owned();
                    parent.children.push(XmlNode::Comment(body));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(SamlError::XmlParse("unexpected end of document".to_string()));
    }
    root.ok_or_else(|| SamlError::XmlParse("document has no root element".to_string()))
}

fn resolved_namespace(resolved: ResolveResult<'_>) -> SamlResult<String> {
    match resolved {
        ResolveResult::Bound(ns) => utf8(ns.as_ref()),
        ResolveResult::Unbound => Ok(String::new()),
        ResolveResult::Unknown(prefix) => Err(SamlError::XmlParse(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn build_element(
    reader: &NsReader<&[u8]>,
    namespace: String,
    start: &BytesStart<'_>,
    scopes: &[Vec<NamespaceDeclaration>],
) -> SamlResult<XmlElement> {
    let name = start.name();
    let mut element = XmlElement {
        namespace,
        prefix: name.prefix().map(|p| utf8(p.as_ref())).transpose()?,
        local_name: utf8(start.local_name().as_ref())?,
        attributes: Vec::new(),
        namespace_declarations: Vec::new(),
        children: Vec::new(),
    };

    for attr in start.attributes() {
        let attr = attr?;
        let value = attr
            .unescape_value()
            .map_err(|e| SamlError::XmlParse(e.to_string()))?
            .into_owned();

        if let Some(binding) = attr.key.as_namespace_binding() {
            let prefix = match binding {
                PrefixDeclaration::Default => None,
                PrefixDeclaration::Named(prefix) => Some(utf8(prefix)?),
            };
            element.namespace_declarations.push(NamespaceDeclaration { prefix, uri: value });
            continue;
        }

        let prefix = attr.key.prefix().map(|p| utf8(p.as_ref())).transpose()?;
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let namespace = if prefix.as_deref() == Some("xml") {
            XML_NS.to_string()
        } else {
            resolved_namespace(resolved)?
        };

        element.attributes.push(XmlAttribute {
            namespace,
            prefix,
            local_name: utf8(local.as_ref())?,
            value,
        });
    }

    carry_qname_binding(&mut element, scopes);
    Ok(element)
}

/// Copies the binding for the prefix of an `xsi:type` value onto the element
/// so the subtree stays self-contained when detached from its ancestors.
fn carry_qname_binding(element: &mut XmlElement, scopes: &[Vec<NamespaceDeclaration>]) {
    let Some((prefix, _)) = element
        .attribute_ns(XSI_NS, "type")
        .and_then(|value| value.split_once(':'))
        .map(|(prefix, local)| (prefix.to_string(), local.to_string()))
    else {
        return;
    };

    let declared_here = element
        .namespace_declarations
        .iter()
        .any(|d| d.prefix.as_deref() == Some(prefix.as_str()));
    if declared_here {
        return;
    }

    let inherited = scopes
        .iter()
        .rev()
        .flat_map(|scope| scope.iter())
        .find(|d| d.prefix.as_deref() == Some(prefix.as_str()))
        .cloned();
    if let Some(declaration) = inherited {
        element.namespace_declarations.push(declaration);
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> SamlResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(SamlError::XmlParse(
            "document has more than one root element".to_string(),
        ));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [XmlElement], text: &str) -> SamlResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
                existing.push_str(text);
            } else {
                parent.children.push(XmlNode::Text(text.to_string()));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(SamlError::XmlParse(
            "character data outside the root element".to_string(),
        )),
    }
}

fn utf8(bytes: &[u8]) -> SamlResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| SamlError::XmlParse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MD_NS, XMLDSIG_NS};

    #[test]
    fn resolves_default_and_prefixed_namespaces() {
        let xml = r#"<EntityDescriptor xmlns="urn:oasis:names:tc:SAML:2.0:metadata"
            xmlns:ds="http://www.w3.org/2000/09/xmldsig#" entityID="https://sp">
            <ds:KeyName>k</ds:KeyName>
        </EntityDescriptor>"#;
        let root = parse(xml).unwrap();

        assert!(root.is(MD_NS, "EntityDescriptor"));
        assert_eq!(root.prefix, None);
        assert_eq!(root.attribute("entityID"), Some("https://sp"));
        assert_eq!(root.namespace_declarations.len(), 2);

        let key_name = root.child_elements().next().unwrap();
        assert!(key_name.is(XMLDSIG_NS, "KeyName"));
        assert_eq!(key_name.prefix.as_deref(), Some("ds"));
        assert_eq!(key_name.text(), "k");
    }

    #[test]
    fn xml_lang_is_qualified() {
        let root = parse(r#"<a xml:lang="en">x</a>"#).unwrap();
        assert_eq!(root.attribute_ns(XML_NS, "lang"), Some("en"));
    }

    #[test]
    fn entities_are_unescaped() {
        let root = parse("<a b=\"&lt;&amp;\">&quot;x&gt;</a>").unwrap();
        assert_eq!(root.attribute("b"), Some("<&"));
        assert_eq!(root.text(), "\"x>");
    }

    #[test]
    fn unbound_prefix_is_rejected() {
        assert!(matches!(parse("<x:a/>"), Err(SamlError::XmlParse(_))));
    }

    #[test]
    fn two_roots_are_rejected() {
        assert!(parse("<a/><b/>").is_err());
    }

    #[test]
    fn truncated_document_is_rejected() {
        assert!(parse("<a><b></b>").is_err());
    }

    #[test]
    fn xsi_type_prefix_binding_is_carried() {
        let xml = r#"<r xmlns:xs="http://www.w3.org/2001/XMLSchema"
            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
            <v xsi:type="xs:string">x</v></r>"#;
        let root = parse(xml).unwrap();
        let value = root.child_elements().next().unwrap();
        assert!(value
            .namespace_declarations
            .iter()
            .any(|d| d.prefix.as_deref() == Some("xs")));
    }
}
