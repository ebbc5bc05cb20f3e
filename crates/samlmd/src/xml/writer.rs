//! Serializing an [`XmlElement`] tree to text.

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::{XmlElement, XmlNode};
use crate::error::{SamlError, SamlResult};
use crate::types::{preferred_prefix, XML_NS};

/// Writes `root` as a compact document without an XML declaration.
///
/// # Errors
///
/// Returns [`SamlError::XmlWrite`] if the writer fails.
pub fn write(root: &XmlElement) -> SamlResult<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    emit(&mut writer, root, &mut NamespaceScope::default(), false)?;
    finish(writer)
}

/// Writes `root` indented by two spaces, dropping whitespace-only text.
///
/// # Errors
///
/// Returns [`SamlError::XmlWrite`] if the writer fails.
pub fn write_pretty(root: &XmlElement) -> SamlResult<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    emit(&mut writer, root, &mut NamespaceScope::default(), true)?;
    finish(writer)
}

fn finish(writer: Writer<Cursor<Vec<u8>>>) -> SamlResult<String> {
    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| SamlError::XmlWrite(e.to_string()))
}

/// Prefix bindings visible at the current point of the output.
#[derive(Debug, Default)]
struct NamespaceScope {
    frames: Vec<Vec<(Option<String>, String)>>,
}

impl NamespaceScope {
    fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn bind_in_current(&mut self, prefix: Option<&str>, uri: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push((prefix.map(str::to_string), uri.to_string()));
        }
    }

    fn bound_in_current(&self, prefix: Option<&str>) -> Option<&str> {
        self.frames.last().and_then(|frame| {
            frame
                .iter()
                .find(|(p, _)| p.as_deref() == prefix)
                .map(|(_, uri)| uri.as_str())
        })
    }

    /// Ensures `prefix` maps to `uri`, recording a declaration if needed.
    ///
    /// Returns the prefix to use, which differs from the requested one only
    /// when the requested prefix is already bound to another URI on this
    /// element.
    fn require(
        &mut self,
        prefix: Option<&str>,
        uri: &str,
        declarations: &mut Vec<(Option<String>, String)>,
    ) -> Option<String> {
        if self.lookup(prefix) == Some(uri) || (prefix.is_none() && uri.is_empty() && self.lookup(None).is_none()) {
            return prefix.map(str::to_string);
        }

        let prefix = match self.bound_in_current(prefix) {
            Some(_) => Some(self.fresh_prefix()),
            None => prefix.map(str::to_string),
        };
        self.bind_in_current(prefix.as_deref(), uri);
        declarations.push((prefix.clone(), uri.to_string()));
        prefix
    }

    fn fresh_prefix(&self) -> String {
        (1..)
            .map(|n| format!("ns{n}"))
            .find(|candidate| self.bound_in_current(Some(candidate)).is_none())
            .unwrap_or_else(|| "ns".to_string())
    }
}

fn emit<W: std::io::Write>(
    writer: &mut Writer<W>,
    element: &XmlElement,
    scope: &mut NamespaceScope,
    pretty: bool,
) -> SamlResult<()> {
    scope.push();
    let mut declarations: Vec<(Option<String>, String)> = Vec::new();

    for declaration in &element.namespace_declarations {
        if scope.lookup(declaration.prefix.as_deref()) != Some(declaration.uri.as_str()) {
            scope.require(declaration.prefix.as_deref(), &declaration.uri, &mut declarations);
        }
    }

    let element_prefix = if element.namespace.is_empty() {
        scope.require(None, "", &mut declarations)
    } else {
        scope.require(element.prefix.as_deref(), &element.namespace, &mut declarations)
    };
    let name = match &element_prefix {
        Some(prefix) => format!("{prefix}:{}", element.local_name),
        None => element.local_name.clone(),
    };

    let mut attributes: Vec<(String, &str)> = Vec::with_capacity(element.attributes.len());
    for attribute in &element.attributes {
        let key = if attribute.namespace.is_empty() {
            attribute.local_name.clone()
        } else if attribute.namespace == XML_NS {
            format!("xml:{}", attribute.local_name)
        } else {
            let wanted = attribute
                .prefix
                .as_deref()
                .or_else(|| preferred_prefix(&attribute.namespace))
                .unwrap_or("ns1");
            let prefix = scope
                .require(Some(wanted), &attribute.namespace, &mut declarations)
                .unwrap_or_else(|| wanted.to_string());
            format!("{prefix}:{}", attribute.local_name)
        };
        attributes.push((key, attribute.value.as_str()));
    }

    let mut start = BytesStart::new(name.as_str());
    for (prefix, uri) in &declarations {
        let key = match prefix {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        start.push_attribute((key.as_str(), uri.as_str()));
    }
    for (key, value) in &attributes {
        start.push_attribute((key.as_str(), *value));
    }

    let has_content = element.children.iter().any(|node| match node {
        XmlNode::Text(text) => !(pretty && text.trim().is_empty()),
        _ => true,
    });

    if has_content {
        write_event(writer, Event::Start(start))?;
        for child in &element.children {
            match child {
                XmlNode::Element(child) => emit(writer, child, scope, pretty)?,
                XmlNode::Text(text) if pretty && text.trim().is_empty() => {}
                XmlNode::Text(text) => write_event(writer, Event::Text(BytesText::new(text)))?,
                XmlNode::Comment(comment) => {
                    write_event(writer, Event::Comment(BytesText::from_escaped(comment.as_str())))?;
                }
            }
        }
        write_event(writer, Event::End(BytesEnd::new(name.as_str())))?;
    } else {
        write_event(writer, Event::Empty(start))?;
    }

    scope.pop();
    Ok(())
}

fn write_event<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> SamlResult<()> {
    writer
        .write_event(event)
        .map_err(|e| SamlError::XmlWrite(e.to_string()))
}
