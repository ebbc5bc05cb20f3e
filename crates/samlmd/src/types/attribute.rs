//! SAML attributes and attribute values.

use crate::chunk::Chunk;
use crate::dispatch::{known_child, ChildPolicy, DispatchTable, UnknownChildren};
use crate::element::{expect, new_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::metadata::ForeignAttributes;
use crate::lexical::Lexical;
use crate::validation::{require_non_empty, require_uri, required_attribute};
use crate::xml::{NamespaceDeclaration, XmlElement};

use super::{attribute_name_formats, SAML_NS, XSI_NS, XS_NS};

/// Content of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValueContent {
    /// Simple content, possibly empty.
    Text(String),
    /// Complex content kept verbatim.
    Elements(Vec<Chunk>),
}

/// One value of an attribute (`saml:AttributeValue`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    xsi_type: Option<String>,
    type_binding: Option<NamespaceDeclaration>,
    nil: Option<Lexical<bool>>,
    content: AttributeValueContent,
}

impl AttributeValue {
    /// An untyped text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            xsi_type: None,
            type_binding: None,
            nil: None,
            content: AttributeValueContent::Text(value.into()),
        }
    }

    /// A value typed `xs:string`.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            xsi_type: Some("xs:string".to_string()),
            type_binding: Some(NamespaceDeclaration {
                prefix: Some("xs".to_string()),
                uri: XS_NS.to_string(),
            }),
            ..Self::text(value)
        }
    }

    /// An explicitly absent value (`xsi:nil="true"`).
    #[must_use]
    pub fn nil() -> Self {
        Self {
            nil: Some(Lexical::new(true)),
            ..Self::text("")
        }
    }

    /// A value with element content.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `elements` is empty.
    pub fn elements(elements: Vec<Chunk>) -> SamlResult<Self> {
        if elements.is_empty() {
            return Err(SamlError::validation(
                Self::LOCAL_NAME,
                "element content needs at least one element",
            ));
        }
        Ok(Self {
            xsi_type: None,
            type_binding: None,
            nil: None,
            content: AttributeValueContent::Elements(elements),
        })
    }

    /// Sets `xsi:type` to `prefix:local_name`, binding `prefix` to
    /// `namespace` on the value itself.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if a part is empty.
    pub fn with_type(mut self, prefix: &str, local_name: &str, namespace: &str) -> SamlResult<Self> {
        require_non_empty("xsi:type", prefix)?;
        require_non_empty("xsi:type", local_name)?;
        require_uri("xsi:type", namespace)?;
        self.xsi_type = Some(format!("{prefix}:{local_name}"));
        self.type_binding = Some(NamespaceDeclaration {
            prefix: Some(prefix.to_string()),
            uri: namespace.to_string(),
        });
        Ok(self)
    }

    /// The raw `xsi:type` value.
    #[must_use]
    pub fn xsi_type(&self) -> Option<&str> {
        self.xsi_type.as_deref()
    }

    /// `xsi:type` resolved to `(namespace, local name)` when its prefix is
    /// bound on the value.
    #[must_use]
    pub fn resolved_type(&self) -> Option<(&str, &str)> {
        let (prefix, local_name) = self.xsi_type.as_deref()?.split_once(':')?;
        let binding = self.type_binding.as_ref()?;
        (binding.prefix.as_deref() == Some(prefix)).then_some((binding.uri.as_str(), local_name))
    }

    /// Returns true for `xsi:nil="true"`.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.nil.as_ref().map_or(false, Lexical::get)
    }

    /// The content.
    #[must_use]
    pub const fn content(&self) -> &AttributeValueContent {
        &self.content
    }

    /// The text, for simple content.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            AttributeValueContent::Text(text) if !self.is_nil() => Some(text),
            _ => None,
        }
    }
}

impl SamlElement for AttributeValue {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "AttributeValue";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let nil = element
            .attribute_ns(XSI_NS, "nil")
            .map(|value| Lexical::<bool>::parse("xsi:nil", value))
            .transpose()?;

        let xsi_type = element.attribute_ns(XSI_NS, "type").map(str::to_string);
        let type_binding = xsi_type
            .as_deref()
            .and_then(|value| value.split_once(':'))
            .and_then(|(prefix, _)| {
                element
                    .namespace_declarations
                    .iter()
                    .find(|d| d.prefix.as_deref() == Some(prefix))
                    .cloned()
            });

        let elements: Vec<Chunk> = element.child_elements().map(Chunk::from_xml).collect();
        let content = if elements.is_empty() {
            AttributeValueContent::Text(element.text())
        } else {
            AttributeValueContent::Elements(elements)
        };

        let has_content = match &content {
            AttributeValueContent::Text(text) => !text.is_empty(),
            AttributeValueContent::Elements(_) => true,
        };
        if nil.as_ref().map_or(false, Lexical::get) && has_content {
            return Err(SamlError::validation("xsi:nil", "a nil value must be empty"));
        }

        Ok(Self {
            xsi_type,
            type_binding,
            nil,
            content,
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        if let Some(binding) = &self.type_binding {
            element.declare_namespace(binding.prefix.as_deref(), &binding.uri);
        }
        if let Some(xsi_type) = &self.xsi_type {
            element.set_attribute_ns(XSI_NS, "type", xsi_type.as_str());
        }
        if let Some(nil) = &self.nil {
            element.set_attribute_ns(XSI_NS, "nil", nil.to_string());
        }
        match &self.content {
            AttributeValueContent::Text(text) if text.is_empty() => {}
            AttributeValueContent::Text(text) => element.set_text(text.as_str()),
            AttributeValueContent::Elements(chunks) => {
                for chunk in chunks {
                    chunk.append_to(&mut element);
                }
            }
        }
        element
    }
}

static ATTRIBUTE_CHILDREN: DispatchTable<AttributeValue> = DispatchTable {
    context: "Attribute",
    namespace: SAML_NS,
    policy: ChildPolicy::Closed,
    entries: &[known_child!(AttributeValue => std::convert::identity)],
};

/// SAML Attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    name_format: Option<String>,
    friendly_name: Option<String>,
    attributes: ForeignAttributes,
    values: Vec<AttributeValue>,
    unknown: UnknownChildren,
}

impl Attribute {
    /// URI name format.
    pub const NAME_FORMAT_URI: &'static str = attribute_name_formats::URI;

    /// Basic name format.
    pub const NAME_FORMAT_BASIC: &'static str = attribute_name_formats::BASIC;

    /// Unspecified name format.
    pub const NAME_FORMAT_UNSPECIFIED: &'static str = attribute_name_formats::UNSPECIFIED;

    /// Creates an attribute without values.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `name` is empty.
    pub fn new(name: impl Into<String>) -> SamlResult<Self> {
        let name = name.into();
        require_non_empty("Name", &name)?;
        Ok(Self {
            name,
            name_format: None,
            friendly_name: None,
            attributes: ForeignAttributes::new(),
            values: Vec::new(),
            unknown: UnknownChildren::default(),
        })
    }

    /// Creates a new attribute with a single string value.
    ///
    /// # Errors
    ///
    /// See [`Attribute::new`].
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> SamlResult<Self> {
        Ok(Self::new(name)?.with_value(AttributeValue::string(value)))
    }

    /// Creates a new attribute with multiple string values.
    ///
    /// # Errors
    ///
    /// See [`Attribute::new`].
    pub fn multi(name: impl Into<String>, values: Vec<String>) -> SamlResult<Self> {
        let mut attribute = Self::new(name)?;
        attribute.values = values.into_iter().map(AttributeValue::string).collect();
        Ok(attribute)
    }

    /// Sets the friendly name.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Sets the name format.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if `format` is not a URI.
    pub fn with_format(mut self, format: impl Into<String>) -> SamlResult<Self> {
        let format = format.into();
        require_uri("NameFormat", &format)?;
        self.name_format = Some(format);
        Ok(self)
    }

    /// Adds a value.
    #[must_use]
    pub fn with_value(mut self, value: AttributeValue) -> Self {
        self.values.push(value);
        self
    }

    /// The attribute name (typically a URI).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The format of the attribute name.
    #[must_use]
    pub fn name_format(&self) -> Option<&str> {
        self.name_format.as_deref()
    }

    /// A human-readable name for the attribute.
    #[must_use]
    pub fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }

    /// Extension attributes.
    #[must_use]
    pub const fn attributes(&self) -> &ForeignAttributes {
        &self.attributes
    }

    /// The attribute values.
    #[must_use]
    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    /// The values with simple content.
    pub fn text_values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().filter_map(AttributeValue::as_text)
    }

    /// Reads the `AttributeType` content of `element`, which may be a
    /// `saml:Attribute` or a type derived from it.
    pub(crate) fn read(element: &XmlElement, table: &DispatchTable<AttributeValue>) -> SamlResult<Self> {
        let mut attribute = Self::new(required_attribute(element, "Name")?)?;
        if let Some(format) = element.attribute("NameFormat") {
            attribute = attribute.with_format(format)?;
        }
        attribute.friendly_name = element.attribute("FriendlyName").map(str::to_string);
        attribute.attributes = ForeignAttributes::read(element, table.namespace);

        let (values, unknown) = table.resolve_all(element.child_elements())?;
        attribute.values = values;
        attribute.unknown = unknown;
        Ok(attribute)
    }

    pub(crate) fn write(&self, element: &mut XmlElement) {
        element.set_attribute("Name", self.name.as_str());
        element.set_optional_attribute("NameFormat", self.name_format.as_deref());
        element.set_optional_attribute("FriendlyName", self.friendly_name.as_deref());
        self.attributes.write(element);
        for value in &self.values {
            value.append_to(element);
        }
        self.unknown.weave_into(element);
    }
}

impl SamlElement for Attribute {
    const NAMESPACE: &'static str = SAML_NS;
    const LOCAL_NAME: &'static str = "Attribute";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        Self::read(element, &ATTRIBUTE_CHILDREN)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.write(&mut element);
        element
    }
}
