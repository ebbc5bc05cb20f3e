//! `md:AttributeConsumingService` and `md:RequestedAttribute`.

use crate::dispatch::{known_child, ChildPolicy, DispatchTable, UnknownChildren};
use crate::element::{expect, new_element, SamlElement};
use crate::error::SamlResult;
use crate::types::{Attribute, AttributeValue, MD_NS};
use crate::lexical::Lexical;
use crate::validation::{require_child, require_non_empty_list};
use crate::xml::XmlElement;

use super::{ServiceDescription, ServiceName};

static REQUESTED_ATTRIBUTE_CHILDREN: DispatchTable<AttributeValue> = DispatchTable {
    context: "RequestedAttribute",
    namespace: MD_NS,
    policy: ChildPolicy::Closed,
    entries: &[known_child!(AttributeValue => std::convert::identity)],
};

/// An attribute a service provider asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedAttribute {
    attribute: Attribute,
    is_required: Option<Lexical<bool>>,
}

impl RequestedAttribute {
    /// Requests `attribute`, optionally restricted to its listed values.
    #[must_use]
    pub const fn new(attribute: Attribute) -> Self {
        Self {
            attribute,
            is_required: None,
        }
    }

    /// Sets `isRequired`.
    #[must_use]
    pub fn required(mut self, is_required: bool) -> Self {
        self.is_required = Some(Lexical::new(is_required));
        self
    }

    /// The requested attribute.
    #[must_use]
    pub const fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Returns true if the attribute is marked required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.is_required.as_ref().map_or(false, Lexical::get)
    }
}

impl SamlElement for RequestedAttribute {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "RequestedAttribute";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        Ok(Self {
            attribute: Attribute::read(element, &REQUESTED_ATTRIBUTE_CHILDREN)?,
            is_required: Lexical::optional(element, "isRequired")?,
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.attribute.write(&mut element);
        element.set_optional_attribute("isRequired", self.is_required.as_ref());
        element
    }
}

enum ServiceChild {
    Name(ServiceName),
    Description(ServiceDescription),
    Requested(RequestedAttribute),
}

static SERVICE_CHILDREN: DispatchTable<ServiceChild> = DispatchTable {
    context: "AttributeConsumingService",
    namespace: MD_NS,
    policy: ChildPolicy::Closed,
    entries: &[
        known_child!(ServiceName => ServiceChild::Name),
        known_child!(ServiceDescription => ServiceChild::Description),
        known_child!(RequestedAttribute => ServiceChild::Requested),
    ],
};

/// A named set of attributes a service provider consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeConsumingService {
    index: Lexical<u16>,
    is_default: Option<Lexical<bool>>,
    names: Vec<ServiceName>,
    descriptions: Vec<ServiceDescription>,
    requested_attributes: Vec<RequestedAttribute>,
    unknown: UnknownChildren,
}

impl AttributeConsumingService {
    /// Creates the element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`](crate::SamlError::Validation) if
    /// `names` or `requested_attributes` is empty.
    pub fn new(
        index: u16,
        names: Vec<ServiceName>,
        requested_attributes: Vec<RequestedAttribute>,
    ) -> SamlResult<Self> {
        require_non_empty_list("ServiceName", &names)?;
        require_non_empty_list("RequestedAttribute", &requested_attributes)?;
        Ok(Self {
            index: Lexical::new(index),
            is_default: None,
            names,
            descriptions: Vec::new(),
            requested_attributes,
            unknown: UnknownChildren::default(),
        })
    }

    /// Sets `isDefault`.
    #[must_use]
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = Some(Lexical::new(is_default));
        self
    }

    /// Adds a description.
    #[must_use]
    pub fn with_description(mut self, description: ServiceDescription) -> Self {
        self.descriptions.push(description);
        self
    }

    /// The `index` attribute.
    #[must_use]
    pub fn index(&self) -> u16 {
        self.index.get()
    }

    /// The `isDefault` attribute.
    #[must_use]
    pub fn is_default(&self) -> Option<bool> {
        self.is_default.as_ref().map(Lexical::get)
    }

    /// Service names.
    #[must_use]
    pub fn names(&self) -> &[ServiceName] {
        &self.names
    }

    /// Service descriptions.
    #[must_use]
    pub fn descriptions(&self) -> &[ServiceDescription] {
        &self.descriptions
    }

    /// Requested attributes.
    #[must_use]
    pub fn requested_attributes(&self) -> &[RequestedAttribute] {
        &self.requested_attributes
    }
}

impl SamlElement for AttributeConsumingService {
    const NAMESPACE: &'static str = MD_NS;
    const LOCAL_NAME: &'static str = "AttributeConsumingService";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        expect::<Self>(element)?;
        let index: Lexical<u16> = Lexical::required(element, "index")?;
        require_child(element.child_elements(), MD_NS, "ServiceName")?;
        require_child(element.child_elements(), MD_NS, "RequestedAttribute")?;

        let (children, unknown) = SERVICE_CHILDREN.resolve_all(element.child_elements())?;
        let mut names = Vec::new();
        let mut descriptions = Vec::new();
        let mut requested = Vec::new();
        for child in children {
            match child {
                ServiceChild::Name(name) => names.push(name),
                ServiceChild::Description(description) => descriptions.push(description),
                ServiceChild::Requested(attribute) => requested.push(attribute),
            }
        }

        let mut service = Self::new(index.get(), names, requested)?;
        service.index = index;
        service.is_default = Lexical::optional(element, "isDefault")?;
        service.descriptions = descriptions;
        service.unknown = unknown;
        Ok(service)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_attribute("index", self.index.to_string());
        element.set_optional_attribute("isDefault", self.is_default.as_ref());
        for name in &self.names {
            name.append_to(&mut element);
        }
        for description in &self.descriptions {
            description.append_to(&mut element);
        }
        for attribute in &self.requested_attributes {
            attribute.append_to(&mut element);
        }
        self.unknown.weave_into(&mut element);
        element
    }
}
