//! Attribute groups shared by several metadata elements.

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::lexical::Lexical;
use crate::validation::validate_duration;
use crate::xml::{XmlAttribute, XmlElement};

/// The `validUntil` / `cacheDuration` pair carried by descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validity {
    valid_until: Option<Lexical<DateTime<Utc>>>,
    cache_duration: Option<String>,
}

impl Validity {
    /// No expiry and no caching hint.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            valid_until: None,
            cache_duration: None,
        }
    }

    /// Sets `validUntil`.
    #[must_use]
    pub fn with_valid_until(mut self, valid_until: DateTime<Utc>) -> Self {
        self.valid_until = Some(Lexical::new(valid_until));
        self
    }

    /// Sets `cacheDuration`, an `xs:duration` such as `PT6H`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] for a malformed duration.
    pub fn with_cache_duration(mut self, duration: impl Into<String>) -> SamlResult<Self> {
        let duration = duration.into();
        validate_duration("cacheDuration", &duration)?;
        self.cache_duration = Some(duration);
        Ok(self)
    }

    /// The `validUntil` instant.
    #[must_use]
    pub fn valid_until(&self) -> Option<&DateTime<Utc>> {
        self.valid_until.as_ref().map(Lexical::value)
    }

    /// The raw `cacheDuration` value.
    #[must_use]
    pub fn cache_duration(&self) -> Option<&str> {
        self.cache_duration.as_deref()
    }

    /// Returns true if `validUntil` is at or before `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.as_ref().is_some_and(|until| until.get() <= now)
    }

    pub(crate) fn read(element: &XmlElement) -> SamlResult<Self> {
        let validity = Self {
            valid_until: Lexical::optional(element, "validUntil")?,
            cache_duration: None,
        };
        match element.attribute("cacheDuration") {
            Some(duration) => validity.with_cache_duration(duration),
            None => Ok(validity),
        }
    }

    pub(crate) fn write(&self, element: &mut XmlElement) {
        element.set_optional_attribute("validUntil", self.valid_until.as_ref());
        element.set_optional_attribute("cacheDuration", self.cache_duration.as_deref());
    }
}

/// Namespace-qualified attributes from outside the element's own
/// vocabulary (`<anyAttribute namespace="##other">`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignAttributes {
    attributes: Vec<XmlAttribute>,
}

impl ForeignAttributes {
    /// An empty bag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    /// Adds or replaces an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] if the attribute is unqualified.
    pub fn insert(&mut self, attribute: XmlAttribute) -> SamlResult<()> {
        if attribute.namespace.is_empty() {
            return Err(SamlError::validation(
                attribute.local_name,
                "extension attributes must be namespace-qualified",
            ));
        }
        match self
            .attributes
            .iter_mut()
            .find(|a| a.is(&attribute.namespace, &attribute.local_name))
        {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
        Ok(())
    }

    /// Looks up an attribute value.
    #[must_use]
    pub fn get(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.is(namespace, local_name))
            .map(|a| a.value.as_str())
    }

    /// Iterates in document order.
    pub fn iter(&self) -> impl Iterator<Item = &XmlAttribute> {
        self.attributes.iter()
    }

    /// Returns true if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub(crate) fn read(element: &XmlElement, own_namespace: &str) -> Self {
        Self {
            attributes: element.foreign_attributes(own_namespace).cloned().collect(),
        }
    }

    pub(crate) fn write(&self, element: &mut XmlElement) {
        for attribute in &self.attributes {
            element.put_attribute(attribute.clone());
        }
    }
}
