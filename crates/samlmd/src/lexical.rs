//! Schema-typed attribute values that remember how they were spelled.
//!
//! `xs:boolean` accepts `1` as well as `true`, and an `xs:dateTime` may
//! carry any zone offset. Normalizing either on output changes the bytes
//! a signature covers, so parsed values keep their source text and write
//! it back unchanged. Values built in code use the canonical spelling.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::SamlResult;
use crate::validation::{format_datetime, parse_bool, parse_datetime, parse_number};
use crate::xml::XmlElement;

/// A type with an `xs:` lexical space.
pub trait XsdValue: Sized {
    /// Parses `raw`, reporting failures against `field`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`](crate::SamlError::Validation) when
    /// `raw` is outside the lexical space.
    fn parse_xsd(field: &str, raw: &str) -> SamlResult<Self>;

    /// The canonical spelling.
    fn canonical(&self) -> String;
}

impl XsdValue for bool {
    fn parse_xsd(field: &str, raw: &str) -> SamlResult<Self> {
        parse_bool(field, raw)
    }

    fn canonical(&self) -> String {
        self.to_string()
    }
}

impl XsdValue for DateTime<Utc> {
    fn parse_xsd(field: &str, raw: &str) -> SamlResult<Self> {
        parse_datetime(field, raw)
    }

    fn canonical(&self) -> String {
        format_datetime(self)
    }
}

macro_rules! xsd_integer {
    ($($ty:ty),+) => {
        $(
            impl XsdValue for $ty {
                fn parse_xsd(field: &str, raw: &str) -> SamlResult<Self> {
                    parse_number(field, raw)
                }

                fn canonical(&self) -> String {
                    self.to_string()
                }
            }
        )+
    };
}

xsd_integer!(u16, u32);

/// A typed value and, when it was parsed, the text it came from.
///
/// Equality compares the typed values only.
#[derive(Debug, Clone)]
pub struct Lexical<T> {
    value: T,
    raw: Option<String>,
}

impl<T> Lexical<T> {
    /// Wraps a value built in code.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self { value, raw: None }
    }

    /// The typed value.
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// The source text, if the value was parsed.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

impl<T: Copy> Lexical<T> {
    /// A copy of the typed value.
    #[must_use]
    pub fn get(&self) -> T {
        self.value
    }
}

impl<T: XsdValue> Lexical<T> {
    /// Parses `raw` and keeps it.
    ///
    /// # Errors
    ///
    /// See [`XsdValue::parse_xsd`].
    pub fn parse(field: &str, raw: &str) -> SamlResult<Self> {
        Ok(Self {
            value: T::parse_xsd(field, raw)?,
            raw: Some(raw.to_string()),
        })
    }

    /// Reads the unqualified attribute `name`, if present.
    ///
    /// # Errors
    ///
    /// See [`XsdValue::parse_xsd`].
    pub fn optional(element: &XmlElement, name: &str) -> SamlResult<Option<Self>> {
        element.attribute(name).map(|raw| Self::parse(name, raw)).transpose()
    }

    /// Reads the unqualified attribute `name`, which must be present.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`](crate::SamlError::Validation) when
    /// the attribute is missing or malformed.
    pub fn required(element: &XmlElement, name: &str) -> SamlResult<Self> {
        Self::parse(name, crate::validation::required_attribute(element, name)?)
    }
}

impl<T> From<T> for Lexical<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: PartialEq> PartialEq for Lexical<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for Lexical<T> {}

impl<T: XsdValue> fmt::Display for Lexical<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.raw {
            Some(raw) => f.write_str(raw),
            None => f.write_str(&self.value.canonical()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parsed_values_keep_their_spelling() {
        let flag = Lexical::<bool>::parse("isDefault", "1").unwrap();
        assert!(flag.get());
        assert_eq!(flag.to_string(), "1");

        let instant = Lexical::<DateTime<Utc>>::parse("validUntil", "2099-01-01T01:00:00+01:00").unwrap();
        assert_eq!(instant.get(), Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(instant.to_string(), "2099-01-01T01:00:00+01:00");

        let index = Lexical::<u16>::parse("index", "01").unwrap();
        assert_eq!(index.get(), 1);
        assert_eq!(index.to_string(), "01");
    }

    #[test]
    fn built_values_are_canonical() {
        assert_eq!(Lexical::new(true).to_string(), "true");
        let instant = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(Lexical::new(instant).to_string(), "2030-01-02T03:04:05Z");
        assert!(Lexical::new(instant).raw().is_none());
    }

    #[test]
    fn equality_ignores_spelling() {
        let one = Lexical::<bool>::parse("isDefault", "1").unwrap();
        assert_eq!(one, Lexical::new(true));
        assert_ne!(one, Lexical::new(false));
    }

    #[test]
    fn malformed_text_is_rejected() {
        let element = crate::xml::parse(r#"<x isDefault="yes"/>"#).unwrap();
        assert!(Lexical::<bool>::optional(&element, "isDefault").is_err());
        assert!(Lexical::<bool>::optional(&element, "other").unwrap().is_none());
        assert!(Lexical::<u16>::required(&element, "index").is_err());
    }
}
