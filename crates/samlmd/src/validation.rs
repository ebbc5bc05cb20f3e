//! Invariant checks shared by every element constructor.
//!
//! Each helper returns the first violation as [`SamlError::Validation`]
//! naming the offending attribute or child.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

/// Longest entity identifier the metadata schema permits.
pub const MAX_ENTITY_ID_LEN: usize = 1024;

/// Fails if `value` is empty or whitespace only.
///
/// # Errors
///
/// Returns [`SamlError::Validation`] for `field`.
pub fn require_non_empty(field: &str, value: &str) -> SamlResult<()> {
    if value.trim().is_empty() {
        return Err(SamlError::validation(field, "must not be empty"));
    }
    Ok(())
}

/// Fails unless `value` is a non-empty absolute URI.
///
/// # Errors
///
/// Returns [`SamlError::Validation`] for `field`.
pub fn require_uri(field: &str, value: &str) -> SamlResult<()> {
    require_non_empty(field, value)?;
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| SamlError::validation(field, format!("'{value}' is not an absolute URI: {e}")))
}

/// Fails if `values` is empty.
///
/// # Errors
///
/// Returns [`SamlError::Validation`] for `field`.
pub fn require_non_empty_list<T>(field: &str, values: &[T]) -> SamlResult<()> {
    if values.is_empty() {
        return Err(SamlError::validation(field, "at least one is required"));
    }
    Ok(())
}

/// Fails if a field that must be absent is present.
///
/// # Errors
///
/// Returns [`SamlError::Validation`] for `field`.
pub fn forbid<T>(field: &str, value: Option<&T>) -> SamlResult<()> {
    if value.is_some() {
        return Err(SamlError::validation(field, "is not allowed on this element"));
    }
    Ok(())
}

/// Checks an entity identifier.
///
/// # Errors
///
/// Returns [`SamlError::Validation`] if empty or longer than
/// [`MAX_ENTITY_ID_LEN`] characters.
pub fn entity_id(field: &str, value: &str) -> SamlResult<()> {
    require_non_empty(field, value)?;
    if value.chars().count() > MAX_ENTITY_ID_LEN {
        return Err(SamlError::validation(
            field,
            format!("must not exceed {MAX_ENTITY_ID_LEN} characters"),
        ));
    }
    Ok(())
}

/// Fails unless `children` contains a `{namespace}local_name` element.
///
/// Composites call this before dispatching so that a missing required
/// child is reported ahead of any problem inside the children.
///
/// # Errors
///
/// Returns [`SamlError::Validation`] naming `local_name`.
pub fn require_child<'a>(
    children: impl IntoIterator<Item = &'a XmlElement>,
    namespace: &str,
    local_name: &str,
) -> SamlResult<()> {
    if children.into_iter().any(|child| child.is(namespace, local_name)) {
        return Ok(());
    }
    Err(SamlError::validation(local_name, "at least one is required"))
}

/// Stores `value` in an at-most-once slot.
///
/// # Errors
///
/// Returns [`SamlError::MultipleElements`] if the slot is already filled.
pub fn set_once<T>(slot: &mut Option<T>, value: T, local_name: &str) -> SamlResult<()> {
    if slot.is_some() {
        return Err(SamlError::multiple(local_name));
    }
    *slot = Some(value);
    Ok(())
}

/// Returns an unqualified attribute that must be present.
///
/// # Errors
///
/// Returns [`SamlError::Validation`] naming the attribute.
pub fn required_attribute<'a>(element: &'a XmlElement, name: &str) -> SamlResult<&'a str> {
    element
        .attribute(name)
        .ok_or_else(|| SamlError::validation(name, "is required"))
}

/// Parses an `xs:boolean`.
///
/// # Errors
///
/// Returns [`SamlError::Validation`] for anything but `true`, `false`, `1`
/// and `0`.
pub fn parse_bool(field: &str, value: &str) -> SamlResult<bool> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(SamlError::validation(field, format!("'{other}' is not a boolean"))),
    }
}

/// Parses a decimal number such as an endpoint index.
///
/// # Errors
///
/// Returns [`SamlError::Validation`] if `value` does not fit `T`.
pub fn parse_number<T: FromStr>(field: &str, value: &str) -> SamlResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SamlError::validation(field, format!("'{value}' is not a valid number")))
}

/// Parses an `xs:dateTime`, treating a missing zone as UTC.
///
/// # Errors
///
/// Returns [`SamlError::Validation`] if `value` is not a timestamp.
pub fn parse_datetime(field: &str, value: &str) -> SamlResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| SamlError::validation(field, format!("'{value}' is not an xs:dateTime")))
}

/// Formats a timestamp the way SAML documents carry them.
#[must_use]
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Checks an `xs:duration` such as `PT1H` or `P1Y2M3DT4H5M6.5S`.
///
/// # Errors
///
/// Returns [`SamlError::Validation`] for malformed durations.
pub fn validate_duration(field: &str, value: &str) -> SamlResult<()> {
    let invalid = || SamlError::validation(field, format!("'{value}' is not an xs:duration"));

    let body = value.strip_prefix('-').unwrap_or(value);
    let body = body.strip_prefix('P').ok_or_else(invalid)?;
    let (date, time) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };

    let mut components = duration_components(date, &['Y', 'M', 'D'], false).ok_or_else(invalid)?;
    if let Some(time) = time {
        match duration_components(time, &['H', 'M', 'S'], true) {
            Some(0) | None => return Err(invalid()),
            Some(n) => components += n,
        }
    }

    if components == 0 {
        return Err(invalid());
    }
    Ok(())
}

/// Counts `<number><designator>` pairs, which must follow `designators` order.
fn duration_components(part: &str, designators: &[char], fraction_on_last: bool) -> Option<usize> {
    let mut rest = part;
    let mut count = 0;
    let mut next = 0;

    while !rest.is_empty() {
        let end = rest.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
        let (number, tail) = rest.split_at(end);
        let designator = tail.chars().next()?;
        let position = designators[next..].iter().position(|d| *d == designator)? + next;
        let is_last = position + 1 == designators.len();

        let valid = match number.split_once('.') {
            None => !number.is_empty(),
            Some((whole, fraction)) => {
                fraction_on_last
                    && is_last
                    && !whole.is_empty()
                    && !fraction.is_empty()
                    && !fraction.contains('.')
            }
        };
        if !valid {
            return None;
        }

        next = position + 1;
        count += 1;
        rest = &tail[designator.len_utf8()..];
    }
    Some(count)
}

/// Splits a whitespace-separated token list such as
/// `protocolSupportEnumeration`.
///
/// # Errors
///
/// Returns [`SamlError::Validation`] if the list has no tokens.
pub fn split_tokens(field: &str, value: &str) -> SamlResult<Vec<String>> {
    let tokens: Vec<String> = value.split_whitespace().map(str::to_string).collect();
    require_non_empty_list(field, &tokens)?;
    Ok(tokens)
}
