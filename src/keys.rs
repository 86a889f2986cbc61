//! Key string formatting.
//!
//! Keys are written as `prefix + separator + value`, or as the bare value
//! when no prefix is declared. Generated `build_*_key` routines and the
//! decoding side of every generated mapping go through these two functions.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::ConversionError;

/// Separator used when a key declares a prefix but no separator.
pub const DEFAULT_SEPARATOR: &str = "#";

/// Format one key component.
///
/// ```
/// use kvmodel::keys::format_key;
///
/// assert_eq!(format_key(Some("ORDER"), "#", 42), "ORDER#42");
/// assert_eq!(format_key(None, "#", "plain"), "plain");
/// ```
pub fn format_key(prefix: Option<&str>, separator: &str, value: impl Display) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}{separator}{value}"),
        None => value.to_string(),
    }
}

/// Strip the declared prefix and separator from a stored key.
pub fn parse_key<'a>(
    prefix: Option<&str>,
    separator: &str,
    key: &'a str,
) -> Result<&'a str, ConversionError> {
    let Some(prefix) = prefix else {
        return Ok(key);
    };

    key.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(separator))
        .ok_or_else(|| ConversionError::KeyPrefixMismatch {
            expected: format!("{prefix}{separator}"),
            found: key.to_string(),
        })
}

/// Parse the value part of a key back into the property type.
pub fn parse_component<T: FromStr>(raw: &str) -> Result<T, ConversionError> {
    raw.parse::<T>().map_err(|_| ConversionError::InvalidNumber {
        value: raw.to_string(),
        target: std::any::type_name::<T>(),
    })
}
