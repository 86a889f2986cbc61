//! Datetime encoding.
//!
//! Ordinary datetimes are stored as RFC 3339 strings. Properties marked
//! `#[ttl]` are stored as whole epoch seconds so the store can expire them.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::convert::parse_number;
use crate::error::ConversionError;
use crate::value::AttributeValue;

/// Datetime type used by models.
pub type KvDateTime = DateTime<Utc>;

pub fn encode_datetime(value: &KvDateTime) -> AttributeValue {
    AttributeValue::S(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

pub fn decode_datetime(value: &AttributeValue) -> Result<KvDateTime, ConversionError> {
    let raw = value.as_s()?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ConversionError::InvalidDateTime(raw.to_string()))
}

/// Sub-second precision is dropped.
pub fn encode_ttl(value: &KvDateTime) -> AttributeValue {
    AttributeValue::N(value.timestamp().to_string())
}

pub fn decode_ttl(value: &AttributeValue) -> Result<KvDateTime, ConversionError> {
    let seconds: i64 = parse_number(value.as_n()?)?;
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| ConversionError::InvalidDateTime(seconds.to_string()))
}

pub use chrono;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn rfc3339_keeps_nanoseconds() {
        let dt = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let encoded = encode_datetime(&dt);
        assert_eq!(decode_datetime(&encoded).unwrap(), dt);
    }

    #[test]
    fn ttl_is_epoch_seconds() {
        let dt = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(encode_ttl(&dt), AttributeValue::N("1700000000".into()));
        assert_eq!(decode_ttl(&encode_ttl(&dt)).unwrap(), dt);
    }

    #[test]
    fn garbage_is_an_error() {
        assert_matches!(
            decode_datetime(&AttributeValue::S("yesterday".into())),
            Err(ConversionError::InvalidDateTime(_))
        );
        assert_matches!(
            decode_ttl(&AttributeValue::S("1".into())),
            Err(ConversionError::TypeMismatch { .. })
        );
    }
}
