//! Assembling an aggregate from the records of one partition.
//!
//! Entities that declare `#[related(pattern = "...")]` properties get a
//! generated `hydrate(items, options)` routine. It walks the partition's
//! records, routes each one to the root entity or to the relation whose
//! pattern matches its sort key (or discriminator), and consults the
//! [`UnknownRecordPolicy`](crate::config::UnknownRecordPolicy) for the rest.

use log::warn;

use crate::config::{HydrationOptions, UnknownRecordPolicy};
use crate::encryption::redact;
use crate::error::ConversionError;
use crate::traits::metadata::EntityMetadata;
use crate::value::{AttributeMap, AttributeValue};

/// Match a relation or discriminator pattern. A trailing `*` is a prefix
/// wildcard; anything else must match exactly.
pub fn pattern_matches(pattern: &str, value: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => value == pattern,
    }
}

/// The string value used to classify a record.
pub fn record_tag<'a>(item: &'a AttributeMap, attribute: Option<&str>) -> Option<&'a str> {
    match item.get(attribute?)? {
        AttributeValue::S(value) => Some(value),
        _ => None,
    }
}

/// Apply the unknown-record policy to a record no pattern claimed.
pub fn unknown_record(
    options: &HydrationOptions,
    root: &EntityMetadata,
    tag: Option<&str>,
    item: &AttributeMap,
) -> Result<(), ConversionError> {
    let attribute = root.record_type_attribute().unwrap_or_default();
    match options.unknown_records {
        UnknownRecordPolicy::Fail => Err(ConversionError::UnknownRecord {
            attribute: attribute.to_string(),
            value: tag.map(str::to_string),
        }),
        UnknownRecordPolicy::Skip => {
            if options.redact_logs {
                warn!(
                    "Skipping unrecognised record {attribute}={tag:?} while hydrating {}: {}",
                    root.type_name,
                    DisplayItem(&redact(item, root))
                );
            } else {
                warn!(
                    "Skipping unrecognised record {attribute}={tag:?} while hydrating {}: {}",
                    root.type_name,
                    DisplayItem(item)
                );
            }
            Ok(())
        }
    }
}

struct DisplayItem<'a>(&'a AttributeMap);

impl std::fmt::Display for DisplayItem<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    static ROOT: EntityMetadata = EntityMetadata {
        type_name: "Order",
        table: Some("commerce"),
        properties: &[],
        discriminator: None,
        relations: &[],
    };

    #[test]
    fn wildcard_and_exact_patterns() {
        assert!(pattern_matches("LINE#*", "LINE#0001"));
        assert!(!pattern_matches("LINE#*", "ORDER"));
        assert!(pattern_matches("ORDER", "ORDER"));
        assert!(!pattern_matches("ORDER", "ORDER#1"));
        assert!(pattern_matches("*", "anything"));
    }

    #[test]
    fn record_tag_reads_strings_only() {
        let item = AttributeMap::from([
            ("sk".to_string(), AttributeValue::S("LINE#1".into())),
            ("n".to_string(), AttributeValue::N("1".into())),
        ]);
        assert_eq!(record_tag(&item, Some("sk")), Some("LINE#1"));
        assert_eq!(record_tag(&item, Some("n")), None);
        assert_eq!(record_tag(&item, None), None);
    }

    #[test_log::test]
    fn policy_decides_between_skip_and_fail() {
        let item = AttributeMap::new();
        let strict = HydrationOptions::default();
        assert_matches!(
            unknown_record(&strict, &ROOT, Some("NOTE#1"), &item),
            Err(ConversionError::UnknownRecord { value: Some(v), .. }) if v == "NOTE#1"
        );

        let lenient = HydrationOptions::builder()
            .unknown_records(UnknownRecordPolicy::Skip)
            .build();
        assert!(unknown_record(&lenient, &ROOT, Some("NOTE#1"), &item).is_ok());
    }
}
