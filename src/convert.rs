//! Conversions between Rust values and [`AttributeValue`]s.
//!
//! Generated mapping code only ever calls into this module: scalars go
//! through [`ScalarAttribute`], set members through [`SetElement`], custom
//! types through a user supplied [`AttributeConverter`], and lists, maps and
//! nested records through the `encode_*` / `decode_*` helpers below.

use std::str::FromStr;

use crate::error::ConversionError;
use crate::value::{AttributeMap, AttributeValue};

/// A value that maps onto exactly one scalar wire tag (`S`, `N`, `B`, `BOOL`).
pub trait ScalarAttribute: Sized {
    /// The wire tag this type is written with.
    const TAG: &'static str;

    fn to_attribute(&self) -> AttributeValue;

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError>;
}

impl ScalarAttribute for String {
    const TAG: &'static str = "S";

    fn to_attribute(&self) -> AttributeValue {
        AttributeValue::S(self.clone())
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        value.as_s().map(str::to_owned)
    }
}

impl ScalarAttribute for bool {
    const TAG: &'static str = "BOOL";

    fn to_attribute(&self) -> AttributeValue {
        AttributeValue::Bool(*self)
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        value.as_bool()
    }
}

impl ScalarAttribute for Vec<u8> {
    const TAG: &'static str = "B";

    fn to_attribute(&self) -> AttributeValue {
        AttributeValue::B(self.clone())
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        value.as_b().map(<[u8]>::to_vec)
    }
}

macro_rules! impl_number_attribute {
    ($($ty:ty),*) => {
        $(
            impl ScalarAttribute for $ty {
                const TAG: &'static str = "N";

                fn to_attribute(&self) -> AttributeValue {
                    AttributeValue::N(self.to_string())
                }

                fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
                    parse_number(value.as_n()?)
                }
            }

            impl SetElement for $ty {
                fn encode_set<'a, I>(values: I) -> Option<AttributeValue>
                where
                    I: IntoIterator<Item = &'a Self>,
                {
                    let mut numbers: Vec<String> = values.into_iter().map(|n| n.to_string()).collect();
                    numbers.sort();
                    (!numbers.is_empty()).then_some(AttributeValue::Ns(numbers))
                }

                fn decode_set(value: &AttributeValue) -> Result<Vec<Self>, ConversionError> {
                    match value {
                        AttributeValue::Ns(numbers) => numbers.iter().map(|n| parse_number(n)).collect(),
                        other => Err(ConversionError::type_mismatch("NS", other)),
                    }
                }
            }
        )*
    };
}

impl_number_attribute!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

/// Parse the decimal string form of a number attribute.
pub fn parse_number<T: FromStr>(raw: &str) -> Result<T, ConversionError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConversionError::InvalidNumber {
            value: raw.to_string(),
            target: std::any::type_name::<T>(),
        })
}

/// A scalar that may appear inside a string, number or binary set.
///
/// The store rejects empty sets, so encoding an empty collection yields
/// `None` and the attribute is left out of the item.
pub trait SetElement: Sized {
    fn encode_set<'a, I>(values: I) -> Option<AttributeValue>
    where
        I: IntoIterator<Item = &'a Self>,
        Self: 'a;

    fn decode_set(value: &AttributeValue) -> Result<Vec<Self>, ConversionError>;
}

impl SetElement for String {
    fn encode_set<'a, I>(values: I) -> Option<AttributeValue>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let mut strings: Vec<String> = values.into_iter().cloned().collect();
        strings.sort();
        (!strings.is_empty()).then_some(AttributeValue::Ss(strings))
    }

    fn decode_set(value: &AttributeValue) -> Result<Vec<Self>, ConversionError> {
        match value {
            AttributeValue::Ss(strings) => Ok(strings.clone()),
            other => Err(ConversionError::type_mismatch("SS", other)),
        }
    }
}

impl SetElement for Vec<u8> {
    fn encode_set<'a, I>(values: I) -> Option<AttributeValue>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let mut blobs: Vec<Vec<u8>> = values.into_iter().cloned().collect();
        blobs.sort();
        (!blobs.is_empty()).then_some(AttributeValue::Bs(blobs))
    }

    fn decode_set(value: &AttributeValue) -> Result<Vec<Self>, ConversionError> {
        match value {
            AttributeValue::Bs(blobs) => Ok(blobs.clone()),
            other => Err(ConversionError::type_mismatch("BS", other)),
        }
    }
}

/// User supplied conversion for a type the generator has no built-in rule for.
///
/// Converters are plain types; the generated code calls them statically:
///
/// ```rust,ignore
/// struct CentsConverter;
///
/// impl AttributeConverter<Money> for CentsConverter {
///     fn to_attribute(value: &Money) -> AttributeValue {
///         AttributeValue::N(value.cents().to_string())
///     }
///
///     fn from_attribute(value: &AttributeValue) -> Result<Money, ConversionError> {
///         Ok(Money::from_cents(parse_number(value.as_n()?)?))
///     }
/// }
/// ```
pub trait AttributeConverter<T> {
    fn to_attribute(value: &T) -> AttributeValue;

    fn from_attribute(value: &AttributeValue) -> Result<T, ConversionError>;
}

/// Look up an attribute that must be present.
pub fn required<'a>(
    item: &'a AttributeMap,
    attribute: &str,
) -> Result<&'a AttributeValue, ConversionError> {
    match item.get(attribute) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(ConversionError::MissingAttribute(attribute.to_string())),
    }
}

/// Look up an attribute that may be absent; `NULL` counts as absent.
pub fn optional<'a>(item: &'a AttributeMap, attribute: &str) -> Option<&'a AttributeValue> {
    item.get(attribute).filter(|value| !value.is_null())
}

pub fn encode_list<'a, T, I, F>(values: I, encode: F) -> AttributeValue
where
    T: 'a,
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> AttributeValue,
{
    AttributeValue::L(values.into_iter().map(encode).collect())
}

pub fn decode_list<T, F>(value: &AttributeValue, decode: F) -> Result<Vec<T>, ConversionError>
where
    F: Fn(&AttributeValue) -> Result<T, ConversionError>,
{
    value.as_l()?.iter().map(decode).collect()
}

pub fn encode_map<'a, T, I, F>(entries: I, encode: F) -> AttributeValue
where
    T: 'a,
    I: IntoIterator<Item = (&'a String, &'a T)>,
    F: Fn(&T) -> AttributeValue,
{
    AttributeValue::M(
        entries
            .into_iter()
            .map(|(key, value)| (key.clone(), encode(value)))
            .collect(),
    )
}

pub fn decode_map<C, T, F>(value: &AttributeValue, decode: F) -> Result<C, ConversionError>
where
    C: FromIterator<(String, T)>,
    F: Fn(&AttributeValue) -> Result<T, ConversionError>,
{
    value
        .as_m()?
        .iter()
        .map(|(key, entry)| Ok((key.clone(), decode(entry).map_err(|e| e.at(key))?)))
        .collect()
}

pub fn encode_set<'a, T, I>(values: I) -> Option<AttributeValue>
where
    T: SetElement + 'a,
    I: IntoIterator<Item = &'a T>,
{
    T::encode_set(values)
}

pub fn decode_set<C, T>(value: &AttributeValue) -> Result<C, ConversionError>
where
    T: SetElement,
    C: FromIterator<T>,
{
    Ok(T::decode_set(value)?.into_iter().collect())
}

/// Write a nested record as an `M` attribute.
pub fn encode_nested<T: crate::traits::ItemConvert>(value: &T) -> AttributeValue {
    AttributeValue::M(value.to_item())
}

/// Read a nested record from an `M` attribute.
pub fn decode_nested<T: crate::traits::ItemConvert>(
    value: &AttributeValue,
) -> Result<T, ConversionError> {
    T::from_item(value.as_m()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::{BTreeMap, HashSet};

    #[test]
    fn numbers_use_decimal_strings() {
        assert_eq!(42u32.to_attribute(), AttributeValue::N("42".into()));
        assert_eq!((-1.5f64).to_attribute(), AttributeValue::N("-1.5".into()));
        assert_eq!(
            <i64 as ScalarAttribute>::from_attribute(&AttributeValue::N("-9".into())),
            Ok(-9)
        );
    }

    #[test]
    fn bad_number_is_reported() {
        let err = <u8 as ScalarAttribute>::from_attribute(&AttributeValue::N("300".into()));
        assert_matches!(err, Err(ConversionError::InvalidNumber { .. }));
    }

    #[test]
    fn empty_sets_are_omitted() {
        let empty: HashSet<String> = HashSet::new();
        assert_eq!(encode_set(&empty), None);
    }

    #[test]
    fn sets_are_sorted_for_stable_output() {
        let tags: HashSet<String> = ["b", "a", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            encode_set(&tags),
            Some(AttributeValue::Ss(vec!["a".into(), "b".into(), "c".into()]))
        );
        let decoded: HashSet<String> = decode_set(&encode_set(&tags).unwrap()).unwrap();
        assert_eq!(decoded, tags);
    }

    #[test]
    fn maps_report_the_failing_key() {
        let value = AttributeValue::M(BTreeMap::from([(
            "weight".to_string(),
            AttributeValue::S("heavy".into()),
        )]));
        let err = decode_map::<BTreeMap<String, u32>, _, _>(&value, |v| {
            <u32 as ScalarAttribute>::from_attribute(v)
        })
        .unwrap_err();
        assert_matches!(err, ConversionError::Attribute { attribute, .. } if attribute == "weight");
    }

    #[test]
    fn null_attribute_is_treated_as_absent() {
        let item = AttributeMap::from([("gone".to_string(), AttributeValue::Null(true))]);
        assert!(optional(&item, "gone").is_none());
        assert_matches!(
            required(&item, "gone"),
            Err(ConversionError::MissingAttribute(name)) if name == "gone"
        );
    }
}
