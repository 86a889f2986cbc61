//! The store's attribute-value wire encoding.
//!
//! Every record travels as an [`AttributeMap`]: attribute name to a tagged
//! [`AttributeValue`]. The tag set (`S`, `N`, `B`, `BOOL`, `SS`, `NS`, `BS`,
//! `L`, `M`, `NULL`) is fixed by the store and serializes to the same JSON
//! shape the store's API uses, with numbers carried as strings and binary
//! payloads as base64.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::error::ConversionError;

/// A record as the store sees it.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// One tagged wire value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    #[strum(serialize = "S")]
    S(String),

    /// Numbers are kept in their decimal string form to avoid precision loss.
    #[serde(rename = "N")]
    #[strum(serialize = "N")]
    N(String),

    #[serde(rename = "B")]
    #[strum(serialize = "B")]
    B(#[serde(with = "base64_bytes")] Vec<u8>),

    #[serde(rename = "BOOL")]
    #[strum(serialize = "BOOL")]
    Bool(bool),

    #[serde(rename = "SS")]
    #[strum(serialize = "SS")]
    Ss(Vec<String>),

    #[serde(rename = "NS")]
    #[strum(serialize = "NS")]
    Ns(Vec<String>),

    #[serde(rename = "BS")]
    #[strum(serialize = "BS")]
    Bs(#[serde(with = "base64_bytes_list")] Vec<Vec<u8>>),

    #[serde(rename = "L")]
    #[strum(serialize = "L")]
    L(Vec<AttributeValue>),

    #[serde(rename = "M")]
    #[strum(serialize = "M")]
    M(AttributeMap),

    #[serde(rename = "NULL")]
    #[strum(serialize = "NULL")]
    Null(bool),
}

impl AttributeValue {
    /// The wire tag of this value (`"S"`, `"NS"`, ...).
    pub fn tag(&self) -> &'static str {
        self.into()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null(true))
    }

    pub fn as_s(&self) -> Result<&str, ConversionError> {
        match self {
            AttributeValue::S(s) => Ok(s),
            other => Err(ConversionError::type_mismatch("S", other)),
        }
    }

    pub fn as_n(&self) -> Result<&str, ConversionError> {
        match self {
            AttributeValue::N(n) => Ok(n),
            other => Err(ConversionError::type_mismatch("N", other)),
        }
    }

    pub fn as_b(&self) -> Result<&[u8], ConversionError> {
        match self {
            AttributeValue::B(b) => Ok(b),
            other => Err(ConversionError::type_mismatch("B", other)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ConversionError> {
        match self {
            AttributeValue::Bool(b) => Ok(*b),
            other => Err(ConversionError::type_mismatch("BOOL", other)),
        }
    }

    pub fn as_l(&self) -> Result<&[AttributeValue], ConversionError> {
        match self {
            AttributeValue::L(l) => Ok(l),
            other => Err(ConversionError::type_mismatch("L", other)),
        }
    }

    pub fn as_m(&self) -> Result<&AttributeMap, ConversionError> {
        match self {
            AttributeValue::M(m) => Ok(m),
            other => Err(ConversionError::type_mismatch("M", other)),
        }
    }

    /// Render a value for log output; binary payloads are summarised.
    pub fn display_value(&self) -> String {
        match self {
            AttributeValue::S(s) | AttributeValue::N(s) => s.clone(),
            AttributeValue::B(b) => format!("<{} bytes>", b.len()),
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Ss(v) | AttributeValue::Ns(v) => format!("{v:?}"),
            AttributeValue::Bs(v) => format!("<{} binary values>", v.len()),
            AttributeValue::L(l) => format!("<list of {}>", l.len()),
            AttributeValue::M(m) => format!("<map of {}>", m.len()),
            AttributeValue::Null(_) => "null".to_string(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}: {}}}", self.tag(), self.display_value())
    }
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(D::Error::custom)
    }
}

mod base64_bytes_list {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de::Error, ser::SerializeSeq};

    pub fn serialize<S: Serializer>(values: &Vec<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&STANDARD.encode(value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .into_iter()
            .map(|encoded| STANDARD.decode(encoded).map_err(D::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_store_tags() {
        let mut item = AttributeMap::new();
        item.insert("pk".into(), AttributeValue::S("ORDER#1".into()));
        item.insert("amount".into(), AttributeValue::N("12.5".into()));
        item.insert("blob".into(), AttributeValue::B(vec![1, 2, 3]));
        item.insert("flag".into(), AttributeValue::Bool(true));
        item.insert("gone".into(), AttributeValue::Null(true));

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["pk"], serde_json::json!({ "S": "ORDER#1" }));
        assert_eq!(json["amount"], serde_json::json!({ "N": "12.5" }));
        assert_eq!(json["blob"], serde_json::json!({ "B": "AQID" }));
        assert_eq!(json["flag"], serde_json::json!({ "BOOL": true }));
        assert_eq!(json["gone"], serde_json::json!({ "NULL": true }));
    }

    #[test]
    fn parses_nested_store_json() {
        let json = r#"{"M": {"tags": {"SS": ["a", "b"]}, "raw": {"BS": ["AQ=="]}, "xs": {"L": [{"N": "1"}]}}}"#;
        let value: AttributeValue = serde_json::from_str(json).unwrap();
        let map = value.as_m().unwrap();
        assert_eq!(map["tags"], AttributeValue::Ss(vec!["a".into(), "b".into()]));
        assert_eq!(map["raw"], AttributeValue::Bs(vec![vec![1]]));
        assert_eq!(map["xs"].as_l().unwrap().len(), 1);
    }

    #[test]
    fn accessor_reports_mismatched_tag() {
        let err = AttributeValue::N("1".into()).as_s().unwrap_err();
        assert_eq!(
            err,
            ConversionError::TypeMismatch {
                expected: "S",
                found: "N"
            }
        );
    }
}
