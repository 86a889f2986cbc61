use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use kvmodel::convert::{AttributeConverter, parse_number};
use kvmodel::{AttributeValue, ConversionError, Entity, Projection};

/// An order and its lines, stored in one partition.
#[derive(Debug, Clone, PartialEq, Entity)]
#[table(name = "commerce", default_entity)]
#[secondary_index(name = "StageIndex", projection(id, amount, stage))]
pub struct Order {
    #[partition_key(prefix = "ORDER")]
    #[attribute("pk")]
    pub id: String,
    #[sort_key(prefix = "ORDER")]
    #[attribute("sk")]
    pub placed: String,
    pub amount: u64,
    #[index_partition_key(name = "StageIndex", prefix = "STAGE")]
    pub stage: String,
    pub tags: BTreeSet<String>,
    pub note: Option<String>,
    pub created: DateTime<Utc>,
    pub shipping: Address,
    #[related("LINE#*")]
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Entity)]
#[table(name = "commerce")]
#[secondary_index(name = "StageIndex", projection(id, amount, stage))]
pub struct OrderLine {
    #[partition_key(prefix = "ORDER")]
    #[attribute("pk")]
    pub id: String,
    #[sort_key(prefix = "LINE")]
    #[attribute("sk")]
    pub line: u32,
    pub sku: String,
    pub quantity: u32,
    pub amount: u64,
    #[index_partition_key(name = "StageIndex", prefix = "STAGE")]
    pub stage: String,
}

/// Stored as a nested map inside its owner.
#[derive(Debug, Clone, PartialEq, Default, Entity)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub postcode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Entity)]
#[table(name = "customers", default_entity)]
#[secondary_index(name = "EmailIndex", keys_only)]
pub struct Customer {
    #[partition_key(prefix = "CUSTOMER")]
    #[attribute("pk")]
    pub id: u64,
    #[index_partition_key(name = "EmailIndex")]
    #[sensitive]
    pub email: String,
    #[sensitive]
    #[encrypted]
    pub card: Option<String>,
    pub balance: Money,
    #[converter(crate::models::UpperCase)]
    pub country: String,
    pub scores: BTreeMap<String, u32>,
    pub home: Option<Address>,
    #[ttl]
    pub expires: Option<DateTime<Utc>>,
    #[skip]
    pub session: Option<String>,
}

/// Two record types sharing a table, told apart by `kind`.
#[derive(Debug, Clone, PartialEq, Entity)]
#[table(name = "activity", default_entity, discriminator(attribute = "kind", value = "CLICK"))]
pub struct Click {
    #[partition_key(prefix = "ACCOUNT")]
    #[attribute("pk")]
    pub account: String,
    #[sort_key]
    #[attribute("sk")]
    pub seen: i64,
    pub target_url: String,
}

#[derive(Debug, Clone, PartialEq, Entity)]
#[table(name = "activity", discriminator(attribute = "kind", value = "VIEW*"))]
pub struct View {
    #[partition_key(prefix = "ACCOUNT")]
    #[attribute("pk")]
    pub account: String,
    #[sort_key]
    #[attribute("sk")]
    pub seen: i64,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Projection)]
#[projection(source = Order)]
pub struct OrderSummary {
    pub id: String,
    pub amount: Option<u64>,
    pub stage: String,
}

/// Whole cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Money {
    pub cents: i64,
}

pub struct MoneyConverter;

impl AttributeConverter<Money> for MoneyConverter {
    fn to_attribute(value: &Money) -> AttributeValue {
        AttributeValue::N(value.cents.to_string())
    }

    fn from_attribute(value: &AttributeValue) -> Result<Money, ConversionError> {
        Ok(Money {
            cents: parse_number(value.as_n()?)?,
        })
    }
}

/// Country codes are stored upper case.
pub struct UpperCase;

impl AttributeConverter<String> for UpperCase {
    fn to_attribute(value: &String) -> AttributeValue {
        AttributeValue::S(value.to_uppercase())
    }

    fn from_attribute(value: &AttributeValue) -> Result<String, ConversionError> {
        let raw = value.as_s()?;
        if raw.chars().any(char::is_lowercase) {
            return Err(ConversionError::Converter(format!("'{raw}' is not upper case")));
        }
        Ok(raw.to_string())
    }
}
