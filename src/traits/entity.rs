use crate::error::ConversionError;
use crate::traits::metadata::{DiscriminatorMetadata, EntityMetadata};
use crate::value::{AttributeMap, AttributeValue};

/// Conversion between a record type and its wire attribute map.
///
/// Implemented by the generated unit of every entity, embedded or not.
pub trait ItemConvert: Sized {
    const TYPE_NAME: &'static str;

    fn to_item(&self) -> AttributeMap;

    fn from_item(item: &AttributeMap) -> Result<Self, ConversionError>;

    fn metadata() -> &'static EntityMetadata;
}

/// A record type bound to a table.
///
/// Generated for every `#[derive(Entity)]` struct carrying `#[table(...)]`.
pub trait Entity: ItemConvert {
    /// The generated field-reference struct for this entity.
    type Fields: EntityFields<Entity = Self>;

    const TABLE: &'static str;

    const DISCRIMINATOR: Option<DiscriminatorMetadata>;

    fn fields() -> Self::Fields {
        Self::Fields::default()
    }

    /// Encoded partition key of this record, prefix applied.
    fn partition_key(&self) -> AttributeValue;

    /// Encoded sort key of this record, if the entity has one.
    fn sort_key(&self) -> Option<AttributeValue>;

    /// The primary key attributes of this record.
    fn key(&self) -> AttributeMap;

    /// Whether a stored record belongs to this entity.
    ///
    /// Uses the discriminator when there is one and the sort key prefix
    /// otherwise; entities with neither accept every record.
    fn is_record(item: &AttributeMap) -> bool {
        let metadata = Self::metadata();
        if let Some(discriminator) = metadata.discriminator {
            return match item.get(discriminator.attribute) {
                Some(AttributeValue::S(value)) => discriminator.matches(value),
                _ => false,
            };
        }

        let Some(sort_key) = metadata.sort_key() else {
            return true;
        };
        let Some(prefix) = sort_key.key_format.and_then(|format| format.prefix) else {
            return true;
        };
        let separator = sort_key.key_format.map_or("", |format| format.separator);

        match item.get(sort_key.attribute) {
            Some(AttributeValue::S(value)) => value
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with(separator)),
            _ => false,
        }
    }
}

/// Field-reference struct generated alongside each entity.
pub trait EntityFields: Default {
    type Entity: Entity<Fields = Self>;
}

/// A read-only subset of an entity's attributes.
pub trait Projection: Sized {
    type Source: Entity;

    const TYPE_NAME: &'static str;

    /// Wire attributes fetched for this projection. Always includes the
    /// source's discriminator attribute.
    const ATTRIBUTES: &'static [&'static str];

    fn from_item(item: &AttributeMap) -> Result<Self, ConversionError>;

    fn metadata() -> &'static EntityMetadata;

    fn projection_expression() -> String {
        Self::ATTRIBUTES.join(", ")
    }
}
