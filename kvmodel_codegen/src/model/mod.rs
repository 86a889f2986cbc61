//! Analysed models: the validated form of entity and projection
//! declarations that the generators consume.

pub mod types;

use strum::{Display, IntoStaticStr};

pub use types::{ScalarKind, TypeKind, TypeNode, TypeResolver};

use crate::diagnostics::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum KeyRole {
    Partition,
    Sort,
}

/// Prefix and separator of a formatted key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFormat {
    pub prefix: Option<String>,
    pub separator: String,
}

impl KeyFormat {
    /// The record pattern matching every key in this format.
    pub fn pattern(&self) -> Option<String> {
        self.prefix
            .as_ref()
            .map(|prefix| format!("{prefix}{}*", self.separator))
    }

    /// Prefix and separator as they appear in stored values. The
    /// separator is unused without a prefix.
    pub fn stored_form(&self) -> Option<(&str, &str)> {
        self.prefix
            .as_deref()
            .map(|prefix| (prefix, self.separator.as_str()))
    }
}

/// Operator set a property supports; names the runtime constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationSet {
    PartitionKey,
    SortKey,
    String,
    Scalar,
    Set,
    Presence,
}

#[derive(Debug, Clone)]
pub struct PropertyModel {
    /// Rust field name.
    pub name: String,
    /// Wire attribute name.
    pub attribute: String,
    pub ty: TypeNode,
    pub nullable: bool,
    pub key_role: Option<KeyRole>,
    pub key_format: Option<KeyFormat>,
    pub operations: OperationSet,
    /// Indexes this property is a key of.
    pub indexes: Vec<String>,
    pub ttl: bool,
    pub sensitive: bool,
    pub encrypted: bool,
    pub location: Location,
}

impl PropertyModel {
    /// A key carrying a prefix is stored as a formatted string.
    pub fn is_prefixed_key(&self) -> bool {
        self.key_format
            .as_ref()
            .is_some_and(|format| format.prefix.is_some())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexProjectionModel {
    All,
    KeysOnly,
    /// Sorted wire names.
    Attributes(Vec<String>),
    /// Named projection type; resolved to attributes during aggregation.
    Type(String),
}

#[derive(Debug, Clone)]
pub struct IndexKeyBinding {
    pub property: usize,
    pub format: KeyFormat,
}

/// One entity's participation in a secondary index.
#[derive(Debug, Clone)]
pub struct IndexBinding {
    pub name: String,
    pub partition_key: IndexKeyBinding,
    pub sort_key: Option<IndexKeyBinding>,
    pub projection: IndexProjectionModel,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorModel {
    pub attribute: String,
    pub value: String,
    /// Index of the property holding the discriminator, if one does.
    pub property: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct TableBinding {
    pub name: String,
    pub default_entity: bool,
}

/// A `#[related(pattern = "...")]` property.
#[derive(Debug, Clone)]
pub struct Relation {
    pub field: String,
    pub pattern: String,
    /// Simple name of the related entity.
    pub target: String,
    pub element: syn::Type,
    pub many: bool,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct EntityModel {
    pub name: String,
    pub module_path: Vec<String>,
    pub location: Location,
    /// `None` for embedded entities.
    pub table: Option<TableBinding>,
    pub properties: Vec<PropertyModel>,
    pub partition_key: Option<usize>,
    pub sort_key: Option<usize>,
    pub indexes: Vec<IndexBinding>,
    pub discriminator: Option<DiscriminatorModel>,
    pub relations: Vec<Relation>,
    /// `#[skip]` fields, restored with `Default::default()`.
    pub skipped: Vec<String>,
}

impl EntityModel {
    pub fn is_table_entity(&self) -> bool {
        self.table.is_some()
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table.as_ref().map(|t| t.name.as_str())
    }

    pub fn property(&self, name: &str) -> Option<&PropertyModel> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_by_attribute(&self, attribute: &str) -> Option<&PropertyModel> {
        self.properties.iter().find(|p| p.attribute == attribute)
    }

    pub fn partition_key_property(&self) -> Option<&PropertyModel> {
        self.partition_key.map(|i| &self.properties[i])
    }

    pub fn sort_key_property(&self) -> Option<&PropertyModel> {
        self.sort_key.map(|i| &self.properties[i])
    }

    /// Pattern matching this entity's own records by sort key.
    pub fn root_pattern(&self) -> Option<String> {
        self.sort_key_property()
            .and_then(|p| p.key_format.as_ref())
            .and_then(KeyFormat::pattern)
    }

    /// Attribute whose value classifies records of a shared partition.
    pub fn record_type_attribute(&self) -> Option<&str> {
        self.sort_key_property()
            .map(|p| p.attribute.as_str())
            .or(self.discriminator.as_ref().map(|d| d.attribute.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionModel {
    pub name: String,
    pub module_path: Vec<String>,
    pub location: Location,
    /// Simple name of the source entity.
    pub source: String,
    pub source_module_path: Vec<String>,
    /// Source properties retyped as the projection declares them.
    pub properties: Vec<PropertyModel>,
    pub discriminator: Option<DiscriminatorModel>,
    /// Sorted wire names fetched for the projection, discriminator included.
    pub attributes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format_pattern() {
        let format = KeyFormat {
            prefix: Some("LINE".into()),
            separator: "#".into(),
        };
        assert_eq!(format.pattern().as_deref(), Some("LINE#*"));
        let bare = KeyFormat {
            prefix: None,
            separator: "#".into(),
        };
        assert_eq!(bare.pattern(), None);
        assert_eq!(format.stored_form(), Some(("LINE", "#")));
        let piped = KeyFormat {
            prefix: None,
            separator: "|".into(),
        };
        assert_eq!(bare.stored_form(), piped.stored_form());
        let name: &'static str = OperationSet::PartitionKey.into();
        assert_eq!(name, "PARTITION_KEY");
    }
}
