//! Static descriptions of generated entities.
//!
//! Every generated unit carries one `static` [`EntityMetadata`]. All of it is
//! const-constructible so no registry has to be built at runtime.

use strum::{Display, EnumString, IntoStaticStr};

/// What a property looks like on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum AttributeKind {
    String,
    Number,
    Binary,
    Bool,
    DateTime,
    /// Epoch seconds used for item expiry.
    Ttl,
    List,
    StringSet,
    NumberSet,
    BinarySet,
    Map,
    Nested,
    Custom,
}

impl AttributeKind {
    /// Scalar kinds usable as key attributes.
    pub fn is_key_scalar(self) -> bool {
        matches!(
            self,
            AttributeKind::String | AttributeKind::Number | AttributeKind::Binary
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum KeyRole {
    Partition,
    Sort,
}

/// Comparison and function operators a property can take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum QueryOperator {
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "<>")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "BETWEEN")]
    Between,
    #[strum(serialize = "begins_with")]
    BeginsWith,
    #[strum(serialize = "contains")]
    Contains,
    #[strum(serialize = "attribute_exists")]
    Exists,
    #[strum(serialize = "attribute_not_exists")]
    NotExists,
}

impl QueryOperator {
    pub const PARTITION_KEY: &'static [QueryOperator] = &[QueryOperator::Eq];

    pub const SORT_KEY: &'static [QueryOperator] = &[
        QueryOperator::Eq,
        QueryOperator::Lt,
        QueryOperator::Le,
        QueryOperator::Gt,
        QueryOperator::Ge,
        QueryOperator::Between,
        QueryOperator::BeginsWith,
    ];

    pub const SCALAR: &'static [QueryOperator] = &[
        QueryOperator::Eq,
        QueryOperator::Ne,
        QueryOperator::Lt,
        QueryOperator::Le,
        QueryOperator::Gt,
        QueryOperator::Ge,
        QueryOperator::Between,
        QueryOperator::Exists,
        QueryOperator::NotExists,
    ];

    pub const STRING: &'static [QueryOperator] = &[
        QueryOperator::Eq,
        QueryOperator::Ne,
        QueryOperator::Lt,
        QueryOperator::Le,
        QueryOperator::Gt,
        QueryOperator::Ge,
        QueryOperator::Between,
        QueryOperator::BeginsWith,
        QueryOperator::Contains,
        QueryOperator::Exists,
        QueryOperator::NotExists,
    ];

    pub const SET: &'static [QueryOperator] = &[
        QueryOperator::Contains,
        QueryOperator::Exists,
        QueryOperator::NotExists,
    ];

    pub const PRESENCE: &'static [QueryOperator] =
        &[QueryOperator::Exists, QueryOperator::NotExists];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFormat {
    pub prefix: Option<&'static str>,
    pub separator: &'static str,
}

impl KeyFormat {
    pub fn format(&self, value: impl std::fmt::Display) -> String {
        crate::keys::format_key(self.prefix, self.separator, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyMetadata {
    /// Rust field name.
    pub name: &'static str,
    /// Wire attribute name.
    pub attribute: &'static str,
    pub kind: AttributeKind,
    pub nullable: bool,
    pub key_role: Option<KeyRole>,
    pub key_format: Option<KeyFormat>,
    pub operations: &'static [QueryOperator],
    /// Names of the secondary indexes this property is a key of.
    pub indexes: &'static [&'static str],
    pub sensitive: bool,
    pub encrypted: bool,
}

impl PropertyMetadata {
    pub fn supports(&self, operator: QueryOperator) -> bool {
        self.operations.contains(&operator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscriminatorMetadata {
    pub attribute: &'static str,
    /// A trailing `*` makes this a prefix match.
    pub value: &'static str,
}

impl DiscriminatorMetadata {
    pub fn matches(&self, candidate: &str) -> bool {
        crate::hydration::pattern_matches(self.value, candidate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationMetadata {
    pub name: &'static str,
    pub pattern: &'static str,
    pub target: &'static str,
    pub many: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityMetadata {
    pub type_name: &'static str,
    /// `None` for embedded records.
    pub table: Option<&'static str>,
    pub properties: &'static [PropertyMetadata],
    pub discriminator: Option<DiscriminatorMetadata>,
    pub relations: &'static [RelationMetadata],
}

impl EntityMetadata {
    pub fn property(&self, name: &str) -> Option<&'static PropertyMetadata> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_by_attribute(&self, attribute: &str) -> Option<&'static PropertyMetadata> {
        self.properties.iter().find(|p| p.attribute == attribute)
    }

    pub fn partition_key(&self) -> Option<&'static PropertyMetadata> {
        self.properties
            .iter()
            .find(|p| p.key_role == Some(KeyRole::Partition))
    }

    pub fn sort_key(&self) -> Option<&'static PropertyMetadata> {
        self.properties
            .iter()
            .find(|p| p.key_role == Some(KeyRole::Sort))
    }

    pub fn sensitive_attributes(&self) -> impl Iterator<Item = &'static str> {
        self.properties
            .iter()
            .filter(|p| p.sensitive)
            .map(|p| p.attribute)
    }

    pub fn encrypted_attributes(&self) -> impl Iterator<Item = &'static str> {
        self.properties
            .iter()
            .filter(|p| p.encrypted)
            .map(|p| p.attribute)
    }

    /// Attribute used to tell records of a shared partition apart: the sort
    /// key when there is one, otherwise the discriminator attribute.
    pub fn record_type_attribute(&self) -> Option<&'static str> {
        self.sort_key()
            .map(|p| p.attribute)
            .or(self.discriminator.map(|d| d.attribute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static PROPS: [PropertyMetadata; 2] = [
        PropertyMetadata {
            name: "id",
            attribute: "pk",
            kind: AttributeKind::String,
            nullable: false,
            key_role: Some(KeyRole::Partition),
            key_format: Some(KeyFormat {
                prefix: Some("USER"),
                separator: "#",
            }),
            operations: QueryOperator::PARTITION_KEY,
            indexes: &[],
            sensitive: false,
            encrypted: false,
        },
        PropertyMetadata {
            name: "email",
            attribute: "email",
            kind: AttributeKind::String,
            nullable: true,
            key_role: None,
            key_format: None,
            operations: QueryOperator::STRING,
            indexes: &["EmailIndex"],
            sensitive: true,
            encrypted: false,
        },
    ];

    static META: EntityMetadata = EntityMetadata {
        type_name: "User",
        table: Some("users"),
        properties: &PROPS,
        discriminator: None,
        relations: &[],
    };

    #[test]
    fn lookups() {
        assert_eq!(META.partition_key().map(|p| p.name), Some("id"));
        assert!(META.sort_key().is_none());
        assert_eq!(META.property_by_attribute("email").map(|p| p.name), Some("email"));
        assert_eq!(META.sensitive_attributes().collect::<Vec<_>>(), vec!["email"]);
        assert_eq!(META.record_type_attribute(), None);
    }

    #[test]
    fn operator_sets() {
        let pk = META.partition_key().unwrap();
        assert!(pk.supports(QueryOperator::Eq));
        assert!(!pk.supports(QueryOperator::BeginsWith));
        assert_eq!(QueryOperator::BeginsWith.to_string(), "begins_with");
        assert_eq!(
            pk.key_format.map(|f| f.format(7)),
            Some("USER#7".to_string())
        );
    }
}
