//! Secondary index descriptors.
//!
//! The table unit emits one `static` [`IndexDescriptor`] per index name,
//! merged across every entity of that table that declares the index.

use std::fmt::Display;

use crate::traits::metadata::{AttributeKind, KeyFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexKey {
    pub attribute: &'static str,
    pub kind: AttributeKind,
    pub format: KeyFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexProjection {
    /// Every attribute is copied into the index.
    All,
    KeysOnly,
    /// An explicit attribute list, sorted by wire name.
    Include(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: &'static str,
    pub table: &'static str,
    /// Entity types that declare this index.
    pub entities: &'static [&'static str],
    pub partition_key: IndexKey,
    pub sort_key: Option<IndexKey>,
    pub projection: IndexProjection,
    /// Projection type the attribute list was taken from, if any.
    pub projection_type: Option<&'static str>,
}

impl IndexDescriptor {
    pub fn contains_entity(&self, entity: &str) -> bool {
        self.entities.contains(&entity)
    }

    pub fn format_partition_key(&self, value: impl Display) -> String {
        self.partition_key.format.format(value)
    }

    pub fn format_sort_key(&self, value: impl Display) -> Option<String> {
        self.sort_key.map(|key| key.format.format(value))
    }

    /// Attributes a read against this index may return, or `None` when the
    /// index projects everything.
    pub fn projected_attributes(&self) -> Option<Vec<&'static str>> {
        let mut attributes: Vec<&'static str> = match self.projection {
            IndexProjection::All => return None,
            IndexProjection::KeysOnly => Vec::new(),
            IndexProjection::Include(list) => list.to_vec(),
        };
        attributes.push(self.partition_key.attribute);
        attributes.extend(self.sort_key.map(|k| k.attribute));
        attributes.sort_unstable();
        attributes.dedup();
        Some(attributes)
    }
}

/// Generated per table.
pub trait TableSchema {
    const NAME: &'static str;

    const ENTITIES: &'static [&'static str];

    const DEFAULT_ENTITY: Option<&'static str>;

    fn indexes() -> &'static [IndexDescriptor];

    fn index(name: &str) -> Option<&'static IndexDescriptor> {
        Self::indexes().iter().find(|index| index.name == name)
    }

    fn indexes_for(entity: &str) -> impl Iterator<Item = &'static IndexDescriptor> {
        Self::indexes()
            .iter()
            .filter(move |index| index.contains_entity(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::DEFAULT_SEPARATOR;

    static STATUS_INDEX: IndexDescriptor = IndexDescriptor {
        name: "StatusIndex",
        table: "commerce",
        entities: &["Order", "OrderLine"],
        partition_key: IndexKey {
            attribute: "gsi1pk",
            kind: AttributeKind::String,
            format: KeyFormat {
                prefix: Some("STATE"),
                separator: DEFAULT_SEPARATOR,
            },
        },
        sort_key: None,
        projection: IndexProjection::Include(&["amount", "id", "status"]),
        projection_type: None,
    };

    #[test]
    fn projected_attributes_include_keys() {
        assert_eq!(
            STATUS_INDEX.projected_attributes(),
            Some(vec!["amount", "gsi1pk", "id", "status"])
        );
        assert_eq!(STATUS_INDEX.format_partition_key("OPEN"), "STATE#OPEN");
        assert_eq!(STATUS_INDEX.format_sort_key(1), None);
        assert!(STATUS_INDEX.contains_entity("OrderLine"));
    }
}
