//! The diagnostic catalog.
//!
//! Codes are stable: a code is never reused or renumbered, and
//! [`REGISTRY_VERSION`] is bumped whenever one is added. Tests assert on
//! [`DiagnosticId`] and severity, never on message text.

use strum::{Display, EnumCount, EnumIter, IntoStaticStr};

pub const REGISTRY_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Symbolic names for every catalog entry.
///
/// The declaration order is the order of [`REGISTRY`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount, IntoStaticStr,
)]
pub enum DiagnosticId {
    // Structural (KVS)
    MissingPartitionKey,
    DuplicatePartitionKey,
    DuplicateSortKey,
    MissingKeyAttributeName,
    NotExtensible,
    UnsupportedPropertyType,
    CollectionKey,
    NullableKey,
    NestedNotAnalyzable,
    ReservedAttributeName,
    RelationWithoutSortKey,
    AmbiguousRelationPatterns,
    KeyOnEmbeddedType,
    InvalidAttribute,
    DuplicateAttributeName,
    DuplicateDeclaration,
    InvalidKeyFormat,
    InvalidTtl,
    InvalidEncryptedType,
    InvalidRelationType,
    SourceParseFailed,

    // Projection and index (KVP)
    ProjectionSourceNotFound,
    ProjectionPropertyMissing,
    ProjectionTypeMismatch,
    ProjectionCoversSource,
    IndexMissingPartitionKey,
    IndexKeyConflict,
    IndexProjectionConflict,
    IndexProjectionUnknownProperty,
    ConflictingDiscriminators,
    MultipleDefaultEntities,
    NoDefaultEntity,
    DuplicateIndexKeyRole,
    IndexAccessorCollision,

    // Wrapper specialization (KVW)
    UnclassifiableTemplate,
    MissingCapability,
    UnknownBuilderEntity,
    UnknownTemplateOperation,
    SpecializationNotRequested,
    DuplicateWrapper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticDescriptor {
    pub id: DiagnosticId,
    pub code: &'static str,
    pub severity: Severity,
    /// Message with positional `{0}`, `{1}`, ... placeholders.
    pub template: &'static str,
}

const fn entry(
    id: DiagnosticId,
    code: &'static str,
    severity: Severity,
    template: &'static str,
) -> DiagnosticDescriptor {
    DiagnosticDescriptor {
        id,
        code,
        severity,
        template,
    }
}

use DiagnosticId as D;
use Severity::{Error, Warning};

#[rustfmt::skip]
pub static REGISTRY: [DiagnosticDescriptor; DiagnosticId::COUNT] = [
    entry(D::MissingPartitionKey, "KVS001", Error,
        "entity '{0}' has no #[partition_key] property"),
    entry(D::DuplicatePartitionKey, "KVS002", Error,
        "entity '{0}' marks more than one property as partition key: {1}"),
    entry(D::DuplicateSortKey, "KVS003", Error,
        "entity '{0}' marks more than one property as sort key: {1}"),
    entry(D::MissingKeyAttributeName, "KVS004", Error,
        "key property '{0}.{1}' must declare its wire name with #[attribute(\"...\")]"),
    entry(D::NotExtensible, "KVS005", Error,
        "'{0}' cannot be extended with generated members: {1}"),
    entry(D::UnsupportedPropertyType, "KVS006", Error,
        "property '{0}.{1}' has unsupported type '{2}': {3}"),
    entry(D::CollectionKey, "KVS007", Error,
        "key property '{0}.{1}' must be a string, number or binary scalar, found '{2}'"),
    entry(D::NullableKey, "KVS008", Error,
        "key property '{0}.{1}' cannot be optional"),
    entry(D::NestedNotAnalyzable, "KVS009", Error,
        "property '{0}.{1}' refers to '{2}', which is not an analyzable entity"),
    entry(D::ReservedAttributeName, "KVS010", Warning,
        "wire attribute name '{1}' of '{0}' is a reserved word of the store; it will be used as declared"),
    entry(D::RelationWithoutSortKey, "KVS011", Warning,
        "entity '{0}' declares related records but has no sort key to match them by"),
    entry(D::AmbiguousRelationPatterns, "KVS012", Warning,
        "entity '{0}': record patterns '{1}' and '{2}' overlap"),
    entry(D::KeyOnEmbeddedType, "KVS013", Error,
        "'{0}' has no #[table] binding and cannot declare {1}"),
    entry(D::InvalidAttribute, "KVS014", Error,
        "invalid attribute on '{0}': {1}"),
    entry(D::DuplicateAttributeName, "KVS015", Error,
        "entity '{0}' maps more than one property to wire attribute '{1}'"),
    entry(D::DuplicateDeclaration, "KVS016", Error,
        "'{0}' is declared more than once (also at {1})"),
    entry(D::InvalidKeyFormat, "KVS017", Error,
        "key format of '{0}.{1}' is invalid: {2}"),
    entry(D::InvalidTtl, "KVS018", Error,
        "#[ttl] property '{0}.{1}' must be a datetime or an integer, found '{2}'"),
    entry(D::InvalidEncryptedType, "KVS019", Error,
        "#[encrypted] property '{0}.{1}' must be a string or binary value, found '{2}'"),
    entry(D::InvalidRelationType, "KVS020", Error,
        "related property '{0}.{1}' must be Vec<T> or Option<T> of an entity, found '{2}'"),
    entry(D::SourceParseFailed, "KVS021", Error,
        "failed to parse '{0}': {1}"),
    entry(D::ProjectionSourceNotFound, "KVP001", Error,
        "projection '{0}' refers to unknown source entity '{1}'"),
    entry(D::ProjectionPropertyMissing, "KVP002", Error,
        "projection '{0}' includes '{1}', which does not exist on '{2}'"),
    entry(D::ProjectionTypeMismatch, "KVP003", Error,
        "projection '{0}' declares '{1}' as '{2}' but the source declares '{3}'"),
    entry(D::ProjectionCoversSource, "KVP004", Warning,
        "projection '{0}' includes every property of '{1}'"),
    entry(D::IndexMissingPartitionKey, "KVP005", Error,
        "index '{1}' on '{0}' has no partition key"),
    entry(D::IndexKeyConflict, "KVP006", Error,
        "index '{0}' on table '{1}': {2} and {3} declare different key attributes"),
    entry(D::IndexProjectionConflict, "KVP007", Error,
        "index '{0}' on table '{1}': {2} and {3} declare different projections"),
    entry(D::IndexProjectionUnknownProperty, "KVP008", Error,
        "index '{1}' on '{0}' projects unknown property '{2}'"),
    entry(D::ConflictingDiscriminators, "KVP009", Error,
        "table '{0}': discriminators of '{1}' and '{2}' overlap"),
    entry(D::MultipleDefaultEntities, "KVP010", Error,
        "table '{0}' has more than one default entity: {1}"),
    entry(D::NoDefaultEntity, "KVP011", Warning,
        "table '{0}' is shared by several entities but none is marked default_entity; using '{1}'"),
    entry(D::DuplicateIndexKeyRole, "KVP012", Error,
        "entity '{0}' declares more than one {2} key for index '{1}'"),
    entry(D::IndexAccessorCollision, "KVP013", Error,
        "indexes '{0}' and '{1}' of table '{2}' would share the accessor '{3}'"),
    entry(D::UnclassifiableTemplate, "KVW001", Error,
        "template operation '{0}' matches no specialization shape: {1}"),
    entry(D::MissingCapability, "KVW002", Error,
        "builder '{1}' cannot forward '{0}': missing capability {2}"),
    entry(D::UnknownBuilderEntity, "KVW003", Error,
        "builder '{0}' is bound to '{1}', which is not a table entity"),
    entry(D::UnknownTemplateOperation, "KVW004", Error,
        "builder '{0}' lists unknown template operation '{1}'"),
    entry(D::SpecializationNotRequested, "KVW005", Error,
        "template operation '{0}' is marked specialize = false but its shape needs {1} binding"),
    entry(D::DuplicateWrapper, "KVW006", Error,
        "builder '{0}' would receive two wrappers named '{1}'"),
];

impl DiagnosticId {
    pub fn descriptor(self) -> &'static DiagnosticDescriptor {
        &REGISTRY[self as usize]
    }

    pub fn code(self) -> &'static str {
        self.descriptor().code
    }

    pub fn severity(self) -> Severity {
        self.descriptor().severity
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Find a descriptor by its stable code, e.g. `"KVS001"`.
pub fn lookup(code: &str) -> Option<&'static DiagnosticDescriptor> {
    REGISTRY.iter().find(|d| d.code == code)
}

/// Substitute `{n}` placeholders. Missing arguments render as `?`.
pub fn render(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if after[..close].chars().all(|c| c.is_ascii_digit()) && close > 0 => {
                let index: usize = after[..close].parse().unwrap_or(usize::MAX);
                out.push_str(args.get(index).map(String::as_str).unwrap_or("?"));
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Number of distinct positional arguments a template expects.
pub fn arity(template: &str) -> usize {
    let mut highest = None;
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        if let Some(close) = after.find('}')
            && let Ok(index) = after[..close].parse::<usize>()
        {
            highest = highest.max(Some(index));
        }
        rest = after;
    }
    highest.map_or(0, |h| h + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn table_order_matches_enum() {
        for id in DiagnosticId::iter() {
            assert_eq!(id.descriptor().id, id, "{id:?} is out of place");
        }
    }

    #[test]
    fn codes_are_unique_and_namespaced() {
        let mut seen = HashSet::new();
        for descriptor in REGISTRY.iter() {
            assert!(seen.insert(descriptor.code), "{} reused", descriptor.code);
            assert!(
                ["KVS", "KVP", "KVW"]
                    .iter()
                    .any(|ns| descriptor.code.starts_with(ns)),
                "{} has no namespace",
                descriptor.code
            );
        }
    }

    #[test]
    fn namespaces_follow_declaration_groups() {
        assert!(DiagnosticId::SourceParseFailed.code().starts_with("KVS"));
        assert!(DiagnosticId::ProjectionSourceNotFound.code().starts_with("KVP"));
        assert!(DiagnosticId::DuplicateIndexKeyRole.code().starts_with("KVP"));
        assert_eq!(DiagnosticId::IndexAccessorCollision.code(), "KVP013");
        assert!(DiagnosticId::UnclassifiableTemplate.code().starts_with("KVW"));
    }

    #[test]
    fn render_substitutes_positionally() {
        let rendered = render("{1} before {0}, {{ kept", &["a".into(), "b".into()]);
        assert_eq!(rendered, "b before a, {{ kept");
        assert_eq!(render("{0} and {3}", &["x".into()]), "x and ?");
        assert_eq!(arity(DiagnosticId::ProjectionTypeMismatch.descriptor().template), 4);
    }

    #[test]
    fn lookup_by_code() {
        assert_eq!(
            lookup("KVS010").map(|d| d.id),
            Some(DiagnosticId::ReservedAttributeName)
        );
        assert_eq!(lookup("KVS999"), None);
        assert_eq!(
            DiagnosticId::ReservedAttributeName.severity(),
            Severity::Warning
        );
    }
}
