//! Semantic analysis of scanned declarations.

pub mod entity;
pub mod index;
pub mod projection;
pub mod reserved;

use std::collections::{BTreeMap, BTreeSet, HashMap};

pub use entity::analyze_entity;
pub use index::{IndexDescriptorModel, IndexKeyModel, TableModel, aggregate_tables, check_tables};
pub use projection::analyze_projection;

use crate::diagnostics::{DiagnosticId, Diagnostics, Location};
use crate::model::EntityModel;
use crate::scan::{ScanOutput, TypeDeclaration};

/// Whether two record patterns can match the same value. A trailing `*` is
/// a prefix wildcard.
pub fn patterns_overlap(a: &str, b: &str) -> bool {
    match (a.strip_suffix('*'), b.strip_suffix('*')) {
        (Some(pa), Some(pb)) => pa.starts_with(pb) || pb.starts_with(pa),
        (Some(pa), None) => b.starts_with(pa),
        (None, Some(pb)) => a.starts_with(pb),
        (None, None) => a == b,
    }
}

/// Declarations that survive the duplicate-name check.
pub struct UniqueDeclarations<'a> {
    pub entities: Vec<&'a TypeDeclaration>,
    pub projections: Vec<&'a TypeDeclaration>,
}

/// Entities and projections share one namespace of simple names; the first
/// declaration of a name wins.
pub fn unique_declarations<'a>(scan: &'a ScanOutput, diagnostics: &mut Diagnostics) -> UniqueDeclarations<'a> {
    let mut seen: HashMap<&str, &Location> = HashMap::new();
    let mut keep = |declaration: &'a TypeDeclaration, diagnostics: &mut Diagnostics| match seen
        .get(declaration.name.as_str())
    {
        // A type deriving both Entity and Projection is one declaration.
        Some(first) if **first == declaration.location => true,
        Some(first) => {
            let other = first.to_string();
            diagnostics.report(
                DiagnosticId::DuplicateDeclaration,
                [declaration.name.as_str(), other.as_str()],
                &declaration.location,
            );
            false
        }
        None => {
            seen.insert(&declaration.name, &declaration.location);
            true
        }
    };

    let entities = scan
        .entities
        .iter()
        .filter(|d| keep(*d, diagnostics))
        .collect();
    let projections = scan
        .projections
        .iter()
        .filter(|d| keep(*d, diagnostics))
        .collect();
    UniqueDeclarations {
        entities,
        projections,
    }
}

/// Reject entities whose nested properties or relations name a type with no
/// analysed model. Rejection propagates to entities that refer to a rejected
/// one.
pub fn check_references(entities: &BTreeMap<String, EntityModel>) -> (BTreeSet<String>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let mut rejected: BTreeSet<String> = BTreeSet::new();

    loop {
        let mut changed = false;
        for model in entities.values() {
            if rejected.contains(&model.name) {
                continue;
            }
            let available = |target: &str| entities.contains_key(target) && !rejected.contains(target);

            let mut missing: Vec<(String, String, Location)> = Vec::new();
            for property in &model.properties {
                for target in property.ty.nested_names() {
                    if !available(target) {
                        missing.push((property.name.clone(), target.to_string(), property.location.clone()));
                    }
                }
            }
            for relation in &model.relations {
                if !available(&relation.target) {
                    missing.push((relation.field.clone(), relation.target.clone(), relation.location.clone()));
                }
            }

            if missing.is_empty() {
                continue;
            }
            for (field, target, location) in missing {
                diagnostics.report(
                    DiagnosticId::NestedNotAnalyzable,
                    [model.name.clone(), field, target],
                    &location,
                );
            }
            rejected.insert(model.name.clone());
            changed = true;
        }
        if !changed {
            break;
        }
    }

    (rejected, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_overlap_rules() {
        assert!(patterns_overlap("LINE#*", "LINE#1"));
        assert!(patterns_overlap("LINE#*", "LINE#A*"));
        assert!(patterns_overlap("A", "A"));
        assert!(!patterns_overlap("LINE#*", "PAYMENT#*"));
        assert!(!patterns_overlap("ORDER", "ORDERS"));
        assert!(patterns_overlap("ORDER*", "ORDERS"));
    }
}
