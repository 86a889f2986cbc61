//! Per-table aggregation of secondary indexes and table-level checks.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::patterns_overlap;
use crate::diagnostics::{DiagnosticId, Diagnostics};
use crate::generate::naming::index_accessor;
use crate::model::{
    EntityModel, IndexBinding, IndexKeyBinding, IndexProjectionModel, KeyFormat, ProjectionModel,
    ScalarKind,
};

#[derive(Debug, Clone, PartialEq)]
pub struct IndexKeyModel {
    pub attribute: String,
    /// Wire category; formatted keys are strings.
    pub kind: ScalarKind,
    pub format: KeyFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDescriptorModel {
    pub name: String,
    pub table: String,
    /// Declaring entities, in declaration order.
    pub entities: Vec<String>,
    pub partition_key: IndexKeyModel,
    pub sort_key: Option<IndexKeyModel>,
    /// `All`, `KeysOnly` or resolved `Attributes`.
    pub projection: IndexProjectionModel,
    pub projection_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableModel {
    pub name: String,
    pub entities: Vec<String>,
    pub default_entity: Option<String>,
    pub indexes: BTreeMap<String, IndexDescriptorModel>,
    /// Set when a table-level error makes the table unit unusable.
    pub blocked: bool,
}

fn key_model(entity: &EntityModel, binding: &IndexKeyBinding) -> IndexKeyModel {
    let property = &entity.properties[binding.property];
    let kind = if binding.format.prefix.is_some() {
        ScalarKind::String
    } else {
        property
            .ty
            .non_optional()
            .key_scalar()
            .unwrap_or(ScalarKind::String)
    };
    IndexKeyModel {
        attribute: property.attribute.clone(),
        kind,
        format: binding.format.clone(),
    }
}

fn keys_align(a: &IndexKeyModel, b: &IndexKeyModel) -> bool {
    a.attribute == b.attribute && a.kind == b.kind && a.format.stored_form() == b.format.stored_form()
}

/// Resolve a binding's projection; `Type` projections take the projection
/// model's attribute list.
fn resolve_projection(
    entity: &EntityModel,
    binding: &IndexBinding,
    projections: &BTreeMap<String, ProjectionModel>,
    diagnostics: &mut Diagnostics,
) -> Option<(IndexProjectionModel, Option<String>)> {
    match &binding.projection {
        IndexProjectionModel::Type(name) => match projections.get(name) {
            Some(projection) => Some((
                IndexProjectionModel::Attributes(projection.attributes.clone()),
                Some(name.clone()),
            )),
            None => {
                diagnostics.report(
                    DiagnosticId::IndexProjectionUnknownProperty,
                    [entity.name.as_str(), binding.name.as_str(), name.as_str()],
                    &binding.location,
                );
                None
            }
        },
        other => Some((other.clone(), None)),
    }
}

fn is_specified(projection: &IndexProjectionModel) -> bool {
    !matches!(projection, IndexProjectionModel::All)
}

/// Group table entities by table and merge their index declarations.
pub fn aggregate_tables(
    entities: &[EntityModel],
    projections: &BTreeMap<String, ProjectionModel>,
) -> (BTreeMap<String, TableModel>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let mut tables: BTreeMap<String, TableModel> = BTreeMap::new();
    let mut conflicted: BTreeSet<(String, String)> = BTreeSet::new();

    for entity in entities {
        let Some(table_name) = entity.table_name() else {
            continue;
        };
        let table = tables
            .entry(table_name.to_string())
            .or_insert_with(|| TableModel {
                name: table_name.to_string(),
                entities: Vec::new(),
                default_entity: None,
                indexes: BTreeMap::new(),
                blocked: false,
            });
        table.entities.push(entity.name.clone());

        for binding in &entity.indexes {
            let marker = (table_name.to_string(), binding.name.clone());
            if conflicted.contains(&marker) {
                continue;
            }
            let Some((projection, projection_type)) =
                resolve_projection(entity, binding, projections, &mut diagnostics)
            else {
                continue;
            };
            let partition_key = key_model(entity, &binding.partition_key);
            let sort_key = binding.sort_key.as_ref().map(|k| key_model(entity, k));

            let Some(existing) = table.indexes.get_mut(&binding.name) else {
                let accessor = index_accessor(&binding.name);
                if let Some(other) = table.indexes.keys().find(|name| index_accessor(name) == accessor) {
                    diagnostics.report(
                        DiagnosticId::IndexAccessorCollision,
                        [other.as_str(), binding.name.as_str(), table_name, accessor.as_str()],
                        &binding.location,
                    );
                    conflicted.insert(marker);
                    continue;
                }
                table.indexes.insert(
                    binding.name.clone(),
                    IndexDescriptorModel {
                        name: binding.name.clone(),
                        table: table_name.to_string(),
                        entities: vec![entity.name.clone()],
                        partition_key,
                        sort_key,
                        projection,
                        projection_type,
                    },
                );
                continue;
            };

            let first = existing.entities.first().cloned().unwrap_or_default();
            let sort_aligned = match (&existing.sort_key, &sort_key) {
                (Some(a), Some(b)) => keys_align(a, b),
                (None, None) => true,
                _ => false,
            };
            let conflict = if !keys_align(&existing.partition_key, &partition_key) || !sort_aligned {
                Some(DiagnosticId::IndexKeyConflict)
            } else if (is_specified(&existing.projection) || is_specified(&projection))
                && existing.projection != projection
            {
                Some(DiagnosticId::IndexProjectionConflict)
            } else {
                None
            };

            match conflict {
                Some(id) => {
                    diagnostics.report(
                        id,
                        [
                            binding.name.as_str(),
                            table_name,
                            first.as_str(),
                            entity.name.as_str(),
                        ],
                        &binding.location,
                    );
                    table.indexes.remove(&binding.name);
                    conflicted.insert(marker);
                }
                None => {
                    existing.entities.push(entity.name.clone());
                    if existing.projection_type.is_none() {
                        existing.projection_type = projection_type;
                    }
                }
            }
        }
    }

    debug!(
        "aggregated {} tables with {} indexes",
        tables.len(),
        tables.values().map(|t| t.indexes.len()).sum::<usize>()
    );
    (tables, diagnostics)
}

/// Default-entity and discriminator checks for every table.
pub fn check_tables(
    tables: &mut BTreeMap<String, TableModel>,
    entities: &BTreeMap<String, EntityModel>,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    for table in tables.values_mut() {
        let members: Vec<&EntityModel> = table
            .entities
            .iter()
            .filter_map(|name| entities.get(name))
            .collect();
        let Some(first) = members.first() else {
            continue;
        };

        let defaults: Vec<&EntityModel> = members
            .iter()
            .copied()
            .filter(|e| e.table.as_ref().is_some_and(|t| t.default_entity))
            .collect();
        match defaults.as_slice() {
            [] if members.len() > 1 => {
                diagnostics.report(
                    DiagnosticId::NoDefaultEntity,
                    [table.name.as_str(), first.name.as_str()],
                    &first.location,
                );
                table.default_entity = Some(first.name.clone());
            }
            [] => table.default_entity = Some(first.name.clone()),
            [only] => table.default_entity = Some(only.name.clone()),
            many => {
                let names = many
                    .iter()
                    .map(|e| e.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                diagnostics.report(
                    DiagnosticId::MultipleDefaultEntities,
                    [table.name.as_str(), names.as_str()],
                    &many[1].location,
                );
                table.blocked = true;
            }
        }

        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                let (Some(da), Some(db)) = (&a.discriminator, &b.discriminator) else {
                    continue;
                };
                if da.attribute == db.attribute && patterns_overlap(&da.value, &db.value) {
                    diagnostics.report(
                        DiagnosticId::ConflictingDiscriminators,
                        [table.name.as_str(), a.name.as_str(), b.name.as_str()],
                        &b.location,
                    );
                    table.blocked = true;
                }
            }
        }
    }

    diagnostics
}
