//! Entity analysis: turns a [`TypeDeclaration`] into an [`EntityModel`].

use std::collections::{BTreeMap, HashMap};

use log::trace;

use super::patterns_overlap;
use super::reserved::is_reserved;
use crate::diagnostics::{Analysis, DiagnosticId, Diagnostics, Location};
use crate::generate::naming::index_accessor;
use crate::model::types::{option_inner, type_string};
use crate::model::{
    DiscriminatorModel, EntityModel, IndexBinding, IndexKeyBinding, IndexProjectionModel,
    KeyFormat, KeyRole, OperationSet, PropertyModel, Relation, ScalarKind, TableBinding, TypeKind,
    TypeNode, TypeResolver,
};
use crate::scan::attributes::{IndexProjectionDecl, KeyAttr};
use crate::scan::{FieldDeclaration, Shape, TypeDeclaration};

pub const DEFAULT_SEPARATOR: &str = "#";

struct EntityAnalyzer<'a> {
    declaration: &'a TypeDeclaration,
    resolver: &'a TypeResolver<'a>,
    diagnostics: Diagnostics,
}

/// Analyse one entity declaration.
pub fn analyze_entity(declaration: &TypeDeclaration, resolver: &TypeResolver<'_>) -> Analysis<EntityModel> {
    trace!("analysing entity {}", declaration.name);
    let mut analyzer = EntityAnalyzer {
        declaration,
        resolver,
        diagnostics: Diagnostics::new(),
    };
    match analyzer.run() {
        Some(model) => Analysis::from_parts(model, analyzer.diagnostics),
        None => Analysis::failed(analyzer.diagnostics),
    }
}

/// Reason a declaration cannot receive generated members, if any.
pub fn extensibility_problem(declaration: &TypeDeclaration) -> Option<&'static str> {
    match declaration.shape {
        Shape::Enum => Some("enums are not supported"),
        Shape::Union => Some("unions are not supported"),
        Shape::Tuple => Some("tuple structs are not supported"),
        Shape::Unit => Some("unit structs have no properties"),
        Shape::Named if declaration.generic => Some("generic types are not supported"),
        Shape::Named => None,
    }
}

fn operations_for(node: &TypeNode, role: Option<KeyRole>) -> OperationSet {
    match role {
        Some(KeyRole::Partition) => return OperationSet::PartitionKey,
        Some(KeyRole::Sort) => return OperationSet::SortKey,
        None => {}
    }
    match &node.non_optional().kind {
        TypeKind::Scalar(ScalarKind::String) => OperationSet::String,
        TypeKind::Scalar(_) | TypeKind::DateTime { .. } => OperationSet::Scalar,
        TypeKind::Set { .. } => OperationSet::Set,
        _ => OperationSet::Presence,
    }
}

impl<'a> EntityAnalyzer<'a> {
    fn report<I, S>(&mut self, id: DiagnosticId, args: I, location: &Location)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.diagnostics.report(id, args, location);
    }

    fn name(&self) -> &'a str {
        &self.declaration.name
    }

    fn run(&mut self) -> Option<EntityModel> {
        let declaration = self.declaration;
        if let Some(problem) = extensibility_problem(declaration) {
            self.report(
                DiagnosticId::NotExtensible,
                [declaration.name.as_str(), problem],
                &declaration.location,
            );
            return None;
        }

        let table = declaration.attrs.table.as_ref().map(|t| TableBinding {
            name: t.name.clone(),
            default_entity: t.default_entity,
        });
        if table.is_none() {
            self.check_embedded();
        }

        let mut properties = Vec::new();
        let mut relations = Vec::new();
        let mut skipped = Vec::new();
        for field in &declaration.fields {
            if field.attrs.skip {
                skipped.push(field.name.clone());
            } else if let Some(pattern) = &field.attrs.related {
                relations.extend(self.relation(field, pattern));
            } else if let Some(property) = self.property(field) {
                properties.push(property);
            }
        }

        self.check_wire_names(&properties);

        let mut model = EntityModel {
            name: declaration.name.clone(),
            module_path: declaration.module_path.clone(),
            location: declaration.location.clone(),
            table,
            properties,
            partition_key: None,
            sort_key: None,
            indexes: Vec::new(),
            discriminator: None,
            relations,
            skipped,
        };

        if model.is_table_entity() {
            self.assign_keys(&mut model);
            self.assign_discriminator(&mut model);
            self.assign_indexes(&mut model);
            self.check_relations(&model);
        }
        Some(model)
    }

    fn check_embedded(&mut self) {
        let declaration = self.declaration;
        let name = declaration.name.as_str();
        if !declaration.attrs.secondary_indexes.is_empty() {
            self.report(DiagnosticId::KeyOnEmbeddedType, [name, "secondary indexes"], &declaration.location);
        }
        for field in &declaration.fields {
            let what = if field.attrs.has_key_marker() {
                "key properties"
            } else if field.attrs.has_index_marker() {
                "index keys"
            } else if field.attrs.related.is_some() {
                "related records"
            } else {
                continue;
            };
            self.report(DiagnosticId::KeyOnEmbeddedType, [name, what], &field.location);
        }
    }

    fn relation(&mut self, field: &FieldDeclaration, pattern: &str) -> Option<Relation> {
        let element = match option_inner(&field.ty) {
            Some(inner) => Some((inner, false)),
            None => vec_inner(&field.ty).map(|inner| (inner, true)),
        };
        let target = element.and_then(|(ty, many)| match ty {
            syn::Type::Path(p) if p.qself.is_none() && p.path.segments.iter().all(|s| s.arguments.is_none()) => {
                p.path.segments.last().map(|s| (ty, s.ident.to_string(), many))
            }
            _ => None,
        });
        let Some((element, target, many)) = target else {
            let ty = type_string(&field.ty);
            self.report(
                DiagnosticId::InvalidRelationType,
                [self.name(), field.name.as_str(), ty.as_str()],
                &field.location,
            );
            return None;
        };
        Some(Relation {
            field: field.name.clone(),
            pattern: pattern.to_string(),
            target,
            element: element.clone(),
            many,
            location: field.location.clone(),
        })
    }

    fn property(&mut self, field: &FieldDeclaration) -> Option<PropertyModel> {
        let attrs = &field.attrs;
        let mut ty = match self.resolver.resolve_field(&field.ty, attrs.converter.as_ref()) {
            Ok(node) => node,
            Err(reason) => {
                let declared = type_string(&field.ty);
                self.report(
                    DiagnosticId::UnsupportedPropertyType,
                    [self.name(), field.name.as_str(), declared.as_str(), reason.as_str()],
                    &field.location,
                );
                return None;
            }
        };

        if attrs.ttl {
            if ty.non_optional().is_datetime() {
                ty.mark_ttl();
            } else if !ty.non_optional().is_integer() {
                let declared = ty.display();
                self.report(
                    DiagnosticId::InvalidTtl,
                    [self.name(), field.name.as_str(), declared.as_str()],
                    &field.location,
                );
            }
        }

        if attrs.encrypted
            && !matches!(
                ty.non_optional().scalar(),
                Some(ScalarKind::String | ScalarKind::Binary)
            )
        {
            let declared = ty.display();
            self.report(
                DiagnosticId::InvalidEncryptedType,
                [self.name(), field.name.as_str(), declared.as_str()],
                &field.location,
            );
        }

        let attribute = attrs.attribute.clone().unwrap_or_else(|| field.name.clone());
        if is_reserved(&attribute) {
            self.report(
                DiagnosticId::ReservedAttributeName,
                [self.name(), attribute.as_str()],
                &field.location,
            );
        }

        let key_role = match (&attrs.partition_key, &attrs.sort_key) {
            (Some(_), Some(_)) => {
                self.report(
                    DiagnosticId::InvalidKeyFormat,
                    [self.name(), field.name.as_str(), "a property cannot be both partition and sort key"],
                    &field.location,
                );
                None
            }
            (Some(_), None) => Some(KeyRole::Partition),
            (None, Some(_)) => Some(KeyRole::Sort),
            (None, None) => None,
        };

        Some(PropertyModel {
            name: field.name.clone(),
            attribute,
            nullable: ty.is_optional(),
            operations: operations_for(&ty, key_role),
            ty,
            key_role,
            key_format: None,
            indexes: Vec::new(),
            ttl: attrs.ttl,
            sensitive: attrs.sensitive,
            encrypted: attrs.encrypted,
            location: field.location.clone(),
        })
    }

    fn check_wire_names(&mut self, properties: &[PropertyModel]) {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for property in properties {
            if seen.insert(&property.attribute, &property.name).is_some() {
                self.report(
                    DiagnosticId::DuplicateAttributeName,
                    [self.name(), property.attribute.as_str()],
                    &property.location,
                );
            }
        }
    }

    /// Validate a declared key format. Returns `None` if it is unusable.
    fn key_format(&mut self, property: &PropertyModel, attr: &KeyAttr) -> Option<KeyFormat> {
        let mut problem = None;
        if attr.prefix.as_deref() == Some("") {
            problem = Some("prefix cannot be empty");
        } else if attr.separator.as_deref() == Some("") {
            problem = Some("separator cannot be empty");
        } else if attr.prefix.is_some() && property.ty.non_optional().scalar() == Some(ScalarKind::Binary) {
            problem = Some("binary keys cannot carry a prefix");
        } else if attr.separator.is_some() && attr.prefix.is_none() {
            problem = Some("a separator needs a prefix");
        }
        if let Some(problem) = problem {
            self.report(
                DiagnosticId::InvalidKeyFormat,
                [self.name(), property.name.as_str(), problem],
                &property.location,
            );
            return None;
        }
        Some(KeyFormat {
            prefix: attr.prefix.clone(),
            separator: attr
                .separator
                .clone()
                .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
        })
    }

    /// Key attributes must name a string, number or binary scalar.
    fn check_key_type(&mut self, property: &PropertyModel, allow_optional: bool) -> bool {
        let name = self.declaration.name.clone();
        if !allow_optional && property.nullable {
            self.report(
                DiagnosticId::NullableKey,
                [name.as_str(), property.name.as_str()],
                &property.location,
            );
            return false;
        }
        if property.ty.non_optional().key_scalar().is_none() {
            let declared = property.ty.display();
            self.report(
                DiagnosticId::CollectionKey,
                [name.as_str(), property.name.as_str(), declared.as_str()],
                &property.location,
            );
            return false;
        }
        true
    }

    fn assign_keys(&mut self, model: &mut EntityModel) {
        let declaration = self.declaration;
        let roles = |role: KeyRole| -> Vec<usize> {
            model
                .properties
                .iter()
                .enumerate()
                .filter(|(_, p)| p.key_role == Some(role))
                .map(|(i, _)| i)
                .collect()
        };
        let partition = roles(KeyRole::Partition);
        let sort = roles(KeyRole::Sort);
        let joined = |indices: &[usize]| {
            indices
                .iter()
                .map(|&i| model.properties[i].name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        match partition.as_slice() {
            [] => self.report(DiagnosticId::MissingPartitionKey, [self.name()], &declaration.location),
            [_] => {}
            many => {
                let names = joined(many);
                self.report(
                    DiagnosticId::DuplicatePartitionKey,
                    [self.name(), names.as_str()],
                    &declaration.location,
                );
            }
        }
        if sort.len() > 1 {
            let names = joined(&sort);
            self.report(
                DiagnosticId::DuplicateSortKey,
                [self.name(), names.as_str()],
                &declaration.location,
            );
        }

        for index in partition.iter().chain(&sort).copied() {
            let property = model.properties[index].clone();
            let Some(field) = declaration.field(&property.name) else {
                continue;
            };
            if field.attrs.attribute.is_none() {
                self.report(
                    DiagnosticId::MissingKeyAttributeName,
                    [self.name(), property.name.as_str()],
                    &property.location,
                );
            }
            if !self.check_key_type(&property, false) {
                continue;
            }
            let attr = match property.key_role {
                Some(KeyRole::Partition) => field.attrs.partition_key.as_ref(),
                _ => field.attrs.sort_key.as_ref(),
            };
            if let Some(attr) = attr {
                model.properties[index].key_format = self.key_format(&property, attr);
            }
        }

        model.partition_key = partition.first().copied();
        model.sort_key = sort.first().copied();
    }

    fn assign_discriminator(&mut self, model: &mut EntityModel) {
        let declaration = self.declaration;
        let Some(declared) = declaration
            .attrs
            .table
            .as_ref()
            .and_then(|t| t.discriminator.as_ref())
        else {
            return;
        };

        let property = model
            .properties
            .iter()
            .position(|p| p.attribute == declared.attribute);
        match property {
            Some(index) => {
                let holder = &model.properties[index];
                if holder.ty.scalar() != Some(ScalarKind::String) {
                    let message = format!(
                        "discriminator attribute '{}' is held by '{}', which must be a String",
                        declared.attribute, holder.name
                    );
                    self.report(
                        DiagnosticId::InvalidAttribute,
                        [self.name(), message.as_str()],
                        &holder.location,
                    );
                }
            }
            None if declared.value.ends_with('*') => {
                let message = format!(
                    "wildcard discriminator '{}' needs a property holding '{}'",
                    declared.value, declared.attribute
                );
                self.report(
                    DiagnosticId::InvalidAttribute,
                    [self.name(), message.as_str()],
                    &declaration.location,
                );
            }
            None => {}
        }

        model.discriminator = Some(DiscriminatorModel {
            attribute: declared.attribute.clone(),
            value: declared.value.clone(),
            property,
        });
    }

    fn assign_indexes(&mut self, model: &mut EntityModel) {
        let declaration = self.declaration;

        // Index name to (partition, sort) key bindings, in first-seen order.
        let mut keys: BTreeMap<String, (Option<IndexKeyBinding>, Option<IndexKeyBinding>)> =
            BTreeMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut failed: Vec<String> = Vec::new();

        for (index, property) in model.properties.clone().iter().enumerate() {
            let Some(field) = declaration.field(&property.name) else {
                continue;
            };
            let roles = field
                .attrs
                .index_partition_keys
                .iter()
                .map(|k| (k, "partition"))
                .chain(field.attrs.index_sort_keys.iter().map(|k| (k, "sort")));
            for (key, role) in roles {
                if !order.contains(&key.index) {
                    order.push(key.index.clone());
                }
                if !self.check_key_type(property, true) {
                    failed.push(key.index.clone());
                    continue;
                }
                let Some(format) = self.key_format(property, &key.format) else {
                    failed.push(key.index.clone());
                    continue;
                };
                // Index keys are stored in their declared format, so every
                // key role of one property must agree on it.
                let current = &model.properties[index];
                let decided = current.key_role.is_some() || !current.indexes.is_empty();
                let stored = current.key_format.as_ref().and_then(KeyFormat::stored_form);
                if decided && stored != format.stored_form() {
                    let problem = format!(
                        "index '{}' stores it in a different format than its other key roles",
                        key.index
                    );
                    self.report(
                        DiagnosticId::InvalidKeyFormat,
                        [self.name(), property.name.as_str(), problem.as_str()],
                        &property.location,
                    );
                    failed.push(key.index.clone());
                    continue;
                }
                if format.prefix.is_some() {
                    model.properties[index].key_format = Some(format.clone());
                }
                let slot = keys.entry(key.index.clone()).or_default();
                let target = if role == "partition" { &mut slot.0 } else { &mut slot.1 };
                if target.is_some() {
                    self.report(
                        DiagnosticId::DuplicateIndexKeyRole,
                        [self.name(), key.index.as_str(), role],
                        &property.location,
                    );
                    failed.push(key.index.clone());
                    continue;
                }
                *target = Some(IndexKeyBinding {
                    property: index,
                    format,
                });
                model.properties[index].indexes.push(key.index.clone());
            }
        }

        for declared in &declaration.attrs.secondary_indexes {
            if !order.contains(&declared.name) {
                order.push(declared.name.clone());
            }
        }

        for name in order {
            let declared = declaration
                .attrs
                .secondary_indexes
                .iter()
                .find(|d| d.name == name);
            let (partition, sort) = keys.remove(&name).unwrap_or_default();
            let Some(partition_key) = partition else {
                if !failed.contains(&name) {
                    self.report(
                        DiagnosticId::IndexMissingPartitionKey,
                        [self.name(), name.as_str()],
                        &declaration.location,
                    );
                }
                continue;
            };

            let projection = match declared.and_then(|d| d.projection.as_ref()) {
                None => IndexProjectionModel::All,
                Some(IndexProjectionDecl::KeysOnly) => IndexProjectionModel::KeysOnly,
                Some(IndexProjectionDecl::Type(path)) => IndexProjectionModel::Type(
                    path.segments
                        .last()
                        .map(|s| s.ident.to_string())
                        .unwrap_or_default(),
                ),
                Some(IndexProjectionDecl::Properties(names)) => {
                    let mut attributes = Vec::new();
                    for property_name in names {
                        match model.property(property_name) {
                            Some(property) => attributes.push(property.attribute.clone()),
                            None => self.report(
                                DiagnosticId::IndexProjectionUnknownProperty,
                                [self.name(), name.as_str(), property_name.as_str()],
                                &declaration.location,
                            ),
                        }
                    }
                    attributes.sort();
                    attributes.dedup();
                    IndexProjectionModel::Attributes(attributes)
                }
            };

            let accessor = index_accessor(&name);
            if let Some(other) = model.indexes.iter().find(|b| index_accessor(&b.name) == accessor) {
                let other = other.name.clone();
                let table = model.table_name().unwrap_or_default().to_string();
                self.report(
                    DiagnosticId::IndexAccessorCollision,
                    [other, name, table, accessor],
                    &declaration.location,
                );
                continue;
            }

            model.indexes.push(IndexBinding {
                name,
                partition_key,
                sort_key: sort,
                projection,
                location: declaration.location.clone(),
            });
        }
    }

    fn check_relations(&mut self, model: &EntityModel) {
        if model.relations.is_empty() {
            return;
        }
        if model.sort_key.is_none() {
            self.report(
                DiagnosticId::RelationWithoutSortKey,
                [self.name()],
                &model.location,
            );
        }

        let mut patterns: Vec<&str> = model.relations.iter().map(|r| r.pattern.as_str()).collect();
        let root = model.root_pattern();
        if let Some(root) = &root {
            patterns.insert(0, root);
        }
        for (i, first) in patterns.iter().enumerate() {
            for second in &patterns[i + 1..] {
                if patterns_overlap(first, second) {
                    self.report(
                        DiagnosticId::AmbiguousRelationPatterns,
                        [self.name(), *first, *second],
                        &model.location,
                    );
                }
            }
        }
    }
}

fn vec_inner(ty: &syn::Type) -> Option<&syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Vec" {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first()? {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
