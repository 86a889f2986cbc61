//! Projection analysis: resolves a projection against its source entity.

use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use super::entity::extensibility_problem;
use crate::diagnostics::{Analysis, DiagnosticId, Diagnostics};
use crate::model::types::{option_inner, type_string};
use crate::model::{DiscriminatorModel, EntityModel, ProjectionModel, TypeKind, TypeNode};
use crate::scan::TypeDeclaration;

/// Analyse one projection declaration against the analysed entities.
///
/// Projected properties keep the source's wire shape; a projection may only
/// widen `T` to `Option<T>`.
///
/// `declared` holds the names of every declared entity, analysed or not, so
/// a projection over an entity that failed analysis is not reported twice.
pub fn analyze_projection(
    declaration: &TypeDeclaration,
    entities: &BTreeMap<String, EntityModel>,
    declared: &BTreeSet<String>,
) -> Analysis<ProjectionModel> {
    trace!("analysing projection {}", declaration.name);
    let mut diagnostics = Diagnostics::new();
    let name = declaration.name.as_str();

    if let Some(problem) = extensibility_problem(declaration) {
        diagnostics.report(DiagnosticId::NotExtensible, [name, problem], &declaration.location);
        return Analysis::failed(diagnostics);
    }

    let Some(source_path) = &declaration.attrs.projection_source else {
        diagnostics.report(
            DiagnosticId::InvalidAttribute,
            [name, "missing #[projection(source = Entity)]"],
            &declaration.location,
        );
        return Analysis::failed(diagnostics);
    };
    let source_name = source_path
        .segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_default();

    let source = match entities.get(&source_name) {
        Some(source) if source.is_table_entity() => source,
        // Declared but failed its own analysis; already reported.
        None if declared.contains(&source_name) => return Analysis::failed(diagnostics),
        _ => {
            diagnostics.report(
                DiagnosticId::ProjectionSourceNotFound,
                [name, source_name.as_str()],
                &declaration.location,
            );
            return Analysis::failed(diagnostics);
        }
    };

    let mut properties = Vec::new();
    for field in &declaration.fields {
        let Some(original) = source.property(&field.name) else {
            diagnostics.report(
                DiagnosticId::ProjectionPropertyMissing,
                [name, field.name.as_str(), source.name.as_str()],
                &field.location,
            );
            continue;
        };

        let declared_ty = type_string(&field.ty);
        let source_ty = original.ty.display();
        let widened = option_inner(&field.ty).is_some_and(|inner| type_string(inner) == source_ty)
            && !original.nullable;
        if declared_ty != source_ty && !widened {
            diagnostics.report(
                DiagnosticId::ProjectionTypeMismatch,
                [name, field.name.as_str(), declared_ty.as_str(), source_ty.as_str()],
                &field.location,
            );
            continue;
        }
        let mut property = original.clone();
        if widened {
            property.ty = TypeNode {
                kind: TypeKind::Optional(Box::new(original.ty.clone())),
                ty: field.ty.clone(),
            };
            property.nullable = true;
        }
        property.location = field.location.clone();
        properties.push(property);
    }

    if !properties.is_empty() && properties.len() == source.properties.len() {
        diagnostics.report(
            DiagnosticId::ProjectionCoversSource,
            [name, source.name.as_str()],
            &declaration.location,
        );
    }

    let discriminator = source.discriminator.as_ref().map(|d| DiscriminatorModel {
        attribute: d.attribute.clone(),
        value: d.value.clone(),
        property: properties.iter().position(|p| p.attribute == d.attribute),
    });

    let mut attributes: Vec<String> = properties.iter().map(|p| p.attribute.clone()).collect();
    attributes.extend(discriminator.as_ref().map(|d| d.attribute.clone()));
    attributes.sort();
    attributes.dedup();

    let model = ProjectionModel {
        name: declaration.name.clone(),
        module_path: declaration.module_path.clone(),
        location: declaration.location.clone(),
        source: source.name.clone(),
        source_module_path: source.module_path.clone(),
        properties,
        discriminator,
        attributes,
    };
    Analysis::from_parts(model, diagnostics)
}
