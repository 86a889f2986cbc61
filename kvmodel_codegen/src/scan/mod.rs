//! Source scanning.
//!
//! Parses every source file with `syn` and collects the declarations the
//! rest of the pipeline works from: entities, projections, template
//! operations, entity-bound builders, trait impls and `use` items.

pub mod attributes;
pub mod declaration;

use std::collections::BTreeMap;

use log::trace;
use syn::ItemUse;
use syn::visit::Visit;

pub use declaration::{
    BuilderDeclaration, FieldDeclaration, ImplFact, Shape, SourceFile, TemplateDeclaration,
    TypeDeclaration, module_path_for,
};

use crate::diagnostics::{DiagnosticId, Diagnostics, Location};
use declaration::DeclarationVisitor;

#[derive(Debug, Default, Clone)]
pub struct ScanOutput {
    pub entities: Vec<TypeDeclaration>,
    pub projections: Vec<TypeDeclaration>,
    pub templates: Vec<TemplateDeclaration>,
    pub builders: Vec<BuilderDeclaration>,
    pub impls: Vec<ImplFact>,
    pub uses: BTreeMap<Vec<String>, Vec<ItemUse>>,
    pub modules: Vec<Vec<String>>,
    pub diagnostics: Diagnostics,
}

impl ScanOutput {
    /// Whether `segment` names a module directly under the crate root.
    pub fn is_root_module(&self, segment: &str) -> bool {
        self.modules
            .iter()
            .any(|m| m.len() == 1 && m[0] == segment)
    }

    pub fn uses_of(&self, module: &[String]) -> &[ItemUse] {
        self.uses.get(module).map_or(&[], Vec::as_slice)
    }

    /// Traits a type implements, by last path segment.
    pub fn implemented_traits(&self, type_name: &str) -> Vec<String> {
        self.impls
            .iter()
            .filter(|fact| fact.self_type == type_name)
            .map(|fact| fact.trait_name.clone())
            .collect()
    }
}

/// Parse and collect declarations from every source, in order.
pub fn scan(sources: &[SourceFile]) -> ScanOutput {
    let mut output = ScanOutput::default();

    for source in sources {
        let file = match syn::parse_file(&source.content) {
            Ok(file) => file,
            Err(e) => {
                let location = Location::from_span(source.path.as_deref(), e.span());
                output.diagnostics.report(
                    DiagnosticId::SourceParseFailed,
                    [source.display_name(), e.to_string()],
                    &location,
                );
                continue;
            }
        };

        let mut visitor = DeclarationVisitor::new(source.path.as_deref(), source.module_path.clone());
        visitor.visit_file(&file);
        let found = visitor.found;
        trace!(
            "scanned {}: {} entities, {} projections, {} templates, {} builders",
            source.display_name(),
            found.entities.len(),
            found.projections.len(),
            found.templates.len(),
            found.builders.len()
        );

        for declaration in found.entities.iter().chain(&found.projections) {
            for (message, location) in &declaration.attribute_errors {
                output.diagnostics.report(
                    DiagnosticId::InvalidAttribute,
                    [declaration.name.clone(), message.clone()],
                    location,
                );
            }
        }
        for (name, message, location) in found.attribute_errors {
            output
                .diagnostics
                .report(DiagnosticId::InvalidAttribute, [name, message], &location);
        }

        output.entities.extend(found.entities);
        output.projections.extend(found.projections);
        output.templates.extend(found.templates);
        output.builders.extend(found.builders);
        output.impls.extend(found.impls);
        for (module, uses) in found.uses {
            output.uses.entry(module).or_default().extend(uses);
        }
        for module in found.modules {
            if !output.modules.contains(&module) {
                output.modules.push(module);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn collects_declarations_by_module() {
        let source = SourceFile::inline(
            &["models"],
            r#"
            use std::collections::BTreeMap;

            #[derive(Debug, Entity)]
            #[table(name = "commerce")]
            pub struct Order {
                #[partition_key]
                #[attribute("pk")]
                pub id: String,
            }

            #[derive(kvmodel::Projection)]
            #[projection(source = Order)]
            pub struct OrderSummary { pub id: String }

            pub mod inner {
                #[derive(Entity)]
                pub enum NotAStruct { A }
            }

            #[entity_builder(entity = Order)]
            pub struct OrderQuery;

            impl Filterable for OrderQuery {}

            #[template_operation]
            pub fn limit<B: Projectable>(builder: B, n: u32) -> B { builder }

            fn helper() {
                #[derive(Entity)]
                struct Hidden;
            }
            "#,
        );

        let output = scan(&[source]);
        assert!(output.diagnostics.is_empty());
        let names: Vec<_> = output.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Order", "NotAStruct"]);
        assert_eq!(output.entities[1].module_path, vec!["models", "inner"]);
        assert_eq!(output.entities[1].shape, Shape::Enum);
        assert_eq!(output.projections[0].name, "OrderSummary");
        assert_eq!(output.builders[0].name, "OrderQuery");
        assert_eq!(output.templates[0].name, "limit");
        assert_eq!(output.implemented_traits("OrderQuery"), vec!["Filterable"]);
        assert_eq!(output.uses_of(&["models".to_string()]).len(), 1);
        assert!(output.is_root_module("models"));
    }

    #[test]
    fn parse_failures_and_bad_attributes_are_reported() {
        let broken = SourceFile::inline(&["broken"], "pub struct {");
        let bad = SourceFile::inline(
            &[],
            r#"
            #[derive(Entity)]
            #[table(nme = "x")]
            pub struct Bad { #[ttl(1)] pub at: u64 }
            "#,
        );
        let output = scan(&[broken, bad]);
        assert_eq!(output.diagnostics.count_of(DiagnosticId::SourceParseFailed), 1);
        assert_eq!(output.diagnostics.count_of(DiagnosticId::InvalidAttribute), 2);
        assert_matches!(output.entities.as_slice(), [entity] if entity.attrs.table.is_none());
    }
}
