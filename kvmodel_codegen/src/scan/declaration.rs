//! Declarations collected from one parsed source file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use syn::visit::{self, Visit};
use syn::{Attribute, Fields, ItemEnum, ItemFn, ItemImpl, ItemMod, ItemStruct, ItemUnion, ItemUse};

use super::attributes::{
    self, EntityAttrs, FieldAttrs, derives, find_entity_builder, find_template_operation,
};
use crate::diagnostics::Location;

/// Rust item shape of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Named,
    Tuple,
    Unit,
    Enum,
    Union,
}

#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub name: String,
    pub ty: syn::Type,
    pub attrs: FieldAttrs,
    pub location: Location,
}

/// A `#[derive(Entity)]` or `#[derive(Projection)]` item.
#[derive(Debug, Clone)]
pub struct TypeDeclaration {
    pub name: String,
    pub module_path: Vec<String>,
    pub location: Location,
    pub shape: Shape,
    pub generic: bool,
    pub attrs: EntityAttrs,
    pub fields: Vec<FieldDeclaration>,
    /// Malformed attributes, already rendered.
    pub attribute_errors: Vec<(String, Location)>,
}

impl TypeDeclaration {
    pub fn field(&self, name: &str) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A function marked `#[template_operation]`.
#[derive(Debug, Clone)]
pub struct TemplateDeclaration {
    pub name: String,
    pub module_path: Vec<String>,
    pub location: Location,
    pub signature: syn::Signature,
    pub specialize: bool,
    pub docs: Vec<Attribute>,
    /// Self type of the inherent impl block declaring it, if any.
    pub owner: Option<syn::Type>,
}

/// A struct marked `#[entity_builder(...)]`.
#[derive(Debug, Clone)]
pub struct BuilderDeclaration {
    pub name: String,
    pub module_path: Vec<String>,
    pub location: Location,
    pub entity: syn::Path,
    pub operations: Option<Vec<String>>,
    pub capabilities: Vec<String>,
}

/// `impl Trait for Type`, by last path segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImplFact {
    pub trait_name: String,
    pub self_type: String,
}

#[derive(Debug, Default, Clone)]
pub struct FileDeclarations {
    pub entities: Vec<TypeDeclaration>,
    pub projections: Vec<TypeDeclaration>,
    pub templates: Vec<TemplateDeclaration>,
    pub builders: Vec<BuilderDeclaration>,
    pub impls: Vec<ImplFact>,
    /// Top-level `use` items per module path.
    pub uses: BTreeMap<Vec<String>, Vec<ItemUse>>,
    /// Every module path seen, including inline modules.
    pub modules: Vec<Vec<String>>,
    pub attribute_errors: Vec<(String, String, Location)>,
}

pub(crate) struct DeclarationVisitor<'a> {
    file: Option<&'a Path>,
    module: Vec<String>,
    pub(crate) found: FileDeclarations,
}

impl<'a> DeclarationVisitor<'a> {
    pub(crate) fn new(file: Option<&'a Path>, module: Vec<String>) -> Self {
        let found = FileDeclarations {
            modules: vec![module.clone()],
            ..Default::default()
        };
        Self {
            file,
            module,
            found,
        }
    }

    fn location(&self, span: proc_macro2::Span) -> Location {
        Location::from_span(self.file, span)
    }

    fn errors(&self, errors: Vec<syn::Error>) -> Vec<(String, Location)> {
        errors
            .into_iter()
            .map(|e| (e.to_string(), self.location(e.span())))
            .collect()
    }

    fn declare(
        &mut self,
        ident: &syn::Ident,
        attrs: &[Attribute],
        generics: &syn::Generics,
        shape: Shape,
        fields: Option<&Fields>,
    ) {
        let (is_entity, is_projection) = derives(attrs);
        if !is_entity && !is_projection {
            return;
        }

        let (type_attrs, type_errors) = attributes::parse_entity_attrs(attrs);
        let mut attribute_errors = self.errors(type_errors);
        let mut declared_fields = Vec::new();
        if let Some(Fields::Named(named)) = fields {
            for field in &named.named {
                let Some(field_ident) = &field.ident else {
                    continue;
                };
                let (field_attrs, field_errors) = attributes::parse_field_attrs(&field.attrs);
                attribute_errors.extend(self.errors(field_errors));
                declared_fields.push(FieldDeclaration {
                    name: field_ident.to_string(),
                    ty: field.ty.clone(),
                    attrs: field_attrs,
                    location: self.location(field_ident.span()),
                });
            }
        }

        let declaration = TypeDeclaration {
            name: ident.to_string(),
            module_path: self.module.clone(),
            location: self.location(ident.span()),
            shape,
            generic: !generics.params.is_empty(),
            attrs: type_attrs,
            fields: declared_fields,
            attribute_errors,
        };
        if is_entity {
            self.found.entities.push(declaration.clone());
        }
        if is_projection {
            self.found.projections.push(declaration);
        }
    }

    fn template(&mut self, attrs: &[Attribute], signature: &syn::Signature, owner: Option<&syn::Type>) {
        let Some(parsed) = find_template_operation(attrs) else {
            return;
        };
        let location = self.location(signature.ident.span());
        match parsed {
            Ok(args) => self.found.templates.push(TemplateDeclaration {
                name: signature.ident.to_string(),
                module_path: self.module.clone(),
                location,
                signature: signature.clone(),
                specialize: args.specialize,
                docs: attrs
                    .iter()
                    .filter(|a| a.path().is_ident("doc"))
                    .cloned()
                    .collect(),
                owner: owner.cloned(),
            }),
            Err(e) => self
                .found
                .attribute_errors
                .push((signature.ident.to_string(), e.to_string(), location)),
        }
    }
}

fn shape_of(fields: &Fields) -> Shape {
    match fields {
        Fields::Named(_) => Shape::Named,
        Fields::Unnamed(_) => Shape::Tuple,
        Fields::Unit => Shape::Unit,
    }
}

fn last_segment(ty: &syn::Type) -> Option<String> {
    match ty {
        syn::Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

impl<'ast> Visit<'ast> for DeclarationVisitor<'_> {
    fn visit_item_struct(&mut self, item: &'ast ItemStruct) {
        self.declare(
            &item.ident,
            &item.attrs,
            &item.generics,
            shape_of(&item.fields),
            Some(&item.fields),
        );

        if let Some(parsed) = find_entity_builder(&item.attrs) {
            let location = self.location(item.ident.span());
            match parsed {
                Ok(args) => self.found.builders.push(BuilderDeclaration {
                    name: item.ident.to_string(),
                    module_path: self.module.clone(),
                    location,
                    entity: args.entity,
                    operations: args.operations,
                    capabilities: args.capabilities,
                }),
                Err(e) => self.found.attribute_errors.push((
                    item.ident.to_string(),
                    e.to_string(),
                    location,
                )),
            }
        }
    }

    fn visit_item_enum(&mut self, item: &'ast ItemEnum) {
        self.declare(&item.ident, &item.attrs, &item.generics, Shape::Enum, None);
    }

    fn visit_item_union(&mut self, item: &'ast ItemUnion) {
        self.declare(&item.ident, &item.attrs, &item.generics, Shape::Union, None);
    }

    // Function bodies are not descended into: items declared there have no
    // nameable module path.
    fn visit_item_fn(&mut self, item: &'ast ItemFn) {
        self.template(&item.attrs, &item.sig, None);
    }

    fn visit_item_impl(&mut self, item: &'ast ItemImpl) {
        if let Some((_, trait_path, _)) = &item.trait_
            && let Some(trait_name) = trait_path.segments.last()
            && let Some(self_type) = last_segment(&item.self_ty)
        {
            self.found.impls.push(ImplFact {
                trait_name: trait_name.ident.to_string(),
                self_type,
            });
        }
        // Only inherent, non-generic impls give templates a nameable path.
        if item.trait_.is_some() || !item.generics.params.is_empty() {
            return;
        }
        for impl_item in &item.items {
            if let syn::ImplItem::Fn(method) = impl_item {
                self.template(&method.attrs, &method.sig, Some(&item.self_ty));
            }
        }
    }

    fn visit_item_use(&mut self, item: &'ast ItemUse) {
        self.found
            .uses
            .entry(self.module.clone())
            .or_default()
            .push(item.clone());
    }

    fn visit_item_mod(&mut self, item: &'ast ItemMod) {
        // Out-of-line modules are picked up from their own files.
        if item.content.is_none() {
            return;
        }
        self.module.push(item.ident.to_string());
        self.found.modules.push(self.module.clone());
        visit::visit_item_mod(self, item);
        self.module.pop();
    }
}

/// Module path of a source file relative to the crate root directory.
///
/// `lib.rs` and `main.rs` at the root map to the crate root, `a/mod.rs` and
/// `a.rs` both map to `a`.
pub fn module_path_for(crate_root: &Path, file: &Path) -> Vec<String> {
    let Ok(relative) = file.strip_prefix(crate_root) else {
        return Vec::new();
    };
    let mut segments: Vec<String> = relative
        .iter()
        .map(|s| s.to_string_lossy().into_owned())
        .collect();

    let Some(last) = segments.pop() else {
        return Vec::new();
    };
    let stem = last.strip_suffix(".rs").unwrap_or(&last).to_string();
    let at_root = segments.is_empty();
    match stem.as_str() {
        "lib" | "main" if at_root => {}
        "mod" => {}
        _ => segments.push(stem),
    }
    segments
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: Option<PathBuf>,
    pub module_path: Vec<String>,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, module_path: Vec<String>, content: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            module_path,
            content: content.into(),
        }
    }

    /// A source without a backing file, mounted at `module_path`.
    pub fn inline(module_path: &[&str], content: impl Into<String>) -> Self {
        Self {
            path: None,
            module_path: module_path.iter().map(|s| s.to_string()).collect(),
            content: content.into(),
        }
    }

    pub fn display_name(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None if self.module_path.is_empty() => "crate".to_string(),
            None => self.module_path.join("::"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_paths_follow_file_layout() {
        let root = Path::new("/app/src");
        assert!(module_path_for(root, Path::new("/app/src/lib.rs")).is_empty());
        assert_eq!(module_path_for(root, Path::new("/app/src/models.rs")), vec!["models"]);
        assert_eq!(
            module_path_for(root, Path::new("/app/src/models/mod.rs")),
            vec!["models"]
        );
        assert_eq!(
            module_path_for(root, Path::new("/app/src/models/lib.rs")),
            vec!["models", "lib"]
        );
        assert!(module_path_for(root, Path::new("/elsewhere/x.rs")).is_empty());
    }
}
