//! Source generation for analysed models.
//!
//! Every generator returns a `TokenStream` for one unit. Units are rendered
//! with `prettyplease` and included into the consuming crate through one
//! entry file, each inside its own module.

pub mod entity;
pub mod imports;
pub mod mapping;
pub mod naming;
pub mod projection;
pub mod table;
pub mod wrapper;

use std::collections::BTreeMap;
use std::path::Path;

use proc_macro2::TokenStream;
use quote::quote;
use strum::Display;

pub use entity::entity_unit;
pub use projection::projection_unit;
pub use table::table_unit;
pub use wrapper::{SpecializationClass, TemplateShape, WrapperUnit, classify, wrapper_units};

use crate::error::PipelineError;
use crate::model::EntityModel;
use crate::scan::ScanOutput;

/// Read-only inputs shared by the generators.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub scan: &'a ScanOutput,
    /// Entities that passed analysis and reference checks.
    pub entities: &'a BTreeMap<String, EntityModel>,
    /// Module path the entry file is included at.
    pub module_root: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UnitKind {
    Entity,
    Projection,
    Table,
    Wrappers,
}

/// One rendered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub kind: UnitKind,
    /// Name of the entity, projection, table or builder.
    pub name: String,
    /// Module the unit is included as.
    pub module: String,
    pub file_name: String,
    pub source: String,
    /// Items re-exported from the entry file.
    pub exports: Vec<String>,
}

impl GeneratedUnit {
    pub fn new(kind: UnitKind, name: &str, module: String, tokens: TokenStream) -> Result<Self, PipelineError> {
        let source = format_unit(&module, tokens)?;
        Ok(Self {
            kind,
            name: name.to_string(),
            file_name: format!("{module}.rs"),
            module,
            source,
            exports: Vec::new(),
        })
    }

    pub fn exporting(mut self, item: impl Into<String>) -> Self {
        self.exports.push(item.into());
        self
    }
}

const HEADER: &str = "// @generated by kvmodel_codegen. Do not edit.\n\n";

/// Render a unit's tokens as formatted source.
pub fn format_unit(unit: &str, tokens: TokenStream) -> Result<String, PipelineError> {
    let file = syn::parse2::<syn::File>(tokens).map_err(|e| PipelineError::Format {
        unit: unit.to_string(),
        message: e.to_string(),
    })?;
    Ok(format!("{HEADER}{}", prettyplease::unparse(&file)))
}

/// Entry file including every unit from `output_dir`, plus short re-exports
/// of the field structs and table schemas.
pub fn entry_source(units: &[GeneratedUnit], output_dir: &Path) -> String {
    let modules = units.iter().map(|unit| {
        let module = naming::field_ident(&unit.module);
        let path = output_dir.join(&unit.file_name).display().to_string();
        quote! {
            #[allow(clippy::all, unused_qualifications)]
            pub mod #module {
                include!(#path);
            }
        }
    });
    let reexports = units.iter().flat_map(|unit| {
        let module = naming::field_ident(&unit.module);
        unit.exports.iter().map(move |item| {
            let item = naming::field_ident(item);
            quote!(pub use #module::#item;)
        })
    });
    let tokens = quote! {
        #(#modules)*
        #(#reexports)*
    };
    match syn::parse2::<syn::File>(tokens.clone()) {
        Ok(file) => format!("{HEADER}{}", prettyplease::unparse(&file)),
        Err(_) => format!("{HEADER}{tokens}\n"),
    }
}
