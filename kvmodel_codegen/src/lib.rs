//! # kvmodel_codegen
//!
//! Build-time analysis and code generation for `kvmodel` data models.
//!
//! The pipeline scans a crate's sources for `#[derive(Entity)]`,
//! `#[derive(Projection)]`, `#[template_operation]` and `#[entity_builder]`
//! declarations, validates them into models, and emits one source unit per
//! entity, projection, table and builder. Problems with the declarations are
//! reported as [`Diagnostics`](diagnostics::Diagnostics) with stable codes:
//!
//! - `KVS*`: structural problems of one entity or projection,
//! - `KVP*`: projection, index and table conflicts,
//! - `KVW*`: wrapper specialization problems.
//!
//! ```rust,ignore
//! use kvmodel_codegen::config::CodegenConfig;
//! use kvmodel_codegen::pipeline::Pipeline;
//! use kvmodel_codegen::scan::SourceFile;
//!
//! let pipeline = Pipeline::new(CodegenConfig::default())?;
//! let output = pipeline.run(&[SourceFile::inline(&["models"], source)])?;
//! for diagnostic in output.diagnostics.iter() {
//!     eprintln!("{diagnostic}");
//! }
//! ```

pub mod analyze;
pub mod build;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod generate;
pub mod model;
pub mod pipeline;
pub mod scan;

pub use config::CodegenConfig;
pub use diagnostics::{Diagnostic, DiagnosticId, Diagnostics};
pub use error::{CodegenError, CodegenResult, PipelineError};
pub use pipeline::{Pipeline, PipelineOutput};
