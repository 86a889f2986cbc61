// Shared helpers for the pipeline tests

#![allow(dead_code)]

use kvmodel_codegen::config::CodegenConfig;
use kvmodel_codegen::diagnostics::DiagnosticId;
use kvmodel_codegen::generate::UnitKind;
use kvmodel_codegen::pipeline::{Pipeline, PipelineOutput};
use kvmodel_codegen::scan::SourceFile;

/// Orders with their lines, sharing the `commerce` table.
pub const COMMERCE: &str = r#"
use kvmodel::prelude::*;

#[derive(Debug, Clone, PartialEq, Entity)]
#[table(name = "commerce", default_entity)]
#[secondary_index(name = "StageIndex", projection(id, amount, stage))]
pub struct Order {
    #[partition_key(prefix = "ORDER")]
    #[attribute("pk")]
    pub id: String,
    #[sort_key(prefix = "ORDER")]
    #[attribute("sk")]
    pub placed: String,
    pub amount: u64,
    #[index_partition_key(name = "StageIndex", prefix = "STAGE")]
    pub stage: String,
    #[related(pattern = "LINE#*")]
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Entity)]
#[table(name = "commerce")]
#[secondary_index(name = "StageIndex", projection(id, amount, stage))]
pub struct OrderLine {
    #[partition_key(prefix = "ORDER")]
    #[attribute("pk")]
    pub id: String,
    #[sort_key(prefix = "LINE")]
    #[attribute("sk")]
    pub line: u32,
    pub amount: u64,
    #[index_partition_key(name = "StageIndex", prefix = "STAGE")]
    pub stage: String,
}
"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config() -> CodegenConfig {
    CodegenConfig::builder().emit_cargo_directives(false).build()
}

/// Run the pipeline over inline sources mounted at `crate::models`.
pub fn run_models(source: &str) -> PipelineOutput {
    run(&[SourceFile::inline(&["models"], source)])
}

pub fn run(sources: &[SourceFile]) -> PipelineOutput {
    run_with_config(config(), sources)
}

pub fn run_with_config(config: CodegenConfig, sources: &[SourceFile]) -> PipelineOutput {
    init_logging();
    Pipeline::new(config)
        .and_then(|pipeline| pipeline.run(sources).map_err(Into::into))
        .expect("pipeline run")
}

pub fn codes(output: &PipelineOutput) -> Vec<&'static str> {
    output.diagnostics.iter().map(|d| d.code()).collect()
}

pub fn count(output: &PipelineOutput, id: DiagnosticId) -> usize {
    output.diagnostics.count_of(id)
}

/// Source of a generated unit with all whitespace removed.
pub fn compact_source(output: &PipelineOutput, kind: UnitKind, name: &str) -> String {
    let unit = output
        .unit(kind, name)
        .unwrap_or_else(|| panic!("no {kind} unit for {name}; diagnostics: {:?}", codes(output)));
    compact(&unit.source)
}

pub fn compact(source: &str) -> String {
    source.chars().filter(|c| !c.is_whitespace()).collect()
}
