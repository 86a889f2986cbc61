//! The in-memory generation pipeline.
//!
//! ```text
//! sources ─▶ scan ─▶ analyse entities ─▶ reference check ─▶ analyse projections
//!                                                              │
//!        units ◀─ generate ◀─ table checks ◀─ index aggregation ┘
//! ```
//!
//! Every stage is a pure function of its inputs. Modelling problems become
//! diagnostics and only block the units they concern; the run itself fails
//! only when it is cancelled or emits tokens that do not parse.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace};

use crate::analyze::{
    TableModel, aggregate_tables, analyze_entity, analyze_projection, check_references, check_tables,
    unique_declarations,
};
use crate::config::{CodegenConfig, ConverterRegistry};
use crate::diagnostics::Diagnostics;
use crate::error::{CodegenResult, PipelineError};
use crate::generate::naming::{
    entity_unit_module, fields_struct, projection_unit_module, table_struct, table_unit_module,
    wrapper_unit_module,
};
use crate::generate::{
    GeneratedUnit, GenerationContext, UnitKind, entity_unit, entry_source, projection_unit, table_unit,
    wrapper_units,
};
use crate::model::{EntityModel, ProjectionModel, TypeResolver};
use crate::scan::{SourceFile, scan};

/// Everything one run produced.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub units: Vec<GeneratedUnit>,
    pub diagnostics: Diagnostics,
    /// Analysed entity models, by name.
    pub entities: BTreeMap<String, EntityModel>,
    pub projections: BTreeMap<String, ProjectionModel>,
    pub tables: BTreeMap<String, TableModel>,
}

impl PipelineOutput {
    pub fn unit(&self, kind: UnitKind, name: &str) -> Option<&GeneratedUnit> {
        self.units.iter().find(|u| u.kind == kind && u.name == name)
    }

    /// Entry file source for units written to `output_dir`.
    pub fn entry_source(&self, output_dir: &Path) -> String {
        entry_source(&self.units, output_dir)
    }
}

pub struct Pipeline {
    config: CodegenConfig,
    registry: ConverterRegistry,
    cancel: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(config: CodegenConfig) -> CodegenResult<Self> {
        let registry = ConverterRegistry::from_config(&config)?;
        Ok(Self {
            config,
            registry,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Share a cancellation flag with the host.
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    fn checkpoint(&self) -> Result<(), PipelineError> {
        if self.cancel.load(Ordering::Relaxed) {
            debug!("generation cancelled");
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    pub fn run(&self, sources: &[SourceFile]) -> Result<PipelineOutput, PipelineError> {
        self.checkpoint()?;
        debug!("scanning {} source files", sources.len());
        let scanned = scan(sources);
        let mut diagnostics = scanned.diagnostics.clone();

        self.checkpoint()?;
        let unique = unique_declarations(&scanned, &mut diagnostics);
        debug!(
            "analysing {} entities and {} projections",
            unique.entities.len(),
            unique.projections.len()
        );

        let resolver = TypeResolver::new(&self.registry);
        let mut analysed: Vec<EntityModel> = Vec::new();
        for declaration in &unique.entities {
            self.checkpoint()?;
            let analysis = analyze_entity(declaration, &resolver);
            diagnostics.merge(analysis.diagnostics);
            match analysis.value {
                Some(model) => analysed.push(model),
                None => trace!("entity {} rejected", declaration.name),
            }
        }

        let all: BTreeMap<String, EntityModel> = analysed
            .iter()
            .map(|model| (model.name.clone(), model.clone()))
            .collect();
        let (rejected, reference_diagnostics) = check_references(&all);
        diagnostics.merge(reference_diagnostics);
        let ordered: Vec<EntityModel> = analysed
            .into_iter()
            .filter(|model| !rejected.contains(&model.name))
            .collect();
        let entities: BTreeMap<String, EntityModel> = ordered
            .iter()
            .map(|model| (model.name.clone(), model.clone()))
            .collect();

        self.checkpoint()?;
        let declared: BTreeSet<String> = scanned.entities.iter().map(|d| d.name.clone()).collect();
        let mut projections: BTreeMap<String, ProjectionModel> = BTreeMap::new();
        let mut projection_order: Vec<String> = Vec::new();
        for declaration in &unique.projections {
            let analysis = analyze_projection(declaration, &entities, &declared);
            diagnostics.merge(analysis.diagnostics);
            if let Some(model) = analysis.value {
                projection_order.push(model.name.clone());
                projections.insert(model.name.clone(), model);
            }
        }

        self.checkpoint()?;
        debug!("aggregating indexes");
        let (mut tables, index_diagnostics) = aggregate_tables(&ordered, &projections);
        diagnostics.merge(index_diagnostics);
        diagnostics.merge(check_tables(&mut tables, &entities));

        let context = GenerationContext {
            scan: &scanned,
            entities: &entities,
            module_root: &self.config.module_root,
        };
        let mut units = Vec::new();

        debug!("generating {} entity units", ordered.len());
        for model in &ordered {
            self.checkpoint()?;
            trace!("generating entity unit for {}", model.name);
            let mut unit = GeneratedUnit::new(
                UnitKind::Entity,
                &model.name,
                entity_unit_module(&model.name),
                entity_unit(&context, model),
            )?;
            if model.is_table_entity() {
                unit = unit.exporting(fields_struct(&model.name).to_string());
            }
            units.push(unit);
        }

        debug!("generating {} projection units", projections.len());
        for name in &projection_order {
            self.checkpoint()?;
            let Some(model) = projections.get(name) else {
                continue;
            };
            trace!("generating projection unit for {}", name);
            units.push(GeneratedUnit::new(
                UnitKind::Projection,
                name,
                projection_unit_module(name),
                projection_unit(&context, model),
            )?);
        }

        for table in tables.values() {
            self.checkpoint()?;
            if table.blocked {
                debug!("table {} is blocked by table-level errors", table.name);
                continue;
            }
            units.push(
                GeneratedUnit::new(
                    UnitKind::Table,
                    &table.name,
                    table_unit_module(&table.name),
                    table_unit(table),
                )?
                .exporting(table_struct(&table.name).to_string()),
            );
        }

        self.checkpoint()?;
        let (wrappers, wrapper_diagnostics) = wrapper_units(&context);
        diagnostics.merge(wrapper_diagnostics);
        debug!("generating {} wrapper units", wrappers.len());
        for wrapper in wrappers {
            units.push(GeneratedUnit::new(
                UnitKind::Wrappers,
                &wrapper.builder,
                wrapper_unit_module(&wrapper.builder),
                wrapper.tokens,
            )?);
        }

        diagnostics.sort();
        debug!(
            "generated {} units with {} errors and {} warnings",
            units.len(),
            diagnostics.error_count(),
            diagnostics.warning_count()
        );
        Ok(PipelineOutput {
            units,
            diagnostics,
            entities,
            projections,
            tables,
        })
    }
}
