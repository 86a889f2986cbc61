//! Build-script front end.
//!
//! ```rust,ignore
//! // build.rs
//! fn main() {
//!     kvmodel_codegen::build::generate_from_env().unwrap();
//! }
//! ```
//!
//! Sources are read first and the whole pipeline runs in memory. Each unit
//! is then written to a temporary file and renamed into place, and the
//! entry file is written last, so an interrupted build never leaves an entry
//! file pointing at partial units.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::{CONFIG_FILE_NAME, CodegenConfig};
use crate::error::{CodegenError, CodegenResult};
use crate::pipeline::{Pipeline, PipelineOutput};
use crate::scan::{SourceFile, module_path_for};

/// Every `.rs` file under the configured source roots, sorted by path.
pub fn collect_sources(config: &CodegenConfig) -> CodegenResult<Vec<SourceFile>> {
    let crate_root = config.resolved_crate_root();
    let mut paths = Vec::new();
    for root in config.resolved_source_roots() {
        collect_rust_files(&root, &mut paths)?;
    }
    paths.sort();
    paths.dedup();

    paths
        .into_iter()
        .map(|path| {
            let content = fs::read_to_string(&path).map_err(|e| CodegenError::io(&path, e))?;
            let module_path = module_path_for(&crate_root, &path);
            Ok(SourceFile::new(path, module_path, content))
        })
        .collect()
}

fn collect_rust_files(dir: &Path, paths: &mut Vec<PathBuf>) -> CodegenResult<()> {
    if dir.is_file() {
        paths.push(dir.to_path_buf());
        return Ok(());
    }
    let entries = fs::read_dir(dir).map_err(|e| CodegenError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| CodegenError::io(dir, e))?.path();
        if path.is_dir() {
            collect_rust_files(&path, paths)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            paths.push(path);
        }
    }
    Ok(())
}

fn write_atomically(path: &Path, content: &str) -> CodegenResult<()> {
    let tmp = path.with_extension("rs.tmp");
    fs::write(&tmp, content).map_err(|e| CodegenError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| CodegenError::io(path, e))?;
    debug!("wrote {}", path.display());
    Ok(())
}

/// Write every unit and then the entry file to `output_dir`.
pub fn write_output(output: &PipelineOutput, output_dir: &Path, entry_file: &str) -> CodegenResult<PathBuf> {
    fs::create_dir_all(output_dir).map_err(|e| CodegenError::io(output_dir, e))?;
    for unit in &output.units {
        write_atomically(&output_dir.join(&unit.file_name), &unit.source)?;
    }
    let entry = output_dir.join(entry_file);
    write_atomically(&entry, &output.entry_source(output_dir))?;
    Ok(entry)
}

/// Run the generator for `config` and write its output.
///
/// Returns the pipeline output when no error was reported (and no warning,
/// with `warnings_as_errors`).
pub fn generate(config: &CodegenConfig) -> CodegenResult<PipelineOutput> {
    let output_dir = match &config.output_dir {
        Some(dir) => config.resolve(dir),
        None => std::env::var_os("OUT_DIR")
            .map(PathBuf::from)
            .ok_or(CodegenError::MissingEnv("OUT_DIR"))?,
    };

    let sources = collect_sources(config)?;
    if config.emit_cargo_directives {
        for root in config.resolved_source_roots() {
            println!("cargo:rerun-if-changed={}", root.display());
        }
        if let Some(manifest_dir) = &config.manifest_dir {
            println!("cargo:rerun-if-changed={}", manifest_dir.join(CONFIG_FILE_NAME).display());
        }
    }

    let output = Pipeline::new(config.clone())?.run(&sources)?;
    write_output(&output, &output_dir, &config.entry_file)?;

    if config.emit_cargo_directives {
        for diagnostic in output.diagnostics.iter() {
            println!("cargo:warning={diagnostic}");
        }
    }

    let diagnostics = &output.diagnostics;
    if diagnostics.has_errors() || (config.warnings_as_errors && diagnostics.warning_count() > 0) {
        return Err(CodegenError::Diagnostics(diagnostics.clone()));
    }
    Ok(output)
}

/// Configure from the build-script environment and generate.
///
/// Reads `kvmodel.toml` from `CARGO_MANIFEST_DIR` when present; output goes
/// to `OUT_DIR`.
pub fn generate_from_env() -> CodegenResult<PipelineOutput> {
    let manifest_dir = std::env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .ok_or(CodegenError::MissingEnv("CARGO_MANIFEST_DIR"))?;
    let config_path = manifest_dir.join(CONFIG_FILE_NAME);
    let mut config = if config_path.is_file() {
        CodegenConfig::from_file(&config_path)?
    } else {
        CodegenConfig::default()
    };
    config.manifest_dir = Some(manifest_dir);
    generate(&config)
}
