//! The build-script front end: source collection, output files and the
//! error policy.

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use assert_matches::assert_matches;
use common::{COMMERCE, init_logging};
use kvmodel_codegen::build::{collect_sources, generate};
use kvmodel_codegen::config::CodegenConfig;
use kvmodel_codegen::error::{CodegenError, PipelineError};
use kvmodel_codegen::pipeline::Pipeline;
use kvmodel_codegen::scan::SourceFile;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn crate_config(root: &Path) -> CodegenConfig {
    CodegenConfig::builder()
        .manifest_dir(root.to_path_buf())
        .output_dir(root.join("generated"))
        .emit_cargo_directives(false)
        .build()
}

#[test_log::test]
fn sources_map_to_module_paths() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/lib.rs", "pub mod models;");
    write(dir.path(), "src/models/mod.rs", "pub mod order;");
    write(dir.path(), "src/models/order.rs", COMMERCE);
    write(dir.path(), "src/notes.txt", "not rust");

    let sources = collect_sources(&crate_config(dir.path())).unwrap();
    let modules: Vec<Vec<String>> = sources.iter().map(|s| s.module_path.clone()).collect();
    assert_eq!(
        modules,
        vec![
            Vec::<String>::new(),
            vec!["models".to_string()],
            vec!["models".to_string(), "order".to_string()],
        ]
    );
}

#[test_log::test]
fn generate_writes_units_and_entry_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/lib.rs", "pub mod models;");
    write(dir.path(), "src/models.rs", COMMERCE);
    let config = crate_config(dir.path());

    let output = generate(&config).unwrap();
    assert!(output.diagnostics.is_empty());

    let out_dir = dir.path().join("generated");
    for unit in &output.units {
        let written = fs::read_to_string(out_dir.join(&unit.file_name)).unwrap();
        assert_eq!(written, unit.source);
    }
    assert!(!out_dir.join("entity_order.rs.tmp").exists());

    let entry = fs::read_to_string(out_dir.join("kvmodel_generated.rs")).unwrap();
    assert!(entry.starts_with("// @generated by kvmodel_codegen."));
    assert!(entry.contains("pub mod entity_order {"));
    assert!(entry.contains(&format!("include!(\"{}\")", out_dir.join("entity_order.rs").display())));
    assert!(entry.contains("pub use entity_order::OrderFields;"));
    assert!(entry.contains("pub use table_commerce::CommerceTable;"));
    assert!(!entry.contains("OrderLineTable"));
}

#[test_log::test]
fn errors_fail_the_build_after_writing() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/lib.rs",
        r#"
        #[derive(Entity)]
        #[table(name = "orders")]
        pub struct Order {
            pub id: String,
        }
        "#,
    );

    let result = generate(&crate_config(dir.path()));
    assert_matches!(result, Err(CodegenError::Diagnostics(diagnostics)) => {
        assert_eq!(diagnostics.error_count(), 1);
    });
    // The entry file still exists, so the including crate sees the
    // diagnostics rather than a missing file.
    assert!(dir.path().join("generated/kvmodel_generated.rs").exists());
}

#[test_log::test]
fn warnings_fail_only_when_strict() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/lib.rs",
        r#"
        #[derive(Entity)]
        #[table(name = "orders")]
        pub struct Order {
            #[partition_key]
            #[attribute("pk")]
            pub id: String,
            pub status: String,
        }
        "#,
    );

    let mut config = crate_config(dir.path());
    let output = generate(&config).unwrap();
    assert_eq!(output.diagnostics.warning_count(), 1);

    config.warnings_as_errors = true;
    assert_matches!(generate(&config), Err(CodegenError::Diagnostics(_)));
}

#[test_log::test]
fn missing_out_dir_is_reported() {
    // SAFETY: no other test in this binary reads OUT_DIR.
    unsafe { std::env::remove_var("OUT_DIR") };
    let dir = tempfile::tempdir().unwrap();
    let config = CodegenConfig::builder()
        .manifest_dir(dir.path().to_path_buf())
        .emit_cargo_directives(false)
        .build();
    assert_matches!(generate(&config), Err(CodegenError::MissingEnv("OUT_DIR")));
}

#[test_log::test]
fn config_file_is_read_from_the_manifest_dir() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "kvmodel.toml",
        r#"
        [codegen]
        source_roots = ["models"]
        crate_root = "models"

        [diagnostics]
        warnings_as_errors = true
        "#,
    );
    let config = CodegenConfig::from_file(&dir.path().join("kvmodel.toml")).unwrap();
    assert!(config.warnings_as_errors);
    assert_eq!(config.source_roots, vec![PathBuf::from("models")]);
    assert_eq!(config.resolved_crate_root(), dir.path().join("models"));
}

#[test]
fn cancelled_runs_stop() {
    init_logging();
    let cancel = Arc::new(AtomicBool::new(false));
    let pipeline = Pipeline::new(CodegenConfig::default())
        .unwrap()
        .with_cancellation(Arc::clone(&cancel));
    cancel.store(true, Ordering::Relaxed);

    let result = pipeline.run(&[SourceFile::inline(&["models"], COMMERCE)]);
    assert_matches!(result, Err(PipelineError::Cancelled));
}
