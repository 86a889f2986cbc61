//! Generator configuration.
//!
//! A [`CodegenConfig`] can be built in code or loaded from a `kvmodel.toml`
//! next to the consuming crate's `Cargo.toml`:
//!
//! ```toml
//! [codegen]
//! source_roots = ["src"]
//! entry_file = "kvmodel_generated.rs"
//! module_root = "crate"
//!
//! [converters]
//! Money = "crate::models::MoneyConverter"
//!
//! [diagnostics]
//! warnings_as_errors = false
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{CodegenError, CodegenResult};

pub const CONFIG_FILE_NAME: &str = "kvmodel.toml";

/// Configuration for one run of the generator.
///
/// # Examples
///
/// ```
/// use kvmodel_codegen::config::CodegenConfig;
///
/// let config = CodegenConfig::builder()
///     .source_roots(vec!["src/models".into()])
///     .warnings_as_errors(true)
///     .build();
/// assert_eq!(config.entry_file, "kvmodel_generated.rs");
/// ```
#[derive(Debug, Clone, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct CodegenConfig {
    /// Directories scanned recursively for `.rs` files.
    #[builder(default = vec![PathBuf::from("src")])]
    pub source_roots: Vec<PathBuf>,

    /// Directory holding `lib.rs`; module paths are derived relative to it.
    #[builder(default = PathBuf::from("src"))]
    pub crate_root: PathBuf,

    /// Where generated files go. Defaults to `OUT_DIR`.
    #[builder(default, setter(strip_option))]
    pub output_dir: Option<PathBuf>,

    #[builder(default = "kvmodel_generated.rs".to_string(), setter(into))]
    pub entry_file: String,

    /// Module path the entry file is included at.
    #[builder(default = "crate".to_string(), setter(into))]
    pub module_root: String,

    /// Type name to converter path.
    #[builder(default)]
    pub converters: BTreeMap<String, String>,

    #[builder(default = false)]
    pub warnings_as_errors: bool,

    /// Print `cargo:` directives while generating.
    #[builder(default = true)]
    pub emit_cargo_directives: bool,

    /// Base for relative paths. Set from `CARGO_MANIFEST_DIR` by the build
    /// front end.
    #[builder(default, setter(strip_option))]
    #[serde(skip)]
    pub manifest_dir: Option<PathBuf>,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    codegen: CodegenSection,
    #[serde(default)]
    converters: BTreeMap<String, String>,
    #[serde(default)]
    diagnostics: DiagnosticsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CodegenSection {
    source_roots: Option<Vec<PathBuf>>,
    crate_root: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    entry_file: Option<String>,
    module_root: Option<String>,
    emit_cargo_directives: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DiagnosticsSection {
    warnings_as_errors: Option<bool>,
}

impl CodegenConfig {
    /// Parse a `kvmodel.toml` document. Unset keys keep their defaults.
    pub fn from_toml_str(content: &str, origin: &Path) -> CodegenResult<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|source| CodegenError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;

        let mut config = Self::default();
        let section = file.codegen;
        if let Some(roots) = section.source_roots {
            config.source_roots = roots;
        }
        if let Some(root) = section.crate_root {
            config.crate_root = root;
        }
        config.output_dir = section.output_dir;
        if let Some(entry) = section.entry_file {
            config.entry_file = entry;
        }
        if let Some(module_root) = section.module_root {
            config.module_root = module_root;
        }
        if let Some(emit) = section.emit_cargo_directives {
            config.emit_cargo_directives = emit;
        }
        config.converters = file.converters;
        if let Some(strict) = file.diagnostics.warnings_as_errors {
            config.warnings_as_errors = strict;
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> CodegenResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CodegenError::io(path, e))?;
        let mut config = Self::from_toml_str(&content, path)?;
        config.manifest_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Resolve a configured path against the manifest directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.manifest_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn resolved_source_roots(&self) -> Vec<PathBuf> {
        self.source_roots.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn resolved_crate_root(&self) -> PathBuf {
        self.resolve(&self.crate_root)
    }
}

/// Converters registered by type, parsed once per run.
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    by_type: BTreeMap<String, syn::Path>,
}

impl ConverterRegistry {
    pub fn from_config(config: &CodegenConfig) -> CodegenResult<Self> {
        let mut by_type = BTreeMap::new();
        for (ty, converter) in &config.converters {
            let path = syn::parse_str::<syn::Path>(converter).map_err(|_| {
                CodegenError::InvalidConverter {
                    ty: ty.clone(),
                    converter: converter.clone(),
                }
            })?;
            by_type.insert(normalize(ty), path);
        }
        Ok(Self { by_type })
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Look up by the full type as written, then by its last path segment.
    pub fn lookup(&self, ty: &syn::Type) -> Option<&syn::Path> {
        let full = normalize(&quote::quote!(#ty).to_string());
        if let Some(found) = self.by_type.get(&full) {
            return Some(found);
        }
        let syn::Type::Path(type_path) = ty else {
            return None;
        };
        let last = type_path.path.segments.last()?.ident.to_string();
        self.by_type.get(&last)
    }
}

/// Type text with all whitespace removed, for comparisons.
pub fn normalize(ty: &str) -> String {
    ty.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn toml_sections_override_defaults() {
        let config = CodegenConfig::from_toml_str(
            r#"
            [codegen]
            source_roots = ["src/models"]
            module_root = "crate::generated"

            [converters]
            "money::Money" = "crate::MoneyConverter"

            [diagnostics]
            warnings_as_errors = true
            "#,
            Path::new("kvmodel.toml"),
        )
        .unwrap();
        assert_eq!(config.source_roots, vec![PathBuf::from("src/models")]);
        assert_eq!(config.module_root, "crate::generated");
        assert_eq!(config.entry_file, "kvmodel_generated.rs");
        assert!(config.warnings_as_errors);
        assert!(config.emit_cargo_directives);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = CodegenConfig::from_toml_str("[codegen]\nsource_root = 1", Path::new("x.toml"));
        assert_matches!(result, Err(CodegenError::ConfigParse { .. }));
    }

    #[test]
    fn registry_matches_full_then_last_segment() {
        let config = CodegenConfig::builder()
            .converters(BTreeMap::from([
                ("Money".to_string(), "crate::MoneyConverter".to_string()),
                ("geo :: Point".to_string(), "crate::PointConverter".to_string()),
            ]))
            .build();
        let registry = ConverterRegistry::from_config(&config).unwrap();

        let money: syn::Type = syn::parse_quote!(crate::models::Money);
        let point: syn::Type = syn::parse_quote!(geo::Point);
        let other: syn::Type = syn::parse_quote!(Point);
        assert!(registry.lookup(&money).is_some());
        assert!(registry.lookup(&point).is_some());
        assert!(registry.lookup(&other).is_none());
    }

    #[test]
    fn invalid_converter_path_is_an_error() {
        let config = CodegenConfig::builder()
            .converters(BTreeMap::from([("Money".to_string(), "not a path".to_string())]))
            .build();
        assert_matches!(
            ConverterRegistry::from_config(&config),
            Err(CodegenError::InvalidConverter { .. })
        );
    }

    #[test]
    fn relative_paths_resolve_against_manifest() {
        let config = CodegenConfig::builder().manifest_dir("/work/app".into()).build();
        assert_eq!(
            config.resolved_crate_root(),
            PathBuf::from("/work/app/src")
        );
    }
}
