use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::Diagnostics;

pub type CodegenResult<T> = Result<T, CodegenError>;

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration '{}': {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Converter '{converter}' registered for '{ty}' is not a valid path")]
    InvalidConverter { ty: String, converter: String },

    #[error("Environment variable '{0}' is not set; is this running from a build script?")]
    MissingEnv(&'static str),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("model analysis failed with {} error(s) and {} warning(s)", .0.error_count(), .0.warning_count())]
    Diagnostics(Diagnostics),
}

impl CodegenError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CodegenError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures of the pipeline itself, as opposed to modelling diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("generation was cancelled")]
    Cancelled,

    #[error("generated unit '{unit}' is not valid Rust: {message}")]
    Format { unit: String, message: String },
}
