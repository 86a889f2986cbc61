//! Diagnostics produced while analysing declarations.
//!
//! Modelling problems never abort the pipeline. Every stage returns its
//! value together with the diagnostics it produced; the caller decides what
//! an error means (the build front end turns them into a failed build).

pub mod registry;

use std::fmt;
use std::path::{Path, PathBuf};

use derive_more::{Deref, IntoIterator};
use proc_macro2::Span;

pub use registry::{DiagnosticDescriptor, DiagnosticId, REGISTRY_VERSION, Severity};

/// Where a declaration was found.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Location {
    pub file: Option<PathBuf>,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn from_span(file: Option<&Path>, span: Span) -> Self {
        let start = span.start();
        Self {
            file: file.map(Path::to_path_buf),
            line: start.line,
            column: start.column + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file.display(), self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub id: DiagnosticId,
    pub args: Vec<String>,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn new<I, S>(id: DiagnosticId, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            args: args.into_iter().map(Into::into).collect(),
            location: None,
        }
    }

    pub fn at(mut self, location: &Location) -> Self {
        self.location = Some(location.clone());
        self
    }

    pub fn code(&self) -> &'static str {
        self.id.code()
    }

    pub fn severity(&self) -> Severity {
        self.id.severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn message(&self) -> String {
        registry::render(self.id.descriptor().template, &self.args)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity(), self.code(), self.message())?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

/// An ordered bag of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, IntoIterator)]
pub struct Diagnostics(#[into_iterator(owned, ref)] Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn report<I, S>(&mut self, id: DiagnosticId, args: I, location: &Location)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Diagnostic::new(id, args).at(location));
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.0.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.0.len() - self.error_count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| !d.is_error())
    }

    pub fn ids(&self) -> Vec<DiagnosticId> {
        self.0.iter().map(|d| d.id).collect()
    }

    pub fn count_of(&self, id: DiagnosticId) -> usize {
        self.0.iter().filter(|d| d.id == id).count()
    }

    /// Stable order for reporting: by file and position, then by code.
    pub fn sort(&mut self) {
        self.0
            .sort_by(|a, b| a.location.cmp(&b.location).then(a.id.cmp(&b.id)));
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

/// Output of one analysis step: the value, if it could be built, plus every
/// diagnostic raised along the way.
#[derive(Debug, Clone)]
pub struct Analysis<T> {
    pub value: Option<T>,
    pub diagnostics: Diagnostics,
}

impl<T> Analysis<T> {
    /// Keep `value` only if no error was reported.
    pub fn from_parts(value: T, diagnostics: Diagnostics) -> Self {
        let value = (!diagnostics.has_errors()).then_some(value);
        Self { value, diagnostics }
    }

    pub fn failed(diagnostics: Diagnostics) -> Self {
        Self {
            value: None,
            diagnostics,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.value.is_some()
    }
}
