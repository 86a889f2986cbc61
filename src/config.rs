//! Runtime options.
//!
//! Options structs use the builder pattern via `typed-builder`.

use typed_builder::TypedBuilder;

/// What to do with a record in a partition that matches neither the root
/// entity nor any of its relation patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownRecordPolicy {
    /// Log a warning and continue.
    Skip,
    /// Abort hydration with [`ConversionError::UnknownRecord`](crate::ConversionError::UnknownRecord).
    #[default]
    Fail,
}

/// Options for assembling an aggregate from the records of one partition.
///
/// # Examples
///
/// ```
/// use kvmodel::config::{HydrationOptions, UnknownRecordPolicy};
///
/// // Defaults: unknown records are an error, relations are loaded.
/// let options = HydrationOptions::default();
/// assert_eq!(options.unknown_records, UnknownRecordPolicy::Fail);
///
/// let lenient = HydrationOptions::builder()
///     .unknown_records(UnknownRecordPolicy::Skip)
///     .build();
/// assert!(lenient.include_relations);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct HydrationOptions {
    #[builder(default)]
    pub unknown_records: UnknownRecordPolicy,

    /// When false only the root record is decoded and relation records are
    /// ignored without consulting the unknown-record policy.
    #[builder(default = true)]
    pub include_relations: bool,

    /// Log skipped records with sensitive attributes redacted.
    #[builder(default = true)]
    pub redact_logs: bool,
}

impl Default for HydrationOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
