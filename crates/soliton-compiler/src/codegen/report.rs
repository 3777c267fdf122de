//! Generation failures and the end-of-run summary.

use std::collections::BTreeMap;
use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use super::splice::SpliceError;
use super::ArtifactKind;
use crate::diagnostic::RelationValidationError;

/// Why a generator produced nothing for an aggregate.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum GenerationReason {
    #[error("field '{field}' has type '{type_name}' with no column mapping")]
    #[diagnostic(
        code(soliton::codegen::unmapped_type),
        help("Annotate the field with +soliton:valueObject, +soliton:entity, or mark it transient with db:\"-\"")
    )]
    UnmappedType { field: String, type_name: String },

    #[error("field '{field}' uses unsupported value object strategy '{strategy}'")]
    #[diagnostic(code(soliton::codegen::unsupported_strategy), help("The only supported strategy is 'json'"))]
    UnsupportedStrategy { field: String, strategy: String },

    #[error("aggregate has no identity field and declares no base entity")]
    #[diagnostic(
        code(soliton::codegen::missing_identity),
        help("Add an ID field, or declare +soliton:baseEntity(Name)")
    )]
    MissingIdentity,

    #[error("identity field '{field}' has type '{type_name}'; an integer type is required")]
    #[diagnostic(code(soliton::codegen::unsupported_identity))]
    UnsupportedIdentity { field: String, type_name: String },

    #[error("enum value '{value}' is not valid for a {type_name} field")]
    #[diagnostic(code(soliton::codegen::invalid_enum_value))]
    InvalidEnumValue { value: String, type_name: String },

    #[error("failed to write '{}': {message}", path.display())]
    #[diagnostic(code(soliton::codegen::io))]
    Io { path: PathBuf, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Splice(#[from] SpliceError),

    #[error("cancelled before this artifact was generated")]
    #[diagnostic(code(soliton::codegen::cancelled))]
    Cancelled,

    #[error("generator panicked: {0}")]
    #[diagnostic(code(soliton::codegen::panicked))]
    Panicked(String),
}

impl GenerationReason {
    pub fn io(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::Io {
            path: path.into(),
            message: error.to_string(),
        }
    }
}

/// One failed `(aggregate, artifact-kind)` pair.
///
/// `aggregate` is `None` for model-wide artifacts such as `field_types.go`.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[error("{kind} for {}: {reason}", aggregate.as_deref().unwrap_or("model"))]
#[diagnostic(code(soliton::codegen::generation_failed))]
pub struct GenerationError {
    pub aggregate: Option<String>,
    pub kind: ArtifactKind,
    #[diagnostic_source]
    pub reason: GenerationReason,
}

impl GenerationError {
    pub fn new(aggregate: Option<&str>, kind: ArtifactKind, reason: GenerationReason) -> Self {
        Self {
            aggregate: aggregate.map(str::to_string),
            kind,
            reason,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.reason == GenerationReason::Cancelled
    }
}

/// Success and failure counts for one artifact kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCount {
    pub succeeded: usize,
    pub failed: usize,
}

/// Summary of a generation run.
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Files whose content changed, sorted.
    pub written: Vec<PathBuf>,
    /// Files whose content was already up to date, sorted.
    pub unchanged: Vec<PathBuf>,
    pub failures: Vec<GenerationError>,
    pub validation: Vec<RelationValidationError>,
    pub counts: BTreeMap<ArtifactKind, KindCount>,
    pub cancelled: bool,
}

impl GenerationReport {
    pub fn record_success(&mut self, kind: ArtifactKind) {
        self.counts.entry(kind).or_default().succeeded += 1;
    }

    pub fn record_failure(&mut self, error: GenerationError) {
        self.counts.entry(error.kind).or_default().failed += 1;
        self.failures.push(error);
    }

    /// Orders every list so two runs over the same model compare equal.
    pub fn finish(&mut self) {
        self.written.sort();
        self.written.dedup();
        self.unchanged.sort();
        self.unchanged.dedup();
        self.failures
            .sort_by(|a, b| (&a.aggregate, a.kind).cmp(&(&b.aggregate, b.kind)));
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Failures not caused by cancellation.
    pub fn errors(&self) -> impl Iterator<Item = &GenerationError> {
        self.failures.iter().filter(|f| !f.is_cancellation())
    }

    pub fn total_succeeded(&self) -> usize {
        self.counts.values().map(|c| c.succeeded).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.counts.values().map(|c| c.failed).sum()
    }
}
