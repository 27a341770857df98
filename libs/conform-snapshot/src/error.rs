//! Error and issue types for snapshot generation.
//!
//! Two distinct error channels, per the failure model in §4.3/§7: structural
//! failures that make an input impossible to process at all are a hard
//! `Error` (this module); per-element merge violations are collected as
//! non-fatal [`SnapshotIssue`]s carried on [`crate::generator::SnapshotResult`].

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum Error {
    #[error("expansion error: {0}")]
    Expansion(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("differential error: {0}")]
    Differential(String),

    #[error("base StructureDefinition not found: {0}")]
    BaseNotFound(String),

    #[error(transparent)]
    Context(#[from] conform_context::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Severity of a [`SnapshotIssue`]. `success` on the overall result is true
/// iff no issue carries `Error` severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
}

/// A non-fatal problem surfaced while merging a differential against its base.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotIssue {
    pub severity: IssueSeverity,
    pub code: IssueCode,
    pub message: String,
    pub path: Option<String>,
}

impl SnapshotIssue {
    pub fn new(severity: IssueSeverity, code: IssueCode, message: impl Into<String>, path: impl Into<Option<String>>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

/// Stable machine-readable identifier for the kind of violation, so a caller
/// can filter/group issues without parsing `message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    CardinalityViolation,
    TypeIncompatible,
    BindingViolation,
    InvalidConstraint,
    SlicingError,
    DifferentialNotConsumed,
}
