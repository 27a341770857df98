//! Snapshot generation (component 3, §4.3): flattens a StructureDefinition's
//! differential against its resolved base into a complete element tree.
//!
//! ```no_run
//! use conform_snapshot::generator::generate_snapshot;
//! use conform_models::{Differential, Snapshot};
//!
//! # fn demo(base: &Snapshot, differential: &Differential) {
//! let result = generate_snapshot(differential, base).unwrap();
//! if !result.success() {
//!     for issue in &result.issues {
//!         eprintln!("{:?}: {}", issue.severity, issue.message);
//!     }
//! }
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod merge;
pub mod normalization;
pub mod slicing;
pub mod validation;

pub use error::{Error, IssueCode, IssueSeverity, Result, SnapshotIssue};
pub use generator::{generate_differential, generate_snapshot, SnapshotContext, SnapshotResult};
