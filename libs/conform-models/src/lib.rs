//! FHIR conformance data models.
//!
//! Version-agnostic Rust types for `StructureDefinition`, `ElementDefinition`,
//! `Snapshot`/`Differential`, and the choice-type ("value[x]") dispatcher used
//! to resolve FHIR's polymorphic properties.
//!
//! ```
//! use conform_models::common::{StructureDefinition, StructureDefinitionKind};
//!
//! # fn demo(sd: &StructureDefinition) {
//! if sd.kind == StructureDefinitionKind::Resource {
//!     println!("{} is a resource", sd.name);
//! }
//! # }
//! ```

pub mod choice;
pub mod common;

pub use common::*;
