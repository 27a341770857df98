//! Canonical builder (component 4, §4.4): lowers a populated snapshot
//! `StructureDefinition` into an implementation-friendly [`CanonicalProfile`]
//! with normalized defaults and a path-keyed element map.

pub mod builder;
pub mod error;
pub mod types;

pub use builder::build_canonical_profile;
pub use error::{Error, Result};
pub use types::{
    BindingConstraint, CanonicalElement, CanonicalProfile, Invariant, MaxCardinality,
    SlicingDefinition, SlicingDiscriminator, TypeConstraint,
};
