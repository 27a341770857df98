//! The conformance registry (component 1): stores `StructureDefinition`s by
//! canonical URL, resolves inheritance chains, and loads from external
//! sources through a pluggable loader chain.

pub mod error;
pub mod loader;
pub mod registry;

pub use error::{Error, Result};
pub use loader::{CompositeLoader, FilesystemLoader, InMemoryLoader, StructureDefinitionLoader};
pub use registry::{FhirContext, Registry};
