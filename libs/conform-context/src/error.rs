//! Error types for the conformance registry and its loaders.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum Error {
    /// No loader resolved the given canonical URL.
    #[error("StructureDefinition not found: {url} (tried: {})", .tried_sources.join(", "))]
    ResourceNotFound {
        url: String,
        tried_sources: Vec<String>,
    },

    /// A `baseDefinition` chain revisited a URL already on the current walk.
    #[error("circular baseDefinition chain: {}", .chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    /// A loader itself failed (IO error, malformed file, etc).
    #[error("loader `{source_type}` failed loading {url}: {cause}")]
    LoaderError {
        source_type: String,
        url: String,
        cause: String,
    },

    /// Register was called with a resource that fails the data model's own invariants.
    #[error("invalid StructureDefinition{}: {reason}", .url.as_ref().map(|u| format!(" ({u})")).unwrap_or_default())]
    InvalidStructureDefinition { url: Option<String>, reason: String },

    /// Any operation performed after `dispose()`.
    #[error("registry has been disposed")]
    Disposed,

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::JsonError(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
