use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("StructureDefinition '{0}' has no snapshot to canonicalize")]
    NoSnapshot(String),
}

pub type Result<T> = std::result::Result<T, Error>;
