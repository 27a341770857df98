//! Loader protocol for resolving `StructureDefinition`s from external sources.
//!
//! A loader answers `load(url) -> SD | None | Err` for a single canonical URL.
//! `CompositeLoader` tries its children in declaration order and returns the
//! first non-`None` result; an `Err` from any child aborts the whole chain
//! rather than silently falling through to the next loader.

use async_trait::async_trait;
use conform_models::common::StructureDefinition;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};

#[async_trait]
pub trait StructureDefinitionLoader: Send + Sync {
    /// Attempt to resolve `url`. `Ok(None)` means "not found here, try the next
    /// loader"; `Err` aborts the chain.
    async fn load(&self, url: &str) -> Result<Option<StructureDefinition>>;

    /// Cheap, synchronous hint for whether this loader is even worth trying.
    /// Loaders that can't say in advance should always return `true`.
    fn can_load(&self, url: &str) -> bool {
        let _ = url;
        true
    }

    /// A short label identifying this loader in diagnostics (`tried_sources`).
    fn source_type(&self) -> &str;
}

/// A loader backed by an in-memory map, for tests and embedders that already
/// hold their `StructureDefinition`s in memory.
pub struct InMemoryLoader {
    resources: std::collections::HashMap<String, StructureDefinition>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self {
            resources: std::collections::HashMap::new(),
        }
    }

    pub fn with(mut self, sd: StructureDefinition) -> Self {
        self.resources.insert(sd.url.clone(), sd);
        self
    }
}

impl Default for InMemoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StructureDefinitionLoader for InMemoryLoader {
    async fn load(&self, url: &str) -> Result<Option<StructureDefinition>> {
        Ok(self.resources.get(url).cloned())
    }

    fn can_load(&self, url: &str) -> bool {
        self.resources.contains_key(url)
    }

    fn source_type(&self) -> &str {
        "in-memory"
    }
}

/// A loader that reads one JSON file per canonical URL from a directory,
/// keyed by the URL's last path segment (e.g. `.../StructureDefinition/Patient`
/// resolves to `{dir}/Patient.json`). Local-disk only: no network transport.
pub struct FilesystemLoader {
    directory: PathBuf,
}

impl FilesystemLoader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let segment = url.rsplit('/').next().unwrap_or(url);
        self.directory.join(format!("{segment}.json"))
    }
}

#[async_trait]
impl StructureDefinitionLoader for FilesystemLoader {
    async fn load(&self, url: &str) -> Result<Option<StructureDefinition>> {
        let path = self.path_for(url);
        if !path.exists() {
            return Ok(None);
        }
        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::LoaderError {
                source_type: self.source_type().to_string(),
                url: url.to_string(),
                cause: e.to_string(),
            }
        })?;
        let value: serde_json::Value = serde_json::from_str(&contents).map_err(|e| {
            Error::LoaderError {
                source_type: self.source_type().to_string(),
                url: url.to_string(),
                cause: e.to_string(),
            }
        })?;
        let sd = StructureDefinition::from_value(&value).map_err(|e| Error::LoaderError {
            source_type: self.source_type().to_string(),
            url: url.to_string(),
            cause: e.to_string(),
        })?;
        Ok(Some(sd))
    }

    fn source_type(&self) -> &str {
        "filesystem"
    }
}

/// Tries each child loader in declaration order, returning the first hit.
/// An error from any child aborts the chain (no silent fallback to the next
/// child on failure).
pub struct CompositeLoader {
    children: Vec<Arc<dyn StructureDefinitionLoader>>,
}

impl CompositeLoader {
    /// Panics if `children` is empty — a composite loader with no members
    /// can never resolve anything, which almost always indicates a wiring bug.
    pub fn new(children: Vec<Arc<dyn StructureDefinitionLoader>>) -> Self {
        assert!(
            !children.is_empty(),
            "CompositeLoader requires at least one child loader"
        );
        Self { children }
    }
}

#[async_trait]
impl StructureDefinitionLoader for CompositeLoader {
    async fn load(&self, url: &str) -> Result<Option<StructureDefinition>> {
        for child in &self.children {
            if !child.can_load(url) {
                continue;
            }
            if let Some(sd) = child.load(url).await? {
                return Ok(Some(sd));
            }
        }
        Ok(None)
    }

    fn source_type(&self) -> &str {
        "composite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conform_models::common::{StructureDefinitionKind, TypeDerivationRule};
    use std::collections::HashMap;

    fn sd(url: &str) -> StructureDefinition {
        StructureDefinition {
            id: None,
            url: url.to_string(),
            version: None,
            name: "Test".to_string(),
            title: None,
            status: None,
            is_abstract: false,
            kind: StructureDefinitionKind::Resource,
            type_name: "Patient".to_string(),
            base_definition: None,
            derivation: Some(TypeDerivationRule::Specialization),
            snapshot: None,
            differential: None,
            extensions: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn in_memory_loader_resolves_registered_url() {
        let loader = InMemoryLoader::new().with(sd("http://example.org/a"));
        let found = loader.load("http://example.org/a").await.unwrap();
        assert!(found.is_some());
        assert!(loader.load("http://example.org/b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn composite_loader_tries_children_in_order() {
        let first = Arc::new(InMemoryLoader::new());
        let second = Arc::new(InMemoryLoader::new().with(sd("http://example.org/a")));
        let composite = CompositeLoader::new(vec![first, second]);

        let found = composite.load("http://example.org/a").await.unwrap();
        assert!(found.is_some());
        assert!(composite
            .load("http://example.org/missing")
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    #[should_panic(expected = "at least one child")]
    fn composite_loader_requires_a_child() {
        let _ = CompositeLoader::new(vec![]);
    }
}
