//! The conformance registry: storage, lookup, and inheritance-chain resolution
//! for `StructureDefinition`s (component 1, §4.1).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use conform_models::common::StructureDefinition;

use crate::error::{Error, Result};
use crate::loader::StructureDefinitionLoader;

/// Trait for synchronous, post-load access to registered conformance resources.
/// Kept separate from [`FhirContext`] so callers that only need read access
/// (the snapshot generator, the FHIRPath `%resource` plumbing) can depend on
/// the trait object rather than the concrete registry.
pub trait FhirContext: Send + Sync {
    fn get_structure_definition(&self, key: &str) -> Result<Option<Arc<StructureDefinition>>>;
    fn resolve_inheritance_chain(&self, url: &str) -> Result<Arc<Vec<String>>>;
}

fn parse_key(key: &str) -> (&str, Option<&str>) {
    match key.split_once('|') {
        Some((url, version)) => (url, Some(version)),
        None => (key, None),
    }
}

/// In-process registry. Two indices (primary by `url|version`, latest by bare
/// `url`) plus a memoized inheritance-chain cache, as described in §4.1/§5.
pub struct Registry {
    primary: RwLock<HashMap<String, Arc<StructureDefinition>>>,
    /// bare url -> most recently registered versioned key
    latest: RwLock<HashMap<String, String>>,
    /// bare url -> versioned keys in registration order, oldest first
    versions: RwLock<HashMap<String, Vec<String>>>,
    chain_cache: RwLock<HashMap<String, Arc<Vec<String>>>>,
    loader: Option<Arc<dyn StructureDefinitionLoader>>,
    disposed: std::sync::atomic::AtomicBool,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            primary: RwLock::new(HashMap::new()),
            latest: RwLock::new(HashMap::new()),
            versions: RwLock::new(HashMap::new()),
            chain_cache: RwLock::new(HashMap::new()),
            loader: None,
            disposed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn with_loader(loader: Arc<dyn StructureDefinitionLoader>) -> Self {
        Self {
            loader: Some(loader),
            ..Self::new()
        }
    }

    fn check_alive(&self) -> Result<()> {
        if self.disposed.load(std::sync::atomic::Ordering::Acquire) {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    /// Register a `StructureDefinition` under its canonical key (`url|version`
    /// or bare `url` when unversioned).
    pub fn register(&self, sd: StructureDefinition) -> Result<()> {
        self.check_alive()?;
        if sd.url.is_empty() {
            return Err(Error::InvalidStructureDefinition {
                url: None,
                reason: "missing url".to_string(),
            });
        }
        let key = sd.canonical_key();
        let url = sd.url.clone();
        let version = sd.version.clone();

        tracing::debug!(key = %key, "registering StructureDefinition");

        self.primary.write().unwrap().insert(key.clone(), Arc::new(sd));

        if version.is_some() {
            self.latest.write().unwrap().insert(url.clone(), key.clone());
            self.versions.write().unwrap().entry(url.clone()).or_default().push(key);
        }

        self.invalidate_url(&url);
        Ok(())
    }

    /// Get a `StructureDefinition` by key, parsing `url|version` and falling
    /// back to the latest-registered version for a bare url.
    pub fn get(&self, key: &str) -> Result<Option<Arc<StructureDefinition>>> {
        self.check_alive()?;
        let (url, version) = parse_key(key);
        let primary = self.primary.read().unwrap();
        if let Some(version) = version {
            return Ok(primary.get(&format!("{url}|{version}")).cloned());
        }
        let latest = self.latest.read().unwrap();
        if let Some(latest_key) = latest.get(url) {
            return Ok(primary.get(latest_key).cloned());
        }
        Ok(primary.get(url).cloned())
    }

    /// Delete a key. Deleting the current latest version of a url promotes
    /// the next most-recently-registered version (if any) to latest.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.check_alive()?;
        let (url, version) = parse_key(key);

        if let Some(version) = version {
            let full_key = format!("{url}|{version}");
            self.primary.write().unwrap().remove(&full_key);

            let mut versions = self.versions.write().unwrap();
            if let Some(list) = versions.get_mut(url) {
                list.retain(|k| k != &full_key);
                let mut latest = self.latest.write().unwrap();
                if latest.get(url).map(|k| k.as_str()) == Some(full_key.as_str()) {
                    match list.last() {
                        Some(next) => {
                            latest.insert(url.to_string(), next.clone());
                        }
                        None => {
                            latest.remove(url);
                        }
                    }
                }
            }
        } else {
            self.primary.write().unwrap().remove(url);
        }

        self.invalidate_url(url);
        Ok(())
    }

    /// Drop every cached inheritance chain that mentions `url`.
    fn invalidate_url(&self, url: &str) {
        let mut cache = self.chain_cache.write().unwrap();
        cache.retain(|_, chain| !chain.iter().any(|u| u == url));
    }

    /// Register a resource obtained from the async loader chain and return it.
    pub async fn resolve(&self, url: &str) -> Result<Arc<StructureDefinition>> {
        self.check_alive()?;
        if let Some(found) = self.get(url)? {
            return Ok(found);
        }
        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| Error::ResourceNotFound {
                url: url.to_string(),
                tried_sources: vec![],
            })?;
        match loader.load(url).await? {
            Some(sd) => {
                self.register(sd)?;
                Ok(self.get(url)?.expect("just registered"))
            }
            None => Err(Error::ResourceNotFound {
                url: url.to_string(),
                tried_sources: vec![loader.source_type().to_string()],
            }),
        }
    }

    /// Mark the registry permanently unusable; every subsequent operation
    /// fails with [`Error::Disposed`].
    pub fn dispose(&self) {
        tracing::info!("disposing registry");
        self.disposed.store(true, std::sync::atomic::Ordering::Release);
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl FhirContext for Registry {
    fn get_structure_definition(&self, key: &str) -> Result<Option<Arc<StructureDefinition>>> {
        self.get(key)
    }

    fn resolve_inheritance_chain(&self, url: &str) -> Result<Arc<Vec<String>>> {
        self.check_alive()?;
        if let Some(cached) = self.chain_cache.read().unwrap().get(url) {
            return Ok(cached.clone());
        }

        let mut chain = Vec::new();
        let mut visited = std::collections::HashSet::new();
        let mut current = url.to_string();

        loop {
            if !visited.insert(current.clone()) {
                chain.push(current);
                return Err(Error::CircularDependency { chain });
            }
            chain.push(current.clone());

            let sd = self.get(&current)?.ok_or_else(|| Error::ResourceNotFound {
                url: current.clone(),
                tried_sources: vec!["registry".to_string()],
            })?;

            match &sd.base_definition {
                Some(base) => current = base.clone(),
                None => break,
            }
        }

        let chain = Arc::new(chain);
        self.chain_cache
            .write()
            .unwrap()
            .insert(url.to_string(), chain.clone());
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conform_models::common::{StructureDefinitionKind, TypeDerivationRule};
    use std::collections::HashMap as StdHashMap;

    fn sd(url: &str, version: Option<&str>, base: Option<&str>) -> StructureDefinition {
        StructureDefinition {
            id: None,
            url: url.to_string(),
            version: version.map(|v| v.to_string()),
            name: "Test".to_string(),
            title: None,
            status: None,
            is_abstract: false,
            kind: StructureDefinitionKind::Resource,
            type_name: "Patient".to_string(),
            base_definition: base.map(|b| b.to_string()),
            derivation: Some(if base.is_some() {
                TypeDerivationRule::Constraint
            } else {
                TypeDerivationRule::Specialization
            }),
            snapshot: None,
            differential: None,
            extensions: StdHashMap::new(),
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        let registry = Registry::new();
        registry.register(sd("http://example.org/a", None, None)).unwrap();
        let found = registry.get("http://example.org/a").unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn bare_get_returns_latest_registered_version() {
        let registry = Registry::new();
        registry
            .register(sd("http://example.org/a", Some("1.0.0"), None))
            .unwrap();
        registry
            .register(sd("http://example.org/a", Some("2.0.0"), None))
            .unwrap();

        let found = registry.get("http://example.org/a").unwrap().unwrap();
        assert_eq!(found.version.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn deleting_latest_version_promotes_next_latest() {
        let registry = Registry::new();
        registry
            .register(sd("http://example.org/a", Some("1.0.0"), None))
            .unwrap();
        registry
            .register(sd("http://example.org/a", Some("2.0.0"), None))
            .unwrap();

        registry.delete("http://example.org/a|2.0.0").unwrap();

        let found = registry.get("http://example.org/a").unwrap().unwrap();
        assert_eq!(found.version.as_deref(), Some("1.0.0"));

        registry.delete("http://example.org/a|1.0.0").unwrap();
        assert!(registry.get("http://example.org/a").unwrap().is_none());
    }

    #[test]
    fn resolves_inheritance_chain_to_root() {
        let registry = Registry::new();
        registry.register(sd("http://example.org/root", None, None)).unwrap();
        registry
            .register(sd("http://example.org/mid", None, Some("http://example.org/root")))
            .unwrap();
        registry
            .register(sd("http://example.org/leaf", None, Some("http://example.org/mid")))
            .unwrap();

        let chain = registry.resolve_inheritance_chain("http://example.org/leaf").unwrap();
        assert_eq!(
            *chain,
            vec![
                "http://example.org/leaf".to_string(),
                "http://example.org/mid".to_string(),
                "http://example.org/root".to_string(),
            ]
        );
    }

    #[test]
    fn detects_self_cycle() {
        let registry = Registry::new();
        registry
            .register(sd("http://example.org/a", None, Some("http://example.org/a")))
            .unwrap();

        let result = registry.resolve_inheritance_chain("http://example.org/a");
        assert!(matches!(result, Err(Error::CircularDependency { .. })));
    }

    #[test]
    fn detects_two_cycle() {
        let registry = Registry::new();
        registry
            .register(sd("http://example.org/a", None, Some("http://example.org/b")))
            .unwrap();
        registry
            .register(sd("http://example.org/b", None, Some("http://example.org/a")))
            .unwrap();

        let result = registry.resolve_inheritance_chain("http://example.org/a");
        assert!(matches!(result, Err(Error::CircularDependency { .. })));
    }

    #[test]
    fn operations_fail_after_dispose() {
        let registry = Registry::new();
        registry.register(sd("http://example.org/a", None, None)).unwrap();
        registry.dispose();
        assert!(matches!(registry.get("http://example.org/a"), Err(Error::Disposed)));
    }

    #[test]
    fn invalidating_a_url_drops_chains_that_contain_it() {
        let registry = Registry::new();
        registry.register(sd("http://example.org/root", None, None)).unwrap();
        registry
            .register(sd("http://example.org/leaf", None, Some("http://example.org/root")))
            .unwrap();
        registry.resolve_inheritance_chain("http://example.org/leaf").unwrap();
        assert!(registry
            .chain_cache
            .read()
            .unwrap()
            .contains_key("http://example.org/leaf"));

        registry.delete("http://example.org/root").unwrap();
        assert!(!registry
            .chain_cache
            .read()
            .unwrap()
            .contains_key("http://example.org/leaf"));
    }
}
