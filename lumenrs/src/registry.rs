use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glob::glob;

use crate::error::{LumenError, Result};
use crate::explore::Explore;
use crate::validation::validate_explore;

/// Compiled explores available for querying, keyed by name.
#[derive(Debug, Default, Clone)]
pub struct ExploreRegistry {
    pub explores: HashMap<String, Explore>,
}

impl ExploreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from already-loaded explores, validating each one.
    pub fn from_explores(explores: Vec<Explore>) -> Result<Self> {
        let mut registry = ExploreRegistry::new();
        for explore in explores {
            registry.insert(explore)?;
        }
        Ok(registry)
    }

    /// Load every `*.yml` / `*.yaml` explore file in `root`.
    pub fn load_from_dir<P: AsRef<Path>>(root: P) -> Result<Self> {
        let dir = root.as_ref();
        if !dir.exists() {
            return Err(LumenError::Validation(format!(
                "explores directory not found: {}",
                dir.display()
            )));
        }

        let mut registry = ExploreRegistry::new();
        for pattern in ["*.yml", "*.yaml"] {
            for entry in glob(&format!("{}/{pattern}", dir.display()))
                .map_err(|e| LumenError::Other(e.into()))?
                .flatten()
            {
                registry.load_explore_file(&entry)?;
            }
        }
        tracing::debug!(dir = %dir.display(), count = registry.explores.len(), "loaded explores");
        Ok(registry)
    }

    fn load_explore_file(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        let explore: Explore = serde_yaml::from_str(&contents)?;
        tracing::trace!(path = %path.display(), explore = %explore.name, "parsed explore file");
        self.insert(explore)
    }

    fn insert(&mut self, explore: Explore) -> Result<()> {
        validate_explore(&explore)?;
        if self.explores.contains_key(&explore.name) {
            return Err(LumenError::Validation(format!(
                "duplicate explore {}",
                explore.name
            )));
        }
        self.explores.insert(explore.name.clone(), explore);
        Ok(())
    }

    pub fn get_explore(&self, name: &str) -> Option<&Explore> {
        self.explores.get(name)
    }

    /// Registered explores sorted by name.
    pub fn explores(&self) -> Vec<&Explore> {
        let mut explores: Vec<&Explore> = self.explores.values().collect();
        explores.sort_by(|a, b| a.name.cmp(&b.name));
        explores
    }
}
