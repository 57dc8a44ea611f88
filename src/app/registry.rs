//! Location registry loaded from static YAML configuration
//!
//! The registry file maps human-readable display names to cache aliases
//! under a `cities` key:
//!
//! ```yaml
//! cities:
//!   Santiago: "stgo"
//!   Buenos Aires: "bsas"
//! ```
//!
//! It is read once at startup and never changes afterwards. Anything wrong
//! with it is a [`ConfigError`] and stops the process before it serves.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::app::cache::keys;
use crate::errors::{ConfigError, ConfigResult};

/// A configured location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// External identifier used by API callers
    pub display_name: String,
    /// Identifier used to build the weather cache key and the provider query
    pub alias: String,
}

impl Location {
    /// Create a location from its display name and alias
    pub fn new(display_name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            alias: alias.into(),
        }
    }

    /// Cache key holding this location's latest weather snapshot
    pub fn weather_key(&self) -> String {
        keys::weather_key(&self.alias)
    }

    /// Cache key holding this location's latest provider error message
    pub fn error_key(&self) -> String {
        keys::error_key(&self.display_name)
    }

    /// Value sent as the provider's `location` query parameter
    pub fn provider_query(&self) -> &str {
        self.alias.trim()
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    cities: Option<BTreeMap<String, String>>,
}

/// Immutable set of configured locations
#[derive(Debug, Clone)]
pub struct LocationRegistry {
    locations: Vec<Location>,
    by_name: HashMap<String, usize>,
    source: PathBuf,
}

impl LocationRegistry {
    /// Load the registry from a YAML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed,
    /// lacks a non-empty `cities` mapping, or reuses an alias.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let registry = Self::from_yaml_str(&content, path)?;
        info!(
            "Loaded {} locations from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Parse registry content; `source` is only used in error messages
    pub fn from_yaml_str(content: &str, source: &Path) -> ConfigResult<Self> {
        let invalid = |reason: String| ConfigError::InvalidRegistry {
            path: source.to_path_buf(),
            reason,
        };

        let file: RegistryFile =
            serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))?;
        let cities = file
            .cities
            .ok_or_else(|| invalid("missing 'cities' mapping".to_string()))?;

        Self::from_pairs(cities, source)
    }

    /// Build a registry from `(display name, alias)` pairs
    pub fn from_pairs<I, N, A>(pairs: I, source: &Path) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (N, A)>,
        N: Into<String>,
        A: Into<String>,
    {
        let mut locations: Vec<Location> = Vec::new();
        let mut by_name = HashMap::new();
        let mut by_alias: HashMap<String, String> = HashMap::new();

        for (name, alias) in pairs {
            let location = Location::new(name, alias);

            if location.display_name.trim().is_empty() {
                return Err(ConfigError::InvalidRegistry {
                    path: source.to_path_buf(),
                    reason: "empty location name".to_string(),
                });
            }
            if location.alias.trim().is_empty() {
                return Err(ConfigError::InvalidRegistry {
                    path: source.to_path_buf(),
                    reason: format!("empty alias for '{}'", location.display_name),
                });
            }
            if by_name.contains_key(&location.display_name) {
                return Err(ConfigError::InvalidRegistry {
                    path: source.to_path_buf(),
                    reason: format!("duplicate location '{}'", location.display_name),
                });
            }

            let trimmed = location.alias.trim().to_string();
            if let Some(first) = by_alias.get(&trimmed) {
                return Err(ConfigError::DuplicateAlias {
                    alias: trimmed,
                    first: first.clone(),
                    second: location.display_name,
                });
            }
            by_alias.insert(trimmed, location.display_name.clone());

            debug!(
                "Registered location '{}' as {}",
                location.display_name,
                location.weather_key()
            );
            by_name.insert(location.display_name.clone(), locations.len());
            locations.push(location);
        }

        if locations.is_empty() {
            return Err(ConfigError::InvalidRegistry {
                path: source.to_path_buf(),
                reason: "no locations configured".to_string(),
            });
        }

        Ok(Self {
            locations,
            by_name,
            source: source.to_path_buf(),
        })
    }

    /// All configured locations, in registry order
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Display names of all configured locations
    pub fn display_names(&self) -> Vec<&str> {
        self.locations
            .iter()
            .map(|l| l.display_name.as_str())
            .collect()
    }

    /// Look up a location by its display name
    pub fn get(&self, display_name: &str) -> Option<&Location> {
        self.by_name
            .get(display_name)
            .map(|&index| &self.locations[index])
    }

    /// Alias configured for a display name
    pub fn alias_for(&self, display_name: &str) -> Option<&str> {
        self.get(display_name).map(|l| l.alias.as_str())
    }

    /// Number of configured locations
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the registry is empty (never true for a loaded registry)
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// File the registry was loaded from
    pub fn source(&self) -> &Path {
        &self.source
    }
}
