//! Renderer configuration, stored as YAML.
//!
//! ```yaml
//! cache:
//!   enabled: true
//!   capacity: 50
//! autoescape: false
//! template_dirs: [templates]
//! extensions: [html, tera]
//! ```
//!
//! Every field is optional; missing fields take their [`Default`] value.
//! Relative `template_dirs` are resolved against the directory holding the
//! config file when it is read with [`Config::load_at`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::loader::DirLoader;

/// Capacity used when a config does not name one.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    /// Escape HTML in every rendered expression.
    pub autoescape: bool,
    /// Base directories for a [`DirLoader`], searched in order.
    pub template_dirs: Vec<PathBuf>,
    /// Extension allow-list for the directory loader. Empty accepts all.
    pub extensions: Vec<String>,
}

/// Composed-template cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum number of cached templates; `0` means unbounded.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            autoescape: false,
            template_dirs: Vec::new(),
            extensions: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a config from YAML text. Relative paths are kept as written.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    /// Read and parse the config at `path`.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(dir) = path.parent() {
            config.resolve_dirs(dir);
        }
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Directory loader described by this config, if any directory is set.
    pub fn dir_loader(&self) -> Option<DirLoader> {
        if self.template_dirs.is_empty() {
            return None;
        }
        Some(DirLoader::with_bases(self.template_dirs.iter().cloned()).with_extensions(&self.extensions))
    }

    fn resolve_dirs(&mut self, root: &Path) {
        for dir in &mut self.template_dirs {
            if dir.is_relative() {
                *dir = root.join(&*dir);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml_str("  \n").unwrap(), Config::default());
    }

    #[test]
    fn partial_document_fills_defaults() {
        let cfg = Config::from_yaml_str("cache:\n  enabled: true\n").unwrap();
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.cache.capacity, DEFAULT_CACHE_CAPACITY);
        assert!(!cfg.autoescape);
    }

    #[test]
    fn no_dirs_means_no_dir_loader() {
        assert!(Config::default().dir_loader().is_none());
    }
}
