//! Configuration module
//!
//! Lookup order for the config file:
//! 1. `--config` / `KAIZEN_CONFIG`
//! 2. `.kaizen/config.toml`, walking up from the working directory
//! 3. `~/.kaizen/config.toml`
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::search::SearchSettings;
use crate::core::storage::Store;

/// Directory holding config and database, locally or in the home directory
pub const KAIZEN_DIR: &str = ".kaizen";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub user: UserConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Recorded as `resolved_by` on conflict records
    #[serde(default = "default_user_name")]
    pub name: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: default_user_name(),
        }
    }
}

fn default_user_name() -> String {
    "AI".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Database file; discovered when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_tags_weight")]
    pub tags_weight: f32,

    #[serde(default = "default_content_weight")]
    pub content_weight: f32,

    #[serde(default = "default_min_relevance")]
    pub min_relevance: f32,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tags_weight: default_tags_weight(),
            content_weight: default_content_weight(),
            min_relevance: default_min_relevance(),
            max_results: default_max_results(),
        }
    }
}

fn default_tags_weight() -> f32 {
    1.0
}

fn default_content_weight() -> f32 {
    0.4
}

fn default_min_relevance() -> f32 {
    0.4
}

fn default_max_results() -> usize {
    50
}

impl SearchConfig {
    pub fn settings(&self) -> SearchSettings {
        SearchSettings {
            tags_weight: self.tags_weight,
            content_weight: self.content_weight,
            min_relevance: self.min_relevance,
            max_results: self.max_results,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.tags_weight < 0.0 || self.content_weight < 0.0 {
            bail!("search weights must not be negative");
        }
        if self.min_relevance < 0.0 {
            bail!("search.min_relevance must not be negative");
        }
        if self.max_results == 0 {
            bail!("search.max_results must be at least 1");
        }
        Ok(())
    }
}

impl Config {
    /// Load config, preferring an explicit path
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Some(local) = Self::find_local_config() {
            return Self::load_from(&local);
        }

        if let Some(global) = Self::global_config_path() {
            if global.exists() {
                return Self::load_from(&global);
            }
        }

        Ok(Self::default())
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.search.validate()?;
        Ok(config)
    }

    /// Save config to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Find the nearest `.kaizen` directory walking up from the working directory
    pub fn find_local_dir() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let dir = current.join(KAIZEN_DIR);
            if dir.is_dir() {
                return Some(dir);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    pub fn find_local_config() -> Option<PathBuf> {
        Self::find_local_dir()
            .map(|dir| dir.join("config.toml"))
            .filter(|path| path.exists())
    }

    /// `~/.kaizen`
    pub fn global_dir() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(KAIZEN_DIR))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Database path with priority:
    /// 1. KAIZEN_DATABASE env var
    /// 2. `[store] path`
    /// 3. Local `.kaizen/data.db` (walking up from CWD)
    /// 4. Global `~/.kaizen/data.db`
    pub fn database_path(&self) -> PathBuf {
        if let Ok(env_path) = std::env::var("KAIZEN_DATABASE") {
            return PathBuf::from(env_path);
        }

        if let Some(path) = &self.store.path {
            return path.clone();
        }

        if let Some(local) = Self::find_local_dir() {
            return local.join("data.db");
        }

        if let Some(global) = Self::global_dir() {
            return global.join("data.db");
        }

        PathBuf::from(KAIZEN_DIR).join("data.db")
    }

    /// Open the store with this config's search settings
    pub fn open_store(&self) -> Result<Store> {
        let path = self.database_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let store = Store::open(&path)
            .with_context(|| format!("opening database {}", path.display()))?;
        Ok(store.with_search_settings(self.search.settings()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.user.name, "AI");
        assert!(config.store.path.is_none());
        assert_eq!(config.search.settings(), SearchSettings::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[user]\nname = \"alice\"\n\n[search]\nmax_results = 10\n",
        )?;

        let config = Config::load(Some(&path))?;
        assert_eq!(config.user.name, "alice");
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.search.tags_weight, 1.0);
        assert_eq!(config.search.min_relevance, 0.4);
        Ok(())
    }

    #[test]
    fn test_invalid_search_settings_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\nmax_results = 0\n")?;

        assert!(Config::load_from(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.store.path = Some(dir.path().join("custom.db"));
        config.save_to(&path)?;

        let loaded = Config::load_from(&path)?;
        assert_eq!(loaded.store.path, config.store.path);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/kaizen.toml"))).is_err());
    }
}
