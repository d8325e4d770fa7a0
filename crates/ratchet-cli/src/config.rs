//! Configuration types and parsing for ratchet.yml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Main project configuration from ratchet.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Directory containing the migration SQL files
    #[serde(default = "default_migrations_path")]
    pub migrations_path: String,

    /// Name of the version tracking table
    #[serde(default = "default_version_table")]
    pub version_table: String,

    /// Name of the migration lock table
    #[serde(default = "default_lock_table")]
    pub lock_table: String,

    /// Default worker count for partitioned DML migrations
    #[serde(default = "default_concurrency")]
    pub partitioned_concurrency: usize,

    /// Migration sequence numbering
    #[serde(default)]
    pub sequence: SequenceConfig,

    /// Database backend selection
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Version numbering for `migrate create`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// New versions are multiples of this interval
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Width of the zero-padded version prefix
    #[serde(default = "default_zero_prefix_length")]
    pub zero_prefix_length: usize,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            zero_prefix_length: default_zero_prefix_length(),
        }
    }
}

/// Database backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbBackend {
    /// In-process backend, useful for rehearsing a migration directory
    #[default]
    Memory,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Backend type
    #[serde(rename = "type", default)]
    pub backend: DbBackend,
}

fn default_migrations_path() -> String {
    "migrations".to_string()
}

fn default_version_table() -> String {
    ratchet_engine::options::DEFAULT_VERSION_TABLE.to_string()
}

fn default_lock_table() -> String {
    ratchet_engine::options::DEFAULT_LOCK_TABLE.to_string()
}

fn default_concurrency() -> usize {
    1
}

fn default_interval() -> u64 {
    10
}

fn default_zero_prefix_length() -> usize {
    6
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory, looking for ratchet.yml
    /// or ratchet.yaml. Falls back to defaults when neither exists, so the
    /// CLI works in a bare directory of SQL files.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let yml = dir.join("ratchet.yml");
        let yaml = dir.join("ratchet.yaml");
        if yml.exists() {
            Self::load(&yml)
        } else if yaml.exists() {
            Self::load(&yaml)
        } else {
            Ok(Self::default_for(dir))
        }
    }

    fn default_for(dir: &Path) -> Self {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ratchet".to_string());
        Self {
            name,
            migrations_path: default_migrations_path(),
            version_table: default_version_table(),
            lock_table: default_lock_table(),
            partitioned_concurrency: default_concurrency(),
            sequence: SequenceConfig::default(),
            database: DatabaseConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            bail!("project name cannot be empty");
        }
        if self.migrations_path.is_empty() {
            bail!("migrations path cannot be empty");
        }
        Ok(())
    }

    /// Absolute migrations directory for a project root
    pub fn migrations_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations_path)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
