//! Configuration loading and management
//!
//! Handles parsing of `.taskbox.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the root directory
pub const CONFIG_FILE: &str = ".taskbox.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Projects configuration
    #[serde(default)]
    pub projects: ProjectsConfig,

    /// Tasks configuration
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Where collections live and how eagerly they are flushed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory, relative to the root directory unless absolute
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,

    /// Idle time before pending writes are flushed
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".taskbox")
}

fn default_quiet_period_ms() -> u64 {
    3000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            quiet_period_ms: default_quiet_period_ms(),
        }
    }
}

impl StorageConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// Data directory resolved against `root`
    pub fn data_dir(&self, root: &Path) -> PathBuf {
        if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            root.join(&self.dir)
        }
    }
}

/// Default project seeding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsConfig {
    /// Create the default project when the project collection is empty
    #[serde(default = "default_true")]
    pub seed_default: bool,

    #[serde(default = "default_project_id")]
    pub default_id: String,

    #[serde(default = "default_project_name")]
    pub default_name: String,
}

fn default_true() -> bool {
    true
}

fn default_project_id() -> String {
    "prj-inbox".to_string()
}

fn default_project_name() -> String {
    "Inbox".to_string()
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            seed_default: true,
            default_id: default_project_id(),
            default_name: default_project_name(),
        }
    }
}

/// Tasks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Prefix for generated task IDs
    #[serde(default = "default_task_id_prefix")]
    pub id_prefix: String,
}

fn default_task_id_prefix() -> String {
    "task".to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_task_id_prefix(),
        }
    }
}

impl Config {
    /// Load configuration from a `.taskbox.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the root directory, or return defaults
    pub fn load_from_dir(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.storage.validate()?;
        self.projects.validate()?;
        self.tasks.validate()?;
        Ok(())
    }
}

impl StorageConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.quiet_period_ms == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "storage.quiet_period_ms must be > 0".to_string(),
            ));
        }
        if self.dir.as_os_str().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "storage.dir cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl ProjectsConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.default_id.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "projects.default_id cannot be empty".to_string(),
            ));
        }
        if self.default_name.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "projects.default_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl TasksConfig {
    fn validate(&self) -> crate::error::Result<()> {
        let prefix = self.id_prefix.trim();
        if prefix.is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "tasks.id_prefix cannot be empty".to_string(),
            ));
        }
        if !prefix.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(crate::error::Error::InvalidConfig(
                "tasks.id_prefix must be alphanumeric".to_string(),
            ));
        }
        Ok(())
    }
}
