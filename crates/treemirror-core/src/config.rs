//! Configuration module for treemirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{AccountName, ContentLayout};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for treemirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub account: AccountConfig,
}

/// Where metadata and cached content are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database holding the node tree.
    pub database: PathBuf,
    /// Directory under which each account's cached bytes live.
    pub content_root: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `pretty` or `json`.
    pub format: String,
}

/// Account selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account used when the command line does not name one.
    pub default: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/treemirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("treemirror")
            .join("config.yaml")
    }

    /// Local content layout described by `storage.content_root`.
    pub fn content_layout(&self) -> ContentLayout {
        ContentLayout::new(self.storage.content_root.clone())
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("treemirror")
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            database: data_dir.join("treemirror.db"),
            content_root: data_dir.join("files"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"logging.level"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["pretty", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- storage ---
        if self.storage.database.file_name().is_none() {
            errors.push(ValidationError {
                field: "storage.database".into(),
                message: format!(
                    "must name a database file: {}",
                    self.storage.database.display()
                ),
            });
        }
        if self.storage.content_root.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.content_root".into(),
                message: "must not be empty".into(),
            });
        } else if self.storage.database.starts_with(&self.storage.content_root) {
            // Purging an account's cached content must never reach the database
            errors.push(ValidationError {
                field: "storage.database".into(),
                message: format!(
                    "must live outside storage.content_root ({})",
                    self.storage.content_root.display()
                ),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}', expected one of: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        // --- account ---
        if let Some(ref name) = self.account.default {
            if let Err(e) = AccountName::new(name.clone()) {
                errors.push(ValidationError {
                    field: "account.default".into(),
                    message: e.to_string(),
                });
            }
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder starting from [`Config::default`].
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- storage ---

    pub fn storage_database(mut self, path: PathBuf) -> Self {
        self.config.storage.database = path;
        self
    }

    pub fn storage_content_root(mut self, path: PathBuf) -> Self {
        self.config.storage.content_root = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- account ---

    pub fn default_account(mut self, name: impl Into<String>) -> Self {
        self.config.account.default = Some(name.into());
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
