//! Global configuration parsing and validation.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

fn default_cli_binary() -> String {
    "claude".to_owned()
}

fn default_model() -> String {
    "sonnet".to_owned()
}

fn default_chunk_limit() -> usize {
    4096
}

fn default_grace_seconds() -> u64 {
    5
}

fn default_db_file() -> PathBuf {
    PathBuf::from("agent-courier.db")
}

/// Subprocess invocation settings for the assistant CLI.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CliConfig {
    /// Assistant CLI binary name or path.
    #[serde(default = "default_cli_binary")]
    pub binary: String,
    /// Model name passed via `--model`.
    #[serde(default = "default_model")]
    pub model: String,
    /// Seconds to wait after a graceful interrupt before force-killing.
    #[serde(default = "default_grace_seconds")]
    pub grace_seconds: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            binary: default_cli_binary(),
            model: default_model(),
            grace_seconds: default_grace_seconds(),
        }
    }
}

/// Top-level daemon configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Assistant CLI settings.
    #[serde(default)]
    pub cli: CliConfig,
    /// Working directory the subprocess runs in.
    pub workspace_root: PathBuf,
    /// `SQLite` database file for the durable session store.
    #[serde(default = "default_db_file")]
    pub db_path: PathBuf,
    /// Maximum length of one outbound chat message.
    #[serde(default = "default_chunk_limit")]
    pub chunk_limit: usize,
}

impl GlobalConfig {
    /// Parse a TOML document and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` on syntax errors or invalid values.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate semantic constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a field is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.cli.binary.trim().is_empty() {
            return Err(AppError::Config("cli.binary must not be empty".into()));
        }
        if self.cli.model.trim().is_empty() {
            return Err(AppError::Config("cli.model must not be empty".into()));
        }
        // Below this the chunker cannot even hold a repaired tag pair.
        if self.chunk_limit < 64 {
            return Err(AppError::Config(format!(
                "chunk_limit too small: {} (minimum 64)",
                self.chunk_limit
            )));
        }
        Ok(())
    }

    /// Resolved database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
