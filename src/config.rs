//! Configuration handling for the studio

use crate::rules::{EvaluationOptions, HiddenValuePolicy};
use crate::schema::FieldWidth;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable that overrides the configured store directory
pub const STORE_DIR_ENV: &str = "FORM_STUDIO_STORE_DIR";

const DEFAULT_LOG_FILTER: &str = "form_studio=info";

/// User configuration for the studio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StudioConfig {
    /// Directory holding saved form documents
    pub store_dir: Option<PathBuf>,
    /// How hidden fields feed downstream rules
    pub hidden_value_policy: Option<HiddenValuePolicy>,
    /// Width for new fields added without one
    pub default_field_width: Option<FieldWidth>,
    /// tracing filter directive used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
}

impl StudioConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("io", "formstudio", "form-studio")
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from file
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                let config: StudioConfig = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?;
                Ok(config)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let content = serde_json::to_string_pretty(self)?;
            fs::write(&path, content)?;
        }
        Ok(())
    }

    /// Store directory: env override, then config, then the platform data dir
    pub fn store_dir(&self) -> Result<PathBuf> {
        self.store_dir_with(std::env::var_os(STORE_DIR_ENV).map(PathBuf::from))
    }

    fn store_dir_with(&self, env_override: Option<PathBuf>) -> Result<PathBuf> {
        env_override
            .filter(|dir| !dir.as_os_str().is_empty())
            .or_else(|| self.store_dir.clone())
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join("forms")))
            .context("No store directory configured and no home directory found")
    }

    pub fn evaluation_options(&self) -> EvaluationOptions {
        EvaluationOptions {
            hidden_values: self.hidden_value_policy.unwrap_or_default(),
        }
    }

    pub fn default_field_width(&self) -> FieldWidth {
        self.default_field_width.unwrap_or_default()
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}
