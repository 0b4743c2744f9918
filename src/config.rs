//! Configuration Management
//!
//! Handles persistent configuration storage for cloudctl and builds the
//! per-invocation [`SessionContext`].

use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;
use uuid::Uuid;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the remote appliance
    #[serde(default)]
    pub url: Option<String>,
    /// Bearer token for the remote
    #[serde(default)]
    pub access_token: Option<String>,
    /// Output format used when no --json/--yaml/--csv flag is given
    #[serde(default)]
    pub default_format: Option<OutputFormat>,
    /// Default page size for list commands
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Verify TLS certificates
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

fn default_verify_tls() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: None,
            access_token: None,
            default_format: None,
            page_size: None,
            verify_tls: true,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudctl").join("config.json"))
    }

    /// Load configuration from the default location. A missing or unreadable
    /// file yields the defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit file; errors are reported
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| CliError::Config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Effective remote URL (CLI/env > config)
    pub fn effective_url(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.url.clone())
    }

    /// Effective access token (CLI/env > config)
    pub fn effective_token(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.access_token.clone())
    }

    pub fn effective_format(&self) -> OutputFormat {
        self.default_format.unwrap_or_default()
    }
}

/// Connection details for one invocation, handed to the API client
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub base_url: Url,
    pub access_token: Option<String>,
    pub request_id: String,
    pub verify_tls: bool,
}

impl SessionContext {
    pub fn new(base_url: &str, access_token: Option<String>) -> CliResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| CliError::Config(format!("invalid remote url '{}': {}", base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(CliError::Config(format!(
                "remote url must be http or https, got '{}'",
                base_url.scheme()
            )));
        }
        Ok(Self {
            base_url,
            access_token,
            request_id: Uuid::new_v4().to_string(),
            verify_tls: true,
        })
    }

    /// Build the session from config plus CLI/env values
    pub fn from_config(config: &Config, url: Option<&str>, token: Option<&str>) -> CliResult<Self> {
        let Some(url) = config.effective_url(url) else {
            return Err(CliError::Config(
                "no remote configured. Set CLOUDCTL_URL or use --remote-url".to_string(),
            ));
        };
        let mut session = Self::new(&url, config.effective_token(token))?;
        session.verify_tls = config.verify_tls;
        Ok(session)
    }
}
