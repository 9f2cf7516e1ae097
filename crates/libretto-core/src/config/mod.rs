//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::{ClientOptions, DEFAULT_SERVER_URL};
use crate::error::{Error, Result};
use crate::export::ExportOptions;
use crate::paginate::DEFAULT_PAGE_SIZE;

/// Default directory for export files
pub const DEFAULT_OUTPUT_DIR: &str = "exports";

/// Configuration for libretto
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Media server URL
    pub server_url: String,
    /// Authentication token
    pub token: String,
    /// Directory for exports when no explicit output file is given
    pub output_dir: PathBuf,
    /// Overwrite existing export files
    pub force: bool,
    /// Verbose output
    pub debug: bool,
    /// Only print warnings and errors
    pub quiet: bool,
    /// Also write a log file under `logs/`
    pub enable_logging: bool,
    /// Items requested per page
    pub page_size: usize,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Pause between page requests in milliseconds
    pub page_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: String::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            force: false,
            debug: false,
            quiet: false,
            enable_logging: false,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: 30,
            page_delay_ms: 500,
        }
    }
}

impl Config {
    /// Platform config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("libretto").join("config.json"))
    }

    /// Load config from `path`, writing a default file there first if none exists
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            tracing::info!(path = %path.display(), "Created default configuration file");
            return Ok(config);
        }
        Self::load(path)
    }

    /// Load config from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save config to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check required settings
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(Error::Config(
                "a server token is required (set \"token\" or pass --token)".to_string(),
            ));
        }
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "server URL must start with http:// or https://, got '{}'",
                self.server_url
            )));
        }
        Ok(())
    }

    /// Transport settings derived from this config
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            ..ClientOptions::default()
        }
    }

    /// Export settings derived from this config
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            overwrite: self.force,
            page_size: self.page_size.max(1),
            page_delay: Duration::from_millis(self.page_delay_ms),
            ..ExportOptions::default()
        }
    }
}
