//! Client configuration.
//!
//! Values are resolved in this order:
//! - explicit values, from code or the TOML config file
//! - environment variables
//! - defaults
//!
//! The API key is never written to logs; the [`fmt::Debug`] output of
//! [`ClientConfig`] redacts it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use conifer_query::QueryConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Control-plane host used when none is configured.
pub const DEFAULT_CONTROLLER_HOST: &str = "https://api.pinecone.io";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "PINECONE_API_KEY";

/// Environment variable holding the control-plane host.
pub const CONTROLLER_HOST_ENV: &str = "PINECONE_CONTROLLER_HOST";

/// Environment variable holding extra request headers as a JSON object.
pub const ADDITIONAL_HEADERS_ENV: &str = "PINECONE_ADDITIONAL_HEADERS";

/// Configuration for a [`crate::Client`].
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API key sent with every request.
    pub api_key: String,
    /// Control-plane host. Empty means [`DEFAULT_CONTROLLER_HOST`].
    pub controller_host: String,
    /// Value of the API version header.
    pub api_version: String,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// Extra headers attached to every request.
    pub additional_headers: BTreeMap<String, String>,
    /// Multi-namespace query settings.
    pub query: QueryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            controller_host: String::new(),
            api_version: conifer_query::http::API_VERSION.to_string(),
            timeout_seconds: 30,
            additional_headers: BTreeMap::new(),
            query: QueryConfig::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("ClientConfig")
            .field("api_key", &api_key)
            .field("controller_host", &self.controller_host)
            .field("api_version", &self.api_version)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("additional_headers", &self.additional_headers)
            .field("query", &self.query)
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration with the given API key and defaults elsewhere.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Default configuration completed from the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Fill values left empty from environment variables.
    ///
    /// `lookup` returns the value of an environment variable, if set.
    /// Explicit values always win over the environment. Headers from
    /// [`ADDITIONAL_HEADERS_ENV`] are added only where the config has no
    /// header of the same name.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_empty() {
            if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
                self.api_key = key.trim().to_string();
            }
        }
        if self.controller_host.is_empty() {
            if let Some(host) = lookup(CONTROLLER_HOST_ENV).filter(|v| !v.trim().is_empty()) {
                self.controller_host = host;
            }
        }
        if let Some(raw) = lookup(ADDITIONAL_HEADERS_ENV) {
            match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(headers) => {
                    for (name, value) in headers {
                        self.additional_headers.entry(name).or_insert(value);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring malformed {ADDITIONAL_HEADERS_ENV}");
                }
            }
        }
        self
    }

    /// Normalised control-plane host.
    pub fn controller_host(&self) -> String {
        if self.controller_host.trim().is_empty() {
            DEFAULT_CONTROLLER_HOST.to_string()
        } else {
            normalize_host(&self.controller_host)
        }
    }

    /// HTTP request timeout as a [`std::time::Duration`].
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `api_key` is present
    /// - `api_version` is present
    /// - `timeout_seconds` is greater than 0
    /// - the `query` table is valid
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ClientError::Config(format!(
                "api_key is required; set it in the config file or the {API_KEY_ENV} environment variable"
            )));
        }
        if self.api_version.trim().is_empty() {
            return Err(ClientError::Config("api_version must not be empty".into()));
        }
        if self.timeout_seconds == 0 {
            return Err(ClientError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        self.query.validate()?;
        Ok(())
    }

    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ClientError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/conifer/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("conifer"))
            .unwrap_or_else(|| PathBuf::from("/tmp/conifer-config"))
            .join("config.toml")
    }
}

/// Normalise a host to a base URL.
///
/// A host without a scheme gets `https://`; `http://` and `https://` hosts
/// keep theirs. Surrounding whitespace and trailing slashes are removed.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() || host.starts_with("https://") || host.starts_with("http://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}
