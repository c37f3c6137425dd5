//! Configuration for the mock server.
//!
//! Settings come from an optional YAML file and are overridden by CLI flags.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration for the mock server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Path of the database file
    #[serde(default = "default_db")]
    pub db: PathBuf,

    /// Load the database once at startup instead of on every request
    #[serde(default)]
    pub static_mode: bool,

    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Response header settings
    #[serde(default)]
    pub cors: CorsSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db: default_db(),
            static_mode: false,
            listen: default_listen(),
            cors: CorsSettings::default(),
        }
    }
}

fn default_db() -> PathBuf {
    PathBuf::from("db.json")
}

fn default_listen() -> String {
    "0.0.0.0:3000".to_string()
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.db.as_os_str().is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }
        self.listen_addr()?;
        self.cors.validate()?;
        Ok(())
    }

    /// Parsed listen address.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {}", self.listen, e))
    }
}

/// Headers attached to every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsSettings {
    /// Value of the `Access-Control-Allow-Header` header
    #[serde(default = "default_allow_headers")]
    pub allow_headers: String,

    /// Value of the `Content-Type` header
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Echo the request `Origin` as `Access-Control-Allow-Origin`
    #[serde(default = "default_true")]
    pub echo_origin: bool,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allow_headers: default_allow_headers(),
            content_type: default_content_type(),
            echo_origin: true,
        }
    }
}

impl CorsSettings {
    /// Validate header values.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.content_type.trim().is_empty() {
            anyhow::bail!("Content type cannot be empty");
        }
        for (name, value) in [
            ("allow_headers", &self.allow_headers),
            ("content_type", &self.content_type),
        ] {
            axum::http::HeaderValue::from_str(value)
                .map_err(|e| anyhow::anyhow!("Invalid {} header value: {}", name, e))?;
        }
        Ok(())
    }
}

fn default_allow_headers() -> String {
    "Content-Type, X-Requested-With".to_string()
}

fn default_content_type() -> String {
    "application/json; charset=utf-8".to_string()
}

fn default_true() -> bool {
    true
}
