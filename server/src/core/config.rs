use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CLICKHOUSE_DEFAULT_DATABASE, CLICKHOUSE_DEFAULT_MAX_EXECUTION_TIME_SECS,
    CLICKHOUSE_DEFAULT_TIMEOUT_SECS, CLICKHOUSE_DEFAULT_URL, CLICKHOUSE_DEFAULT_USER,
    CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_PORT,
};

// =============================================================================
// File Config (JSON)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// ClickHouse configuration section (from JSON config file)
#[derive(Default, Clone, Deserialize)]
pub struct ClickhouseFileConfig {
    /// ClickHouse HTTP URL (or use FACTLENS_CLICKHOUSE_URL env var)
    pub url: Option<String>,
    /// Database name (default: "default")
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Client-side query deadline in seconds
    pub timeout_secs: Option<u64>,
    /// Server-side `max_execution_time` in seconds
    pub max_execution_time_secs: Option<u64>,
    /// Enable LZ4 compression (default: true)
    pub compression: Option<bool>,
}

impl std::fmt::Debug for ClickhouseFileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickhouseFileConfig")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_execution_time_secs", &self.max_execution_time_secs)
            .field("compression", &self.compression)
            .finish()
    }
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub clickhouse: Option<ClickhouseFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
        }

        if let Some(ch) = other.clickhouse {
            let current = self
                .clickhouse
                .get_or_insert_with(ClickhouseFileConfig::default);
            if ch.url.is_some() {
                current.url = ch.url;
            }
            if ch.database.is_some() {
                current.database = ch.database;
            }
            if ch.user.is_some() {
                current.user = ch.user;
            }
            if ch.password.is_some() {
                current.password = ch.password;
            }
            if ch.timeout_secs.is_some() {
                current.timeout_secs = ch.timeout_secs;
            }
            if ch.max_execution_time_secs.is_some() {
                current.max_execution_time_secs = ch.max_execution_time_secs;
            }
            if ch.compression.is_some() {
                current.compression = ch.compression;
            }
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct ClickhouseConfig {
    pub url: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Client-side deadline for a single query
    pub timeout_secs: u64,
    /// Server-side `max_execution_time`
    pub max_execution_time_secs: u64,
    pub compression: bool,
}

impl ClickhouseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for ClickhouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickhouseConfig")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_execution_time_secs", &self.max_execution_time_secs)
            .field("compression", &self.compression)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub clickhouse: ClickhouseConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.factlens/factlens.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Ok(Self::resolve(cli, file_config))
    }

    /// Layer defaults -> file config -> CLI/env overrides
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_ch = file_config.clickhouse.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let clickhouse = ClickhouseConfig {
            url: cli
                .clickhouse_url
                .clone()
                .or(file_ch.url)
                .unwrap_or_else(|| CLICKHOUSE_DEFAULT_URL.to_string()),
            database: cli
                .clickhouse_database
                .clone()
                .or(file_ch.database)
                .unwrap_or_else(|| CLICKHOUSE_DEFAULT_DATABASE.to_string()),
            user: cli
                .clickhouse_user
                .clone()
                .or(file_ch.user)
                .or_else(|| Some(CLICKHOUSE_DEFAULT_USER.to_string())),
            password: cli.clickhouse_password.clone().or(file_ch.password),
            timeout_secs: cli
                .query_timeout_secs
                .or(file_ch.timeout_secs)
                .unwrap_or(CLICKHOUSE_DEFAULT_TIMEOUT_SECS),
            max_execution_time_secs: file_ch
                .max_execution_time_secs
                .unwrap_or(CLICKHOUSE_DEFAULT_MAX_EXECUTION_TIME_SECS),
            compression: file_ch.compression.unwrap_or(true),
        };

        Self { server, clickhouse }
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }
        if self.clickhouse.url.trim().is_empty() {
            anyhow::bail!("Configuration error: clickhouse.url must not be empty");
        }
        if self.clickhouse.timeout_secs == 0 {
            anyhow::bail!("Configuration error: clickhouse.timeout_secs must be greater than 0");
        }

        if self.clickhouse.max_execution_time_secs > self.clickhouse.timeout_secs {
            tracing::warn!(
                timeout_secs = self.clickhouse.timeout_secs,
                max_execution_time_secs = self.clickhouse.max_execution_time_secs,
                "clickhouse.max_execution_time_secs exceeds timeout_secs, \
                 queries will be abandoned client-side first"
            );
        }

        // No authentication in front of the API
        if is_all_interfaces(&self.server.host) {
            tracing::warn!(
                host = %self.server.host,
                "Binding to all network interfaces. The query API has no authentication."
            );
        }

        Ok(())
    }
}

/// Get the profile config path (~/.factlens/factlens.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}
