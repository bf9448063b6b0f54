//! Configuration loading and path resolution
//!
//! Config file resolution order:
//! 1. Command-line argument (highest priority)
//! 2. `CIVDATA_CONFIG` environment variable
//! 3. `~/.config/civdata/civdata.toml` (platform config dir)
//!
//! A missing file is not fatal: defaults are used and a warning is logged.
//! Secrets (API keys) resolve ENV → TOML via [`resolve_secret`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CIVDATA_CONFIG";

/// Config file name looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "civdata.toml";

/// Complete TOML configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
    pub api_keys: ApiKeysConfig,
    pub http: HttpConfig,
    pub pipeline: PipelineSection,
    pub eligibility: EligibilitySection,
    pub persistence: PersistenceSection,
}

/// `[logging]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[paths]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// SQLite database file (default: `<data dir>/civdata/civdata.db`)
    pub database: Option<PathBuf>,
    /// Root of the offline OpenStates people dataset
    pub dataset_root: Option<PathBuf>,
}

/// `[api_keys]` (environment variables take priority)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiKeysConfig {
    pub congress: Option<String>,
    pub google_civic: Option<String>,
    pub fec: Option<String>,
}

/// `[http]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Token-bucket quota applied per live source
    pub requests_per_second: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: format!("civdata/{}", env!("CARGO_PKG_VERSION")),
            requests_per_second: 5,
        }
    }
}

/// `[pipeline]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSection {
    pub max_concurrent_representatives: usize,
    pub max_in_flight_requests: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_concurrent_representatives: 1,
            max_in_flight_requests: 4,
        }
    }
}

/// `[eligibility]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EligibilitySection {
    pub election_horizon_years: u32,
    pub stale_after_years: u32,
    /// Officials known to have left office before their term ended
    pub departed_officials: Vec<String>,
}

impl Default for EligibilitySection {
    fn default() -> Self {
        Self {
            election_horizon_years: 2,
            stale_after_years: 2,
            departed_officials: Vec::new(),
        }
    }
}

/// `[persistence]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersistenceSection {
    pub overwrite_margin: f64,
    pub low_quality_threshold: f64,
    pub max_lock_wait_ms: u64,
}

impl Default for PersistenceSection {
    fn default() -> Self {
        Self {
            overwrite_margin: 5.0,
            low_quality_threshold: 50.0,
            max_lock_wait_ms: 5000,
        }
    }
}

/// Resolve which config file to read, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("civdata").join(CONFIG_FILE_NAME))
        .filter(|p| p.exists())
}

/// Load TOML configuration, falling back to defaults when the file is absent
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        info!("No config file found, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Default SQLite database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("civdata"))
        .unwrap_or_else(|| PathBuf::from("./civdata_data"))
        .join("civdata.db")
}

/// Resolve a secret: environment variable first, then TOML value
///
/// Blank values count as unset. Warns when both sources carry a value.
pub fn resolve_secret(env_var: &str, toml_value: Option<&str>) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v)).map(str::to_string);

    match (env_value, toml_value) {
        (Some(env), Some(_)) => {
            warn!("{} set in both environment and TOML; using environment", env_var);
            Some(env)
        }
        (Some(env), None) => Some(env),
        (None, Some(toml)) => Some(toml),
        (None, None) => None,
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
