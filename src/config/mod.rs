use anyhow::{Context, Result};
use chrono::Duration;
use serde::Deserialize;

/// Complete buswatch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BuswatchConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub freshness: FreshnessConfig,
    #[serde(default)]
    pub ingress: IngressConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "buswatch.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Freshness window configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FreshnessConfig {
    /// Rows older than this are excluded from active-vehicle queries
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
}

fn default_window_seconds() -> u64 {
    300
}

impl FreshnessConfig {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_seconds as i64)
    }
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
        }
    }
}

/// Ingress configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IngressConfig {
    /// Streaming-path coupling: broadcast an update to observers even when
    /// persisting it failed. The one-shot HTTP path always requires a
    /// successful persist, regardless of this switch.
    #[serde(default = "default_broadcast_on_persist_failure")]
    pub broadcast_on_persist_failure: bool,
}

fn default_broadcast_on_persist_failure() -> bool {
    true
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            broadcast_on_persist_failure: default_broadcast_on_persist_failure(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allowed origin for browser clients. The default "*" admits every
    /// origin — insecure, set a concrete origin in production.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

fn default_allowed_origin() -> String {
    "*".to_string()
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: default_allowed_origin(),
        }
    }
}

impl Default for BuswatchConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            freshness: FreshnessConfig::default(),
            ingress: IngressConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl BuswatchConfig {
    /// Apply `BUSWATCH_*` env overrides on top of file/default values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("BUSWATCH_PORT") {
            if let Ok(n) = v.parse::<u16>() {
                self.server.port = n;
            }
        }
        if let Ok(v) = std::env::var("BUSWATCH_DB_PATH") {
            self.storage.path = v;
        }
        if let Ok(v) = std::env::var("BUSWATCH_FRESHNESS_WINDOW_SECONDS") {
            if let Ok(n) = v.parse::<u64>() {
                self.freshness.window_seconds = n;
            }
        }
        if let Ok(v) = std::env::var("BUSWATCH_BROADCAST_ON_PERSIST_FAILURE") {
            if let Ok(b) = v.parse::<bool>() {
                self.ingress.broadcast_on_persist_failure = b;
            }
        }
        if let Ok(v) = std::env::var("BUSWATCH_CORS_ALLOWED_ORIGIN") {
            self.cors.allowed_origin = v;
        }
        self
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<BuswatchConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: BuswatchConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}
