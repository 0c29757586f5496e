use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Provider API key. An empty string means "not configured" and is
    /// surfaced at the point of use, never at startup.
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CloudConfig {
    pub enabled: bool,
    pub url: String,
    pub anon_key: String,
    pub bucket: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// SQLite file path, or ":memory:" for an ephemeral cache.
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Quiet period between the last mutation and the persisted write.
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VaultConfig {
    pub unlock_delay_ms: u64,
    pub max_image_bytes: u64,
    pub max_image_dimension: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub gateway: GatewayConfig,
    pub cloud: CloudConfig,
    pub cache: CacheConfig,
    pub sync: SyncConfig,
    pub vault: VaultConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default values
            .set_default("environment", "development")?
            .set_default("gateway.api_key", "")?
            .set_default("gateway.model", "gemini-2.0-flash")?
            .set_default("gateway.endpoint", "https://generativelanguage.googleapis.com")?
            .set_default("gateway.timeout_seconds", 30)?
            .set_default("cloud.enabled", false)?
            .set_default("cloud.url", "")?
            .set_default("cloud.anon_key", "")?
            .set_default("cloud.bucket", "documents")?
            .set_default("cache.path", "gaide.db")?
            .set_default("sync.debounce_ms", 2000)?
            .set_default("vault.unlock_delay_ms", 1500)?
            .set_default("vault.max_image_bytes", 512 * 1024)?
            .set_default("vault.max_image_dimension", 1920)?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in settings from environment variables (with prefix "GAIDE_")
            // E.g., `GAIDE_SYNC__DEBOUNCE_MS=500` would set `Settings.sync.debounce_ms`
            .add_source(
                Environment::with_prefix("gaide")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    pub fn gateway_configured(&self) -> bool {
        !self.gateway.api_key.is_empty()
    }

    pub fn cloud_configured(&self) -> bool {
        self.cloud.enabled && !self.cloud.url.is_empty() && !self.cloud.anon_key.is_empty()
    }

    pub fn new_for_test() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("environment", "test")?
            .set_default("gateway.api_key", "test_key")?
            .set_default("gateway.model", "gemini-2.0-flash")?
            .set_default("gateway.endpoint", "http://127.0.0.1:0")?
            .set_default("gateway.timeout_seconds", 5)?
            .set_default("cloud.enabled", false)?
            .set_default("cloud.url", "")?
            .set_default("cloud.anon_key", "")?
            .set_default("cloud.bucket", "documents")?
            .set_default("cache.path", ":memory:")?
            .set_default("sync.debounce_ms", 50)?
            .set_default("vault.unlock_delay_ms", 10)?
            .set_default("vault.max_image_bytes", 512 * 1024)?
            .set_default("vault.max_image_dimension", 1920)?
            .add_source(
                Environment::with_prefix("gaide")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
