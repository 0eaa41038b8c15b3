//! Configuration management for the campus library service

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Seed file read once at startup (`ISBN,Title,Author` rows after a header)
    pub seed_path: String,
}

/// Which student store implementation to use
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Firestore,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Firestore REST endpoint, or the emulator address
    pub base_url: String,
    pub project_id: String,
    pub database: String,
    pub collection: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
    pub page_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Journal of student writes not yet acknowledged by the store
    pub outbox_path: String,
    pub retry_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix CAMPUS_LIBRARY_, sections split on "__")
            .add_source(
                Environment::with_prefix("CAMPUS_LIBRARY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            // Override the store token from FIRESTORE_TOKEN env var if present
            .set_override_option("store.access_token", env::var("FIRESTORE_TOKEN").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            seed_path: "data/books.csv".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Firestore,
            base_url: "https://firestore.googleapis.com".to_string(),
            project_id: "campus-library".to_string(),
            database: "(default)".to_string(),
            collection: "students".to_string(),
            access_token: None,
            timeout_secs: 10,
            page_size: 300,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            outbox_path: "data/outbox.json".to_string(),
            retry_interval_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
