use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use shared_types::PaymentSource;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = r#"
[database]
# Defaults to the platform data directory, e.g. ~/.local/share/mf-auto-reg/transactions.db
# path = "/path/to/transactions.db"
pool_size = 4
busy_timeout_secs = 5

[ingest]
# Used when neither --source nor the subject identifies the provider
# default_source = "ana-pay"
"#;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    pub ingest: Option<IngestConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_pool_size() -> u32 {
    4
}

fn default_busy_timeout_secs() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            pool_size: default_pool_size(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct IngestConfig {
    pub default_source: Option<String>,
}

impl AppConfig {
    /// Load from the user config file, creating it with defaults on first run
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        let config_path = get_config_path();

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        if !config_path.exists() {
            std::fs::write(&config_path, DEFAULT_CONFIG).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
        }

        let config = Self::load_from(&config_path)?;
        Ok((config, config_path))
    }

    /// Load from `path` with `MF_AUTO_REG__*` environment overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("MF_AUTO_REG")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    pub fn database(&self) -> DatabaseConfig {
        self.database.clone().unwrap_or_default()
    }

    /// Configured fallback source, if any
    pub fn default_source(&self) -> Result<Option<PaymentSource>, shared_types::RecordError> {
        self.ingest
            .as_ref()
            .and_then(|ingest| ingest.default_source.as_deref())
            .map(str::parse)
            .transpose()
    }
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("mf-auto-reg").join("config.toml")
    } else {
        PathBuf::from("config.toml")
    }
}
