use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "recipes.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: String,
    pub database: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub session_ttl_minutes: i64,
    pub cookie_name: String,
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            database: PathBuf::from("recipes.db"),
            log_dir: PathBuf::from("logs"),
            log_level: "info".to_string(),
            session_ttl_minutes: 24 * 60,
            cookie_name: "recipes_session".to_string(),
            static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static")),
        }
    }
}

impl Config {
    /// Defaults, then the TOML file if present, then `RECIPES_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    /// [`Config::load`] with a caller-supplied variable lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            info!("Loaded configuration from {}", path.display());
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("RECIPES_BIND") {
            self.bind = bind;
        }
        if let Some(database) = lookup("RECIPES_DATABASE") {
            self.database = PathBuf::from(database);
        }
        if let Some(log_dir) = lookup("RECIPES_LOG_DIR") {
            self.log_dir = PathBuf::from(log_dir);
        }
        if let Some(log_level) = lookup("RECIPES_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Some(ttl) = lookup("RECIPES_SESSION_TTL_MINUTES") {
            self.session_ttl_minutes = ttl.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "RECIPES_SESSION_TTL_MINUTES".to_string(),
                message: format!("{e}"),
            })?;
        }
        if let Some(cookie_name) = lookup("RECIPES_COOKIE_NAME") {
            self.cookie_name = cookie_name;
        }
        if let Some(static_dir) = lookup("RECIPES_STATIC_DIR") {
            self.static_dir = PathBuf::from(static_dir);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "session_ttl_minutes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        let cookie_ok = !self.cookie_name.is_empty()
            && self
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !cookie_ok {
            return Err(ConfigError::Invalid {
                key: "cookie_name".to_string(),
                message: format!("'{}' is not a valid cookie name", self.cookie_name),
            });
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes)
    }
}
