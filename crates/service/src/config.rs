//! Service configuration management
//!
//! Defaults, then an optional TOML file, then environment overrides.

use medipredict_inference::artifacts::{
    ArtifactPaths, LABEL_ENCODERS_FILE, MODEL_FILE, SCALER_FILE, VOCABULARY_FILE,
};
use medipredict_inference::EngineConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "MEDIPREDICT_CONFIG";

/// Configuration file used when [`CONFIG_ENV`] is unset and the file exists
pub const DEFAULT_CONFIG_PATH: &str = "config/medipredict.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Engine(#[from] medipredict_inference::ConfigError),
}

/// Top-level service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listen address
    pub bind_addr: String,
    /// Directory holding the artifact files
    pub model_dir: PathBuf,
    /// Artifact file names, resolved against `model_dir` unless absolute
    pub model_file: PathBuf,
    pub scaler_file: PathBuf,
    pub label_encoders_file: PathBuf,
    pub vocabulary_file: PathBuf,
    /// Exit when artifacts fail to load instead of serving degraded
    pub fail_fast: bool,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Permissive CORS
    pub cors: bool,
    /// Request body limit in bytes
    pub max_body_bytes: usize,
    pub engine: EngineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            model_dir: PathBuf::from("models"),
            model_file: PathBuf::from(MODEL_FILE),
            scaler_file: PathBuf::from(SCALER_FILE),
            label_encoders_file: PathBuf::from(LABEL_ENCODERS_FILE),
            vocabulary_file: PathBuf::from(VOCABULARY_FILE),
            fail_fast: true,
            log_level: "info".to_string(),
            cors: true,
            max_body_bytes: 1024 * 1024,
            engine: EngineConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Resolved artifact locations
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.model_dir.join(&self.model_file),
            scaler: self.model_dir.join(&self.scaler_file),
            label_encoders: self.model_dir.join(&self.label_encoders_file),
            vocabulary: self.model_dir.join(&self.vocabulary_file),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("bind_addr must not be empty".into()));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("max_body_bytes must be positive".into()));
        }
        Ok(self.engine.validate()?)
    }
}

/// Loads and holds the effective configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: ServiceConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// Load from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| env::var(key).ok())
    }

    /// Load using `lookup` for every environment variable
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = match lookup(CONFIG_ENV).filter(|v| !v.trim().is_empty()) {
            Some(path) => Some(PathBuf::from(path.trim())),
            None => Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|p| p.exists()),
        };

        let mut config = match &source {
            Some(path) => Self::load_config_from_file(path)?,
            None => ServiceConfig::default(),
        };

        Self::apply_env_overrides(&mut config, &lookup)?;
        config.validate()?;

        Ok(Self { config, source })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Configuration file that was read, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn load_config_from_file(path: &Path) -> Result<ServiceConfig, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(value) = var("BIND_ADDR") {
            config.bind_addr = value;
        }

        if let Some(value) = var("PORT") {
            let port: u16 = value
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {value}")))?;
            config.bind_addr = match config.bind_addr.parse::<SocketAddr>() {
                Ok(mut addr) => {
                    addr.set_port(port);
                    addr.to_string()
                }
                Err(_) => format!("0.0.0.0:{port}"),
            };
        }

        let model_dir = var("MODEL_DIR");
        if let Some(value) = &model_dir {
            config.model_dir = PathBuf::from(value);
        }

        if let Some(value) = var("MODEL_PATH") {
            let path = PathBuf::from(&value);
            // companion artifacts sit next to the model unless MODEL_DIR says otherwise
            if model_dir.is_none() {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    config.model_dir = parent.to_path_buf();
                }
            }
            config.model_file = if path.is_absolute() || model_dir.is_some() {
                path
            } else {
                path.file_name().map(PathBuf::from).unwrap_or(path)
            };
        }

        if let Some(value) = var("SCALER_PATH") {
            let path = PathBuf::from(value);
            config.scaler_file = if path.is_absolute() {
                path
            } else {
                env::current_dir()
                    .map(|cwd| cwd.join(&path))
                    .unwrap_or(path)
            };
        }

        if let Some(value) = var("MEDIPREDICT_FAIL_FAST") {
            config.fail_fast = parse_bool(&value).ok_or_else(|| {
                ConfigError::Invalid(format!("MEDIPREDICT_FAIL_FAST is not a boolean: {value}"))
            })?;
        }

        if let Some(value) = var("LOG_LEVEL") {
            config.log_level = value.to_lowercase();
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("y")
        || value == "1"
    {
        Some(true)
    } else if value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value.eq_ignore_ascii_case("n")
        || value == "0"
    {
        Some(false)
    } else {
        None
    }
}
