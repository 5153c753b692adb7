use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::csrf::CsrfConfig;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Server configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Port to listen on
    pub port: ConfigValue<u16>,
    /// Production mode adds `Secure` to cookies
    pub production: ConfigValue<bool>,
    /// CSRF token settings
    pub csrf: CsrfConfig,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    port: Option<u16>,
    production: Option<bool>,
    csrf: Option<CsrfConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut port = ConfigValue::new(8080, ConfigSource::Default);
        let mut production = ConfigValue::new(false, ConfigSource::Default);
        let mut csrf = CsrfConfig::default();
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(p) = file_config.port {
                port = ConfigValue::new(p, ConfigSource::File);
            }
            if let Some(prod) = file_config.production {
                production = ConfigValue::new(prod, ConfigSource::File);
            }
            if let Some(csrf_config) = file_config.csrf {
                csrf = csrf_config;
            }
        }

        // Apply environment variable overrides
        if let Ok(value) = std::env::var("LOFERSIL_PORT") {
            let p = value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("LOFERSIL_PORT", value.clone()))?;
            port = ConfigValue::new(p, ConfigSource::Environment);
        }
        if let Ok(value) = std::env::var("LOFERSIL_PRODUCTION") {
            let prod = parse_bool(&value)
                .ok_or_else(|| ConfigError::InvalidEnv("LOFERSIL_PRODUCTION", value.clone()))?;
            production = ConfigValue::new(prod, ConfigSource::Environment);
        }
        // CSRF env var overrides
        if let Ok(secret) = std::env::var("LOFERSIL_CSRF_SECRET") {
            if !secret.is_empty() {
                csrf.signing_key = Some(secret);
            }
        }
        if let Ok(value) = std::env::var("LOFERSIL_CSRF_EXPIRATION_MS") {
            csrf.token_expiration_ms = value.parse().map_err(|_| {
                ConfigError::InvalidEnv("LOFERSIL_CSRF_EXPIRATION_MS", value.clone())
            })?;
        }

        csrf.validate().map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            port,
            production,
            csrf,
            config_file,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/lofersil/
    /// - macOS: ~/Library/Application Support/lofersil/
    /// - Windows: %APPDATA%/lofersil/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lofersil")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "production" => Some(true),
        "0" | "false" | "no" | "development" | "" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
            ConfigError::Invalid(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
