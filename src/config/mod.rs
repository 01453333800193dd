//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::normalize::Normalizer;
use crate::storage::StorageConfig;

pub const ENV_STORAGE_ROOT: &str = "EDU_PDF_STORAGE_ROOT";
pub const ENV_CATALOG_DIR: &str = "EDU_PDF_CATALOG_DIR";
pub const ENV_PORT: &str = "EDU_PDF_PORT";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Largest accepted request body for uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Medium vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediumConfig {
    /// Display names seeded into the catalog at startup
    #[serde(default = "default_mediums")]
    pub defaults: Vec<String>,

    /// Extra alias -> slug pairs on top of the built-in table
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

fn default_mediums() -> Vec<String> {
    vec![
        "Sinhala".to_string(),
        "English".to_string(),
        "Tamil".to_string(),
    ]
}

impl Default for MediumConfig {
    fn default() -> Self {
        Self {
            defaults: default_mediums(),
            aliases: BTreeMap::new(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub mediums: MediumConfig,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./storage")
}

fn default_catalog_dir() -> PathBuf {
    PathBuf::from("./data/catalog")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            catalog_dir: default_catalog_dir(),
            log_level: default_log_level(),
            server: ServerConfig::default(),
            mediums: MediumConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML file. Unset keys take their defaults.
    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load from `path` if it exists, otherwise start from defaults, then
    /// apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::read_file(path)?
        } else {
            AppConfig::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up through `lookup` (the process environment
    /// in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_STORAGE_ROOT) {
            self.storage_root = PathBuf::from(root);
        }
        if let Some(dir) = lookup(ENV_CATALOG_DIR) {
            self.catalog_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("{} is not a valid port: {:?}", ENV_PORT, port))
            })?;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        if self.storage_root == self.catalog_dir {
            return Err(ConfigError::ValidationError(
                "storage_root and catalog_dir must be different directories".to_string(),
            ));
        }

        Ok(())
    }

    pub fn storage(&self) -> StorageConfig {
        StorageConfig::new(self.storage_root.clone(), self.catalog_dir.clone())
    }

    /// Normalizer carrying the configured medium aliases.
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new().with_medium_aliases(&self.mediums.aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.storage_root, PathBuf::from("./storage"));
        assert_eq!(config.catalog_dir, PathBuf::from("./data/catalog"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.mediums.defaults, vec!["Sinhala", "English", "Tamil"]);
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_same_dirs() {
        let mut config = AppConfig::default();
        config.catalog_dir = config.storage_root.clone();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
storage_root = "/srv/pdfs"

[server]
port = 9000

[mediums.aliases]
"sinhala medium" = "sinhala"
"#,
        )
        .unwrap();

        let config = AppConfig::read_file(&path).unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/srv/pdfs"));
        assert_eq!(config.catalog_dir, PathBuf::from("./data/catalog"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.normalizer().medium("Sinhala Medium"), "sinhala");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig::load(&tmp.path().join("absent.toml")).unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.mediums.defaults.len(), 3);
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| match key {
                ENV_STORAGE_ROOT => Some("/data/pdfs".to_string()),
                ENV_PORT => Some("3000".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/data/pdfs"));
        assert_eq!(config.server.port, 3000);

        let bad = config.apply_overrides(|key| (key == ENV_PORT).then(|| "http".to_string()));
        assert!(matches!(bad, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.storage_root, parsed.storage_root);
        assert_eq!(config.mediums.defaults, parsed.mediums.defaults);
    }
}
