use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::google::DEFAULT_LINK_PATTERN;

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

// Define error types for config loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// Result type alias for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Keywords {
    pub main: Vec<String>,
    pub supplemented: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Paths {
    pub download_directory: String,
    pub log_directory: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Pools {
    /// Number of concurrent jobs. Falls back to the CPU core count when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_count: Option<usize>,
}

impl Pools {
    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(num_cpus::get).max(1)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Http {
    pub search_endpoint: String,
    pub referer: String,
    pub verify_tls: bool,
    pub timeout_secs: u64,
    pub retry_attempts: usize,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Extraction {
    pub pattern: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Logging {
    pub log_level: String,
    pub log_format: String,
    pub log_to_terminal: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub keywords: Keywords,
    pub paths: Paths,
    #[serde(default)]
    pub pools: Pools,
    pub http: Http,
    pub extraction: Extraction,
    pub logging: Logging,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            keywords: Keywords {
                main: vec!["swimmer".to_string()],
                supplemented: vec![
                    "butterfly".to_string(),
                    "freestyle".to_string(),
                    "backstroke".to_string(),
                    "kickstroke".to_string(),
                ],
            },
            paths: Paths {
                download_directory: "./google_image".to_string(),
                log_directory: ".".to_string(),
            },
            pools: Pools::default(),
            http: Http {
                search_endpoint: "https://www.google.com/search".to_string(),
                referer: "https://www.google.com".to_string(),
                verify_tls: true,
                timeout_secs: 30,
                retry_attempts: 1,
                retry_backoff_ms: 1000,
            },
            extraction: Extraction {
                pattern: DEFAULT_LINK_PATTERN.to_string(),
            },
            logging: Logging {
                log_level: "debug".to_string(),
                log_format: "text".to_string(),
                log_to_terminal: true,
            },
        }
    }
}

impl AppConfig {
    /// Checks the values serde cannot check on its own.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.keywords.main.is_empty() {
            return Err(ConfigError::Invalid("keywords.main must not be empty".to_string()));
        }
        if self.keywords.supplemented.is_empty() {
            return Err(ConfigError::Invalid(
                "keywords.supplemented must not be empty".to_string(),
            ));
        }
        for keyword in self.keywords.main.iter().chain(self.keywords.supplemented.iter()) {
            validate_keyword(keyword)?;
        }

        if self.pools.worker_count == Some(0) {
            return Err(ConfigError::Invalid("pools.worker_count must be at least 1".to_string()));
        }
        if self.http.retry_attempts == 0 {
            return Err(ConfigError::Invalid("http.retry_attempts must be at least 1".to_string()));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be at least 1".to_string()));
        }

        let pattern = Regex::new(&self.extraction.pattern).map_err(|e| {
            ConfigError::Invalid(format!("extraction.pattern does not compile: {}", e))
        })?;
        if pattern.captures_len() < 2 {
            return Err(ConfigError::Invalid(
                "extraction.pattern needs a capture group for the image URL".to_string(),
            ));
        }

        match self.logging.log_format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(ConfigError::Invalid(format!(
                "logging.log_format must be \"text\" or \"json\", got \"{}\"",
                other
            ))),
        }
    }
}

/// Keywords become directory names, so they must stay a single path component.
fn validate_keyword(keyword: &str) -> ConfigResult<()> {
    if keyword.trim().is_empty() {
        return Err(ConfigError::Invalid("keywords must not be blank".to_string()));
    }
    if keyword == "." || keyword == ".." || keyword.contains(['/', '\\']) {
        return Err(ConfigError::Invalid(format!(
            "keyword \"{}\" cannot be used as a directory name",
            keyword
        )));
    }
    Ok(())
}

/// Loads, creates and saves `config.toml`.
pub struct ConfigManager {
    app_config: AppConfig,
    config_dir: PathBuf,
}

impl ConfigManager {
    pub fn new(config_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            info!("Creating config directory: {}", config_dir.display());
            fs::create_dir_all(&config_dir)?;
        }

        let app_config = Self::load_app_config(&config_dir)?;
        let manager = Self {
            app_config,
            config_dir,
        };

        manager.create_default_config()?;
        manager.app_config.validate()?;

        Ok(manager)
    }

    fn config_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE_NAME)
    }

    fn load_app_config(config_dir: &Path) -> ConfigResult<AppConfig> {
        let config_path = Self::config_path(config_dir);

        if !config_path.exists() {
            warn!("Config file not found: {}", config_path.display());
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&config_path)?;
        match Self::parse_config(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                error!("Failed to parse {}: {}", CONFIG_FILE_NAME, e);
                info!("Backing up old config and creating new one with default values");

                if let Err(backup_err) =
                    fs::rename(&config_path, config_path.with_extension("toml.backup"))
                {
                    warn!("Failed to backup old config: {}", backup_err);
                }

                let default_config = AppConfig::default();
                Self::write_config(&config_path, &default_config)?;
                Ok(default_config)
            }
        }
    }

    fn parse_config(content: &str) -> ConfigResult<AppConfig> {
        Ok(toml::from_str(content)?)
    }

    fn write_config(config_path: &Path, config: &AppConfig) -> ConfigResult<()> {
        let toml_string =
            toml::to_string_pretty(config).map_err(|e| ConfigError::TomlSer(e.to_string()))?;
        fs::write(config_path, toml_string)?;
        Ok(())
    }

    pub fn get_app_config(&self) -> &AppConfig {
        &self.app_config
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Writes `config.toml` with the current values if it does not exist yet.
    pub fn create_default_config(&self) -> ConfigResult<()> {
        let config_path = Self::config_path(&self.config_dir);
        if !config_path.exists() {
            Self::write_config(&config_path, &self.app_config)?;
            info!("Created {} with default values", config_path.display());
        }
        Ok(())
    }
}
