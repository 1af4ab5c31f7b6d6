//! Configuration management
//!
//! Configuration can be loaded from:
//! - a `config.yml` file
//! - environment variables (override file settings)
//!
//! Missing optional values are filled with defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Markdown rendering configuration
    #[serde(default)]
    pub markdown: MarkdownConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL or SQLite file path
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Upper bound on pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/postdesk.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Markdown rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// syntect theme used for fenced code blocks
    #[serde(default = "default_code_theme")]
    pub code_theme: String,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            code_theme: default_code_theme(),
        }
    }
}

fn default_code_theme() -> String {
    "base16-ocean.dark".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "postdesk=info".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration. A file that
    /// exists but is not valid YAML is an error carrying the parse location.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables:
    /// - POSTDESK_DATABASE_DRIVER
    /// - POSTDESK_DATABASE_URL
    /// - POSTDESK_DATABASE_MAX_CONNECTIONS
    /// - POSTDESK_MARKDOWN_CODE_THEME
    /// - POSTDESK_LOG_FILTER
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.url must not be empty".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(driver) = std::env::var("POSTDESK_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                other => tracing::warn!("Ignoring unknown POSTDESK_DATABASE_DRIVER: {}", other),
            }
        }
        if let Ok(url) = std::env::var("POSTDESK_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(max) = std::env::var("POSTDESK_DATABASE_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(max) => self.database.max_connections = max,
                Err(e) => tracing::warn!(
                    "Ignoring invalid POSTDESK_DATABASE_MAX_CONNECTIONS '{}': {}",
                    max,
                    e
                ),
            }
        }
        if let Ok(theme) = std::env::var("POSTDESK_MARKDOWN_CODE_THEME") {
            self.markdown.code_theme = theme;
        }
        if let Ok(filter) = std::env::var("POSTDESK_LOG_FILTER") {
            self.log.filter = filter;
        }
    }
}

/// Format YAML parsing error with location
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    match e.location() {
        Some(location) => format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        ),
        None => e.to_string(),
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn database_config_strategy() -> impl Strategy<Value = DatabaseConfig> {
        (
            prop_oneof![Just(DatabaseDriver::Sqlite), Just(DatabaseDriver::Mysql)],
            prop_oneof![
                "[a-z][a-z0-9_/]{0,20}\\.db".prop_map(|s| s),
                Just(":memory:".to_string()),
                Just("mysql://root@127.0.0.1:3306/posts".to_string()),
            ],
            1u32..200,
        )
            .prop_map(|(driver, url, max_connections)| DatabaseConfig {
                driver,
                url,
                max_connections,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Serializing a config to YAML and loading it back yields the same values.
        #[test]
        fn config_roundtrips_through_yaml(
            database in database_config_strategy(),
            theme in "[A-Za-z][A-Za-z0-9_-]{0,20}",
        ) {
            let config = Config {
                database,
                markdown: MarkdownConfig { code_theme: theme },
                log: LogConfig::default(),
            };

            let yaml = serde_yaml::to_string(&config).expect("Failed to serialize config");
            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            let parsed = Config::load(file.path()).expect("Failed to parse config");

            prop_assert_eq!(config.database.driver, parsed.database.driver);
            prop_assert_eq!(config.database.url, parsed.database.url);
            prop_assert_eq!(config.database.max_connections, parsed.database.max_connections);
            prop_assert_eq!(config.markdown.code_theme, parsed.markdown.code_theme);
        }
    }
}
