//! Store connection settings, loadable from a TOML file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Connection and database settings for the TypeDB sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Server host.
    pub uri: String,
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Drop and recreate the database during bootstrap.
    pub clear: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "localhost".to_string(),
            port: 1729,
            database: "stix".to_string(),
            user: None,
            password: None,
            clear: false,
        }
    }
}

impl StoreConfig {
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// `host:port` address string for the driver.
    pub fn address(&self) -> String {
        format!("{}:{}", self.uri, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: StoreConfig = toml::from_str("database = \"threat-intel\"").unwrap();
        assert_eq!(config.database, "threat-intel");
        assert_eq!(config.uri, "localhost");
        assert_eq!(config.port, 1729);
        assert!(!config.clear);
    }

    #[test]
    fn loads_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "uri = \"typedb.internal\"\nport = 1730\ndatabase = \"stix\"\nclear = true"
        )
        .unwrap();
        let config = StoreConfig::from_toml(file.path()).unwrap();
        assert_eq!(config.address(), "typedb.internal:1730");
        assert!(config.clear);
    }

    #[test]
    fn rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        assert!(matches!(
            StoreConfig::from_toml(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
