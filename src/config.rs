//! Run configuration
//!
//! A [`Config`] is a flat mapping from string keys to optional string values.
//! Resources declare which keys they need; the engine checks presence before
//! a run starts. Values can come from code, a YAML mapping, or
//! `CONVEYOR_`-prefixed environment variables.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Environment variable prefix recognized by [`Config::from_env`]
pub const ENV_PREFIX: &str = "CONVEYOR_";

/// Flat configuration map consulted when opening resources
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Config {
    values: BTreeMap<String, Option<String>>,
}

impl Config {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), Some(value.into()));
    }

    /// Insert a key that is present but carries no value
    pub fn set_null(&mut self, key: impl Into<String>) {
        self.values.insert(key.into(), None);
    }

    /// Look up a value; `None` for absent and null keys alike
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_deref())
    }

    /// Whether `key` is present with a non-null value
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Parse a configuration from a YAML mapping of keys to values
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ConfigError::Invalid(format!("failed to parse config: {e}")).into())
    }

    /// Read a configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::Invalid(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from `CONVEYOR_`-prefixed environment variables.
    ///
    /// A `.env` file in the working directory is honored when present. The
    /// prefix is stripped: `CONVEYOR_DB_DSN` becomes the key `DB_DSN`.
    pub fn from_env() -> Self {
        // a missing .env file is not an error
        dotenvy::dotenv().ok();
        let mut config = Self::new();
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                config.set(stripped, value);
            }
        }
        config
    }

    /// Wrap in an `Rc` for identity-based sharing with the resource manager
    pub fn into_shared(self) -> Rc<Config> {
        Rc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let config = Config::new().with("DB_DSN", "dsn").with("DB_UID", "user");
        assert_eq!(config.get("DB_DSN"), Some("dsn"));
        assert_eq!(config.get("MISSING"), None);
        assert!(config.is_set("DB_UID"));
        assert!(!config.is_set("MISSING"));
    }

    #[test]
    fn test_null_key_is_present_but_unset() {
        let mut config = Config::new();
        config.set_null("DB_PWD");
        assert_eq!(config.get("DB_PWD"), None);
        assert!(!config.is_set("DB_PWD"));
    }

    #[test]
    fn test_from_yaml() {
        let config = Config::from_yaml("DB_DSN: dsn\nDB_PWD: null\n").unwrap();
        assert_eq!(config.get("DB_DSN"), Some("dsn"));
        assert!(!config.is_set("DB_PWD"));
    }

    #[test]
    fn test_from_yaml_rejects_non_mapping() {
        let result = Config::from_yaml("- just\n- a\n- list\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conveyor.yml");
        fs::write(&path, "DB_DSN: dsn\n").unwrap();

        let config = Config::from_yaml_file(&path).unwrap();
        assert_eq!(config.get("DB_DSN"), Some("dsn"));

        let missing = Config::from_yaml_file(&temp_dir.path().join("absent.yml"));
        assert!(missing.is_err());
    }

    #[test]
    fn test_from_env_strips_prefix() {
        env::set_var("CONVEYOR_TEST_FROM_ENV_KEY", "value");

        let config = Config::from_env();
        assert_eq!(config.get("TEST_FROM_ENV_KEY"), Some("value"));

        env::remove_var("CONVEYOR_TEST_FROM_ENV_KEY");
    }
}
