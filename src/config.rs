//! Configuration management for freqlimit.

use serde::{Deserialize, Serialize};

/// Main configuration for the frequency limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreqlimitConfig {
    /// Shared store connection configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Limiter policy configuration
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl Default for FreqlimitConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

/// Shared store (Redis) connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store address as `host:port`
    #[serde(default = "default_address")]
    pub address: String,

    /// Optional authentication password
    #[serde(default)]
    pub password: Option<String>,

    /// Logical database selector
    #[serde(default)]
    pub db: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            password: None,
            db: 0,
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:6379".to_string()
}

impl StoreConfig {
    /// Build the connection URL for the store client.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}/{}", password, self.address, self.db),
            None => format!("redis://{}/{}", self.address, self.db),
        }
    }
}

/// Limiter policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Maximum admitted actions per subject per window
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Window length in seconds
    #[serde(default = "default_frequency_secs")]
    pub frequency_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            frequency_secs: default_frequency_secs(),
        }
    }
}

fn default_limit() -> u64 {
    5
}

fn default_frequency_secs() -> u64 {
    24 * 60 * 60
}

impl FreqlimitConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: FreqlimitConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::FreqlimitError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, rejecting values the limiter cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.store.address.is_empty() {
            return Err(crate::error::FreqlimitError::Config(
                "store address must not be empty".to_string(),
            ));
        }
        if self.policy.limit == 0 {
            return Err(crate::error::FreqlimitError::Config(
                "policy limit must be at least 1".to_string(),
            ));
        }
        if self.policy.frequency_secs == 0 {
            return Err(crate::error::FreqlimitError::Config(
                "policy frequency must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FreqlimitConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy.limit, 5);
        assert_eq!(config.policy.frequency_secs, 86400);
    }

    #[test]
    fn test_store_url_without_password() {
        let store = StoreConfig {
            address: "10.0.0.1:6380".to_string(),
            password: None,
            db: 2,
        };
        assert_eq!(store.url(), "redis://10.0.0.1:6380/2");
    }

    #[test]
    fn test_store_url_with_password() {
        let store = StoreConfig {
            address: "10.0.0.1:6379".to_string(),
            password: Some("hunter2".to_string()),
            db: 0,
        };
        assert_eq!(store.url(), "redis://:hunter2@10.0.0.1:6379/0");
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let mut config = FreqlimitConfig::default();
        config.policy.limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_frequency_is_rejected() {
        let mut config = FreqlimitConfig::default();
        config.policy.frequency_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_parses_partial_yaml() {
        let yaml = "policy:\n  limit: 10\n";
        let config: FreqlimitConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.policy.limit, 10);
        assert_eq!(config.policy.frequency_secs, 86400);
        assert_eq!(config.store.address, "127.0.0.1:6379");
    }
}
