// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration
//
// Defines the configuration for the policy compliance service:
// - GitHub API endpoint, credential and retry behaviour
// - Shared secret allowed to issue one-time tokens
// - Default policy when no document has been uploaded
// - Token storage backend and HTTP listener

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::errors::ComplianceError;
use super::policy::UsedPolicy;
use super::repository::StorageBackend;

pub const CONFIG_PATH_ENV_NAME: &str = "POLICY_COMPLIANCE_CONFIG_PATH";
pub const GITHUB_TOKEN_ENV_NAME: &str = "GITHUB_TOKEN";
pub const GITHUB_API_URL_ENV_NAME: &str = "GITHUB_API_URL";
pub const CHARM_TOKEN_ENV_NAME: &str = "CHARM_TOKEN";
pub const DISALLOW_FORKS_ENV_NAME: &str = "DISALLOW_FORKS";
pub const DATABASE_URL_ENV_NAME: &str = "DATABASE_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Enable `disallow_fork` when no policy document has been uploaded.
    #[serde(default)]
    pub disallow_forks: bool,

    /// PostgreSQL connection string for the token table (in-memory if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Personal access token or app installation token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret held by the charm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charm_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl ServiceConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ServiceConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file in standard locations
    pub fn discover_config() -> Option<PathBuf> {
        // 1. Environment variable
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV_NAME) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Working directory
        let cwd_config = PathBuf::from("./policy-compliance.yaml");
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        // 3. User config directory
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("policy-compliance").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        // 4. System config
        let system_config = PathBuf::from("/etc/policy-compliance/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::info!("No configuration file found, using defaults and environment");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`; empty values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(token) = lookup(GITHUB_TOKEN_ENV_NAME) {
            self.github.token = Some(token);
        }
        if let Some(url) = lookup(GITHUB_API_URL_ENV_NAME) {
            tracing::info!("Environment override: {}={}", GITHUB_API_URL_ENV_NAME, url);
            self.github.api_url = url;
        }
        if let Some(token) = lookup(CHARM_TOKEN_ENV_NAME) {
            self.auth.charm_token = Some(token);
        }
        if let Some(url) = lookup(DATABASE_URL_ENV_NAME) {
            self.database_url = Some(url);
        }
        if let Some(val) = lookup(DISALLOW_FORKS_ENV_NAME) {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    tracing::info!("Environment override: {}=true", DISALLOW_FORKS_ENV_NAME);
                    self.disallow_forks = true;
                }
                "false" | "0" | "no" | "off" => {
                    tracing::info!("Environment override: {}=false", DISALLOW_FORKS_ENV_NAME);
                    self.disallow_forks = false;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for {}: '{}'. Expected true/false. Ignoring.",
                        DISALLOW_FORKS_ENV_NAME,
                        val
                    );
                }
            }
        }
    }

    /// Credentials required before any evaluation can run
    pub fn validate(&self) -> Result<(), ComplianceError> {
        if self.github_token().is_none() {
            return Err(ComplianceError::Configuration(format!(
                "the {GITHUB_TOKEN_ENV_NAME} environment variable was not provided or empty, \
                 it is needed for interactions with GitHub"
            )));
        }
        if self.charm_token().is_none() {
            return Err(ComplianceError::Configuration(format!(
                "the {CHARM_TOKEN_ENV_NAME} environment variable was not provided or empty, \
                 it is required for generating one time tokens"
            )));
        }
        if self.github.api_url.trim().is_empty() {
            return Err(ComplianceError::Configuration("github.api_url cannot be empty".into()));
        }
        Ok(())
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github.token.as_deref().filter(|token| !token.trim().is_empty())
    }

    pub fn charm_token(&self) -> Option<&str> {
        self.auth.charm_token.as_deref().filter(|token| !token.trim().is_empty())
    }

    pub fn used_policy(&self) -> UsedPolicy {
        UsedPolicy::from_disallow_forks(self.disallow_forks)
    }

    pub fn storage_backend(&self) -> StorageBackend {
        StorageBackend::from_database_url(self.database_url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.server.port, 8000);
        assert!(!config.disallow_forks);
        assert_eq!(config.used_policy(), UsedPolicy::AllowForks);
        assert!(matches!(config.storage_backend(), StorageBackend::InMemory));
    }

    #[test]
    fn test_yaml_partial() {
        let config = ServiceConfig::from_yaml_str(
            "disallow_forks: true\ngithub:\n  max_retries: 5\nserver:\n  port: 9000\n",
        )
        .unwrap();
        assert!(config.disallow_forks);
        assert_eq!(config.github.max_retries, 5);
        assert_eq!(config.github.timeout_seconds, 30);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServiceConfig::default();
        config.apply_overrides(lookup(&[
            (GITHUB_TOKEN_ENV_NAME, "ghp_test"),
            (CHARM_TOKEN_ENV_NAME, "charm"),
            (DISALLOW_FORKS_ENV_NAME, "Yes"),
            (DATABASE_URL_ENV_NAME, "postgres://localhost/compliance"),
        ]));
        assert_eq!(config.github_token(), Some("ghp_test"));
        assert_eq!(config.charm_token(), Some("charm"));
        assert!(config.disallow_forks);
        assert!(matches!(config.storage_backend(), StorageBackend::PostgreSQL(_)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_disallow_forks_is_ignored() {
        let mut config = ServiceConfig {
            disallow_forks: true,
            ..Default::default()
        };
        config.apply_overrides(lookup(&[(DISALLOW_FORKS_ENV_NAME, "maybe")]));
        assert!(config.disallow_forks);
        config.apply_overrides(lookup(&[(DISALLOW_FORKS_ENV_NAME, "off")]));
        assert!(!config.disallow_forks);
    }

    #[test]
    fn test_validate_requires_credentials() {
        let mut config = ServiceConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ComplianceError::Configuration(msg)) if msg.contains(GITHUB_TOKEN_ENV_NAME)
        ));

        config.github.token = Some("ghp_test".into());
        config.auth.charm_token = Some("  ".into());
        assert!(matches!(
            config.validate(),
            Err(ComplianceError::Configuration(msg)) if msg.contains(CHARM_TOKEN_ENV_NAME)
        ));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "github:\n  api_url: http://localhost:1234\n").unwrap();

        let config = ServiceConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.github.api_url, "http://localhost:1234");

        assert!(ServiceConfig::load_or_default(Some(dir.path().join("missing.yaml"))).is_err());
    }
}
