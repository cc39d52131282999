//! Withdraw-all configuration and TOML loading.

use serde::{Deserialize, Serialize};
use std::path::Path;
use vault_types::{Result, VaultError};

/// Endpoints and timeouts for the withdraw-all flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WithdrawConfig {
    pub backend_url: String,
    pub relayer_url: String,
    pub request_timeout_ms: u64,
    pub submit_timeout_ms: u64,
}

impl Default for WithdrawConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8000".into(),
            relayer_url: "http://127.0.0.1:8080".into(),
            request_timeout_ms: 20_000,
            submit_timeout_ms: 30_000,
        }
    }
}

impl WithdrawConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: WithdrawConfig =
            toml::from_str(content).map_err(|e| VaultError::Config(format!("parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VaultError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        check_url("backend_url", &self.backend_url)?;
        check_url("relayer_url", &self.relayer_url)?;
        if self.request_timeout_ms == 0 {
            return Err(VaultError::Config("request_timeout_ms must be greater than 0".into()));
        }
        if self.submit_timeout_ms == 0 {
            return Err(VaultError::Config("submit_timeout_ms must be greater than 0".into()));
        }
        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| VaultError::Config(format!("{} is not a valid url ({}): {}", field, value, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(VaultError::Config(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}
