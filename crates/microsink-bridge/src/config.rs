//! Bridge configuration from environment variables.

use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Base URL of the foreign runtime's callback endpoint.
    pub gateway_url: String,
    pub connect_timeout_secs: u64,
    /// None = wait for the foreign callback for as long as it takes.
    pub request_timeout_secs: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8765".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: None,
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            gateway_url: std::env::var("MICROSINK_GATEWAY_URL").unwrap_or(defaults.gateway_url),
            connect_timeout_secs: std::env::var("MICROSINK_CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|_| defaults.connect_timeout_secs.to_string())
                .parse()
                .context("Invalid MICROSINK_CONNECT_TIMEOUT_SECS")?,
            request_timeout_secs: std::env::var("MICROSINK_REQUEST_TIMEOUT_SECS")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("Invalid MICROSINK_REQUEST_TIMEOUT_SECS")?,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
