use std::time::Duration;

use crate::error::{RelayError, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Relay server configuration.
///
/// Values are resolved in order: defaults, then environment variables,
/// then command-line flags.
///
/// Environment:
///   RELAY_HOST           : bind address, defaults to "127.0.0.1"
///   RELAY_PORT           : bind port, defaults to 3000
///   RELAY_HEARTBEAT_SECS : heartbeat sweep period, defaults to 30
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub heartbeat_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
        }
    }
}

impl RelayConfig {
    /// Parse configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("RELAY_HOST") {
            config.host = host;
        }

        if let Some(port) = lookup("RELAY_PORT") {
            config.port = port.trim().parse().map_err(|_| {
                RelayError::InvalidConfig(format!("RELAY_PORT must be a port number, got '{}'", port))
            })?;
        }

        if let Some(secs) = lookup("RELAY_HEARTBEAT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                RelayError::InvalidConfig(format!(
                    "RELAY_HEARTBEAT_SECS must be a whole number of seconds, got '{}'",
                    secs
                ))
            })?;
            config.heartbeat_interval = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the current values.
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        heartbeat_secs: Option<u64>,
    ) -> Result<Self> {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(secs) = heartbeat_secs {
            self.heartbeat_interval = Duration::from_secs(secs);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(RelayError::InvalidConfig(
                "heartbeat interval must be greater than zero".into(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(RelayError::InvalidConfig("host must not be empty".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
