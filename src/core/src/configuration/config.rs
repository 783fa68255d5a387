use super::types::*;
use crate::error_handling::types::ConfigError;
use crate::feed::FeedOptions;
use crate::scheduler::SchedulerOptions;
use log::{debug, info};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Application configuration.
///
/// Read from a TOML file with three optional sections; every field has a
/// default, so an empty file (or no file at all) yields a working setup
/// against a backend on `localhost:2137`.
///
/// ```toml
/// [api]
/// base_url = "http://localhost:2137"
///
/// [feed]
/// initial_limit = 50
/// poll_interval_secs = 5
/// capacity = 500
/// service_ids = []
/// service_refresh_ticks = 0
///
/// [web]
/// enabled = false
/// bind_address = "127.0.0.1"
/// port = 8080
/// ```
///
/// # Fields Overview
///
/// - `api`: backend location
/// - `feed`: bulk load size, polling period, rolling window and followed services
/// - `web`: local dashboard exposing the feed
#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api: ApiConfig,
    pub feed: FeedConfig,
    pub web: WebConfig,
}

impl Config {
    /// Reads and validates the configuration file at `path`.
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        info!("Reading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> Result<Config, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    /// Checks cross-field constraints the types alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::BadBaseUrl(format!(
                "`{}` must start with http:// or https://",
                self.api.base_url
            )));
        }

        if self.feed.initial_limit == 0 {
            return Err(ConfigError::NotInRange(
                "feed.initial_limit must be at least 1".to_string(),
            ));
        }
        if self.feed.poll_interval_secs == 0 {
            return Err(ConfigError::NotInRange(
                "feed.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.feed.capacity < self.feed.initial_limit as usize {
            return Err(ConfigError::NotInRange(format!(
                "feed.capacity ({}) must not be smaller than feed.initial_limit ({})",
                self.feed.capacity, self.feed.initial_limit
            )));
        }

        if self.web.enabled {
            if self.web.port == 0 {
                return Err(ConfigError::NotInRange(
                    "web.port must be between 1 and 65535".to_string(),
                ));
            }
            self.web_address()?;
        }
        Ok(())
    }

    pub fn web_address(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.web.bind_address.parse().map_err(|_| {
            ConfigError::NotInRange(format!(
                "web.bind_address `{}` is not an IP address",
                self.web.bind_address
            ))
        })?;
        Ok(SocketAddr::new(ip, self.web.port))
    }

    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            capacity: self.feed.capacity,
            service_ids: self.feed.service_ids.clone(),
        }
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            period: Duration::from_secs(self.feed.poll_interval_secs),
            service_refresh_ticks: self.feed.service_refresh_ticks,
        }
    }
}
