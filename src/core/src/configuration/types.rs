use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "http://localhost:2137";

/// `[api]` section: where the backend lives.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// `[feed]` section: stream feed loading and polling.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    /// Streams requested by the bulk load on mount.
    pub initial_limit: u32,
    pub poll_interval_secs: u64,
    /// Rolling window size of the feed.
    pub capacity: usize,
    /// Services to follow; empty follows every service.
    pub service_ids: Vec<i64>,
    /// Re-list the services every N polls when following every service; 0 disables.
    pub service_refresh_ticks: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            initial_limit: 50,
            poll_interval_secs: 5,
            capacity: 500,
            service_ids: Vec::new(),
            service_refresh_ticks: 0,
        }
    }
}

/// `[web]` section: the local dashboard.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
