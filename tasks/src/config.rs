//! Configuration for the `tasks` binary.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tasklist_runtime::StoreConfig;

/// Default log filter when neither `RUST_LOG` nor `TASKS_LOG` is set
pub const DEFAULT_LOG_FILTER: &str = "tasks=info,tasklist_runtime=info";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Tracing filter directives (`TASKS_LOG`)
    pub log_filter: String,
    /// Graceful shutdown timeout in seconds (`TASKS_SHUTDOWN_TIMEOUT_SECS`)
    pub shutdown_timeout: u64,
    /// Answer every confirmation with "No" instead of asking (`TASKS_HEADLESS`)
    pub headless: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            shutdown_timeout: 5,
            headless: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_filter: lookup("TASKS_LOG").unwrap_or(defaults.log_filter),
            shutdown_timeout: lookup("TASKS_SHUTDOWN_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.shutdown_timeout),
            headless: lookup("TASKS_HEADLESS")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.headless),
        }
    }

    /// Store settings derived from this configuration
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default().with_shutdown_timeout(Duration::from_secs(self.shutdown_timeout))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
