use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sample: SampleConfig,
}

/// State store settings applied to every view model the application creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Double-apply reducers and check for mutated states (default: false).
    #[serde(default)]
    pub debug_mode: bool,
    /// Name of the worker thread (default: "state-worker").
    #[serde(default = "default_worker_thread_name")]
    pub worker_thread_name: String,
    /// Validate the initial state in debug mode (default: true).
    #[serde(default = "default_true")]
    pub validate_state_shape: bool,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Log file. Without one, nothing is logged while the TUI is running.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Settings for the sample application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    /// UI tick interval in milliseconds (default: 100).
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
    /// Entities served by the local source (default: 20).
    #[serde(default = "default_entity_count")]
    pub entity_count: usize,
    /// Simulated latency of the local source in milliseconds (default: 800).
    #[serde(default = "default_load_delay_ms")]
    pub load_delay_ms: u64,
    /// Delay before an unconfirmed latched value is restored (default: 3000).
    #[serde(default = "default_latch_restore_delay_ms")]
    pub latch_restore_delay_ms: u64,
    /// Delay before a latched value is sent to the host (default: 0).
    #[serde(default)]
    pub latch_send_delay_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_worker_thread_name() -> String {
    "state-worker".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_tick_rate_ms() -> u64 {
    100
}

fn default_entity_count() -> usize {
    20
}

fn default_load_delay_ms() -> u64 {
    800
}

fn default_latch_restore_delay_ms() -> u64 {
    3000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            worker_thread_name: default_worker_thread_name(),
            validate_state_shape: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: default_tick_rate_ms(),
            entity_count: default_entity_count(),
            load_delay_ms: default_load_delay_ms(),
            latch_restore_delay_ms: default_latch_restore_delay_ms(),
            latch_send_delay_ms: 0,
        }
    }
}
