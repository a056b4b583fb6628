//! Configuration for the svcmap CLI
//!
//! Layers, lowest precedence first: built-in defaults, the config file,
//! then `SVCMAP_*` environment variables (`SVCMAP_WAITER__TIMEOUT_SECS=60`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use svcmap_reconcile::{ReconcilerConfig, WaiterConfig};

/// Main CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Registry connection settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Operation polling settings
    #[serde(default)]
    pub waiter: WaiterSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Registry connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Services requested per listing page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Health check failure threshold for services created on demand
    #[serde(default = "default_failure_threshold")]
    pub health_check_failure_threshold: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout(),
            page_size: default_page_size(),
            health_check_failure_threshold: default_failure_threshold(),
        }
    }
}

/// Operation polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaiterSettings {
    /// Seconds between status checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Seconds before giving up on an operation
    #[serde(default = "default_operation_timeout")]
    pub timeout_secs: u64,

    /// Status label of a successful operation
    #[serde(default = "default_success_status")]
    pub success_status: String,

    /// Status label of a failed operation
    #[serde(default = "default_failure_status")]
    pub failure_status: String,
}

impl Default for WaiterSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_operation_timeout(),
            success_status: default_success_status(),
            failure_status: default_failure_status(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_page_size() -> u32 {
    svcmap_reconcile::DEFAULT_PAGE_SIZE
}

fn default_failure_threshold() -> u32 {
    1
}

fn default_poll_interval() -> u64 {
    5
}

fn default_operation_timeout() -> u64 {
    3600
}

fn default_success_status() -> String {
    "SUCCESS".to_string()
}

fn default_failure_status() -> String {
    "FAIL".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl CliConfig {
    /// Load configuration
    ///
    /// An explicit `path` must exist; without one the per-user file
    /// (`<config dir>/svcmap/config.toml`) is read when present.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&CliConfig::default())?);

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::with_name(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    builder = builder.add_source(
                        config::File::from(default_path)
                            .format(config::FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SVCMAP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Per-user configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("svcmap").join("config.toml"))
    }

    /// Reconciler settings derived from this configuration
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            waiter: WaiterConfig {
                poll_interval: Duration::from_secs(self.waiter.poll_interval_secs),
                timeout: Duration::from_secs(self.waiter.timeout_secs),
                success_status: self.waiter.success_status.clone(),
                failure_status: self.waiter.failure_status.clone(),
            },
            page_size: self.registry.page_size,
            health_check_failure_threshold: self.registry.health_check_failure_threshold,
        }
    }
}
