//! CLI error types

use thiserror::Error;

/// Errors surfaced by the svcmap binary
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    DesiredState(#[from] svcmap_types::DesiredStateError),

    #[error(transparent)]
    Reconcile(#[from] svcmap_reconcile::ReconcileError),

    #[error(transparent)]
    Registry(#[from] svcmap_registry::RegistryError),

    #[error("Output error: {0}")]
    Output(String),
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Output(err.to_string())
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
