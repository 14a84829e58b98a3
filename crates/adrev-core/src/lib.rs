//! Shared domain types and configuration for the adrev workspace.
//!
//! Everything here is infrastructure-free: no HTTP, no database handles.
//! The other crates depend on this one, never the reverse.

use thiserror::Error;

mod app_config;
mod apps;
mod config;
mod records;

pub use app_config::{AppConfig, Environment};
pub use apps::{load_apps, AppTarget, AppsFile, Platform};
pub use config::{load_app_config, load_app_config_from_env};
pub use records::{
    AggregateMetrics, AggregateRecord, DataSource, QueryType, UserDataKind, UserLevelRecord,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read application registry at {path}")]
    AppsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse application registry")]
    AppsFileParse(#[source] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
