//! CLI error types and conversions

use crate::alias::AliasError;
use crate::bulk::BulkError;
use crate::client::ApiError;
use crate::config::ConfigError;
use crate::output::OutputError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// API error
    #[error("API error: {0}")]
    ApiError(#[from] ApiError),

    /// Alias error
    #[error("alias error: {0}")]
    AliasError(#[from] AliasError),

    /// Bulk error
    #[error("bulk error: {0}")]
    BulkError(#[from] BulkError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(#[from] ConfigError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
