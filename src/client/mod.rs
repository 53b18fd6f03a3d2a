//! ClickUp API access layer
//!
//! Leaf-first: [`rate_limit`] gates every call, [`http::RetryingTransport`]
//! owns retries and is the only code that touches the network, and
//! [`ResourceClient`] turns domain calls into envelopes and typed entities.

pub mod config;
pub mod envelope;
pub mod http;
pub mod parser;
pub mod payload;
pub mod rate_limit;
pub mod resources;
pub mod retry;
pub mod transport;

pub use envelope::{HttpMethod, QuotaTelemetry, RawResponse, RequestEnvelope, RetrySafety};
pub use http::RetryingTransport;
pub use payload::{AssigneeChanges, NewTask, TaskQuery, TaskUpdate};
pub use rate_limit::{Clock, ManualClock, RateBudget, RateLimiter, SystemClock};
pub use resources::{create_task_envelope, update_task_envelope, AuthReport, ResourceClient};
pub use retry::{FailureClass, RetryAction, RetryPolicy};
pub use transport::{Credentials, HttpTransport, ReqwestTransport, TransportFailure, TransportFailureKind};

use serde::{Deserialize, Serialize};

/// API errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Input rejected before sending, or HTTP 400
    #[error("validation error: {0}")]
    Validation(String),

    /// HTTP 404
    #[error("not found: {0}")]
    NotFound(String),

    /// HTTP 401 / 403
    #[error("permission denied ({status}): {message}")]
    PermissionDenied {
        /// HTTP status
        status: u16,
        /// Service error text
        message: String,
    },

    /// Still rate limited after the last allowed attempt
    #[error("rate limited after {attempts} attempts")]
    RateLimited {
        /// Attempts made
        attempts: u32,
    },

    /// Network failure, timeout or 5xx after the last allowed attempt
    #[error("transport error after {attempts} attempts: {message}")]
    Transport {
        /// Attempts made
        attempts: u32,
        /// Last underlying error
        message: String,
    },

    /// Response did not match the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Any other unsuccessful status
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status
        status: u16,
        /// Service error text
        message: String,
    },
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Copyable classification of an [`ApiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// See [`ApiError::Validation`]
    Validation,
    /// See [`ApiError::NotFound`]
    NotFound,
    /// See [`ApiError::PermissionDenied`]
    PermissionDenied,
    /// See [`ApiError::RateLimited`]
    RateLimited,
    /// See [`ApiError::Transport`]
    Transport,
    /// See [`ApiError::Decode`]
    Decode,
    /// See [`ApiError::Api`]
    Api,
}

impl ApiError {
    /// Classification of this error
    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Validation(_) => FailureKind::Validation,
            ApiError::NotFound(_) => FailureKind::NotFound,
            ApiError::PermissionDenied { .. } => FailureKind::PermissionDenied,
            ApiError::RateLimited { .. } => FailureKind::RateLimited,
            ApiError::Transport { .. } => FailureKind::Transport,
            ApiError::Decode(_) => FailureKind::Decode,
            ApiError::Api { .. } => FailureKind::Api,
        }
    }
}
