//! Error types for the record synchronization engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome class of a failed remote call, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TransientNetwork,
    Throttled,
    Validation,
    Permission,
    NotFound,
    Conflict,
    Decode,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::TransientNetwork => "transient_network",
            FailureKind::Throttled => "throttled",
            FailureKind::Validation => "validation",
            FailureKind::Permission => "permission",
            FailureKind::NotFound => "not_found",
            FailureKind::Conflict => "conflict",
            FailureKind::Decode => "decode",
        }
    }
}

/// Errors raised by a single call against the remote record API
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("Transient network failure after {attempts} attempt(s): {message}")]
    TransientNetwork {
        message: String,
        status: Option<u16>,
        body: Option<String>,
        attempts: u32,
    },

    #[error("Throttled by remote (status {status}) after {attempts} attempt(s)")]
    Throttled {
        status: u16,
        body: Option<String>,
        attempts: u32,
    },

    #[error("Validation rejected (status {status}): {body}")]
    Validation { status: u16, body: String },

    #[error("Permission denied (status {status}): {body}")]
    Permission { status: u16, body: String },

    #[error("Not found: {body}")]
    NotFound { body: String },

    #[error("Conflict: {body}")]
    Conflict { body: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Classify a non-success HTTP status. `throttle_statuses` are the codes the
    /// throttle guard owns; everything else follows the fixed taxonomy.
    pub fn from_status(status: u16, body: String, throttle_statuses: &[u16]) -> Self {
        if throttle_statuses.contains(&status) {
            return RemoteError::Throttled {
                status,
                body: non_empty(body),
                attempts: 1,
            };
        }
        match status {
            401 | 403 => RemoteError::Permission { status, body },
            404 => RemoteError::NotFound { body },
            409 => RemoteError::Conflict { body },
            500..=599 => RemoteError::TransientNetwork {
                message: format!("server error {}", status),
                status: Some(status),
                body: non_empty(body),
                attempts: 1,
            },
            _ => RemoteError::Validation { status, body },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            RemoteError::TransientNetwork { .. } => FailureKind::TransientNetwork,
            RemoteError::Throttled { .. } => FailureKind::Throttled,
            RemoteError::Validation { .. } => FailureKind::Validation,
            RemoteError::Permission { .. } => FailureKind::Permission,
            RemoteError::NotFound { .. } => FailureKind::NotFound,
            RemoteError::Conflict { .. } => FailureKind::Conflict,
            RemoteError::Decode(_) => FailureKind::Decode,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::TransientNetwork { .. })
    }

    pub fn is_throttle(&self) -> bool {
        matches!(self, RemoteError::Throttled { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }

    /// Body returned by the remote, if any, for diagnostics.
    pub fn body(&self) -> Option<&str> {
        match self {
            RemoteError::TransientNetwork { body, .. } | RemoteError::Throttled { body, .. } => {
                body.as_deref()
            }
            RemoteError::Validation { body, .. }
            | RemoteError::Permission { body, .. }
            | RemoteError::NotFound { body }
            | RemoteError::Conflict { body } => Some(body),
            RemoteError::Decode(_) => None,
        }
    }

    /// Stamp the number of attempts spent on a retryable error.
    pub fn with_attempts(self, count: u32) -> Self {
        match self {
            RemoteError::TransientNetwork {
                message,
                status,
                body,
                ..
            } => RemoteError::TransientNetwork {
                message,
                status,
                body,
                attempts: count,
            },
            RemoteError::Throttled { status, body, .. } => RemoteError::Throttled {
                status,
                body,
                attempts: count,
            },
            other => other,
        }
    }
}

fn non_empty(body: String) -> Option<String> {
    if body.trim().is_empty() {
        None
    } else {
        Some(body)
    }
}

/// Crate-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Plan error: {0}")]
    PlanError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
