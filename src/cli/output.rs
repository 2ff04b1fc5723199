//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain errors to a one-line message with a stable category prefix.
pub fn map_error(e: &ApiError) -> String {
    let category = match e {
        ApiError::ConfigError(_) => "config",
        ApiError::PlanError(_) => "plan",
        ApiError::IoError(_) => "io",
    };
    format!("error[{}]: {}", category, e)
}
