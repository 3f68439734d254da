// Structured request errors. Every assembler failure ends up here; nothing
// escapes to the serving boundary as a panic.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::calculator::DataUnavailable;

/// Known keys echoed back as a hint on a miss
pub const NOT_FOUND_HINT_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    NotFound,
    ServiceUnavailable,
    BadRequest,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("State not found: {requested}")]
    NotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error("Comprehensive data not loaded for {region}")]
    DataUnavailable { region: String },

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::NotFound { .. } | ApiError::DataUnavailable { .. } => ErrorCategory::NotFound,
            ApiError::ServiceUnavailable(_) => ErrorCategory::ServiceUnavailable,
            ApiError::BadRequest(_) => ErrorCategory::BadRequest,
            ApiError::Internal(_) => ErrorCategory::Internal,
        }
    }

    pub fn not_found(requested: &str, keys: &[String]) -> Self {
        ApiError::NotFound {
            requested: requested.to_string(),
            available: keys.iter().take(NOT_FOUND_HINT_LIMIT).cloned().collect(),
        }
    }

    pub fn unloaded() -> Self {
        ApiError::ServiceUnavailable("State data not loaded. Please check server logs.".to_string())
    }

    /// Short title used as the `error` field
    pub fn title(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "State not found",
            ApiError::DataUnavailable { .. } => "Entries not available",
            ApiError::ServiceUnavailable(_) => "Service temporarily unavailable",
            ApiError::BadRequest(_) => "Bad request",
            ApiError::Internal(_) => "Internal server error",
        }
    }

    pub fn body(&self, timestamp: DateTime<Utc>) -> ErrorBody {
        let (requested_state, available_states, suggestion) = match self {
            ApiError::NotFound { requested, available } => (
                Some(requested.clone()),
                Some(available.clone()),
                Some("Check spelling or try a different state name"),
            ),
            _ => (None, None, None),
        };

        ErrorBody {
            success: false,
            error: self.title(),
            message: self.to_string(),
            requested_state,
            available_states,
            suggestion,
            timestamp,
        }
    }
}

impl From<DataUnavailable> for ApiError {
    fn from(err: DataUnavailable) -> Self {
        ApiError::DataUnavailable { region: err.region }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_states: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
    pub timestamp: DateTime<Utc>,
}
