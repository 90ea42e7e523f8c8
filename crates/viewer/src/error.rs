#![forbid(unsafe_code)]

use serde_json::{Value, json};
use st_core::ContractViolation;
use st_storage::StoreError;
use thiserror::Error;

/// An API failure rendered as `{"error": {code, message, recovery}}`.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
    pub recovery: Option<String>,
    pub status: u16,
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>, recovery: &str) -> Self {
        Self {
            code,
            message: message.into(),
            recovery: Some(recovery.to_string()),
            status: 400,
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>, recovery: &str) -> Self {
        Self {
            code,
            message: message.into(),
            recovery: Some(recovery.to_string()),
            status: 404,
        }
    }

    pub fn method_not_allowed(method: &str) -> Self {
        Self {
            code: "METHOD_NOT_ALLOWED",
            message: format!("{method} is not supported; the API is read-only."),
            recovery: Some("Use GET or HEAD.".to_string()),
            status: 405,
        }
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            recovery: None,
            status: 500,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code,
                "message": self.message,
                "recovery": self.recovery
            }
        })
    }

    pub fn status_line(&self) -> &'static str {
        match self.status {
            400 => "400 Bad Request",
            404 => "404 Not Found",
            405 => "405 Method Not Allowed",
            503 => "503 Service Unavailable",
            _ => "500 Internal Server Error",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidInput(message) => Self::bad_request(
                "INVALID_INPUT",
                message,
                "Check the query parameters and retry.",
            ),
            StoreError::Sql(_) => Self {
                code: "SOURCE_UNAVAILABLE",
                message: err.to_string(),
                recovery: Some("Check that the ideas database is readable.".to_string()),
                status: 503,
            },
            other => Self::internal("STORE_ERROR", other.to_string()),
        }
    }
}

impl From<ContractViolation> for ApiError {
    fn from(err: ContractViolation) -> Self {
        Self::internal("CONTRACT_VIOLATION", err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal("ENCODE_FAILED", err.to_string())
    }
}
