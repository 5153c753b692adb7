//! JSON response bodies shared by the handlers.

use serde::Serialize;

use super::contact::FieldError;
use crate::csrf::TokenStats;

/// Error response: `{ "success": false, "error": ..., "code": ... }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, code: &'static str) -> Self {
        Self {
            success: false,
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<FieldError>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Token issuance response data
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub token: String,
    /// Epoch milliseconds
    pub expires: i64,
    /// Seconds
    pub expires_in: u64,
}

/// Token issuance response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub data: TokenData,
}

/// Accepted contact submission
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub csrf: TokenStats,
}
