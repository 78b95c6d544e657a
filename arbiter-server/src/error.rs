// arbiter-server/src/error.rs
// ============================================================================
// Module: HTTP Error Mapping
// Description: Maps PipelineError and request-decode failures onto the wire
//              error envelope and HTTP status codes named in the contract.
// Purpose: Keep the transport layer the single place a PipelineError becomes
//          an HTTP response, so handlers never hand-roll a status code.
// Dependencies: arbiter-core, axum
// ============================================================================

//! ## Overview
//! [`ApiError`] wraps an [`ErrorCode`] plus an optional details payload and
//! implements `IntoResponse`, so a handler can simply `?`-propagate a
//! [`PipelineError`] into the correct `{ "error": { ... } }` body.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;

use arbiter_core::error::ErrorBody;
use arbiter_core::error::ErrorCode;
use arbiter_core::error::ErrorEnvelope;
use arbiter_core::pipeline::PipelineError;

// ============================================================================
// SECTION: API Error
// ============================================================================

/// A fully-formed API error: a stable code, a message, and optional details.
#[derive(Debug)]
pub struct ApiError {
    /// Stable wire error code.
    code: ErrorCode,
    /// Human-readable message.
    message: String,
    /// Structured details, e.g. `existing_hash`/`incoming_hash`.
    details: Option<serde_json::Value>,
}

impl ApiError {
    /// Builds an API error with no structured details.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), details: None }
    }

    /// Attaches structured details to the error.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut body = ErrorBody::new(self.code, self.message);
        if let Some(details) = self.details {
            body = body.with_details(details);
        }
        (status, Json(ErrorEnvelope::from(body))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::SchemaInvalid(message) => {
                Self::new(ErrorCode::RequestSchemaInvalid, message)
            }
            PipelineError::PayloadMismatch { existing_hash, incoming_hash } => {
                Self::new(ErrorCode::ConflictPayloadMismatch, "idempotency key reused with a different payload")
                    .with_details(serde_json::json!({
                        "existing_hash": existing_hash,
                        "incoming_hash": incoming_hash,
                    }))
            }
            PipelineError::InvalidTransition => {
                Self::new(ErrorCode::ConflictInvalidTransition, "transition not permitted from the current state")
            }
            PipelineError::NotFound => Self::new(ErrorCode::NotFound, "no such entity"),
            PipelineError::AuditWriteFailed(message) => {
                Self::new(ErrorCode::InternalAuditWriteFailed, message)
            }
        }
    }
}

/// Builds a `request.schema_invalid` error from a JSON decode failure.
pub fn schema_invalid(err: &serde_json::Error) -> ApiError {
    ApiError::new(ErrorCode::RequestSchemaInvalid, err.to_string())
}
