// arbiter-core/src/error.rs
// ============================================================================
// Module: Arbiter Stable Error Codes
// Description: The closed set of machine-readable error codes the pipeline
//              can produce, plus the JSON error envelope shape.
// Purpose: Keep the wire-level error vocabulary and its HTTP mapping in one
//          place so transports never invent their own codes.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every error the pipeline can surface maps to one of a fixed set of stable
//! string codes. These codes are part of the wire contract: they must never
//! be renamed or repurposed once shipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Error Code
// ============================================================================

/// Stable, machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Envelope failed schema validation.
    RequestSchemaInvalid,
    /// Same idempotency key reused with a different payload fingerprint.
    ConflictPayloadMismatch,
    /// Attempted an invalid state transition (terminal -> * or unknown transition).
    ConflictInvalidTransition,
    /// Reserved duplicate-key conflict code.
    ConflictDuplicateKey,
    /// Unknown entity on a read.
    NotFound,
    /// Action provider is outside the configured allowlist.
    PolicyProviderNotAllowed,
    /// Action type is outside the configured universe.
    PolicyActionTypeNotAllowed,
    /// Configuration names an unsupported store kind.
    ConfigInvalidStoreKind,
    /// Audit append failed; the request fails closed.
    InternalAuditWriteFailed,
    /// Unexpected internal failure.
    InternalError,
}

impl ErrorCode {
    /// Returns the stable wire string for this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestSchemaInvalid => "request.schema_invalid",
            Self::ConflictPayloadMismatch => "conflict.payload_mismatch",
            Self::ConflictInvalidTransition => "conflict.invalid_transition",
            Self::ConflictDuplicateKey => "conflict.duplicate_key",
            Self::NotFound => "not_found",
            Self::PolicyProviderNotAllowed => "policy.provider_not_allowed",
            Self::PolicyActionTypeNotAllowed => "policy.action_type_not_allowed",
            Self::ConfigInvalidStoreKind => "config.invalid_store_kind",
            Self::InternalAuditWriteFailed => "internal.audit_write_failed",
            Self::InternalError => "internal_error",
        }
    }

    /// Returns the default HTTP status code associated with this error.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::RequestSchemaInvalid
            | Self::PolicyProviderNotAllowed
            | Self::PolicyActionTypeNotAllowed => 400,
            Self::ConflictPayloadMismatch
            | Self::ConflictInvalidTransition
            | Self::ConflictDuplicateKey => 409,
            Self::NotFound => 404,
            Self::ConfigInvalidStoreKind => 500,
            Self::InternalAuditWriteFailed | Self::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Error Envelope
// ============================================================================

/// The `{ "error": { ... } }` JSON body returned for any failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code string.
    pub code: String,
    /// Human-readable message, not part of the stable contract.
    pub message: String,
    /// Optional structured details (e.g. `existing_hash`/`incoming_hash`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    /// Builds an error body from a stable code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: message.into(),
            details: None,
        }
    }

    /// Attaches structured details to the error body.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Top-level error envelope wrapping an [`ErrorBody`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The wrapped error body.
    pub error: ErrorBody,
}

impl From<ErrorBody> for ErrorEnvelope {
    fn from(error: ErrorBody) -> Self {
        Self {
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_are_stable() {
        assert_eq!(ErrorCode::RequestSchemaInvalid.as_str(), "request.schema_invalid");
        assert_eq!(ErrorCode::ConflictPayloadMismatch.as_str(), "conflict.payload_mismatch");
        assert_eq!(ErrorCode::NotFound.as_str(), "not_found");
        assert_eq!(ErrorCode::InternalAuditWriteFailed.as_str(), "internal.audit_write_failed");
    }

    #[test]
    fn http_status_mapping_matches_spec() {
        assert_eq!(ErrorCode::RequestSchemaInvalid.http_status(), 400);
        assert_eq!(ErrorCode::ConflictPayloadMismatch.http_status(), 409);
        assert_eq!(ErrorCode::NotFound.http_status(), 404);
    }
}
