// arbiter-core/src/authz.rs
// ============================================================================
// Module: Authorization Contract
// Description: The capability the pipeline depends on, plus the built-in
//              allow-all implementation.
// Purpose: Let the pipeline treat built-in and external-HTTP authorization
//          identically; the external transport lives in a separate crate.
// Dependencies: async-trait, serde
// ============================================================================

//! ## Overview
//! The pipeline depends only on [`AuthzDecider::authorize`]. `arbiter-core`
//! ships the built-in always-allow decider; `arbiter-authz-http` ships the
//! external-HTTP decider with retry, circuit breaker, and fail-mode handling,
//! both behind this same trait.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CorrelationId;
use crate::identifiers::EventId;

// ============================================================================
// SECTION: Request/Decision Shapes
// ============================================================================

/// The resource an authorization request pertains to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzResource {
    /// Resource type, e.g. the action's `type`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource identifier.
    pub id: String,
    /// Opaque resource attributes.
    pub attributes: serde_json::Value,
}

/// The inner `request` object of the wire protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzInnerRequest {
    /// Action name being authorized.
    pub action: String,
    /// Resource the action applies to.
    pub resource: AuthzResource,
    /// Contextual fields, currently just `event_id`.
    pub context: AuthzContext,
}

/// Context carried alongside an authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzContext {
    /// The event that produced this authorization request.
    pub event_id: EventId,
}

/// Wire-shaped authorization request, `{v, tenant_id, correlation_id, actor, request}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzRequest {
    /// Protocol version.
    pub v: u32,
    /// Tenant the request belongs to.
    pub tenant_id: String,
    /// Correlation identifier; equals the triggering `event_id`.
    pub correlation_id: CorrelationId,
    /// Opaque actor reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<serde_json::Value>,
    /// The inner authorization request.
    pub request: AuthzInnerRequest,
}

/// Wire-shaped authorization decision, `{v, decision, reason_code, policy_version, ttl_ms}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthzDecision {
    /// Whether the action is allowed.
    pub allow: bool,
    /// Stable reason code for the decision.
    pub reason_code: String,
    /// Policy version that produced this decision.
    pub policy_version: String,
    /// Optional decision cache lifetime in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,
}

// ============================================================================
// SECTION: Fail Mode
// ============================================================================

/// How an external-AuthZ call resolves when it cannot produce a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailMode {
    /// Deny with `authz_error_deny`.
    Deny,
    /// Allow with `authz_error_allow`.
    Allow,
    /// Delegate to the built-in decider with `authz_error_fallback_builtin`.
    FallbackBuiltin,
}

impl FailMode {
    /// Resolves this fail mode into a final decision given the policy version
    /// the built-in decider would use for a fallback.
    #[must_use]
    pub fn resolve(self, builtin_policy_version: &str) -> AuthzDecision {
        match self {
            Self::Deny => AuthzDecision {
                allow: false,
                reason_code: "authz_error_deny".to_string(),
                policy_version: builtin_policy_version.to_string(),
                ttl_ms: None,
            },
            Self::Allow => AuthzDecision {
                allow: true,
                reason_code: "authz_error_allow".to_string(),
                policy_version: builtin_policy_version.to_string(),
                ttl_ms: None,
            },
            Self::FallbackBuiltin => AuthzDecision {
                allow: true,
                reason_code: "authz_error_fallback_builtin".to_string(),
                policy_version: builtin_policy_version.to_string(),
                ttl_ms: None,
            },
        }
    }
}

// ============================================================================
// SECTION: Decider Trait
// ============================================================================

/// The capability the pipeline depends on: authorize a request, never fail.
///
/// Implementations absorb their own transport errors via retry/circuit-breaker
/// and `fail_mode`; by the time `authorize` returns, a decision always exists.
#[async_trait]
pub trait AuthzDecider: Send + Sync {
    /// Produces an authorization decision for `request`.
    async fn authorize(&self, request: &AuthzRequest) -> AuthzDecision;
}

// ============================================================================
// SECTION: Builtin Decider
// ============================================================================

/// The built-in decider: always allows, with a fixed reason and policy version.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinAuthz;

impl BuiltinAuthz {
    /// The policy version the built-in decider reports.
    pub const POLICY_VERSION: &'static str = "builtin-v0";
    /// The reason code the built-in decider reports.
    pub const REASON_CODE: &'static str = "builtin_allow_all";
}

#[async_trait]
impl AuthzDecider for BuiltinAuthz {
    async fn authorize(&self, _request: &AuthzRequest) -> AuthzDecision {
        AuthzDecision {
            allow: true,
            reason_code: Self::REASON_CODE.to_string(),
            policy_version: Self::POLICY_VERSION.to_string(),
            ttl_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builtin_always_allows() {
        let decider = BuiltinAuthz;
        let request = AuthzRequest {
            v: 1,
            tenant_id: "t1".to_string(),
            correlation_id: CorrelationId::new("e1"),
            actor: None,
            request: AuthzInnerRequest {
                action: "send_message".to_string(),
                resource: AuthzResource {
                    resource_type: "room".to_string(),
                    id: "r1".to_string(),
                    attributes: serde_json::Value::Null,
                },
                context: AuthzContext {
                    event_id: EventId::new("e1"),
                },
            },
        };
        let decision = decider.authorize(&request).await;
        assert!(decision.allow);
        assert_eq!(decision.reason_code, "builtin_allow_all");
        assert_eq!(decision.policy_version, "builtin-v0");
    }

    #[test]
    fn fail_mode_deny_resolves_to_denial() {
        let decision = FailMode::Deny.resolve("builtin-v0");
        assert!(!decision.allow);
        assert_eq!(decision.reason_code, "authz_error_deny");
    }

    #[test]
    fn fail_mode_fallback_builtin_allows() {
        let decision = FailMode::FallbackBuiltin.resolve("builtin-v0");
        assert!(decision.allow);
        assert_eq!(decision.reason_code, "authz_error_fallback_builtin");
    }
}
