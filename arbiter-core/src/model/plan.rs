// arbiter-core/src/model/plan.rs
// ============================================================================
// Module: Response Plan
// Description: The pipeline's sole output type: a plan of described, unexecuted
//              actions plus the decision trail that produced them.
// Purpose: Give every pipeline stage a single, serializable result shape.
// Dependencies: serde, sha2 (via fingerprint)
// ============================================================================

//! ## Overview
//! A plan never triggers side effects itself; it is a record of what the
//! pipeline decided. `plan_id` and each `action_id` are derived
//! deterministically from their inputs so that replays and independent
//! processes agree on identifiers without coordination.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::fingerprint::hex_sha256;
use crate::identifiers::ActionId;
use crate::identifiers::ApprovalId;
use crate::identifiers::EventId;
use crate::identifiers::PlanId;
use crate::identifiers::TenantId;
use crate::model::time::Timestamp;

// ============================================================================
// SECTION: Intent
// ============================================================================

/// The planner's chosen response intent for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Do not respond.
    Ignore,
    /// Respond in reply to a specific message.
    Reply,
    /// Respond as a new message.
    Message,
}

// ============================================================================
// SECTION: Action
// ============================================================================

/// The kind of action a plan describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Send a notification.
    Notify,
    /// Write to an external system.
    WriteExternal,
    /// Start an asynchronous job.
    StartJob,
    /// Request a generation from a downstream runtime.
    RequestGeneration,
    /// Send a reply to a specific message.
    SendReply,
    /// Send a new message.
    SendMessage,
    /// Take no action.
    DoNothing,
}

/// Risk classification of an action, used by approval policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
}

/// A single described, unexecuted action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Deterministic action identifier.
    pub action_id: ActionId,
    /// Action kind.
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Provider this action targets, e.g. `"builtin"`.
    pub provider: String,
    /// Operation name within the provider.
    pub operation: String,
    /// Opaque operation parameters.
    pub params: serde_json::Value,
    /// Risk classification.
    pub risk: Risk,
    /// Whether this action requires approval before execution.
    pub requires_approval: bool,
    /// Idempotency key for the downstream executor.
    pub idempotency_key: String,
}

impl Action {
    /// Derives the deterministic action id `"act_" + hex(sha256(plan_id ++ ":" ++ type ++ ":" ++ index))[0..16]`.
    #[must_use]
    pub fn derive_id(plan_id: &PlanId, action_type: ActionType, index: usize) -> ActionId {
        let seed = format!("{plan_id}:{}:{index}", action_type_str(action_type));
        let digest = hex_sha256(seed.as_bytes());
        ActionId::new(format!("act_{}", &digest[..16]))
    }
}

/// Returns the wire string for an [`ActionType`], used when deriving action ids.
const fn action_type_str(action_type: ActionType) -> &'static str {
    match action_type {
        ActionType::Notify => "notify",
        ActionType::WriteExternal => "write_external",
        ActionType::StartJob => "start_job",
        ActionType::RequestGeneration => "request_generation",
        ActionType::SendReply => "send_reply",
        ActionType::SendMessage => "send_message",
        ActionType::DoNothing => "do_nothing",
    }
}

// ============================================================================
// SECTION: Decision & Approval
// ============================================================================

/// The policy decision trail attached to a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Policy version that produced this plan (gate/authz/planner snapshot).
    pub policy_version: String,
    /// Equals `event.occurred_at`; wall-clock never contributes here.
    pub evaluation_time: Timestamp,
    /// Stable reason code explaining the outcome, when not a normal accept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
}

/// Approval requirement attached to a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// Whether approval is required before any action executes.
    pub required: bool,
    /// Approval identifier, present once an approval has been requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<ApprovalId>,
}

// ============================================================================
// SECTION: Response Plan
// ============================================================================

/// The pipeline's output: a set of described actions plus the decision trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePlan {
    /// Deterministic plan identifier.
    pub plan_id: PlanId,
    /// Tenant this plan belongs to.
    pub tenant_id: TenantId,
    /// Event that produced this plan.
    pub event_id: EventId,
    /// Described actions; never executed by this system.
    pub actions: Vec<Action>,
    /// Decision trail.
    pub decision: Decision,
    /// Approval requirement, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<Approval>,
}

impl ResponsePlan {
    /// Derives the deterministic plan id `"plan_" + hex(sha256(tenant_id ++ ":" ++ event_id))[0..16]`.
    #[must_use]
    pub fn derive_id(tenant_id: &TenantId, event_id: &EventId) -> PlanId {
        let seed = format!("{tenant_id}:{event_id}");
        let digest = hex_sha256(seed.as_bytes());
        PlanId::new(format!("plan_{}", &digest[..16]))
    }

    /// Builds a single-action `do_nothing` plan carrying a reason code.
    #[must_use]
    pub fn do_nothing(
        tenant_id: TenantId,
        event_id: EventId,
        policy_version: impl Into<String>,
        evaluation_time: Timestamp,
        reason_code: impl Into<String>,
    ) -> Self {
        let plan_id = Self::derive_id(&tenant_id, &event_id);
        let action_id = Action::derive_id(&plan_id, ActionType::DoNothing, 0);
        let reason = reason_code.into();
        Self {
            plan_id: plan_id.clone(),
            tenant_id,
            event_id,
            actions: vec![Action {
                action_id,
                action_type: ActionType::DoNothing,
                provider: "builtin".to_string(),
                operation: "do_nothing".to_string(),
                params: serde_json::Value::Null,
                risk: Risk::Low,
                requires_approval: false,
                idempotency_key: plan_id.to_string(),
            }],
            decision: Decision {
                policy_version: policy_version.into(),
                evaluation_time,
                reason_code: Some(reason),
            },
            approval: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_id_is_deterministic() {
        let tenant = TenantId::new("t1");
        let event = EventId::new("e1");
        let a = ResponsePlan::derive_id(&tenant, &event);
        let b = ResponsePlan::derive_id(&tenant, &event);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("plan_"));
        assert_eq!(a.as_str().len(), "plan_".len() + 16);
    }

    #[test]
    fn action_id_varies_by_index_and_type() {
        let plan_id = PlanId::new("plan_abc");
        let a = Action::derive_id(&plan_id, ActionType::RequestGeneration, 0);
        let b = Action::derive_id(&plan_id, ActionType::RequestGeneration, 1);
        let c = Action::derive_id(&plan_id, ActionType::DoNothing, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn do_nothing_plan_has_reason_code() {
        let ts = Timestamp::parse("2026-02-14T00:00:00Z").unwrap();
        let plan = ResponsePlan::do_nothing(
            TenantId::new("t1"),
            EventId::new("e1"),
            "v1",
            ts,
            "gate_cooldown",
        );
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].action_type, ActionType::DoNothing);
        assert_eq!(plan.decision.reason_code.as_deref(), Some("gate_cooldown"));
    }
}
