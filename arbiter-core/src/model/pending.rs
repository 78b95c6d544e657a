// arbiter-core/src/model/pending.rs
// ============================================================================
// Module: Pending Generation
// Description: A request_generation action awaiting its generation-result.
// Purpose: Bridge plan emission (which requests a generation) and the sibling
//          generation-result ingest path that consumes it exactly once.
// Dependencies: serde
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ActionId;
use crate::identifiers::EventId;
use crate::identifiers::PlanId;
use crate::identifiers::RoomId;
use crate::identifiers::TenantId;
use crate::model::plan::Intent;

/// Keyed by `(tenant_id, action_id)`; created on `request_generation` emission,
/// consumed exactly once on matching generation-result ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingGeneration {
    /// Tenant that owns this pending generation.
    pub tenant_id: TenantId,
    /// Room the generation will be sent into.
    pub room_id: RoomId,
    /// Plan that requested this generation.
    pub plan_id: PlanId,
    /// Event that produced the plan requesting this generation.
    pub event_id: EventId,
    /// The `request_generation` action's id; also the lookup key.
    pub action_id: ActionId,
    /// Intent chosen by the planner when the generation was requested.
    pub intent: Intent,
    /// Message identifier this generation should reply to, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}
