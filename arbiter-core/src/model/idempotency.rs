// arbiter-core/src/model/idempotency.rs
// ============================================================================
// Module: Idempotency Record
// Description: Cached plan + payload fingerprint keyed by (tenant_id, event_id).
// Purpose: Let replays of an accepted event return the original plan unchanged
//          and detect payload reuse under a stale key.
// Dependencies: serde
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::model::plan::ResponsePlan;

/// Created on first accept of an event; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    /// The cached response plan returned verbatim on replay.
    pub plan: ResponsePlan,
    /// JCS-SHA256 hex fingerprint of the canonical event payload that produced `plan`.
    pub payload_fingerprint: String,
}

impl IdempotencyRecord {
    /// Builds a new idempotency record.
    #[must_use]
    pub const fn new(plan: ResponsePlan, payload_fingerprint: String) -> Self {
        Self {
            plan,
            payload_fingerprint,
        }
    }

    /// Returns whether `incoming_fingerprint` matches the stored fingerprint.
    #[must_use]
    pub fn matches(&self, incoming_fingerprint: &str) -> bool {
        self.payload_fingerprint == incoming_fingerprint
    }
}
