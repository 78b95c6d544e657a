// arbiter-core/src/model/audit.rs
// ============================================================================
// Module: Audit Record
// Description: The append-only, hash-chained audit record shape.
// Purpose: Give the pipeline and the audit writer a single serializable type
//          whose canonical form (sans `record_hash`) feeds the hash chain.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! `record_hash` is always computed over the record's own canonical JSON with
//! `record_hash` itself excluded; [`AuditRecord::hashable`] returns that
//! intermediate form so `arbiter-audit` never has to special-case the field by
//! hand on every write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CorrelationId;
use crate::identifiers::PlanId;
use crate::identifiers::TenantId;
use crate::model::time::Timestamp;

// ============================================================================
// SECTION: Audit Record
// ============================================================================

/// One append-only audit record in the hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier for this record.
    pub audit_id: String,
    /// Tenant this record pertains to.
    pub tenant_id: TenantId,
    /// Correlation identifier, usually the triggering event id.
    pub correlation_id: CorrelationId,
    /// Action name, e.g. `"process_event"`, `"idempotency_hit"`.
    pub action: String,
    /// Outcome, e.g. `"accepted"`, `"denied"`, `"conflict"`.
    pub result: String,
    /// Stable reason code, when the outcome carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    /// Append-time wall-clock timestamp. Diagnostic only; never fed back into
    /// decisions.
    pub ts: Timestamp,
    /// Plan this record pertains to, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<PlanId>,
    /// Previous record's `record_hash`, or `""` for the first record.
    pub prev_hash: String,
    /// `sha256(canonical_json(self \ record_hash))`, hex-encoded.
    pub record_hash: String,
}

/// The fields of an [`AuditRecord`] that participate in its own hash, i.e.
/// every field except `record_hash`.
#[derive(Debug, Clone, Serialize)]
pub struct HashableAuditRecord<'a> {
    audit_id: &'a str,
    tenant_id: &'a TenantId,
    correlation_id: &'a CorrelationId,
    action: &'a str,
    result: &'a str,
    reason_code: &'a Option<String>,
    ts: Timestamp,
    plan_id: &'a Option<PlanId>,
    prev_hash: &'a str,
}

impl AuditRecord {
    /// Returns the subset of fields that feed `record_hash`'s computation.
    #[must_use]
    pub fn hashable(&self) -> HashableAuditRecord<'_> {
        HashableAuditRecord {
            audit_id: &self.audit_id,
            tenant_id: &self.tenant_id,
            correlation_id: &self.correlation_id,
            action: &self.action,
            result: &self.result,
            reason_code: &self.reason_code,
            ts: self.ts,
            plan_id: &self.plan_id,
            prev_hash: &self.prev_hash,
        }
    }
}
