// arbiter-core/src/store/mod.rs
// ============================================================================
// Module: Store Contract
// Description: The abstract persistence contract every pipeline stage uses.
// Purpose: Let the pipeline orchestrator depend on one trait regardless of
//          whether state lives in memory or in SQLite.
// Dependencies: async-trait, serde
// ============================================================================

//! ## Overview
//! [`Store`] exposes keyed read/write for every entity in the data model. It
//! offers **at-least per-key serialization**: two concurrent callers touching
//! the same key never interleave in a way that breaks an entity's invariant,
//! but callers touching different keys may run fully in parallel. Concrete
//! implementations (in-memory here, SQLite in `arbiter-store-sqlite`) satisfy
//! that guarantee however fits their backend.

pub mod memory;

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;

use crate::identifiers::ActionId;
use crate::identifiers::ApprovalId;
use crate::identifiers::EventId;
use crate::identifiers::JobId;
use crate::identifiers::PlanId;
use crate::identifiers::RoomId;
use crate::identifiers::TenantId;
use crate::model::ActionResult;
use crate::model::ApprovalState;
use crate::model::IdempotencyRecord;
use crate::model::JobState;
use crate::model::PendingGeneration;
use crate::model::RoomState;
use crate::model::lifecycle::LifecycleError;

// ============================================================================
// SECTION: Action-Result Outcome
// ============================================================================

/// Outcome of a first-write-wins action-result write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResultOutcome {
    /// This call stored the first result for the key.
    Written(ActionResult),
    /// An identical result was already stored; accepted as a no-op.
    AlreadyMatching(ActionResult),
    /// A different result was already stored under this key.
    Mismatch {
        /// Fingerprint already stored.
        existing_hash: String,
        /// Fingerprint presented by this call.
        incoming_hash: String,
    },
}

/// A boxed, one-shot state transition function for job/approval compare-and-apply.
pub type JobTransition =
    Box<dyn FnOnce(Option<&JobState>) -> Result<JobState, LifecycleError> + Send>;
/// A boxed, one-shot state transition function for approval compare-and-apply.
pub type ApprovalTransition =
    Box<dyn FnOnce(Option<&ApprovalState>) -> Result<ApprovalState, LifecycleError> + Send>;

// ============================================================================
// SECTION: Store Trait
// ============================================================================

/// The persistence contract the pipeline orchestrator depends on.
#[async_trait]
pub trait Store: Send + Sync {
    /// Looks up the idempotency record for `(tenant_id, event_id)`.
    async fn get_idempotency(
        &self,
        tenant_id: &TenantId,
        event_id: &EventId,
    ) -> Option<IdempotencyRecord>;

    /// Inserts `record` for `(tenant_id, event_id)` if absent.
    ///
    /// Returns `None` when this call won the race and stored `record`;
    /// returns the already-present record when another writer won first.
    async fn put_idempotency_if_absent(
        &self,
        tenant_id: &TenantId,
        event_id: &EventId,
        record: IdempotencyRecord,
    ) -> Option<IdempotencyRecord>;

    /// Returns the current room state, or the lazily-created default.
    async fn get_room_state(&self, tenant_id: &TenantId, room_id: &RoomId) -> RoomState;

    /// Atomically mutates and returns the new room state for `(tenant_id, room_id)`.
    async fn mutate_room_state(
        &self,
        tenant_id: &TenantId,
        room_id: &RoomId,
        mutator: Box<dyn FnOnce(&mut RoomState) + Send>,
    ) -> RoomState;

    /// Inserts a pending-generation record keyed by `(tenant_id, action_id)`.
    async fn put_pending(
        &self,
        tenant_id: &TenantId,
        action_id: &ActionId,
        record: PendingGeneration,
    );

    /// Atomically removes and returns the pending-generation record for
    /// `(tenant_id, action_id)`, if any.
    async fn take_pending(
        &self,
        tenant_id: &TenantId,
        action_id: &ActionId,
    ) -> Option<PendingGeneration>;

    /// Returns the current count in `(tenant_id, minute_bucket)`.
    async fn tenant_rate_count(&self, tenant_id: &TenantId, minute_bucket: i64) -> u32;

    /// Increments `(tenant_id, minute_bucket)` and returns the new count.
    ///
    /// Implementations may opportunistically evict buckets older than
    /// `minute_bucket - 5`; eviction is best-effort and never blocks the
    /// increment.
    async fn tenant_rate_increment(&self, tenant_id: &TenantId, minute_bucket: i64) -> u32;

    /// Returns the current job state for `(tenant_id, job_id)`, if any.
    async fn get_job(&self, tenant_id: &TenantId, job_id: &JobId) -> Option<JobState>;

    /// Atomically applies `transition` to the job keyed by `(tenant_id, job_id)`.
    async fn compare_and_apply_job(
        &self,
        tenant_id: &TenantId,
        job_id: &JobId,
        transition: JobTransition,
    ) -> Result<JobState, LifecycleError>;

    /// Returns the current approval state for `(tenant_id, approval_id)`, if any.
    async fn get_approval(
        &self,
        tenant_id: &TenantId,
        approval_id: &ApprovalId,
    ) -> Option<ApprovalState>;

    /// Atomically applies `transition` to the approval keyed by `(tenant_id, approval_id)`.
    async fn compare_and_apply_approval(
        &self,
        tenant_id: &TenantId,
        approval_id: &ApprovalId,
        transition: ApprovalTransition,
    ) -> Result<ApprovalState, LifecycleError>;

    /// Returns the current action-result for `(tenant_id, plan_id, action_id)`, if any.
    async fn get_action_result(
        &self,
        tenant_id: &TenantId,
        plan_id: &PlanId,
        action_id: &ActionId,
    ) -> Option<ActionResult>;

    /// Writes `candidate` under `(tenant_id, plan_id, action_id)` if absent;
    /// otherwise compares fingerprints per first-write-wins semantics.
    async fn first_write_wins_action_result(
        &self,
        tenant_id: &TenantId,
        plan_id: &PlanId,
        action_id: &ActionId,
        candidate: ActionResult,
    ) -> ActionResultOutcome;
}
