// arbiter-core/src/store/memory.rs
// ============================================================================
// Module: In-Memory Store
// Description: A Mutex-guarded map-based Store implementation.
// Purpose: Back `store.kind = "memory"` and the crate's own test suite.
// Dependencies: async-trait
// ============================================================================

//! ## Overview
//! Every map is guarded by its own `Mutex`, so unrelated keys never block
//! each other beyond lock-acquisition cost. This satisfies the store
//! contract's at-least per-key serialization without requiring a lock per
//! entity instance.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;

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
use crate::store::ActionResultOutcome;
use crate::store::ApprovalTransition;
use crate::store::JobTransition;
use crate::store::Store;

// ============================================================================
// SECTION: MemoryStore
// ============================================================================

/// An in-memory [`Store`] implementation for the `memory` config kind and for
/// tests.
#[derive(Default)]
pub struct MemoryStore {
    /// Idempotency records keyed by `(tenant_id, event_id)`.
    idempotency: Mutex<HashMap<(TenantId, EventId), IdempotencyRecord>>,
    /// Room state keyed by `(tenant_id, room_id)`.
    rooms: Mutex<HashMap<(TenantId, RoomId), RoomState>>,
    /// Pending generations keyed by `(tenant_id, action_id)`.
    pending: Mutex<HashMap<(TenantId, ActionId), PendingGeneration>>,
    /// Tenant-rate counts keyed by `(tenant_id, minute_bucket)`.
    tenant_rate: Mutex<HashMap<(TenantId, i64), u32>>,
    /// Job state keyed by `(tenant_id, job_id)`.
    jobs: Mutex<HashMap<(TenantId, JobId), JobState>>,
    /// Approval state keyed by `(tenant_id, approval_id)`.
    approvals: Mutex<HashMap<(TenantId, ApprovalId), ApprovalState>>,
    /// Action-result state keyed by `(tenant_id, plan_id, action_id)`.
    action_results: Mutex<HashMap<(TenantId, PlanId, ActionId), ActionResult>>,
}

impl MemoryStore {
    /// Builds an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks `mutex`, recovering the guard even if a prior holder panicked.
    fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_idempotency(
        &self,
        tenant_id: &TenantId,
        event_id: &EventId,
    ) -> Option<IdempotencyRecord> {
        Self::lock(&self.idempotency)
            .get(&(tenant_id.clone(), event_id.clone()))
            .cloned()
    }

    async fn put_idempotency_if_absent(
        &self,
        tenant_id: &TenantId,
        event_id: &EventId,
        record: IdempotencyRecord,
    ) -> Option<IdempotencyRecord> {
        let mut guard = Self::lock(&self.idempotency);
        let key = (tenant_id.clone(), event_id.clone());
        if let Some(existing) = guard.get(&key) {
            return Some(existing.clone());
        }
        guard.insert(key, record);
        None
    }

    async fn get_room_state(&self, tenant_id: &TenantId, room_id: &RoomId) -> RoomState {
        Self::lock(&self.rooms)
            .get(&(tenant_id.clone(), room_id.clone()))
            .copied()
            .unwrap_or_default()
    }

    async fn mutate_room_state(
        &self,
        tenant_id: &TenantId,
        room_id: &RoomId,
        mutator: Box<dyn FnOnce(&mut RoomState) + Send>,
    ) -> RoomState {
        let mut guard = Self::lock(&self.rooms);
        let entry = guard.entry((tenant_id.clone(), room_id.clone())).or_default();
        mutator(entry);
        *entry
    }

    async fn put_pending(
        &self,
        tenant_id: &TenantId,
        action_id: &ActionId,
        record: PendingGeneration,
    ) {
        Self::lock(&self.pending).insert((tenant_id.clone(), action_id.clone()), record);
    }

    async fn take_pending(
        &self,
        tenant_id: &TenantId,
        action_id: &ActionId,
    ) -> Option<PendingGeneration> {
        Self::lock(&self.pending).remove(&(tenant_id.clone(), action_id.clone()))
    }

    async fn tenant_rate_count(&self, tenant_id: &TenantId, minute_bucket: i64) -> u32 {
        Self::lock(&self.tenant_rate)
            .get(&(tenant_id.clone(), minute_bucket))
            .copied()
            .unwrap_or(0)
    }

    async fn tenant_rate_increment(&self, tenant_id: &TenantId, minute_bucket: i64) -> u32 {
        let mut guard = Self::lock(&self.tenant_rate);
        guard.retain(|(tenant, bucket), _| tenant != tenant_id || *bucket >= minute_bucket - 5);
        let count = guard.entry((tenant_id.clone(), minute_bucket)).or_insert(0);
        *count += 1;
        *count
    }

    async fn get_job(&self, tenant_id: &TenantId, job_id: &JobId) -> Option<JobState> {
        Self::lock(&self.jobs).get(&(tenant_id.clone(), job_id.clone())).cloned()
    }

    async fn compare_and_apply_job(
        &self,
        tenant_id: &TenantId,
        job_id: &JobId,
        transition: JobTransition,
    ) -> Result<JobState, LifecycleError> {
        let mut guard = Self::lock(&self.jobs);
        let key = (tenant_id.clone(), job_id.clone());
        let next = transition(guard.get(&key))?;
        guard.insert(key, next.clone());
        Ok(next)
    }

    async fn get_approval(
        &self,
        tenant_id: &TenantId,
        approval_id: &ApprovalId,
    ) -> Option<ApprovalState> {
        Self::lock(&self.approvals)
            .get(&(tenant_id.clone(), approval_id.clone()))
            .cloned()
    }

    async fn compare_and_apply_approval(
        &self,
        tenant_id: &TenantId,
        approval_id: &ApprovalId,
        transition: ApprovalTransition,
    ) -> Result<ApprovalState, LifecycleError> {
        let mut guard = Self::lock(&self.approvals);
        let key = (tenant_id.clone(), approval_id.clone());
        let next = transition(guard.get(&key))?;
        guard.insert(key, next.clone());
        Ok(next)
    }

    async fn get_action_result(
        &self,
        tenant_id: &TenantId,
        plan_id: &PlanId,
        action_id: &ActionId,
    ) -> Option<ActionResult> {
        Self::lock(&self.action_results)
            .get(&(tenant_id.clone(), plan_id.clone(), action_id.clone()))
            .cloned()
    }

    async fn first_write_wins_action_result(
        &self,
        tenant_id: &TenantId,
        plan_id: &PlanId,
        action_id: &ActionId,
        candidate: ActionResult,
    ) -> ActionResultOutcome {
        let mut guard = Self::lock(&self.action_results);
        let key = (tenant_id.clone(), plan_id.clone(), action_id.clone());
        match guard.get(&key) {
            None => {
                guard.insert(key, candidate.clone());
                ActionResultOutcome::Written(candidate)
            }
            Some(existing) if existing.matches(&candidate.payload_fingerprint) => {
                ActionResultOutcome::AlreadyMatching(existing.clone())
            }
            Some(existing) => ActionResultOutcome::Mismatch {
                existing_hash: existing.payload_fingerprint.clone(),
                incoming_hash: candidate.payload_fingerprint,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamp;

    fn ts() -> Timestamp {
        Timestamp::parse("2026-02-14T00:00:00Z").unwrap()
    }

    #[tokio::test]
    async fn idempotency_put_if_absent_is_exclusive() {
        let store = MemoryStore::new();
        let tenant = TenantId::new("t1");
        let event = EventId::new("e1");
        let plan = crate::model::ResponsePlan::do_nothing(
            tenant.clone(),
            event.clone(),
            "v1",
            ts(),
            "planner_ignore",
        );
        let record = IdempotencyRecord::new(plan.clone(), "fp1".to_string());
        let first = store.put_idempotency_if_absent(&tenant, &event, record.clone()).await;
        assert_eq!(first, None);
        let second = store.put_idempotency_if_absent(&tenant, &event, record).await;
        assert!(second.is_some());
    }

    #[tokio::test]
    async fn room_state_defaults_and_mutates() {
        let store = MemoryStore::new();
        let tenant = TenantId::new("t1");
        let room = RoomId::new("r1");
        let initial = store.get_room_state(&tenant, &room).await;
        assert!(!initial.generating);
        let mutated = store
            .mutate_room_state(
                &tenant,
                &room,
                Box::new(|state| {
                    state.generating = true;
                    state.pending_queue_size += 1;
                }),
            )
            .await;
        assert!(mutated.generating);
        assert_eq!(mutated.pending_queue_size, 1);
    }

    #[tokio::test]
    async fn pending_generation_is_consumed_once() {
        let store = MemoryStore::new();
        let tenant = TenantId::new("t1");
        let action = ActionId::new("act1");
        let pending = PendingGeneration {
            tenant_id: tenant.clone(),
            room_id: RoomId::new("r1"),
            plan_id: PlanId::new("plan1"),
            event_id: EventId::new("e1"),
            action_id: action.clone(),
            intent: crate::model::Intent::Reply,
            reply_to: None,
        };
        store.put_pending(&tenant, &action, pending.clone()).await;
        let taken = store.take_pending(&tenant, &action).await;
        assert_eq!(taken, Some(pending));
        assert_eq!(store.take_pending(&tenant, &action).await, None);
    }

    #[tokio::test]
    async fn tenant_rate_increments_and_evicts_stale_buckets() {
        let store = MemoryStore::new();
        let tenant = TenantId::new("t1");
        assert_eq!(store.tenant_rate_increment(&tenant, 100).await, 1);
        assert_eq!(store.tenant_rate_increment(&tenant, 100).await, 2);
        store.tenant_rate_increment(&tenant, 107).await;
        assert_eq!(store.tenant_rate_count(&tenant, 100).await, 0);
    }

    #[tokio::test]
    async fn job_transition_rejects_terminal_restart() {
        let store = MemoryStore::new();
        let tenant = TenantId::new("t1");
        let job = JobId::new("j1");
        store
            .compare_and_apply_job(
                &tenant,
                &job,
                Box::new(move |_existing| {
                    Ok(JobState {
                        status: crate::model::JobStatus::Completed,
                        reason_code: None,
                        updated_at: ts(),
                        payload_fingerprint: "fp1".to_string(),
                    })
                }),
            )
            .await
            .unwrap();
        let result = store
            .compare_and_apply_job(
                &tenant,
                &job,
                Box::new(move |existing| match existing {
                    Some(state) if state.status.is_terminal() => {
                        Err(LifecycleError::InvalidTransition)
                    }
                    _ => unreachable!("test only exercises the terminal branch"),
                }),
            )
            .await;
        assert_eq!(result, Err(LifecycleError::InvalidTransition));
    }

    #[tokio::test]
    async fn action_result_first_write_wins() {
        let store = MemoryStore::new();
        let tenant = TenantId::new("t1");
        let plan = PlanId::new("plan1");
        let action = ActionId::new("act1");
        let result = ActionResult {
            status: crate::model::ActionResultStatus::Succeeded,
            occurred_at: ts(),
            evidence: serde_json::Value::Null,
            payload_fingerprint: "fp1".to_string(),
        };
        let first = store
            .first_write_wins_action_result(&tenant, &plan, &action, result.clone())
            .await;
        assert_eq!(first, ActionResultOutcome::Written(result.clone()));

        let repeat = store
            .first_write_wins_action_result(&tenant, &plan, &action, result.clone())
            .await;
        assert_eq!(repeat, ActionResultOutcome::AlreadyMatching(result));

        let mut mismatched = ActionResult {
            status: crate::model::ActionResultStatus::Failed,
            occurred_at: ts(),
            evidence: serde_json::Value::Null,
            payload_fingerprint: "fp2".to_string(),
        };
        let conflict = store
            .first_write_wins_action_result(&tenant, &plan, &action, mismatched.clone())
            .await;
        assert_eq!(
            conflict,
            ActionResultOutcome::Mismatch {
                existing_hash: "fp1".to_string(),
                incoming_hash: "fp2".to_string(),
            }
        );
        mismatched.payload_fingerprint = "fp1".to_string();
    }
}
