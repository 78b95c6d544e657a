// arbiter-core/src/pipeline.rs
// ============================================================================
// Module: Pipeline Orchestrator
// Description: The eight-stage event pipeline plus sibling ingest paths for
//              generation-results, job/approval events, and action-results.
// Purpose: Enforce the one true invariant order: schema validation,
//          idempotency, room state, gate, authorization, planner, plan
//          emission, idempotency persist + audit.
// Dependencies: arbiter-core::{model, store, gate, authz, planner, fingerprint}
// ============================================================================

//! ## Overview
//! [`Pipeline`] is a single struct generic over nothing — it holds a
//! `Arc<dyn Store>`, a `Arc<dyn AuthzDecider>`, a `Arc<dyn AuditAppender>`, and
//! its policy configuration, and exposes one method per external entry point
//! named in the external interfaces. Stage order is enforced by control flow,
//! not by a type-state machine: each `process_event` call runs its stages top
//! to bottom and returns at the first stage that produces a result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::authz::AuthzContext;
use crate::authz::AuthzDecider;
use crate::authz::AuthzInnerRequest;
use crate::authz::AuthzRequest;
use crate::authz::AuthzResource;
use crate::fingerprint;
use crate::gate;
use crate::gate::GateConfig;
use crate::gate::GateVerdict;
use crate::identifiers::ActionId;
use crate::identifiers::ApprovalId;
use crate::identifiers::CorrelationId;
use crate::identifiers::EventId;
use crate::identifiers::JobId;
use crate::identifiers::PlanId;
use crate::identifiers::RoomId;
use crate::identifiers::TenantId;
use crate::model::Action;
use crate::model::ActionResult;
use crate::model::ActionResultStatus;
use crate::model::ActionType;
use crate::model::ApprovalState;
use crate::model::ApprovalStatus;
use crate::model::Decision;
use crate::model::EventEnvelope;
use crate::model::IdempotencyRecord;
use crate::model::Intent;
use crate::model::JobState;
use crate::model::JobStatus;
use crate::model::PendingGeneration;
use crate::model::Risk;
use crate::model::ResponsePlan;
use crate::model::Timestamp;
use crate::model::lifecycle::LifecycleError;
use crate::planner;
use crate::planner::PlannerConfig;
use crate::store::ActionResultOutcome;
use crate::store::Store;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures the pipeline surfaces directly, as opposed to plan-level denials.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request failed schema validation.
    #[error("request.schema_invalid: {0}")]
    SchemaInvalid(String),
    /// The same idempotency key was reused with a different payload.
    #[error("conflict.payload_mismatch")]
    PayloadMismatch {
        /// Fingerprint already stored under this key.
        existing_hash: String,
        /// Fingerprint presented by this request.
        incoming_hash: String,
    },
    /// A job/approval transition was attempted from a terminal state.
    #[error("conflict.invalid_transition")]
    InvalidTransition,
    /// The referenced entity does not exist.
    #[error("not_found")]
    NotFound,
    /// The audit sink failed to append; the request fails closed.
    #[error("internal.audit_write_failed: {0}")]
    AuditWriteFailed(String),
}

impl From<LifecycleError> for PipelineError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::PayloadMismatch { existing_hash, incoming_hash } => {
                Self::PayloadMismatch { existing_hash, incoming_hash }
            }
            LifecycleError::InvalidTransition => Self::InvalidTransition,
        }
    }
}

// ============================================================================
// SECTION: Audit Sink Contract
// ============================================================================

/// The fields the pipeline supplies for one audit record; the sink fills in
/// `ts`, `prev_hash`, and `record_hash`.
#[derive(Debug, Clone)]
pub struct AuditRecordInput {
    /// Tenant this record pertains to.
    pub tenant_id: TenantId,
    /// Correlation identifier, usually the triggering event id.
    pub correlation_id: CorrelationId,
    /// Action name, e.g. `"process_event"`, `"idempotency_hit"`.
    pub action: String,
    /// Outcome, e.g. `"accepted"`, `"denied"`, `"conflict"`.
    pub result: String,
    /// Stable reason code, when the outcome carries one.
    pub reason_code: Option<String>,
    /// Plan this record pertains to, when any.
    pub plan_id: Option<PlanId>,
}

/// The append-only audit writer the pipeline depends on.
#[async_trait]
pub trait AuditAppender: Send + Sync {
    /// Appends one record to the audit chain, failing closed on I/O error.
    async fn append(&self, input: AuditRecordInput) -> Result<(), String>;
}

// ============================================================================
// SECTION: Pipeline Configuration
// ============================================================================

/// Static policy configuration the pipeline evaluates against.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Gate rule thresholds.
    pub gate: GateConfig,
    /// Planner reply policy.
    pub planner: PlannerConfig,
    /// Policy version stamped onto every plan's decision trail.
    pub policy_version: String,
}

// ============================================================================
// SECTION: Sibling Ingest DTOs
// ============================================================================

/// Input to the generation-result ingest path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationResult {
    /// Protocol version.
    pub v: u32,
    /// Plan that requested this generation.
    pub plan_id: PlanId,
    /// The `request_generation` action this result answers.
    pub action_id: ActionId,
    /// Tenant this result belongs to.
    pub tenant_id: TenantId,
    /// Generated text.
    pub text: String,
    /// Optional trace identifier for downstream correlation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// The consumption instant; feeds `room.last_send_at`, so it is caller
    /// supplied rather than read from the wall clock.
    pub occurred_at: Timestamp,
}

/// Input to the job-event ingest path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobEvent {
    /// Tenant this event belongs to.
    pub tenant_id: TenantId,
    /// Job this event pertains to.
    pub job_id: JobId,
    /// Requested status.
    pub status: JobStatus,
    /// Stable reason code for a terminal outcome, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    /// Event time.
    pub occurred_at: Timestamp,
}

/// Input to the approval-event ingest path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApprovalEvent {
    /// Tenant this event belongs to.
    pub tenant_id: TenantId,
    /// Approval this event pertains to.
    pub approval_id: ApprovalId,
    /// Requested status.
    pub status: ApprovalStatus,
    /// Stable reason code for a terminal outcome, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    /// Event time.
    pub occurred_at: Timestamp,
}

/// Input to the action-result ingest path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionResultEvent {
    /// Tenant this result belongs to.
    pub tenant_id: TenantId,
    /// Plan the action belongs to.
    pub plan_id: PlanId,
    /// Action this result reports on.
    pub action_id: ActionId,
    /// Reported outcome.
    pub status: ActionResultStatus,
    /// Event time.
    pub occurred_at: Timestamp,
    /// Opaque supporting evidence.
    #[serde(default)]
    pub evidence: serde_json::Value,
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// The event-processing pipeline orchestrator.
pub struct Pipeline {
    store: Arc<dyn Store>,
    authz: Arc<dyn AuthzDecider>,
    audit: Arc<dyn AuditAppender>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Builds a pipeline over the given store, authorization decider, audit
    /// sink, and policy configuration.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        authz: Arc<dyn AuthzDecider>,
        audit: Arc<dyn AuditAppender>,
        config: PipelineConfig,
    ) -> Self {
        Self { store, authz, audit, config }
    }

    async fn record_audit(
        &self,
        tenant_id: &TenantId,
        correlation_id: &str,
        action: &str,
        result: &str,
        reason_code: Option<String>,
        plan_id: Option<PlanId>,
    ) -> Result<(), PipelineError> {
        self.audit
            .append(AuditRecordInput {
                tenant_id: tenant_id.clone(),
                correlation_id: CorrelationId::new(correlation_id),
                action: action.to_string(),
                result: result.to_string(),
                reason_code,
                plan_id,
            })
            .await
            .map_err(PipelineError::AuditWriteFailed)
    }

    fn room_id_for(event: &EventEnvelope) -> RoomId {
        event.room_id.clone().unwrap_or_else(|| RoomId::new(event.subject.clone()))
    }

    fn build_authz_request(event: &EventEnvelope, action: &Action) -> AuthzRequest {
        AuthzRequest {
            v: 1,
            tenant_id: event.tenant_id.to_string(),
            correlation_id: CorrelationId::new(event.event_id.as_str()),
            actor: event.actor.clone(),
            request: AuthzInnerRequest {
                action: action.operation.clone(),
                resource: AuthzResource {
                    resource_type: "room".to_string(),
                    id: Self::room_id_for(event).to_string(),
                    attributes: serde_json::Value::Null,
                },
                context: AuthzContext { event_id: event.event_id.clone() },
            },
        }
    }

    /// Persists the idempotency record for `event`, increments the tenant-rate
    /// bucket on first write, and appends one audit record, returning the
    /// winning plan (the caller's plan, or another writer's if it raced ahead).
    async fn finish(
        &self,
        event: &EventEnvelope,
        incoming_fp: String,
        plan: ResponsePlan,
        bucket: i64,
        action: &str,
        result: &str,
    ) -> Result<ResponsePlan, PipelineError> {
        let record = IdempotencyRecord::new(plan.clone(), incoming_fp);
        let raced = self
            .store
            .put_idempotency_if_absent(&event.tenant_id, &event.event_id, record)
            .await;
        let final_plan = if let Some(existing) = raced {
            existing.plan
        } else {
            self.store.tenant_rate_increment(&event.tenant_id, bucket).await;
            plan
        };
        self.record_audit(
            &event.tenant_id,
            event.event_id.as_str(),
            action,
            result,
            final_plan.decision.reason_code.clone(),
            Some(final_plan.plan_id.clone()),
        )
        .await?;
        Ok(final_plan)
    }

    /// Runs the eight-stage pipeline over a raw JSON event payload.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::SchemaInvalid`] when `raw` fails validation,
    /// [`PipelineError::PayloadMismatch`] on idempotency-key reuse with a
    /// different payload, or [`PipelineError::AuditWriteFailed`] when the
    /// audit sink fails closed.
    pub async fn process_event(&self, raw: serde_json::Value) -> Result<ResponsePlan, PipelineError> {
        // Stage 1: schema validation.
        let incoming_fp = fingerprint::fingerprint(&raw)
            .map_err(|err| PipelineError::SchemaInvalid(err.to_string()))?;
        let event: EventEnvelope = serde_json::from_value(raw)
            .map_err(|err| PipelineError::SchemaInvalid(err.to_string()))?;

        // Stage 2: idempotency check.
        if let Some(existing) =
            self.store.get_idempotency(&event.tenant_id, &event.event_id).await
        {
            if existing.matches(&incoming_fp) {
                self.record_audit(
                    &event.tenant_id,
                    event.event_id.as_str(),
                    "idempotency_hit",
                    "replayed",
                    None,
                    Some(existing.plan.plan_id.clone()),
                )
                .await?;
                return Ok(existing.plan);
            }
            self.record_audit(
                &event.tenant_id,
                event.event_id.as_str(),
                "process_event",
                "conflict",
                Some("conflict.payload_mismatch".to_string()),
                None,
            )
            .await?;
            return Err(PipelineError::PayloadMismatch {
                existing_hash: existing.payload_fingerprint,
                incoming_hash: incoming_fp,
            });
        }

        // Stage 3: room state load.
        let room_id = Self::room_id_for(&event);
        let room = self.store.get_room_state(&event.tenant_id, &room_id).await;
        let bucket = event.occurred_at.minute_bucket();

        // Stage 4: gate.
        let tenant_count = self.store.tenant_rate_count(&event.tenant_id, bucket).await;
        if let GateVerdict::Deny { reason_code } =
            gate::evaluate(room, event.occurred_at, tenant_count, self.config.gate)
        {
            let plan = ResponsePlan::do_nothing(
                event.tenant_id.clone(),
                event.event_id.clone(),
                self.config.policy_version.clone(),
                event.occurred_at,
                reason_code,
            );
            return self.finish(&event, incoming_fp, plan, bucket, "process_event", "denied").await;
        }

        // Stage 5: authorization. Only reached when the gate allowed.
        let plan_id = ResponsePlan::derive_id(&event.tenant_id, &event.event_id);
        let probe_action = Action {
            action_id: Action::derive_id(&plan_id, ActionType::RequestGeneration, 0),
            action_type: ActionType::RequestGeneration,
            provider: "builtin".to_string(),
            operation: "request_generation".to_string(),
            params: serde_json::Value::Null,
            risk: Risk::Low,
            requires_approval: false,
            idempotency_key: plan_id.to_string(),
        };
        let authz_request = Self::build_authz_request(&event, &probe_action);
        let decision = self.authz.authorize(&authz_request).await;
        if !decision.allow {
            let plan = ResponsePlan::do_nothing(
                event.tenant_id.clone(),
                event.event_id.clone(),
                self.config.policy_version.clone(),
                event.occurred_at,
                decision.reason_code,
            );
            return self.finish(&event, incoming_fp, plan, bucket, "process_event", "denied").await;
        }

        // Stage 6: planner.
        let intent = planner::select_intent(&event, self.config.planner);

        // Stage 7: plan emission.
        let plan = match intent {
            Intent::Ignore => ResponsePlan::do_nothing(
                event.tenant_id.clone(),
                event.event_id.clone(),
                self.config.policy_version.clone(),
                event.occurred_at,
                "planner_ignore",
            ),
            Intent::Reply | Intent::Message => {
                let action = probe_action;
                let pending = PendingGeneration {
                    tenant_id: event.tenant_id.clone(),
                    room_id: room_id.clone(),
                    plan_id: plan_id.clone(),
                    event_id: event.event_id.clone(),
                    action_id: action.action_id.clone(),
                    intent,
                    reply_to: event.reply_to().map(str::to_string),
                };
                self.store.put_pending(&event.tenant_id, &action.action_id, pending).await;
                self.store
                    .mutate_room_state(
                        &event.tenant_id,
                        &room_id,
                        Box::new(|state| {
                            state.generating = true;
                            state.pending_queue_size += 1;
                        }),
                    )
                    .await;
                ResponsePlan {
                    plan_id: plan_id.clone(),
                    tenant_id: event.tenant_id.clone(),
                    event_id: event.event_id.clone(),
                    actions: vec![action],
                    decision: Decision {
                        policy_version: self.config.policy_version.clone(),
                        evaluation_time: event.occurred_at,
                        reason_code: None,
                    },
                    approval: None,
                }
            }
        };

        // Stage 8: idempotency persist + audit.
        self.finish(&event, incoming_fp, plan, bucket, "process_event", "accepted").await
    }

    /// Consumes the pending generation matching `input`, emitting a
    /// `send_reply` or `send_message` action.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AuditWriteFailed`] when the audit sink fails.
    pub async fn ingest_generation(
        &self,
        input: GenerationResult,
    ) -> Result<ResponsePlan, PipelineError> {
        let correlation = input.action_id.to_string();
        let Some(pending) =
            self.store.take_pending(&input.tenant_id, &input.action_id).await
        else {
            let plan = ResponsePlan::do_nothing(
                input.tenant_id.clone(),
                EventId::new(format!("generation:{}", input.action_id)),
                self.config.policy_version.clone(),
                input.occurred_at,
                "generation_unknown_action",
            );
            self.record_audit(
                &input.tenant_id,
                &correlation,
                "ingest_generation",
                "denied",
                Some("generation_unknown_action".to_string()),
                None,
            )
            .await?;
            return Ok(plan);
        };

        let action_type = if matches!(pending.intent, Intent::Reply) || pending.reply_to.is_some()
        {
            ActionType::SendReply
        } else {
            ActionType::SendMessage
        };
        let action_id = Action::derive_id(&pending.plan_id, action_type, 1);
        let mut params = serde_json::Map::new();
        params.insert("text".to_string(), serde_json::Value::String(input.text.clone()));
        if let Some(reply_to) = &pending.reply_to {
            params.insert("reply_to".to_string(), serde_json::Value::String(reply_to.clone()));
        }
        if let Some(trace_id) = &input.trace_id {
            params.insert("trace_id".to_string(), serde_json::Value::String(trace_id.clone()));
        }
        let action = Action {
            action_id,
            action_type,
            provider: "builtin".to_string(),
            operation: match action_type {
                ActionType::SendReply => "send_reply".to_string(),
                _ => "send_message".to_string(),
            },
            params: serde_json::Value::Object(params),
            risk: Risk::Low,
            requires_approval: false,
            idempotency_key: pending.action_id.to_string(),
        };

        let occurred_at = input.occurred_at;
        self.store
            .mutate_room_state(
                &input.tenant_id,
                &pending.room_id,
                Box::new(move |state| {
                    state.pending_queue_size = state.pending_queue_size.saturating_sub(1);
                    if state.pending_queue_size == 0 {
                        state.generating = false;
                    }
                    state.last_send_at = Some(occurred_at);
                }),
            )
            .await;

        let plan = ResponsePlan {
            plan_id: pending.plan_id.clone(),
            tenant_id: input.tenant_id.clone(),
            event_id: pending.event_id.clone(),
            actions: vec![action],
            decision: Decision {
                policy_version: self.config.policy_version.clone(),
                evaluation_time: input.occurred_at,
                reason_code: None,
            },
            approval: None,
        };
        self.record_audit(
            &input.tenant_id,
            &correlation,
            "ingest_generation",
            "accepted",
            None,
            Some(plan.plan_id.clone()),
        )
        .await?;
        Ok(plan)
    }

    /// Applies a job event with first-write-wins duplicate handling and
    /// terminal-state transition enforcement.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PayloadMismatch`] on reused-key payload
    /// divergence, [`PipelineError::InvalidTransition`] on a disallowed
    /// transition, or [`PipelineError::AuditWriteFailed`] on a sink failure.
    pub async fn ingest_job_event(
        &self,
        input: JobEvent,
        canonical_fingerprint: String,
    ) -> Result<JobState, PipelineError> {
        let next_status = input.status;
        let next = JobState {
            status: next_status,
            reason_code: input.reason_code.clone(),
            updated_at: input.occurred_at,
            payload_fingerprint: canonical_fingerprint.clone(),
        };
        let transition = Box::new(move |existing: Option<&JobState>| match existing {
            None => Ok(next.clone()),
            Some(state) if state.payload_fingerprint == canonical_fingerprint => {
                Ok(state.clone())
            }
            Some(state) if state.status.can_transition_to(next_status) => Ok(next.clone()),
            Some(state) if state.status.is_terminal() => Err(LifecycleError::InvalidTransition),
            Some(_) => Err(LifecycleError::InvalidTransition),
        });
        let result = self
            .store
            .compare_and_apply_job(&input.tenant_id, &input.job_id, transition)
            .await;
        let outcome = match &result {
            Ok(_) => "accepted",
            Err(LifecycleError::InvalidTransition) => "conflict",
            Err(LifecycleError::PayloadMismatch { .. }) => "conflict",
        };
        self.record_audit(
            &input.tenant_id,
            input.job_id.as_str(),
            "ingest_job_event",
            outcome,
            input.reason_code.clone(),
            None,
        )
        .await?;
        Ok(result?)
    }

    /// Reads the current job state.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotFound`] when no such job exists.
    pub async fn get_job(
        &self,
        tenant_id: &TenantId,
        job_id: &JobId,
    ) -> Result<JobState, PipelineError> {
        self.store.get_job(tenant_id, job_id).await.ok_or(PipelineError::NotFound)
    }

    /// Applies an approval event with the same semantics as
    /// [`Pipeline::ingest_job_event`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PayloadMismatch`] on reused-key payload
    /// divergence, [`PipelineError::InvalidTransition`] on a disallowed
    /// transition, or [`PipelineError::AuditWriteFailed`] on a sink failure.
    pub async fn ingest_approval_event(
        &self,
        input: ApprovalEvent,
        canonical_fingerprint: String,
    ) -> Result<ApprovalState, PipelineError> {
        let next_status = input.status;
        let next = ApprovalState {
            status: next_status,
            reason_code: input.reason_code.clone(),
            updated_at: input.occurred_at,
            payload_fingerprint: canonical_fingerprint.clone(),
        };
        let transition = Box::new(move |existing: Option<&ApprovalState>| match existing {
            None => Ok(next.clone()),
            Some(state) if state.payload_fingerprint == canonical_fingerprint => {
                Ok(state.clone())
            }
            Some(state) if state.status.can_transition_to(next_status) => Ok(next.clone()),
            Some(_) => Err(LifecycleError::InvalidTransition),
        });
        let result = self
            .store
            .compare_and_apply_approval(&input.tenant_id, &input.approval_id, transition)
            .await;
        let outcome = match &result {
            Ok(_) => "accepted",
            Err(_) => "conflict",
        };
        self.record_audit(
            &input.tenant_id,
            input.approval_id.as_str(),
            "ingest_approval_event",
            outcome,
            input.reason_code.clone(),
            None,
        )
        .await?;
        Ok(result?)
    }

    /// Reads the current approval state.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotFound`] when no such approval exists.
    pub async fn get_approval(
        &self,
        tenant_id: &TenantId,
        approval_id: &ApprovalId,
    ) -> Result<ApprovalState, PipelineError> {
        self.store.get_approval(tenant_id, approval_id).await.ok_or(PipelineError::NotFound)
    }

    /// Applies an action-result with first-write-wins semantics.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PayloadMismatch`] when a different result was
    /// already recorded, or [`PipelineError::AuditWriteFailed`] on a sink
    /// failure.
    pub async fn ingest_action_result(
        &self,
        input: ActionResultEvent,
        canonical_fingerprint: String,
    ) -> Result<ActionResult, PipelineError> {
        let candidate = ActionResult {
            status: input.status,
            occurred_at: input.occurred_at,
            evidence: input.evidence,
            payload_fingerprint: canonical_fingerprint,
        };
        let outcome = self
            .store
            .first_write_wins_action_result(&input.tenant_id, &input.plan_id, &input.action_id, candidate)
            .await;
        let correlation = input.action_id.to_string();
        match outcome {
            ActionResultOutcome::Written(result) => {
                self.record_audit(
                    &input.tenant_id,
                    &correlation,
                    "ingest_action_result",
                    "accepted",
                    None,
                    Some(input.plan_id.clone()),
                )
                .await?;
                Ok(result)
            }
            ActionResultOutcome::AlreadyMatching(result) => {
                self.record_audit(
                    &input.tenant_id,
                    &correlation,
                    "ingest_action_result",
                    "replayed",
                    None,
                    Some(input.plan_id.clone()),
                )
                .await?;
                Ok(result)
            }
            ActionResultOutcome::Mismatch { existing_hash, incoming_hash } => {
                self.record_audit(
                    &input.tenant_id,
                    &correlation,
                    "ingest_action_result",
                    "conflict",
                    Some("conflict.payload_mismatch".to_string()),
                    Some(input.plan_id.clone()),
                )
                .await?;
                Err(PipelineError::PayloadMismatch { existing_hash, incoming_hash })
            }
        }
    }

    /// Reads the current action-result.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotFound`] when no such action-result exists.
    pub async fn get_action_result(
        &self,
        tenant_id: &TenantId,
        plan_id: &PlanId,
        action_id: &ActionId,
    ) -> Result<ActionResult, PipelineError> {
        self.store
            .get_action_result(tenant_id, plan_id, action_id)
            .await
            .ok_or(PipelineError::NotFound)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
