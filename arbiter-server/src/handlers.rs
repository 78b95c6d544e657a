// arbiter-server/src/handlers.rs
// ============================================================================
// Module: HTTP Handlers
// Description: One handler per endpoint named in the external interfaces.
// Purpose: Translate HTTP requests into pipeline calls and pipeline results
//          into HTTP responses, with no decision logic of its own.
// Dependencies: arbiter-core, axum
// ============================================================================

//! ## Overview
//! Handlers are thin: decode, fingerprint where the pipeline asks for a
//! caller-supplied fingerprint, call the pipeline, translate the result.
//! Denials the pipeline itself decided (gate, authz) come back as a 200 plan,
//! never an HTTP error; only malformed requests and store-level conflicts
//! become [`ApiError`]s.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use arbiter_core::error::ErrorCode;
use arbiter_core::fingerprint;
use arbiter_core::identifiers::ActionId;
use arbiter_core::identifiers::ApprovalId;
use arbiter_core::identifiers::JobId;
use arbiter_core::identifiers::PlanId;
use arbiter_core::identifiers::TenantId;
use arbiter_core::model::ActionResult;
use arbiter_core::model::ApprovalState;
use arbiter_core::model::JobState;
use arbiter_core::model::ResponsePlan;
use arbiter_core::model::Timestamp;
use arbiter_core::pipeline::ActionResultEvent;
use arbiter_core::pipeline::ApprovalEvent;
use arbiter_core::pipeline::GenerationResult;
use arbiter_core::pipeline::JobEvent;
use arbiter_core::pipeline::JobStatus;

use crate::error::ApiError;
use crate::error::schema_invalid;
use crate::state::AppState;

// ============================================================================
// SECTION: JSON Decoding Helpers
// ============================================================================

/// Decodes a request body as a raw JSON value, before any typed schema check.
///
/// Invalid JSON becomes `request.schema_invalid`, matching what
/// [`arbiter_core::pipeline::Pipeline::process_event`] does for stage 1.
fn decode_raw(bytes: &Bytes) -> Result<serde_json::Value, ApiError> {
    serde_json::from_slice(bytes).map_err(|err| schema_invalid(&err))
}

/// Decodes a raw JSON value into a typed, `deny_unknown_fields` DTO.
fn decode_typed<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|err| schema_invalid(&err))
}

/// Fingerprints a raw JSON value the same way the pipeline fingerprints event
/// envelopes, for the three ingest paths that take a caller-supplied hash.
fn fingerprint_raw(value: &serde_json::Value) -> Result<String, ApiError> {
    fingerprint::fingerprint(value).map_err(|err| schema_invalid_message(err.to_string()))
}

/// Builds a `request.schema_invalid` error from a plain message.
fn schema_invalid_message(message: String) -> ApiError {
    ApiError::new(ErrorCode::RequestSchemaInvalid, message)
}

// ============================================================================
// SECTION: Health and Contracts
// ============================================================================

/// `GET /v1/healthz` — liveness probe with no side effects.
pub async fn healthz() -> &'static str {
    "ok"
}

/// `GET /v1/contracts` — the contracts manifest computed once at startup.
pub async fn contracts(State(state): State<AppState>) -> Json<arbiter_contract::ContractsManifest> {
    Json((*state.contracts).clone())
}

// ============================================================================
// SECTION: Event and Generation Ingest
// ============================================================================

/// `POST /v1/events` — the primary event-to-plan entry point.
pub async fn post_event(
    State(state): State<AppState>,
    bytes: Bytes,
) -> Result<Json<ResponsePlan>, ApiError> {
    let raw = decode_raw(&bytes)?;
    let plan = state.pipeline.process_event(raw).await?;
    Ok(Json(plan))
}

/// `POST /v1/generations` — a `request_generation` action's awaited result.
pub async fn post_generation(
    State(state): State<AppState>,
    bytes: Bytes,
) -> Result<Json<ResponsePlan>, ApiError> {
    let raw = decode_raw(&bytes)?;
    let input: GenerationResult = decode_typed(raw)?;
    let plan = state.pipeline.ingest_generation(input).await?;
    Ok(Json(plan))
}

// ============================================================================
// SECTION: Job Lifecycle
// ============================================================================

/// `POST /v1/job-events` — a job status transition.
pub async fn post_job_event(
    State(state): State<AppState>,
    bytes: Bytes,
) -> Result<StatusCode, ApiError> {
    let raw = decode_raw(&bytes)?;
    let canonical_fingerprint = fingerprint_raw(&raw)?;
    let input: JobEvent = decode_typed(raw)?;
    state.pipeline.ingest_job_event(input, canonical_fingerprint).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Request body for `POST /v1/job-cancel`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobCancelRequest {
    /// Tenant the job belongs to.
    tenant_id: TenantId,
    /// Job to cancel.
    job_id: JobId,
    /// Stable reason code recorded alongside the cancellation.
    #[serde(default)]
    reason_code: Option<String>,
    /// Cancellation event time.
    occurred_at: Timestamp,
}

/// `POST /v1/job-cancel` — cancels a job, 404 if it does not exist.
pub async fn post_job_cancel(
    State(state): State<AppState>,
    bytes: Bytes,
) -> Result<StatusCode, ApiError> {
    let raw = decode_raw(&bytes)?;
    let request: JobCancelRequest = decode_typed(raw)?;
    state.pipeline.get_job(&request.tenant_id, &request.job_id).await?;

    let event = JobEvent {
        tenant_id: request.tenant_id,
        job_id: request.job_id,
        status: JobStatus::Cancelled,
        reason_code: request.reason_code,
        occurred_at: request.occurred_at,
    };
    let canonical_fingerprint = fingerprint::fingerprint(&event)
        .map_err(|err| schema_invalid_message(err.to_string()))?;
    state.pipeline.ingest_job_event(event, canonical_fingerprint).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /v1/jobs/{tenant}/{id}` — current job state.
pub async fn get_job(
    State(state): State<AppState>,
    Path((tenant, job_id)): Path<(String, String)>,
) -> Result<Json<JobState>, ApiError> {
    let state_value =
        state.pipeline.get_job(&TenantId::from(tenant), &JobId::from(job_id)).await?;
    Ok(Json(state_value))
}

// ============================================================================
// SECTION: Approval Lifecycle
// ============================================================================

/// `POST /v1/approval-events` — an approval status transition.
pub async fn post_approval_event(
    State(state): State<AppState>,
    bytes: Bytes,
) -> Result<StatusCode, ApiError> {
    let raw = decode_raw(&bytes)?;
    let canonical_fingerprint = fingerprint_raw(&raw)?;
    let input: ApprovalEvent = decode_typed(raw)?;
    state.pipeline.ingest_approval_event(input, canonical_fingerprint).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /v1/approvals/{tenant}/{id}` — current approval state.
pub async fn get_approval(
    State(state): State<AppState>,
    Path((tenant, approval_id)): Path<(String, String)>,
) -> Result<Json<ApprovalState>, ApiError> {
    let state_value = state
        .pipeline
        .get_approval(&TenantId::from(tenant), &ApprovalId::from(approval_id))
        .await?;
    Ok(Json(state_value))
}

// ============================================================================
// SECTION: Action Results
// ============================================================================

/// `POST /v1/action-results` — a reported action outcome, first-write-wins.
pub async fn post_action_result(
    State(state): State<AppState>,
    bytes: Bytes,
) -> Result<StatusCode, ApiError> {
    let raw = decode_raw(&bytes)?;
    let canonical_fingerprint = fingerprint_raw(&raw)?;
    let input: ActionResultEvent = decode_typed(raw)?;
    state.pipeline.ingest_action_result(input, canonical_fingerprint).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /v1/action-results/{tenant}/{plan}/{action}` — a reported outcome.
pub async fn get_action_result(
    State(state): State<AppState>,
    Path((tenant, plan_id, action_id)): Path<(String, String, String)>,
) -> Result<Json<ActionResult>, ApiError> {
    let state_value = state
        .pipeline
        .get_action_result(&TenantId::from(tenant), &PlanId::from(plan_id), &ActionId::from(action_id))
        .await?;
    Ok(Json(state_value))
}
