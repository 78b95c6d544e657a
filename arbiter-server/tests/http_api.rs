// arbiter-server/tests/http_api.rs
// ============================================================================
// Module: HTTP API Integration Tests
// Description: Exercises the built router end to end over a real `Pipeline`
//              wired against an in-memory store, without a live listener.
// Purpose: Cover the scenarios spec.md describes as external-interface
//          behavior (event ingest, job lifecycle, idempotent replay, conflict
//          reporting) the way decision-gate-mcp's own request-shaped tests do.
// Dependencies: arbiter-server, arbiter-config, axum, tower, serde_json
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions over HTTP responses."
)]

use arbiter_config::ArbiterConfig;
use arbiter_config::AuditConfig;
use arbiter_config::AuthzCacheConfig;
use arbiter_config::AuthzConfig;
use arbiter_config::AuthzMode;
use arbiter_config::GovernanceConfig;
use arbiter_config::PolicyConfig;
use arbiter_config::ServerConfig;
use arbiter_config::StoreConfig;
use arbiter_config::StoreKind;
use arbiter_core::FailMode;
use arbiter_core::GateConfig;
use arbiter_core::ReplyPolicy;
use arbiter_core::planner::PlannerConfig;
use arbiter_server::wiring;
use axum::Router;
use axum::body::Body;
use axum::body::to_bytes;
use axum::http::Request;
use axum::http::StatusCode;
use serde_json::Value;
use serde_json::json;
use tower::ServiceExt;

/// Builds a full router over a fresh in-memory pipeline and a scratch audit
/// directory, returning the `TempDir` so it outlives the test.
fn test_router() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = ArbiterConfig {
        server: ServerConfig { listen_addr: "127.0.0.1:0".to_string(), max_body_bytes: 65_536 },
        store: StoreConfig { kind: StoreKind::Memory, sqlite_path: None },
        authz: AuthzConfig {
            mode: AuthzMode::Builtin,
            endpoint: None,
            timeout_ms: 2_000,
            fail_mode: FailMode::Deny,
            retry_max_attempts: 0,
            retry_backoff_ms: 0,
            circuit_breaker_failures: 5,
            circuit_breaker_open_ms: 30_000,
            cache: AuthzCacheConfig { enabled: false, ttl_ms: 0, max_entries: 0 },
        },
        policy: PolicyConfig {
            gate: GateConfig { cooldown_ms: 0, max_queue: 10, tenant_rate_limit_per_min: 60 },
            planner: PlannerConfig { reply_policy: ReplyPolicy::MentionFirst, reply_probability: 1.0 },
            policy_version: "policy-v1".to_string(),
            governance: GovernanceConfig { allowed_providers: vec!["builtin".to_string()], required_approval_types: vec![] },
        },
        audit: AuditConfig {
            jsonl_path: dir.path().join("audit.jsonl"),
            include_authz_decision: false,
            immutable_mirror_path: None,
        },
    };
    let components = wiring::build(&config).expect("should wire");
    let state = arbiter_server::state::AppState::from(components);
    (arbiter_server::routes::build_router(state, 65_536), dir)
}

/// Sends a JSON request and returns the status plus decoded body.
async fn send(router: Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let decoded = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json") };
    (status, decoded)
}

fn sample_event(event_id: &str) -> Value {
    json!({
        "tenant_id": "tenant-a",
        "event_id": event_id,
        "source": "chat-gateway",
        "kind": "message",
        "subject": "room-1",
        "summary": "hello",
        "payload_ref": "blob://payload/1",
        "occurred_at": "2026-01-01T00:00:00Z",
        "room_id": "room-1",
        "content": { "type": "text", "text": "@arbiter please help" },
    })
}

#[tokio::test]
async fn event_round_trip_produces_a_plan() {
    let (router, _dir) = test_router();
    let (status, body) = send(router, "POST", "/v1/events", sample_event("evt-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("plan_id").is_some());
}

#[tokio::test]
async fn replaying_the_same_event_id_returns_the_same_plan() {
    let (router, _dir) = test_router();
    let (status_a, body_a) = send(router.clone(), "POST", "/v1/events", sample_event("evt-replay")).await;
    let (status_b, body_b) = send(router, "POST", "/v1/events", sample_event("evt-replay")).await;
    assert_eq!(status_a, StatusCode::OK);
    assert_eq!(status_b, StatusCode::OK);
    assert_eq!(body_a["plan_id"], body_b["plan_id"]);
}

#[tokio::test]
async fn replaying_an_event_id_with_a_different_payload_conflicts() {
    let (router, _dir) = test_router();
    let (status_a, _) = send(router.clone(), "POST", "/v1/events", sample_event("evt-conflict")).await;
    assert_eq!(status_a, StatusCode::OK);

    let mut changed = sample_event("evt-conflict");
    changed["summary"] = json!("a different summary entirely");
    let (status_b, body_b) = send(router, "POST", "/v1/events", changed).await;
    assert_eq!(status_b, StatusCode::CONFLICT);
    assert!(body_b["error"]["code"].as_str().unwrap_or_default().contains("payload_mismatch"));
}

#[tokio::test]
async fn job_lifecycle_starts_is_readable_and_cancels() {
    let (router, _dir) = test_router();

    let start = json!({
        "tenant_id": "tenant-a",
        "job_id": "job-1",
        "status": "started",
        "occurred_at": "2026-01-01T00:00:00Z",
    });
    let (status, _) = send(router.clone(), "POST", "/v1/job-events", start).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(router.clone(), "GET", "/v1/jobs/tenant-a/job-1", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("started"));

    let cancel = json!({
        "tenant_id": "tenant-a",
        "job_id": "job-1",
        "reason_code": "operator_cancelled",
        "occurred_at": "2026-01-01T00:01:00Z",
    });
    let (status, _) = send(router.clone(), "POST", "/v1/job-cancel", cancel).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(router, "GET", "/v1/jobs/tenant-a/job-1", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("cancelled"));
}

#[tokio::test]
async fn cancelling_an_unknown_job_returns_404() {
    let (router, _dir) = test_router();
    let cancel = json!({
        "tenant_id": "tenant-a",
        "job_id": "never-started",
        "occurred_at": "2026-01-01T00:00:00Z",
    });
    let (status, _) = send(router, "POST", "/v1/job-cancel", cancel).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approval_lifecycle_requested_then_approved() {
    let (router, _dir) = test_router();

    let requested = json!({
        "tenant_id": "tenant-a",
        "approval_id": "approval-1",
        "status": "requested",
        "occurred_at": "2026-01-01T00:00:00Z",
    });
    let (status, _) = send(router.clone(), "POST", "/v1/approval-events", requested).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let approved = json!({
        "tenant_id": "tenant-a",
        "approval_id": "approval-1",
        "status": "approved",
        "occurred_at": "2026-01-01T00:01:00Z",
    });
    let (status, _) = send(router.clone(), "POST", "/v1/approval-events", approved).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(router, "GET", "/v1/approvals/tenant-a/approval-1", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("approved"));
}

#[tokio::test]
async fn approval_cannot_transition_out_of_a_terminal_state() {
    let (router, _dir) = test_router();

    let rejected = json!({
        "tenant_id": "tenant-a",
        "approval_id": "approval-2",
        "status": "rejected",
        "occurred_at": "2026-01-01T00:00:00Z",
    });
    let (status, _) = send(router.clone(), "POST", "/v1/approval-events", rejected).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let approved = json!({
        "tenant_id": "tenant-a",
        "approval_id": "approval-2",
        "status": "approved",
        "occurred_at": "2026-01-01T00:01:00Z",
    });
    let (status, _) = send(router, "POST", "/v1/approval-events", approved).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn action_result_is_first_write_wins() {
    let (router, _dir) = test_router();

    let succeeded = json!({
        "tenant_id": "tenant-a",
        "plan_id": "plan-1",
        "action_id": "action-1",
        "status": "succeeded",
        "occurred_at": "2026-01-01T00:00:00Z",
        "evidence": { "http_status": 200 },
    });
    let (status, _) = send(router.clone(), "POST", "/v1/action-results", succeeded).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let failed = json!({
        "tenant_id": "tenant-a",
        "plan_id": "plan-1",
        "action_id": "action-1",
        "status": "failed",
        "occurred_at": "2026-01-01T00:01:00Z",
        "evidence": { "http_status": 500 },
    });
    let (status, _) = send(router.clone(), "POST", "/v1/action-results", failed).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) =
        send(router, "GET", "/v1/action-results/tenant-a/plan-1/action-1", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("succeeded"));
}

#[tokio::test]
async fn malformed_json_body_is_rejected_before_reaching_the_pipeline() {
    let (router, _dir) = test_router();
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/job-events")
                .header("content-type", "application/json")
                .body(Body::from("{not valid"))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
