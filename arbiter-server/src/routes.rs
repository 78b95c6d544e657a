// arbiter-server/src/routes.rs
// ============================================================================
// Module: Router
// Description: Builds the axum Router wiring every endpoint to its handler.
// Purpose: Keep route tables, body-size bounding, and request logging in one
//          place, separate from handler logic and component wiring.
// Dependencies: axum
// ============================================================================

//! ## Overview
//! [`build_router`] is the only function that knows the full path table; it
//! is called once, from [`crate::serve`].

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;

use crate::handlers;
use crate::middleware::log_requests;
use crate::state::AppState;

/// Builds the full `/v1/...` router over `state`, bounding request bodies to
/// `max_body_bytes` and logging one structured line per request.
#[must_use]
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/v1/healthz", get(handlers::healthz))
        .route("/v1/contracts", get(handlers::contracts))
        .route("/v1/events", post(handlers::post_event))
        .route("/v1/generations", post(handlers::post_generation))
        .route("/v1/job-events", post(handlers::post_job_event))
        .route("/v1/job-cancel", post(handlers::post_job_cancel))
        .route("/v1/approval-events", post(handlers::post_approval_event))
        .route("/v1/action-results", post(handlers::post_action_result))
        .route("/v1/jobs/{tenant}/{id}", get(handlers::get_job))
        .route("/v1/approvals/{tenant}/{id}", get(handlers::get_approval))
        .route("/v1/action-results/{tenant}/{plan}/{action}", get(handlers::get_action_result))
        .layer(middleware::from_fn(log_requests))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::*;
    use crate::wiring;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = arbiter_config::ArbiterConfig {
            server: arbiter_config::ServerConfig {
                listen_addr: "127.0.0.1:0".to_string(),
                max_body_bytes: 65_536,
            },
            store: arbiter_config::StoreConfig {
                kind: arbiter_config::StoreKind::Memory,
                sqlite_path: None,
            },
            authz: arbiter_config::AuthzConfig {
                mode: arbiter_config::AuthzMode::Builtin,
                endpoint: None,
                timeout_ms: 2_000,
                fail_mode: arbiter_core::FailMode::Deny,
                retry_max_attempts: 0,
                retry_backoff_ms: 0,
                circuit_breaker_failures: 5,
                circuit_breaker_open_ms: 30_000,
                cache: arbiter_config::AuthzCacheConfig {
                    enabled: false,
                    ttl_ms: 0,
                    max_entries: 0,
                },
            },
            policy: arbiter_config::PolicyConfig {
                gate: arbiter_core::GateConfig {
                    cooldown_ms: 0,
                    max_queue: 10,
                    tenant_rate_limit_per_min: 60,
                },
                planner: arbiter_core::planner::PlannerConfig {
                    reply_policy: arbiter_core::ReplyPolicy::MentionFirst,
                    reply_probability: 0.5,
                },
                policy_version: "policy-v1".to_string(),
                governance: arbiter_config::GovernanceConfig {
                    allowed_providers: vec!["builtin".to_string()],
                    required_approval_types: vec![],
                },
            },
            audit: arbiter_config::AuditConfig {
                jsonl_path: dir.path().join("audit.jsonl"),
                include_authz_decision: false,
                immutable_mirror_path: None,
            },
        };
        let components = wiring::build(&config).expect("should wire");
        (AppState::from(components), dir)
    }

    #[tokio::test]
    async fn healthz_returns_ok_with_no_side_effects() {
        let (state, _dir) = test_state();
        let router = build_router(state, 65_536);
        let response = router
            .oneshot(Request::builder().uri("/v1/healthz").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_job_returns_404() {
        let (state, _dir) = test_state();
        let router = build_router(state, 65_536);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/v1/jobs/tenant-a/missing-job")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_event_body_is_schema_invalid() {
        let (state, _dir) = test_state();
        let router = build_router(state, 65_536);
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/events")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn contracts_manifest_is_served() {
        let (state, _dir) = test_state();
        let router = build_router(state, 65_536);
        let response = router
            .oneshot(Request::builder().uri("/v1/contracts").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
