// arbiter-server/src/middleware.rs
// ============================================================================
// Module: Request Logging Middleware
// Description: Emits one structured log line per request.
// Purpose: Keep method/path/tenant_id/outcome/latency logging in a single
//          layer so handlers never have to remember to log anything.
// Dependencies: axum, tracing
// ============================================================================

//! ## Overview
//! `tenant_id` is read from the path for the three `GET` lookups that carry
//! it there, and peeked out of the JSON body for everything else without
//! requiring the body to pass schema validation first — a request that is
//! later rejected as malformed still gets a tenant-tagged log line whenever
//! the field is present.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Instant;

use axum::body::Body;
use axum::body::to_bytes;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Per-request structured log line: method, path, tenant_id, outcome, latency.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    let (tenant_from_path, request) = tenant_from_path(&path, request);
    let (tenant_from_body, request) = tenant_from_body(request).await;
    let tenant_id = tenant_from_path.or(tenant_from_body);

    let response = next.run(request).await;

    let latency_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
    let outcome = response.status().as_u16();
    tracing::info!(
        method = method.as_str(),
        path = path.as_str(),
        tenant_id = tenant_id.as_deref().unwrap_or("-"),
        outcome,
        latency_ms,
        "request completed"
    );
    response
}

/// Pulls a tenant id out of `/v1/{resource}/{tenant}/...` path shapes.
fn tenant_from_path(path: &str, request: Request) -> (Option<String>, Request) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let tenant = match segments.as_slice() {
        ["v1", "jobs", tenant, ..]
        | ["v1", "approvals", tenant, ..]
        | ["v1", "action-results", tenant, ..] => Some((*tenant).to_string()),
        _ => None,
    };
    (tenant, request)
}

/// Peeks `tenant_id` out of a JSON request body without consuming it for the
/// downstream handler.
///
/// The buffering limit here is unbounded because the [`DefaultBodyLimit`]
/// layer runs outside this middleware and has already rejected any body
/// larger than the configured maximum before it reaches this point.
///
/// [`DefaultBodyLimit`]: axum::extract::DefaultBodyLimit
async fn tenant_from_body(request: Request) -> (Option<String>, Request) {
    let (parts, body) = request.into_parts();
    let Ok(bytes) = to_bytes(body, usize::MAX).await else {
        return (None, Request::from_parts(parts, Body::empty()));
    };
    let tenant_id = serde_json::from_slice::<serde_json::Value>(&bytes)
        .ok()
        .and_then(|value| value.get("tenant_id").and_then(|v| v.as_str().map(str::to_string)));
    (tenant_id, Request::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tenant_from_job_lookup_path() {
        let request = Request::builder()
            .uri("/v1/jobs/tenant-a/job-1")
            .body(Body::empty())
            .expect("request");
        let (tenant, _) = tenant_from_path("/v1/jobs/tenant-a/job-1", request);
        assert_eq!(tenant.as_deref(), Some("tenant-a"));
    }

    #[test]
    fn healthz_path_has_no_tenant() {
        let request = Request::builder().uri("/v1/healthz").body(Body::empty()).expect("request");
        let (tenant, _) = tenant_from_path("/v1/healthz", request);
        assert_eq!(tenant, None);
    }
}
