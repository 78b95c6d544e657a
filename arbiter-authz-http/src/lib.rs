#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        clippy::missing_docs_in_private_items,
        reason = "Test-only output and panic-based assertions are permitted."
    )
)]
// arbiter-authz-http/src/lib.rs
// ============================================================================
// Module: External-HTTP Authorization Decider
// Description: [`AuthzDecider`] backed by an external HTTP endpoint, with
//              retry, circuit breaker, and fail-mode resolution.
// Purpose: Let the pipeline depend on external policy decisions without
//          ever failing to produce a decision.
// Dependencies: arbiter-core, async-trait, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! [`HttpAuthzDecider`] never returns an error: a transport failure, a
//! non-2xx response, or a malformed body is retried up to
//! `retry_max_attempts` times, then resolved via `fail_mode`. A
//! contract-invalid response (missing `v`, `decision`, or `policy_version`)
//! is terminal and skips the remaining retries. A consecutive-failure streak
//! trips the circuit breaker, which short-circuits subsequent calls for
//! `circuit_breaker_open_ms` without attempting network I/O.
//!
//! The actual HTTP call is behind the [`Transport`] trait so the retry and
//! circuit-breaker state machine can be exercised in tests without a
//! network.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use arbiter_core::authz::AuthzDecider;
use arbiter_core::authz::AuthzDecision;
use arbiter_core::authz::AuthzRequest;
use arbiter_core::authz::FailMode;
use async_trait::async_trait;
use thiserror::Error;

pub mod transport;

pub use transport::ReqwestTransport;

// ============================================================================
// SECTION: Wire Response
// ============================================================================

/// Wire-shaped decision as the external endpoint actually sends it:
/// `decision` is the string `"allow"` or `"deny"`, not a bool.
///
/// Parsed in two stages so a syntactically valid JSON body that is missing
/// `v`, `decision`, or `policy_version` can be distinguished from malformed
/// JSON: the former is contract-invalid and terminal, the latter is a
/// retryable parse failure.
#[derive(Debug, Clone)]
pub struct ExternalDecisionResponse {
    /// `"allow"` or `"deny"`.
    pub decision: String,
    /// Stable reason code for the decision. Defaults to `""` if absent;
    /// the wire contract names only `v`, `decision`, and `policy_version`
    /// as terminal-on-absence.
    pub reason_code: String,
    /// Policy version that produced this decision.
    pub policy_version: String,
    /// Optional decision cache lifetime in milliseconds.
    pub ttl_ms: Option<u64>,
}

impl ExternalDecisionResponse {
    /// Parses a response body, classifying malformed JSON as
    /// [`TransportError::Parse`] and a body missing a required contract
    /// field as [`TransportError::Contract`].
    fn parse(body: &str) -> Result<Self, TransportError> {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|err| TransportError::Parse(err.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| TransportError::Contract("response body is not a JSON object".to_string()))?;

        if !object.contains_key("v") {
            return Err(TransportError::Contract("missing required field v".to_string()));
        }
        let decision = object
            .get("decision")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| TransportError::Contract("missing or non-string field decision".to_string()))?
            .to_string();
        let policy_version = object
            .get("policy_version")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| TransportError::Contract("missing or non-string field policy_version".to_string()))?
            .to_string();
        let reason_code = object
            .get("reason_code")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let ttl_ms = object.get("ttl_ms").and_then(serde_json::Value::as_u64);

        Ok(Self {
            decision,
            reason_code,
            policy_version,
            ttl_ms,
        })
    }

    /// Converts the parsed response into [`AuthzDecision`], rejecting a
    /// `decision` value that is neither `"allow"` nor `"deny"`.
    fn into_decision(self) -> Result<AuthzDecision, TransportError> {
        let allow = match self.decision.as_str() {
            "allow" => true,
            "deny" => false,
            other => {
                return Err(TransportError::Contract(format!(
                    "decision field must be \"allow\" or \"deny\", got {other:?}"
                )));
            }
        };
        Ok(AuthzDecision {
            allow,
            reason_code: self.reason_code,
            policy_version: self.policy_version,
            ttl_ms: self.ttl_ms,
        })
    }
}

// ============================================================================
// SECTION: Transport Errors
// ============================================================================

/// Failure modes a [`Transport`] can report for a single attempt.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request could not be sent, or timed out.
    #[error("authz transport error: {0}")]
    Request(String),
    /// The response status code was not in the 2xx range.
    #[error("authz endpoint returned status {0}")]
    Status(u16),
    /// The response body was not valid JSON.
    #[error("authz response body parse error: {0}")]
    Parse(String),
    /// The response was valid JSON but violated the wire contract
    /// (missing `v`/`decision`/`policy_version`, or an unrecognized
    /// `decision` value). Terminal: never retried.
    #[error("authz response violates contract: {0}")]
    Contract(String),
}

impl TransportError {
    /// Whether this error is eligible for retry. Only [`Self::Contract`]
    /// failures are terminal.
    const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Contract(_))
    }
}

// ============================================================================
// SECTION: Transport Trait
// ============================================================================

/// The outbound call a decider attempt performs; abstracted so retry and
/// circuit-breaker logic can be tested without a network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` to `endpoint` and parses the response, bounded by
    /// `timeout`.
    async fn send(
        &self,
        endpoint: &str,
        request: &AuthzRequest,
        timeout: Duration,
    ) -> Result<ExternalDecisionResponse, TransportError>;
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Construction parameters for [`HttpAuthzDecider`].
#[derive(Debug, Clone)]
pub struct HttpAuthzConfig {
    /// URL of the external authorization endpoint.
    pub endpoint: String,
    /// Per-attempt deadline, in milliseconds.
    pub timeout_ms: u64,
    /// How an unresolved call (after retries, or while the circuit is open)
    /// is answered.
    pub fail_mode: FailMode,
    /// Total attempts (including the first) before giving up.
    pub retry_max_attempts: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Consecutive failures before the circuit opens.
    pub circuit_breaker_failures: u32,
    /// How long the circuit stays open once tripped, in milliseconds.
    pub circuit_breaker_open_ms: u64,
    /// Policy version reported when `fail_mode` resolves without calling
    /// the endpoint, matching what the built-in decider would report.
    pub builtin_policy_version: String,
}

// ============================================================================
// SECTION: Circuit Breaker State
// ============================================================================

/// Consecutive-failure counter and open/closed state, held behind a mutex
/// since `authorize` is called concurrently across requests.
struct CircuitState {
    /// Consecutive failed attempts across calls since the last success.
    consecutive_failures: u32,
    /// When the circuit tripped open, if it currently is.
    opened_at: Option<Instant>,
}

impl CircuitState {
    const fn new() -> Self {
        Self {
            consecutive_failures: 0,
            opened_at: None,
        }
    }
}

// ============================================================================
// SECTION: Decider
// ============================================================================

/// External-HTTP [`AuthzDecider`] with retry, circuit breaker, and
/// fail-mode resolution.
pub struct HttpAuthzDecider<T: Transport = ReqwestTransport> {
    /// Resilience and endpoint configuration.
    config: HttpAuthzConfig,
    /// The outbound call implementation.
    transport: T,
    /// Circuit breaker state, shared across calls.
    circuit: Mutex<CircuitState>,
}

impl HttpAuthzDecider<ReqwestTransport> {
    /// Builds a decider using the real `reqwest`-backed transport.
    ///
    /// # Errors
    ///
    /// Returns a message if the underlying HTTP client cannot be built.
    pub fn new(config: HttpAuthzConfig) -> Result<Self, String> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> HttpAuthzDecider<T> {
    /// Builds a decider around an injected transport, for testing or for
    /// swapping the HTTP client implementation.
    pub fn with_transport(config: HttpAuthzConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            circuit: Mutex::new(CircuitState::new()),
        }
    }

    /// Returns the reason code and resolution the configured `fail_mode`
    /// produces for this call, without attempting network I/O.
    fn resolve_fail_mode(&self) -> AuthzDecision {
        self.config.fail_mode.resolve(&self.config.builtin_policy_version)
    }

    /// Checks whether the circuit is currently open; if its `open_ms`
    /// window has elapsed, half-closes it (allows the next attempt through)
    /// without resetting the failure streak until that attempt succeeds.
    fn circuit_is_open(&self) -> bool {
        let mut guard = self.circuit.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(opened_at) = guard.opened_at else {
            return false;
        };
        if opened_at.elapsed() >= Duration::from_millis(self.config.circuit_breaker_open_ms) {
            guard.opened_at = None;
            return false;
        }
        true
    }

    /// Records one failed attempt, tripping the circuit if the consecutive
    /// count reaches the configured threshold.
    fn record_failure(&self) {
        let mut guard = self.circuit.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.consecutive_failures = guard.consecutive_failures.saturating_add(1);
        if guard.consecutive_failures >= self.config.circuit_breaker_failures {
            guard.opened_at = Some(Instant::now());
        }
    }

    /// Records a success: closes the circuit and resets the failure streak.
    fn record_success(&self) {
        let mut guard = self.circuit.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.consecutive_failures = 0;
        guard.opened_at = None;
    }
}

#[async_trait]
impl<T: Transport> AuthzDecider for HttpAuthzDecider<T> {
    async fn authorize(&self, request: &AuthzRequest) -> AuthzDecision {
        if self.circuit_is_open() {
            tracing::warn!(endpoint = %self.config.endpoint, "authz circuit open, short-circuiting");
            let mut decision = self.resolve_fail_mode();
            decision.reason_code = "authz_circuit_open".to_string();
            return decision;
        }

        let timeout = Duration::from_millis(self.config.timeout_ms);
        let attempts = self.config.retry_max_attempts.max(1);
        let mut last_error: Option<TransportError> = None;

        for attempt in 1..=attempts {
            match self.transport.send(&self.config.endpoint, request, timeout).await {
                Ok(response) => match response.into_decision() {
                    Ok(decision) => {
                        self.record_success();
                        return decision;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "authz response violated contract, not retrying");
                        self.record_failure();
                        return self.resolve_fail_mode();
                    }
                },
                Err(err) => {
                    tracing::warn!(error = %err, attempt, attempts, "authz attempt failed");
                    let retryable = err.is_retryable();
                    last_error = Some(err);
                    if !retryable {
                        break;
                    }
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_millis(self.config.retry_backoff_ms)).await;
                    }
                }
            }
        }

        self.record_failure();
        if let Some(err) = last_error {
            tracing::error!(error = %err, "authz exhausted retries, resolving via fail_mode");
        }
        self.resolve_fail_mode()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
