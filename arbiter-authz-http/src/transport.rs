// arbiter-authz-http/src/transport.rs
// ============================================================================
// Module: Reqwest Transport
// Description: The real HTTP [`Transport`] implementation for external AuthZ.
// Purpose: Send the wire-shaped authorization request and parse its response,
//          translating every failure mode into a [`TransportError`].
// Dependencies: reqwest
// ============================================================================

//! ## Overview
//! One `reqwest::Client` is built once at construction and reused across
//! calls; redirects are disabled, since an authorization endpoint redirecting
//! is itself a contract violation worth surfacing as a transport failure
//! rather than silently following.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use arbiter_core::authz::AuthzRequest;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;

use crate::ExternalDecisionResponse;
use crate::Transport;
use crate::TransportError;

// ============================================================================
// SECTION: Reqwest Transport
// ============================================================================

/// [`Transport`] backed by a real `reqwest::Client`.
pub struct ReqwestTransport {
    /// Shared HTTP client, built once.
    client: Client,
}

impl ReqwestTransport {
    /// Builds a new transport with redirects disabled.
    ///
    /// # Errors
    ///
    /// Returns a message if the underlying client cannot be constructed.
    pub fn new() -> Result<Self, String> {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|err| format!("failed to build authz http client: {err}"))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        endpoint: &str,
        request: &AuthzRequest,
        timeout: Duration,
    ) -> Result<ExternalDecisionResponse, TransportError> {
        let response = self
            .client
            .post(endpoint)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|err| TransportError::Request(err.to_string()))?;
        ExternalDecisionResponse::parse(&body)
    }
}
