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
// arbiter-server/src/lib.rs
// ============================================================================
// Module: Arbiter Server Library
// Description: axum HTTP transport over the Arbiter pipeline.
// Purpose: Give the CLI (and tests) a single `serve` entry point that wires
//          configuration into a running, gracefully-shutting-down server.
// Dependencies: arbiter-core, arbiter-config, arbiter-contract, arbiter-audit,
//               arbiter-authz-http, arbiter-store-sqlite, axum, tokio
// ============================================================================

//! ## Overview
//! This crate owns no decision logic; it decodes HTTP requests, calls into
//! [`arbiter_core::pipeline::Pipeline`], and encodes the result. See
//! [`wiring::build`] for how configuration becomes a running pipeline and
//! [`routes::build_router`] for the route table.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod wiring;

// ============================================================================
// SECTION: Imports
// ============================================================================

use arbiter_config::ArbiterConfig;
use thiserror::Error;

use crate::state::AppState;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures starting or running the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Component wiring (store/authz/audit) failed.
    #[error(transparent)]
    Wiring(#[from] wiring::WiringError),
    /// The configured listen address could not be parsed.
    #[error("invalid listen address {addr}")]
    InvalidListenAddr {
        /// The address string that failed to parse.
        addr: String,
    },
    /// Binding the TCP listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address the listener attempted to bind.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The server loop itself returned an I/O error.
    #[error("server loop failed: {0}")]
    Serve(std::io::Error),
}

// ============================================================================
// SECTION: Serve
// ============================================================================

/// Wires `config` into a running pipeline, binds its listen address, and
/// serves the `/v1/...` router until a shutdown signal is received.
///
/// On shutdown the listener stops accepting new connections before this
/// function returns, so the caller's own cleanup (e.g. flushing the audit
/// writer) runs only after in-flight requests have drained.
///
/// # Errors
///
/// Returns [`ServerError`] if component wiring fails, the listen address is
/// invalid, the listener cannot bind, or the server loop itself fails.
pub async fn serve(config: ArbiterConfig) -> Result<(), ServerError> {
    let listen_addr = config.server.listen_addr.clone();
    let max_body_bytes = config.server.max_body_bytes;
    let components = wiring::build(&config)?;
    let state = AppState::from(components);
    let router = routes::build_router(state, max_body_bytes);

    let addr: std::net::SocketAddr = listen_addr
        .parse()
        .map_err(|_| ServerError::InvalidListenAddr { addr: listen_addr.clone() })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr: listen_addr.clone(), source })?;

    tracing::info!(addr = %addr, "arbiter server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;
    tracing::info!("arbiter server shut down");
    Ok(())
}

/// Resolves once SIGINT or (on Unix) SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            std::future::pending::<()>().await;
            return;
        };
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
