// arbiter-server/src/state.rs
// ============================================================================
// Module: Shared Application State
// Description: The Clone-able handle every axum handler receives.
// Purpose: Give handlers access to the pipeline and contracts manifest
//          without threading individual Arcs through the router by hand.
// Dependencies: arbiter-core, arbiter-contract
// ============================================================================

//! ## Overview
//! Route handlers take `State<AppState>` as an axum extractor; this is the
//! only type that crosses that boundary.

use std::sync::Arc;

use arbiter_contract::ContractsManifest;
use arbiter_core::pipeline::Pipeline;

use crate::wiring::Components;

/// Shared, cheaply-cloneable handle to the wired pipeline and manifest.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline every handler dispatches requests through.
    pub pipeline: Arc<Pipeline>,
    /// The precomputed contracts manifest served at `GET /v1/contracts`.
    pub contracts: Arc<ContractsManifest>,
}

impl From<Components> for AppState {
    fn from(components: Components) -> Self {
        Self { pipeline: components.pipeline, contracts: components.contracts }
    }
}
