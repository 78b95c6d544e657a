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
// arbiter-config/src/lib.rs
// ============================================================================
// Module: Arbiter Config Library
// Description: Loads and validates arbiter.toml.
// Purpose: Give every other crate a single, already-validated configuration
//          type so no crate re-parses or re-checks raw TOML on its own.
// Dependencies: arbiter-core, serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration loading fails closed: any missing required field, any value
//! outside its documented range, or any unsupported enum variant is a startup
//! error, never a silently substituted default.

pub mod config;

pub use config::ArbiterConfig;
pub use config::AuditConfig;
pub use config::AuthzCacheConfig;
pub use config::AuthzConfig;
pub use config::AuthzMode;
pub use config::ConfigError;
pub use config::GovernanceConfig;
pub use config::PolicyConfig;
pub use config::ServerConfig;
pub use config::StoreConfig;
pub use config::StoreKind;
