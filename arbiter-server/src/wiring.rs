// arbiter-server/src/wiring.rs
// ============================================================================
// Module: Component Wiring
// Description: Builds a Pipeline and a contracts manifest from ArbiterConfig.
// Purpose: Translate validated configuration into concrete Store, AuthzDecider,
//          and AuditAppender implementations behind the trait objects the
//          pipeline depends on.
// Dependencies: arbiter-core, arbiter-config, arbiter-contract, arbiter-audit,
//               arbiter-authz-http, arbiter-store-sqlite
// ============================================================================

//! ## Overview
//! [`build`] is the one place that knows every concrete implementation of
//! `Store`, `AuthzDecider`, and `AuditAppender`. Everything downstream of it
//! — the pipeline, the router, the handlers — depends only on the traits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use arbiter_audit::JsonlAuditAppender;
use arbiter_authz_http::HttpAuthzConfig;
use arbiter_authz_http::HttpAuthzDecider;
use arbiter_config::ArbiterConfig;
use arbiter_config::AuthzMode;
use arbiter_config::StoreKind;
use arbiter_contract::ContractConfig;
use arbiter_contract::ContractsManifest;
use arbiter_core::authz::AuthzDecider;
use arbiter_core::authz::BuiltinAuthz;
use arbiter_core::pipeline::AuditAppender;
use arbiter_core::pipeline::Pipeline;
use arbiter_core::pipeline::PipelineConfig;
use arbiter_core::store::Store;
use arbiter_core::store::memory::MemoryStore;
use arbiter_store_sqlite::SqliteStore;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures assembling the pipeline's concrete dependencies from config.
#[derive(Debug, Error)]
pub enum WiringError {
    /// The configured SQLite store could not be opened or migrated.
    #[error("config.invalid_store_kind: failed to open sqlite store: {0}")]
    StoreInit(#[from] arbiter_store_sqlite::StoreInitError),
    /// The external-HTTP authorization client could not be built.
    #[error("failed to build external authorization client: {0}")]
    AuthzInit(String),
    /// The audit log (or its mirror) could not be opened.
    #[error("failed to open audit log: {0}")]
    AuditInit(#[from] arbiter_audit::WriterError),
    /// A mode-dependent field `ArbiterConfig::load` should have required was
    /// absent; this indicates a config value built by hand rather than loaded
    /// and validated through [`arbiter_config::ArbiterConfig::load`].
    #[error("invalid config field {field}: required for the selected mode")]
    MissingModeField {
        /// Dotted path of the missing field.
        field: &'static str,
    },
}

// ============================================================================
// SECTION: Assembled Components
// ============================================================================

/// Everything a running server needs beyond the router itself.
pub struct Components {
    /// The wired pipeline, shared across every request.
    pub pipeline: Arc<Pipeline>,
    /// The contracts manifest served at `GET /v1/contracts`, computed once at
    /// startup since every input is fixed for the process lifetime.
    pub contracts: Arc<ContractsManifest>,
    /// Maximum accepted request body size, in bytes.
    pub max_body_bytes: usize,
}

/// Builds a [`Store`] from `config.store`.
fn build_store(config: &ArbiterConfig) -> Result<Arc<dyn Store>, WiringError> {
    match config.store.kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::Sqlite => {
            let path = config
                .store
                .sqlite_path
                .as_deref()
                .ok_or(WiringError::MissingModeField { field: "store.sqlite_path" })?;
            let store = SqliteStore::open(path)?;
            Ok(Arc::new(store))
        }
    }
}

/// Builds an [`AuthzDecider`] from `config.authz`.
fn build_authz(config: &ArbiterConfig) -> Result<Arc<dyn AuthzDecider>, WiringError> {
    match config.authz.mode {
        AuthzMode::Builtin => Ok(Arc::new(BuiltinAuthz)),
        AuthzMode::ExternalHttp => {
            let endpoint = config
                .authz
                .endpoint
                .clone()
                .ok_or(WiringError::MissingModeField { field: "authz.endpoint" })?;
            let decider = HttpAuthzDecider::new(HttpAuthzConfig {
                endpoint,
                timeout_ms: config.authz.timeout_ms,
                fail_mode: config.authz.fail_mode,
                retry_max_attempts: config.authz.retry_max_attempts,
                retry_backoff_ms: config.authz.retry_backoff_ms,
                circuit_breaker_failures: config.authz.circuit_breaker_failures,
                circuit_breaker_open_ms: config.authz.circuit_breaker_open_ms,
                builtin_policy_version: BuiltinAuthz::POLICY_VERSION.to_string(),
            })
            .map_err(WiringError::AuthzInit)?;
            Ok(Arc::new(decider))
        }
    }
}

/// Builds the [`AuditAppender`] from `config.audit`.
fn build_audit(config: &ArbiterConfig) -> Result<Arc<dyn AuditAppender>, WiringError> {
    let writer = JsonlAuditAppender::open(
        &config.audit.jsonl_path,
        config.audit.immutable_mirror_path.as_deref(),
        config.audit.include_authz_decision,
    )?;
    Ok(Arc::new(writer))
}

/// Builds the contracts manifest from `config.policy.governance`.
fn build_contracts(config: &ArbiterConfig) -> ContractsManifest {
    arbiter_contract::build(&ContractConfig {
        allowed_providers: config.policy.governance.allowed_providers.clone(),
        required_approval_types: config.policy.governance.required_approval_types.clone(),
    })
}

/// Assembles every concrete component `config` describes into a running
/// [`Pipeline`] plus the contracts manifest served alongside it.
///
/// # Errors
///
/// Returns [`WiringError`] if the store, the external authorization client,
/// or the audit log cannot be constructed.
pub fn build(config: &ArbiterConfig) -> Result<Components, WiringError> {
    let store = build_store(config)?;
    let authz = build_authz(config)?;
    let audit = build_audit(config)?;
    let pipeline = Pipeline::new(
        store,
        authz,
        audit,
        PipelineConfig {
            gate: config.policy.gate,
            planner: config.policy.planner,
            policy_version: config.policy.policy_version.clone(),
        },
    );
    Ok(Components {
        pipeline: Arc::new(pipeline),
        contracts: Arc::new(build_contracts(config)),
        max_body_bytes: config.server.max_body_bytes,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use arbiter_config::AuditConfig;
    use arbiter_config::AuthzCacheConfig;
    use arbiter_config::AuthzConfig;
    use arbiter_config::GovernanceConfig;
    use arbiter_config::PolicyConfig;
    use arbiter_config::ServerConfig;
    use arbiter_config::StoreConfig;
    use arbiter_core::FailMode;
    use arbiter_core::GateConfig;
    use arbiter_core::planner::PlannerConfig;
    use arbiter_core::planner::ReplyPolicy;

    use super::*;

    fn memory_config(jsonl_path: &std::path::Path) -> ArbiterConfig {
        ArbiterConfig {
            server: ServerConfig {
                listen_addr: "127.0.0.1:0".to_string(),
                max_body_bytes: 1024,
            },
            store: StoreConfig {
                kind: StoreKind::Memory,
                sqlite_path: None,
            },
            authz: AuthzConfig {
                mode: AuthzMode::Builtin,
                endpoint: None,
                timeout_ms: 2_000,
                fail_mode: FailMode::Deny,
                retry_max_attempts: 0,
                retry_backoff_ms: 0,
                circuit_breaker_failures: 5,
                circuit_breaker_open_ms: 30_000,
                cache: AuthzCacheConfig {
                    enabled: false,
                    ttl_ms: 0,
                    max_entries: 0,
                },
            },
            policy: PolicyConfig {
                gate: GateConfig {
                    cooldown_ms: 0,
                    max_queue: 10,
                    tenant_rate_limit_per_min: 60,
                },
                planner: PlannerConfig {
                    reply_policy: ReplyPolicy::MentionFirst,
                    reply_probability: 0.5,
                },
                policy_version: "policy-v1".to_string(),
                governance: GovernanceConfig {
                    allowed_providers: vec!["builtin".to_string()],
                    required_approval_types: vec![],
                },
            },
            audit: AuditConfig {
                jsonl_path: jsonl_path.to_path_buf(),
                include_authz_decision: false,
                immutable_mirror_path: None,
            },
        }
    }

    #[test]
    fn wires_a_memory_backed_pipeline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = memory_config(&dir.path().join("audit.jsonl"));
        let components = build(&config).expect("should wire");
        assert_eq!(components.max_body_bytes, 1024);
        assert_eq!(components.contracts.governance.allowed_providers, vec!["builtin".to_string()]);
    }

    #[test]
    fn sqlite_kind_opens_the_configured_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = memory_config(&dir.path().join("audit.jsonl"));
        config.store.kind = StoreKind::Sqlite;
        config.store.sqlite_path = Some(dir.path().join("arbiter.sqlite3"));
        let components = build(&config).expect("should wire sqlite");
        assert_eq!(components.max_body_bytes, 1024);
    }
}
