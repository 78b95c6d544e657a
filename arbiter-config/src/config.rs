// arbiter-config/src/config.rs
// ============================================================================
// Module: Config
// Description: Loads, parses, and validates arbiter.toml into ArbiterConfig.
// Purpose: Centralize fail-closed configuration validation so every crate
//          that builds a pipeline starts from an already-checked value.
// Dependencies: arbiter-core, serde, toml, thiserror
// ============================================================================

//! ## Overview
//! [`ArbiterConfig::load`] resolves a config path (explicit argument, then
//! `ARBITER_CONFIG`, then `arbiter.toml` in the current directory), reads it
//! under a fixed size bound, parses it as TOML, and validates every field.
//! A missing required field, an out-of-range numeric limit, or an
//! unsupported enum variant aborts with a [`ConfigError`] before any other
//! crate ever sees the value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use arbiter_core::GateConfig;
use arbiter_core::authz::FailMode;
use arbiter_core::planner::PlannerConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming an explicit config file path.
pub const CONFIG_ENV_VAR: &str = "ARBITER_CONFIG";
/// Default config file name, resolved relative to the current directory.
pub const DEFAULT_CONFIG_NAME: &str = "arbiter.toml";
/// Maximum accepted config file size, in bytes. Guards against an
/// accidental symlink to an unbounded or non-regular file.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;
/// Minimum accepted `authz.timeout_ms`.
pub const MIN_AUTHZ_TIMEOUT_MS: u64 = 1;
/// Maximum accepted `authz.timeout_ms`.
pub const MAX_AUTHZ_TIMEOUT_MS: u64 = 60_000;
/// Maximum accepted `authz.retry_max_attempts`.
pub const MAX_AUTHZ_RETRY_ATTEMPTS: u32 = 10;
/// Maximum accepted `authz.circuit_breaker_failures`.
pub const MAX_CIRCUIT_BREAKER_FAILURES: u32 = 1_000;
/// Maximum accepted `authz.cache.max_entries`.
pub const MAX_AUTHZ_CACHE_ENTRIES: u64 = 1_000_000;
/// Maximum accepted `gate.max_queue`.
pub const MAX_GATE_QUEUE: u32 = 100_000;
/// Maximum accepted `gate.tenant_rate_limit_per_min`.
pub const MAX_TENANT_RATE_LIMIT: u32 = 1_000_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {message}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error message.
        message: String,
    },
    /// The config file exceeded [`MAX_CONFIG_FILE_SIZE`].
    #[error("config file {path} exceeds the maximum size of {max} bytes")]
    TooLarge {
        /// Path that was rejected.
        path: PathBuf,
        /// The configured maximum, in bytes.
        max: u64,
    },
    /// The config file was not valid TOML.
    #[error("failed to parse config file {path}: {message}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying parse error message.
        message: String,
    },
    /// A field failed validation after parsing.
    #[error("invalid config field {field}: {message}")]
    Invalid {
        /// Dotted path of the offending field, e.g. `authz.timeout_ms`.
        field: String,
        /// Human-readable description of the violation.
        message: String,
    },
}

// ============================================================================
// SECTION: Top-Level Config
// ============================================================================

/// The fully validated, in-memory configuration for an Arbiter process.
#[derive(Debug, Clone, Deserialize)]
pub struct ArbiterConfig {
    /// HTTP transport configuration.
    pub server: ServerConfig,
    /// Store backend selection.
    pub store: StoreConfig,
    /// Authorization backend selection and resilience policy.
    pub authz: AuthzConfig,
    /// Gate and planner thresholds.
    pub policy: PolicyConfig,
    /// Audit log sink configuration.
    pub audit: AuditConfig,
}

impl ArbiterConfig {
    /// Loads configuration from `path`, falling back to [`CONFIG_ENV_VAR`]
    /// and then [`DEFAULT_CONFIG_NAME`] in the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be found, is too large,
    /// is not valid TOML, or fails field validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = Self::resolve_path(path);
        let raw = Self::read_bounded(&resolved)?;
        let config: Self =
            toml::from_str(&raw).map_err(|err| ConfigError::Parse {
                path: resolved.clone(),
                message: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves the config path from the explicit argument, the
    /// environment, or the default file name, in that order.
    fn resolve_path(path: Option<&Path>) -> PathBuf {
        if let Some(explicit) = path {
            return explicit.to_path_buf();
        }
        if let Ok(from_env) = env::var(CONFIG_ENV_VAR) {
            return PathBuf::from(from_env);
        }
        PathBuf::from(DEFAULT_CONFIG_NAME)
    }

    /// Reads `path` as UTF-8, rejecting anything over [`MAX_CONFIG_FILE_SIZE`].
    fn read_bounded(path: &Path) -> Result<String, ConfigError> {
        let metadata = fs::metadata(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                max: MAX_CONFIG_FILE_SIZE,
            });
        }
        fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Validates every sub-config, failing on the first violation.
    fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        self.authz.validate()?;
        self.policy.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to, e.g. `0.0.0.0:8080`.
    pub listen_addr: String,
    /// Maximum accepted request body size, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Default maximum request body size, in bytes.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl ServerConfig {
    /// Validates that `listen_addr` parses as a socket address and the body
    /// limit is non-zero.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "server.listen_addr".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        self.listen_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| ConfigError::Invalid {
                field: "server.listen_addr".to_string(),
                message: err.to_string(),
            })?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "server.max_body_bytes".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Which [`arbiter_core::store::Store`] backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// In-process, non-durable store. Suitable for development only.
    Memory,
    /// `SQLite`-backed durable store.
    Sqlite,
}

/// Store backend selection.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Which backend to construct.
    pub kind: StoreKind,
    /// Path to the `SQLite` database file. Required when `kind = "sqlite"`.
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
}

impl StoreConfig {
    /// Validates that a `sqlite_path` is present exactly when required.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.kind {
            StoreKind::Memory => Ok(()),
            StoreKind::Sqlite => {
                if self.sqlite_path.is_none() {
                    return Err(ConfigError::Invalid {
                        field: "store.sqlite_path".to_string(),
                        message: "required when store.kind = \"sqlite\"".to_string(),
                    });
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// SECTION: Authorization
// ============================================================================

/// Which [`arbiter_core::authz::AuthzDecider`] backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthzMode {
    /// Always-allow decider; no network calls.
    Builtin,
    /// Remote decider reached over HTTP, with retry and circuit breaking.
    ExternalHttp,
}

/// Decision caching in front of an external authorization call.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthzCacheConfig {
    /// Whether caching is enabled at all.
    #[serde(default)]
    pub enabled: bool,
    /// Cache entry lifetime, in milliseconds.
    #[serde(default)]
    pub ttl_ms: u64,
    /// Maximum number of cached entries before the oldest are evicted.
    #[serde(default)]
    pub max_entries: u64,
}

impl AuthzCacheConfig {
    /// Validates that an enabled cache has a usable ttl and capacity.
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.ttl_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "authz.cache.ttl_ms".to_string(),
                message: "must be greater than zero when the cache is enabled".to_string(),
            });
        }
        if self.max_entries == 0 || self.max_entries > MAX_AUTHZ_CACHE_ENTRIES {
            return Err(ConfigError::Invalid {
                field: "authz.cache.max_entries".to_string(),
                message: format!(
                    "must be in 1..={MAX_AUTHZ_CACHE_ENTRIES} when the cache is enabled"
                ),
            });
        }
        Ok(())
    }
}

/// Authorization backend selection and resilience policy.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthzConfig {
    /// Which backend to construct.
    pub mode: AuthzMode,
    /// Endpoint URL. Required when `mode = "external_http"`.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Per-request timeout, in milliseconds.
    #[serde(default = "default_authz_timeout_ms")]
    pub timeout_ms: u64,
    /// How an unreachable or erroring external decider resolves.
    #[serde(default = "default_fail_mode")]
    pub fail_mode: FailMode,
    /// Maximum retry attempts before invoking `fail_mode`.
    #[serde(default)]
    pub retry_max_attempts: u32,
    /// Backoff between retries, in milliseconds.
    #[serde(default)]
    pub retry_backoff_ms: u64,
    /// Consecutive failures before the circuit breaker opens.
    #[serde(default = "default_circuit_breaker_failures")]
    pub circuit_breaker_failures: u32,
    /// How long the circuit breaker stays open before a retry is attempted.
    #[serde(default = "default_circuit_breaker_open_ms")]
    pub circuit_breaker_open_ms: u64,
    /// Decision caching policy.
    #[serde(default)]
    pub cache: AuthzCacheConfig,
}

/// Default per-request timeout for the external decider, in milliseconds.
const fn default_authz_timeout_ms() -> u64 {
    2_000
}

/// Default consecutive-failure threshold before the breaker opens.
const fn default_circuit_breaker_failures() -> u32 {
    5
}

/// Default open-circuit duration, in milliseconds.
const fn default_circuit_breaker_open_ms() -> u64 {
    30_000
}

/// Default fail mode: deny closed when the external decider is unusable.
const fn default_fail_mode() -> FailMode {
    FailMode::Deny
}

impl Default for AuthzCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_ms: 0,
            max_entries: 0,
        }
    }
}

impl AuthzConfig {
    /// Validates mode-dependent requirements and every numeric bound.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == AuthzMode::ExternalHttp
            && self.endpoint.as_deref().unwrap_or("").trim().is_empty()
        {
            return Err(ConfigError::Invalid {
                field: "authz.endpoint".to_string(),
                message: "required when authz.mode = \"external_http\"".to_string(),
            });
        }
        if self.timeout_ms < MIN_AUTHZ_TIMEOUT_MS || self.timeout_ms > MAX_AUTHZ_TIMEOUT_MS {
            return Err(ConfigError::Invalid {
                field: "authz.timeout_ms".to_string(),
                message: format!(
                    "must be in {MIN_AUTHZ_TIMEOUT_MS}..={MAX_AUTHZ_TIMEOUT_MS}"
                ),
            });
        }
        if self.retry_max_attempts > MAX_AUTHZ_RETRY_ATTEMPTS {
            return Err(ConfigError::Invalid {
                field: "authz.retry_max_attempts".to_string(),
                message: format!("must be at most {MAX_AUTHZ_RETRY_ATTEMPTS}"),
            });
        }
        if self.circuit_breaker_failures == 0
            || self.circuit_breaker_failures > MAX_CIRCUIT_BREAKER_FAILURES
        {
            return Err(ConfigError::Invalid {
                field: "authz.circuit_breaker_failures".to_string(),
                message: format!(
                    "must be in 1..={MAX_CIRCUIT_BREAKER_FAILURES}"
                ),
            });
        }
        if self.circuit_breaker_open_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "authz.circuit_breaker_open_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        self.cache.validate()
    }
}

// ============================================================================
// SECTION: Policy (Gate + Planner)
// ============================================================================

/// Gate and planner thresholds, wrapping the pure-function configs that
/// [`arbiter_core::gate`] and [`arbiter_core::planner`] consume directly.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Admission-control thresholds.
    pub gate: GateConfig,
    /// Intent-selection policy.
    pub planner: PlannerConfig,
    /// Policy version string stamped onto every emitted decision.
    pub policy_version: String,
    /// Governance universes advertised at `GET /v1/contracts`.
    #[serde(default)]
    pub governance: GovernanceConfig,
}

/// The action/provider/approval universes a deployment advertises to
/// clients via the contracts manifest. These do not gate pipeline
/// behavior today (the pipeline only ever emits `provider = "builtin"`
/// actions); they exist so operators can publish the universes they
/// intend to enforce once non-builtin providers are wired in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GovernanceConfig {
    /// Providers this deployment's policy allows actions to target.
    #[serde(default)]
    pub allowed_providers: Vec<String>,
    /// Action types that require approval unconditionally.
    #[serde(default)]
    pub required_approval_types: Vec<String>,
}

impl PolicyConfig {
    /// Validates gate queue/rate bounds and the planner's probability range.
    /// `cooldown_ms` has no upper bound: any value admits by definition.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.gate.max_queue > MAX_GATE_QUEUE {
            return Err(ConfigError::Invalid {
                field: "policy.gate.max_queue".to_string(),
                message: format!("must be at most {MAX_GATE_QUEUE}"),
            });
        }
        if self.gate.tenant_rate_limit_per_min > MAX_TENANT_RATE_LIMIT {
            return Err(ConfigError::Invalid {
                field: "policy.gate.tenant_rate_limit_per_min".to_string(),
                message: format!("must be at most {MAX_TENANT_RATE_LIMIT}"),
            });
        }
        if !(0.0..=1.0).contains(&self.planner.reply_probability) {
            return Err(ConfigError::Invalid {
                field: "policy.planner.reply_probability".to_string(),
                message: "must be in 0.0..=1.0".to_string(),
            });
        }
        if self.policy_version.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "policy.policy_version".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit log sink configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Path to the primary append-only JSONL audit log.
    pub jsonl_path: PathBuf,
    /// Whether the raw authorization decision is included in audit records.
    #[serde(default)]
    pub include_authz_decision: bool,
    /// Optional path to a second JSONL file the same records are mirrored
    /// to, for later divergence checking via `arbiter audit-verify`.
    #[serde(default)]
    pub immutable_mirror_path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates that the primary log path is non-empty.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jsonl_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "audit.jsonl_path".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    const VALID: &str = r#"
[server]
listen_addr = "127.0.0.1:8080"

[store]
kind = "memory"

[authz]
mode = "builtin"

[policy]
policy_version = "policy-v1"

[policy.gate]
cooldown_ms = 1000
max_queue = 10
tenant_rate_limit_per_min = 60

[policy.planner]
reply_policy = "mention_first"
reply_probability = 0.5

[audit]
jsonl_path = "/tmp/arbiter-audit.jsonl"
"#;

    #[test]
    fn loads_a_valid_config() {
        let file = write_config(VALID);
        let config = ArbiterConfig::load(Some(file.path())).expect("should load");
        assert_eq!(config.server.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.authz.mode, AuthzMode::Builtin);
    }

    #[test]
    fn rejects_missing_file() {
        let err = ArbiterConfig::load(Some(Path::new("/nonexistent/arbiter.toml")));
        assert!(matches!(err, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn rejects_sqlite_without_path() {
        let contents = VALID.replace(r#"kind = "memory""#, r#"kind = "sqlite""#);
        let file = write_config(&contents);
        let err = ArbiterConfig::load(Some(file.path()));
        assert!(matches!(err, Err(ConfigError::Invalid { field, .. }) if field == "store.sqlite_path"));
    }

    #[test]
    fn rejects_external_http_without_endpoint() {
        let contents = VALID.replace(r#"mode = "builtin""#, r#"mode = "external_http""#);
        let file = write_config(&contents);
        let err = ArbiterConfig::load(Some(file.path()));
        assert!(matches!(err, Err(ConfigError::Invalid { field, .. }) if field == "authz.endpoint"));
    }

    #[test]
    fn rejects_out_of_range_reply_probability() {
        let contents = VALID.replace("reply_probability = 0.5", "reply_probability = 1.5");
        let file = write_config(&contents);
        let err = ArbiterConfig::load(Some(file.path()));
        assert!(
            matches!(err, Err(ConfigError::Invalid { field, .. }) if field == "policy.planner.reply_probability")
        );
    }

    #[test]
    fn rejects_invalid_listen_addr() {
        let contents = VALID.replace(r#"listen_addr = "127.0.0.1:8080""#, r#"listen_addr = "not-an-addr""#);
        let file = write_config(&contents);
        let err = ArbiterConfig::load(Some(file.path()));
        assert!(matches!(err, Err(ConfigError::Invalid { field, .. }) if field == "server.listen_addr"));
    }

    #[test]
    #[allow(
        unsafe_code,
        reason = "std::env::set_var is unsafe in this edition; this test owns the variable \
                   for its own duration and removes it before returning."
    )]
    fn resolves_path_from_environment_variable() {
        let file = write_config(VALID);
        // SAFETY: no other thread in this test binary reads or writes this variable.
        unsafe {
            env::set_var(CONFIG_ENV_VAR, file.path());
        }
        let config = ArbiterConfig::load(None).expect("should load from env");
        assert_eq!(config.store.kind, StoreKind::Memory);
        // SAFETY: see above.
        unsafe {
            env::remove_var(CONFIG_ENV_VAR);
        }
    }
}
