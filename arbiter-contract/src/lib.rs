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
// arbiter-contract/src/lib.rs
// ============================================================================
// Module: Arbiter Contracts Manifest
// Description: Deterministic hash set over the embedded schema files and the
//              embedded OpenAPI document.
// Purpose: Give `GET /v1/contracts` a manifest that changes if and only if
//          the wire contract itself changes.
// Dependencies: arbiter-core, serde, serde_json, sha2, time
// ============================================================================

//! ## Overview
//! Schema and OpenAPI bytes are embedded at compile time via `include_str!`
//! so the manifest can never drift from what actually ships in the binary.
//! `contracts_set_sha256` and `openapi_sha256` are pure functions of those
//! bytes; only `generated_at` varies across builds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use arbiter_core::fingerprint::hex_sha256;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Embedded Artifacts
// ============================================================================

/// One embedded schema file: its canonical path and raw bytes.
struct SchemaFile {
    /// Path as served in the manifest, relative to `contracts/v1/`.
    path: &'static str,
    /// Raw file bytes, embedded at compile time.
    bytes: &'static [u8],
}

/// The embedded OpenAPI document bytes.
const OPENAPI_BYTES: &[u8] = include_bytes!("../../contracts/v1/openapi.json");

/// The embedded schema files, in the fixed order they are declared here.
/// [`schema_files`] sorts them by path before hashing, so declaration order
/// here has no effect on the manifest.
fn schema_files() -> Vec<SchemaFile> {
    vec![
        SchemaFile {
            path: "event_envelope.schema.json",
            bytes: include_bytes!("../../contracts/v1/event_envelope.schema.json"),
        },
        SchemaFile {
            path: "response_plan.schema.json",
            bytes: include_bytes!("../../contracts/v1/response_plan.schema.json"),
        },
        SchemaFile {
            path: "generation_result.schema.json",
            bytes: include_bytes!("../../contracts/v1/generation_result.schema.json"),
        },
        SchemaFile {
            path: "job_event.schema.json",
            bytes: include_bytes!("../../contracts/v1/job_event.schema.json"),
        },
        SchemaFile {
            path: "approval_event.schema.json",
            bytes: include_bytes!("../../contracts/v1/approval_event.schema.json"),
        },
        SchemaFile {
            path: "action_result.schema.json",
            bytes: include_bytes!("../../contracts/v1/action_result.schema.json"),
        },
    ]
}

// ============================================================================
// SECTION: Governance
// ============================================================================

/// Per-action-type approval defaults advertised to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    /// Action types that require approval unconditionally.
    pub required_for_types: Vec<String>,
    /// Default `requires_approval` value for action types not listed above.
    pub defaults: bool,
}

/// The governance section of the contracts manifest: the closed universes
/// a deployment enforces, surfaced so clients can validate locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Governance {
    /// The full, fixed set of action types the planner can emit.
    pub allowed_action_types: Vec<String>,
    /// Providers this deployment's policy allows actions to target.
    pub allowed_providers: Vec<String>,
    /// Approval requirements by action type.
    pub approval_policy: ApprovalPolicy,
    /// Stable error codes this deployment can return.
    pub error_codes: Vec<String>,
}

/// Inputs a deployment supplies when building its contracts manifest.
/// Everything else is fixed by the embedded schema/OpenAPI bytes.
#[derive(Debug, Clone)]
pub struct ContractConfig {
    /// Providers this deployment's policy allows actions to target.
    pub allowed_providers: Vec<String>,
    /// Action types that require approval unconditionally.
    pub required_approval_types: Vec<String>,
}

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// The full `GET /v1/contracts` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsManifest {
    /// Wire API version, currently always `1`.
    pub api_version: u32,
    /// `sha256` of the raw embedded OpenAPI bytes.
    pub openapi_sha256: String,
    /// `sha256` over the sorted, concatenated `(path, bytes)` schema set.
    pub contracts_set_sha256: String,
    /// RFC3339 build/start time. Not decision-relevant; varies across builds.
    pub generated_at: String,
    /// Map from schema path to its own `sha256`.
    pub schemas: BTreeMap<String, String>,
    /// The enforced action/provider/approval universes.
    pub governance: Governance,
}

/// The fixed wire API version.
const API_VERSION: u32 = 1;

/// The closed set of action types the planner can emit, in wire form.
const ALLOWED_ACTION_TYPES: &[&str] = &[
    "notify",
    "write_external",
    "start_job",
    "request_generation",
    "send_reply",
    "send_message",
    "do_nothing",
];

/// The stable error codes this deployment can return, matching
/// [`arbiter_core::error::ErrorCode`].
const ERROR_CODES: &[&str] = &[
    "request.schema_invalid",
    "conflict.payload_mismatch",
    "conflict.invalid_transition",
    "conflict.duplicate_key",
    "not_found",
    "policy.provider_not_allowed",
    "policy.action_type_not_allowed",
    "config.invalid_store_kind",
    "internal.audit_write_failed",
    "internal_error",
];

/// Builds the contracts manifest from the embedded schema/OpenAPI bytes and
/// the given deployment-specific governance inputs.
///
/// `generated_at` is stamped with the current wall-clock time; every other
/// field is a pure function of the embedded bytes and `config`.
#[must_use]
pub fn build(config: &ContractConfig) -> ContractsManifest {
    let mut files = schema_files();
    files.sort_by(|lhs, rhs| lhs.path.cmp(rhs.path));

    let mut schemas = BTreeMap::new();
    for file in &files {
        schemas.insert(file.path.to_string(), hex_sha256(file.bytes));
    }

    ContractsManifest {
        api_version: API_VERSION,
        openapi_sha256: hex_sha256(OPENAPI_BYTES),
        contracts_set_sha256: contracts_set_sha256(&files),
        generated_at: generated_at(),
        schemas,
        governance: Governance {
            allowed_action_types: ALLOWED_ACTION_TYPES.iter().map(|s| (*s).to_string()).collect(),
            allowed_providers: config.allowed_providers.clone(),
            approval_policy: ApprovalPolicy {
                required_for_types: config.required_approval_types.clone(),
                defaults: false,
            },
            error_codes: ERROR_CODES.iter().map(|s| (*s).to_string()).collect(),
        },
    }
}

/// `sha256(⨁ᵢ (pathᵢ || 0x00 || bytesᵢ || 0x00))` over `files`, which must
/// already be sorted by path.
fn contracts_set_sha256(files: &[SchemaFile]) -> String {
    let mut combined = Vec::new();
    for file in files {
        combined.extend_from_slice(file.path.as_bytes());
        combined.push(0u8);
        combined.extend_from_slice(file.bytes);
        combined.push(0u8);
    }
    hex_sha256(&combined)
}

/// Returns the current wall-clock time as RFC3339, falling back to the Unix
/// epoch if the system clock cannot be read. This value is metadata only;
/// it never participates in a pipeline decision.
fn generated_at() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ContractConfig {
        ContractConfig {
            allowed_providers: vec!["slack".to_string(), "webhook".to_string()],
            required_approval_types: vec!["write_external".to_string()],
        }
    }

    #[test]
    fn manifest_hashes_are_stable_across_builds() {
        let first = build(&config());
        let second = build(&config());
        assert_eq!(first.contracts_set_sha256, second.contracts_set_sha256);
        assert_eq!(first.openapi_sha256, second.openapi_sha256);
        assert_eq!(first.schemas, second.schemas);
    }

    #[test]
    fn schema_map_contains_every_embedded_file() {
        let manifest = build(&config());
        assert_eq!(manifest.schemas.len(), schema_files().len());
        assert!(manifest.schemas.contains_key("event_envelope.schema.json"));
        assert!(manifest.schemas.contains_key("response_plan.schema.json"));
    }

    #[test]
    fn governance_lists_the_full_action_type_universe() {
        let manifest = build(&config());
        assert_eq!(manifest.governance.allowed_action_types.len(), ALLOWED_ACTION_TYPES.len());
        assert!(manifest.governance.allowed_action_types.contains(&"do_nothing".to_string()));
    }

    #[test]
    fn contracts_set_hash_changes_if_any_schema_byte_changes() {
        let mut files = schema_files();
        files.sort_by(|lhs, rhs| lhs.path.cmp(rhs.path));
        let baseline = contracts_set_sha256(&files);

        let mut mutated: Vec<u8> = files[0].bytes.to_vec();
        mutated.push(b' ');
        let mutated_file = SchemaFile {
            path: files[0].path,
            bytes: Box::leak(mutated.into_boxed_slice()),
        };
        files[0] = mutated_file;
        let changed = contracts_set_sha256(&files);

        assert_ne!(baseline, changed);
    }
}
