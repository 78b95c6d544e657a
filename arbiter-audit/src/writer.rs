// arbiter-audit/src/writer.rs
// ============================================================================
// Module: JSONL Audit Writer
// Description: Append-only, hash-chained [`AuditAppender`] implementation.
// Purpose: Durably persist every pipeline audit record in commit order,
//          mirroring to a second file when configured.
// Dependencies: arbiter-core, async-trait, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! Every write holds one exclusive lock across reading `last_hash`, appending
//! the record, and updating `last_hash`, matching the global-ordering
//! guarantee the specification requires of the audit log: no record may ever
//! observe a `prev_hash` other than the line written immediately before it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use arbiter_core::fingerprint::fingerprint;
use arbiter_core::fingerprint::hex_sha256;
use arbiter_core::model::AuditRecord;
use arbiter_core::model::Timestamp;
use arbiter_core::pipeline::AuditAppender;
use arbiter_core::pipeline::AuditRecordInput;
use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures opening or writing the audit log.
#[derive(Debug, Error)]
pub enum WriterError {
    /// The log (or mirror) file could not be opened.
    #[error("failed to open audit log {path}: {message}")]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error message.
        message: String,
    },
    /// An existing log file could not be read while recovering `last_hash`.
    #[error("failed to read audit log {path}: {message}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error message.
        message: String,
    },
    /// An existing record failed to parse while recovering `last_hash`.
    #[error("failed to parse existing audit record at {path} line {line}: {message}")]
    Parse {
        /// Path being recovered.
        path: PathBuf,
        /// One-based line number of the offending record.
        line: usize,
        /// Underlying parse error message.
        message: String,
    },
}

// ============================================================================
// SECTION: Writer State
// ============================================================================

/// The mutable, lock-protected writer state: open file handles plus the
/// hash of the most recently written record.
struct AuditState {
    /// Primary append-only log file.
    primary: File,
    /// Optional mirror file, appended with the identical line.
    mirror: Option<File>,
    /// `record_hash` of the last record written, or `""` before the first.
    last_hash: String,
}

/// Hash-chained, append-only audit log writer.
///
/// Implements [`AuditAppender`] so `arbiter-core`'s pipeline can depend on it
/// without knowing anything about files.
pub struct JsonlAuditAppender {
    /// Shared, lock-protected file state.
    state: Arc<Mutex<AuditState>>,
    /// Whether to emit the full record (including `reason_code`) at debug
    /// log level. When `false`, only the action/result pair is logged.
    include_authz_decision: bool,
}

impl JsonlAuditAppender {
    /// Opens (creating if absent) the primary log at `path`, and the mirror
    /// at `mirror_path` if given, recovering `last_hash` from whichever file
    /// already has content.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError`] if either file cannot be opened, or if an
    /// existing record cannot be read back while recovering `last_hash`.
    pub fn open(
        path: &Path,
        mirror_path: Option<&Path>,
        include_authz_decision: bool,
    ) -> Result<Self, WriterError> {
        let last_hash = Self::recover_last_hash(path)?;
        let primary = open_append(path)?;
        let mirror = mirror_path.map(open_append).transpose()?;
        Ok(Self {
            state: Arc::new(Mutex::new(AuditState {
                primary,
                mirror,
                last_hash,
            })),
            include_authz_decision,
        })
    }

    /// Reads `path` end to end and returns the last record's `record_hash`,
    /// or `""` if the file is empty or does not yet exist.
    fn recover_last_hash(path: &Path) -> Result<String, WriterError> {
        let Ok(file) = File::open(path) else {
            return Ok(String::new());
        };
        let reader = BufReader::new(file);
        let mut last_hash = String::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|err| WriterError::Read {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let record: AuditRecord = serde_json::from_str(&line).map_err(|err| WriterError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                message: err.to_string(),
            })?;
            last_hash = record.record_hash;
        }
        Ok(last_hash)
    }
}

/// Opens `path` for append, creating it if absent.
fn open_append(path: &Path) -> Result<File, WriterError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| WriterError::Open {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

/// Returns the current wall-clock time. Audit `ts` is diagnostic metadata
/// only and never influences a pipeline decision.
fn now_timestamp() -> Timestamp {
    let now = OffsetDateTime::now_utc();
    let unix_millis = now.unix_timestamp() * 1000 + i64::from(now.millisecond());
    Timestamp::from_unix_millis(unix_millis)
}

/// Derives a record identifier from the chain position and record contents,
/// so ids are reproducible from the log alone and never rely on a random
/// generator.
fn derive_audit_id(prev_hash: &str, input: &AuditRecordInput, ts: Timestamp) -> String {
    let seed = format!(
        "{prev_hash}:{}:{}:{}:{}:{}",
        input.tenant_id, input.correlation_id, input.action, input.result, ts
    );
    format!("aud_{}", &hex_sha256(seed.as_bytes())[..16])
}

#[async_trait]
impl AuditAppender for JsonlAuditAppender {
    async fn append(&self, input: AuditRecordInput) -> Result<(), String> {
        let state = Arc::clone(&self.state);
        let include_authz_decision = self.include_authz_decision;
        tokio::task::spawn_blocking(move || append_blocking(&state, input, include_authz_decision))
            .await
            .map_err(|err| format!("audit writer task panicked: {err}"))?
    }
}

/// Builds, hashes, and writes one record under the writer's exclusive lock.
/// Runs on a blocking thread; the lock guard never crosses an `.await`.
fn append_blocking(
    state: &Arc<Mutex<AuditState>>,
    input: AuditRecordInput,
    include_authz_decision: bool,
) -> Result<(), String> {
    let mut guard = state.lock().map_err(|_| "audit writer lock poisoned".to_string())?;
    let prev_hash = guard.last_hash.clone();
    let ts = now_timestamp();
    let audit_id = derive_audit_id(&prev_hash, &input, ts);

    let mut record = AuditRecord {
        audit_id,
        tenant_id: input.tenant_id,
        correlation_id: input.correlation_id,
        action: input.action,
        result: input.result,
        reason_code: input.reason_code,
        ts,
        plan_id: input.plan_id,
        prev_hash,
        record_hash: String::new(),
    };
    record.record_hash =
        fingerprint(&record.hashable()).map_err(|err| format!("failed to hash audit record: {err}"))?;

    if include_authz_decision {
        tracing::debug!(record = ?record, "appending audit record");
    } else {
        tracing::debug!(action = %record.action, result = %record.result, "appending audit record");
    }

    let line = serde_json::to_string(&record).map_err(|err| format!("failed to serialize audit record: {err}"))?;
    writeln!(guard.primary, "{line}").map_err(|err| format!("failed to write audit log: {err}"))?;
    guard.primary.flush().map_err(|err| format!("failed to flush audit log: {err}"))?;
    if let Some(mirror) = guard.mirror.as_mut() {
        writeln!(mirror, "{line}").map_err(|err| format!("failed to write audit mirror: {err}"))?;
        mirror.flush().map_err(|err| format!("failed to flush audit mirror: {err}"))?;
    }

    guard.last_hash = record.record_hash;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use arbiter_core::identifiers::CorrelationId;
    use arbiter_core::identifiers::TenantId;

    use super::*;

    fn input(action: &str) -> AuditRecordInput {
        AuditRecordInput {
            tenant_id: TenantId::new("t1"),
            correlation_id: CorrelationId::new("e1"),
            action: action.to_string(),
            result: "accepted".to_string(),
            reason_code: None,
            plan_id: None,
        }
    }

    #[tokio::test]
    async fn first_record_has_empty_prev_hash() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit.jsonl");
        let writer = JsonlAuditAppender::open(&path, None, false).expect("open");
        writer.append(input("process_event")).await.expect("append");

        let contents = std::fs::read_to_string(&path).expect("read");
        let record: AuditRecord = serde_json::from_str(contents.lines().next().expect("one line")).expect("parse");
        assert_eq!(record.prev_hash, "");
        assert!(!record.record_hash.is_empty());
    }

    #[tokio::test]
    async fn chains_successive_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit.jsonl");
        let writer = JsonlAuditAppender::open(&path, None, false).expect("open");
        writer.append(input("process_event")).await.expect("append 1");
        writer.append(input("idempotency_hit")).await.expect("append 2");

        let contents = std::fs::read_to_string(&path).expect("read");
        let mut lines = contents.lines();
        let first: AuditRecord = serde_json::from_str(lines.next().expect("line 1")).expect("parse 1");
        let second: AuditRecord = serde_json::from_str(lines.next().expect("line 2")).expect("parse 2");
        assert_eq!(second.prev_hash, first.record_hash);
    }

    #[tokio::test]
    async fn mirrors_to_a_second_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let primary_path = dir.path().join("audit.jsonl");
        let mirror_path = dir.path().join("audit.mirror.jsonl");
        let writer =
            JsonlAuditAppender::open(&primary_path, Some(&mirror_path), false).expect("open");
        writer.append(input("process_event")).await.expect("append");

        let primary = std::fs::read_to_string(&primary_path).expect("read primary");
        let mirror = std::fs::read_to_string(&mirror_path).expect("read mirror");
        assert_eq!(primary, mirror);
    }

    #[tokio::test]
    async fn resumes_the_chain_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit.jsonl");
        {
            let writer = JsonlAuditAppender::open(&path, None, false).expect("open");
            writer.append(input("process_event")).await.expect("append");
        }
        let writer = JsonlAuditAppender::open(&path, None, false).expect("reopen");
        writer.append(input("idempotency_hit")).await.expect("append after reopen");

        let contents = std::fs::read_to_string(&path).expect("read");
        let mut lines = contents.lines();
        let first: AuditRecord = serde_json::from_str(lines.next().expect("line 1")).expect("parse 1");
        let second: AuditRecord = serde_json::from_str(lines.next().expect("line 2")).expect("parse 2");
        assert_eq!(second.prev_hash, first.record_hash);
    }
}
