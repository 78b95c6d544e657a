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
// arbiter-store-sqlite/src/lib.rs
// ============================================================================
// Module: Arbiter SQLite Store
// Description: Durable `Store` implementation backed by SQLite WAL, storing
//              each entity as a canonical JSON snapshot under its key columns.
// Purpose: Give deployments a persistent backend behind the same `Store`
//          trait the in-memory implementation satisfies.
// Dependencies: arbiter-core, async-trait, rusqlite, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! [`SqliteStore`] holds one `rusqlite::Connection` behind a `Mutex`, which
//! gives the whole store a single serialization domain -- a safe superset of
//! the per-key serialization [`arbiter_core::store::Store`] requires. Every
//! operation runs on a blocking task via `tokio::task::spawn_blocking`, since
//! `rusqlite` is synchronous. The `Store` trait carries no error channel, so
//! an unexpected SQL failure is logged and answered with the most
//! conservative safe default (an empty read, a refused transition) rather
//! than a panic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use arbiter_core::identifiers::ActionId;
use arbiter_core::identifiers::ApprovalId;
use arbiter_core::identifiers::EventId;
use arbiter_core::identifiers::JobId;
use arbiter_core::identifiers::PlanId;
use arbiter_core::identifiers::RoomId;
use arbiter_core::identifiers::TenantId;
use arbiter_core::model::ActionResult;
use arbiter_core::model::ApprovalState;
use arbiter_core::model::IdempotencyRecord;
use arbiter_core::model::JobState;
use arbiter_core::model::PendingGeneration;
use arbiter_core::model::RoomState;
use arbiter_core::model::lifecycle::LifecycleError;
use arbiter_core::store::ActionResultOutcome;
use arbiter_core::store::ApprovalTransition;
use arbiter_core::store::JobTransition;
use arbiter_core::store::Store;
use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Busy-wait timeout for lock contention between WAL readers and the writer.
const BUSY_TIMEOUT_MS: u32 = 5_000;
/// Schema version stamped via `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;
/// How many minute buckets back a tenant-rate row must be before it is
/// opportunistically evicted, mirroring the in-memory store.
const TENANT_RATE_RETENTION_BUCKETS: i64 = 5;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures opening or migrating the database.
#[derive(Debug, Error)]
pub enum StoreInitError {
    /// The database file could not be opened.
    #[error("failed to open sqlite database: {0}")]
    Open(String),
    /// The schema could not be created or migrated.
    #[error("failed to initialize sqlite schema: {0}")]
    Migrate(String),
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// SQLite-backed [`Store`] implementation.
pub struct SqliteStore {
    /// The single connection, serialized behind a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (creating if absent) the database at `path`, enabling WAL mode
    /// and creating the schema if it does not already exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreInitError`] if the file cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: &Path) -> Result<Self, StoreInitError> {
        let conn = Connection::open(path).map_err(|err| StoreInitError::Open(err.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens a private in-memory database, primarily for tests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreInitError`] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreInitError> {
        let conn = Connection::open_in_memory().map_err(|err| StoreInitError::Open(err.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// Creates every table this store needs, if absent, and sets pragmas.
fn init_schema(conn: &Connection) -> Result<(), StoreInitError> {
    conn.busy_timeout(std::time::Duration::from_millis(u64::from(BUSY_TIMEOUT_MS)))
        .map_err(|err| StoreInitError::Migrate(err.to_string()))?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|err| StoreInitError::Migrate(err.to_string()))?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(|err| StoreInitError::Migrate(err.to_string()))?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)
        .map_err(|err| StoreInitError::Migrate(err.to_string()))?;
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS idempotency (
            tenant_id TEXT NOT NULL,
            event_id TEXT NOT NULL,
            record_json TEXT NOT NULL,
            PRIMARY KEY (tenant_id, event_id)
        );
        CREATE TABLE IF NOT EXISTS room_state (
            tenant_id TEXT NOT NULL,
            room_id TEXT NOT NULL,
            state_json TEXT NOT NULL,
            PRIMARY KEY (tenant_id, room_id)
        );
        CREATE TABLE IF NOT EXISTS pending_generation (
            tenant_id TEXT NOT NULL,
            action_id TEXT NOT NULL,
            record_json TEXT NOT NULL,
            PRIMARY KEY (tenant_id, action_id)
        );
        CREATE TABLE IF NOT EXISTS tenant_rate (
            tenant_id TEXT NOT NULL,
            minute_bucket INTEGER NOT NULL,
            count INTEGER NOT NULL,
            PRIMARY KEY (tenant_id, minute_bucket)
        );
        CREATE TABLE IF NOT EXISTS job_state (
            tenant_id TEXT NOT NULL,
            job_id TEXT NOT NULL,
            state_json TEXT NOT NULL,
            PRIMARY KEY (tenant_id, job_id)
        );
        CREATE TABLE IF NOT EXISTS approval_state (
            tenant_id TEXT NOT NULL,
            approval_id TEXT NOT NULL,
            state_json TEXT NOT NULL,
            PRIMARY KEY (tenant_id, approval_id)
        );
        CREATE TABLE IF NOT EXISTS action_result (
            tenant_id TEXT NOT NULL,
            plan_id TEXT NOT NULL,
            action_id TEXT NOT NULL,
            result_json TEXT NOT NULL,
            PRIMARY KEY (tenant_id, plan_id, action_id)
        );
        ",
    )
    .map_err(|err| StoreInitError::Migrate(err.to_string()))
}

// ============================================================================
// SECTION: Blocking Dispatch
// ============================================================================

/// Runs `f` against the connection on a blocking task, logging and returning
/// `fallback` if the task itself fails to complete (it never should, absent
/// a panic inside `f`).
async fn run_blocking<F, T>(conn: &Arc<Mutex<Connection>>, fallback: T, f: F) -> T
where
    F: FnOnce(&Connection) -> T + Send + 'static,
    T: Send + 'static,
{
    let conn = Arc::clone(conn);
    match tokio::task::spawn_blocking(move || {
        let guard = conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&guard)
    })
    .await
    {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(error = %err, "sqlite store blocking task did not complete");
            fallback
        }
    }
}

/// Logs a SQL failure at the call site and returns `None`/default via the
/// caller's own fallback; centralizes the log line's shape.
fn log_sql_error(context: &str, err: &rusqlite::Error) {
    tracing::error!(error = %err, context, "sqlite store operation failed");
}

// ============================================================================
// SECTION: Store Implementation
// ============================================================================

#[async_trait]
impl Store for SqliteStore {
    async fn get_idempotency(&self, tenant_id: &TenantId, event_id: &EventId) -> Option<IdempotencyRecord> {
        let tenant_id = tenant_id.as_str().to_string();
        let event_id = event_id.as_str().to_string();
        run_blocking(&self.conn, None, move |conn| {
            let result: rusqlite::Result<Option<String>> = conn
                .query_row(
                    "SELECT record_json FROM idempotency WHERE tenant_id = ?1 AND event_id = ?2",
                    params![tenant_id, event_id],
                    |row| row.get(0),
                )
                .optional();
            match result {
                Ok(Some(json)) => serde_json::from_str(&json).ok(),
                Ok(None) => None,
                Err(err) => {
                    log_sql_error("get_idempotency", &err);
                    None
                }
            }
        })
        .await
    }

    async fn put_idempotency_if_absent(
        &self,
        tenant_id: &TenantId,
        event_id: &EventId,
        record: IdempotencyRecord,
    ) -> Option<IdempotencyRecord> {
        let tenant_id = tenant_id.as_str().to_string();
        let event_id = event_id.as_str().to_string();
        run_blocking(&self.conn, Some(record.clone()), move |conn| {
            let existing: rusqlite::Result<Option<String>> = conn
                .query_row(
                    "SELECT record_json FROM idempotency WHERE tenant_id = ?1 AND event_id = ?2",
                    params![tenant_id, event_id],
                    |row| row.get(0),
                )
                .optional();
            match existing {
                Ok(Some(json)) => serde_json::from_str(&json).ok().or(Some(record)),
                Ok(None) => {
                    let Ok(json) = serde_json::to_string(&record) else {
                        return Some(record);
                    };
                    if let Err(err) = conn.execute(
                        "INSERT INTO idempotency (tenant_id, event_id, record_json) VALUES (?1, ?2, ?3)",
                        params![tenant_id, event_id, json],
                    ) {
                        log_sql_error("put_idempotency_if_absent", &err);
                        return Some(record);
                    }
                    None
                }
                Err(err) => {
                    log_sql_error("put_idempotency_if_absent", &err);
                    Some(record)
                }
            }
        })
        .await
    }

    async fn get_room_state(&self, tenant_id: &TenantId, room_id: &RoomId) -> RoomState {
        let tenant_id = tenant_id.as_str().to_string();
        let room_id = room_id.as_str().to_string();
        run_blocking(&self.conn, RoomState::default(), move |conn| {
            read_room_state(conn, &tenant_id, &room_id)
        })
        .await
    }

    async fn mutate_room_state(
        &self,
        tenant_id: &TenantId,
        room_id: &RoomId,
        mutator: Box<dyn FnOnce(&mut RoomState) + Send>,
    ) -> RoomState {
        let tenant_id = tenant_id.as_str().to_string();
        let room_id = room_id.as_str().to_string();
        run_blocking(&self.conn, RoomState::default(), move |conn| {
            let mut state = read_room_state(conn, &tenant_id, &room_id);
            mutator(&mut state);
            let Ok(json) = serde_json::to_string(&state) else {
                return state;
            };
            if let Err(err) = conn.execute(
                "INSERT INTO room_state (tenant_id, room_id, state_json) VALUES (?1, ?2, ?3)
                 ON CONFLICT (tenant_id, room_id) DO UPDATE SET state_json = excluded.state_json",
                params![tenant_id, room_id, json],
            ) {
                log_sql_error("mutate_room_state", &err);
            }
            state
        })
        .await
    }

    async fn put_pending(&self, tenant_id: &TenantId, action_id: &ActionId, record: PendingGeneration) {
        let tenant_id = tenant_id.as_str().to_string();
        let action_id = action_id.as_str().to_string();
        run_blocking(&self.conn, (), move |conn| {
            let Ok(json) = serde_json::to_string(&record) else {
                return;
            };
            if let Err(err) = conn.execute(
                "INSERT INTO pending_generation (tenant_id, action_id, record_json) VALUES (?1, ?2, ?3)
                 ON CONFLICT (tenant_id, action_id) DO UPDATE SET record_json = excluded.record_json",
                params![tenant_id, action_id, json],
            ) {
                log_sql_error("put_pending", &err);
            }
        })
        .await;
    }

    async fn take_pending(&self, tenant_id: &TenantId, action_id: &ActionId) -> Option<PendingGeneration> {
        let tenant_id = tenant_id.as_str().to_string();
        let action_id = action_id.as_str().to_string();
        run_blocking(&self.conn, None, move |conn| {
            let existing: rusqlite::Result<Option<String>> = conn
                .query_row(
                    "SELECT record_json FROM pending_generation WHERE tenant_id = ?1 AND action_id = ?2",
                    params![tenant_id, action_id],
                    |row| row.get(0),
                )
                .optional();
            let json = match existing {
                Ok(value) => value,
                Err(err) => {
                    log_sql_error("take_pending", &err);
                    return None;
                }
            };
            let Some(json) = json else {
                return None;
            };
            if let Err(err) = conn.execute(
                "DELETE FROM pending_generation WHERE tenant_id = ?1 AND action_id = ?2",
                params![tenant_id, action_id],
            ) {
                log_sql_error("take_pending", &err);
            }
            serde_json::from_str(&json).ok()
        })
        .await
    }

    async fn tenant_rate_count(&self, tenant_id: &TenantId, minute_bucket: i64) -> u32 {
        let tenant_id = tenant_id.as_str().to_string();
        run_blocking(&self.conn, 0, move |conn| {
            read_tenant_rate_count(conn, &tenant_id, minute_bucket)
        })
        .await
    }

    async fn tenant_rate_increment(&self, tenant_id: &TenantId, minute_bucket: i64) -> u32 {
        let tenant_id = tenant_id.as_str().to_string();
        run_blocking(&self.conn, 0, move |conn| {
            let new_count = read_tenant_rate_count(conn, &tenant_id, minute_bucket) + 1;
            if let Err(err) = conn.execute(
                "INSERT INTO tenant_rate (tenant_id, minute_bucket, count) VALUES (?1, ?2, ?3)
                 ON CONFLICT (tenant_id, minute_bucket) DO UPDATE SET count = excluded.count",
                params![tenant_id, minute_bucket, new_count],
            ) {
                log_sql_error("tenant_rate_increment", &err);
                return new_count;
            }
            let retention_floor = minute_bucket - TENANT_RATE_RETENTION_BUCKETS;
            if let Err(err) = conn.execute(
                "DELETE FROM tenant_rate WHERE tenant_id = ?1 AND minute_bucket < ?2",
                params![tenant_id, retention_floor],
            ) {
                log_sql_error("tenant_rate_increment (eviction)", &err);
            }
            new_count
        })
        .await
    }

    async fn get_job(&self, tenant_id: &TenantId, job_id: &JobId) -> Option<JobState> {
        let tenant_id = tenant_id.as_str().to_string();
        let job_id = job_id.as_str().to_string();
        run_blocking(&self.conn, None, move |conn| {
            read_json_row(conn, "job_state", "job_id", &tenant_id, &job_id, "get_job")
        })
        .await
    }

    async fn compare_and_apply_job(
        &self,
        tenant_id: &TenantId,
        job_id: &JobId,
        transition: JobTransition,
    ) -> Result<JobState, LifecycleError> {
        let tenant_id = tenant_id.as_str().to_string();
        let job_id = job_id.as_str().to_string();
        run_blocking(&self.conn, Err(LifecycleError::InvalidTransition), move |conn| {
            let existing: Option<JobState> =
                read_json_row(conn, "job_state", "job_id", &tenant_id, &job_id, "compare_and_apply_job");
            let next = transition(existing.as_ref())?;
            let Ok(json) = serde_json::to_string(&next) else {
                return Err(LifecycleError::InvalidTransition);
            };
            if let Err(err) = conn.execute(
                "INSERT INTO job_state (tenant_id, job_id, state_json) VALUES (?1, ?2, ?3)
                 ON CONFLICT (tenant_id, job_id) DO UPDATE SET state_json = excluded.state_json",
                params![tenant_id, job_id, json],
            ) {
                log_sql_error("compare_and_apply_job", &err);
                return Err(LifecycleError::InvalidTransition);
            }
            Ok(next)
        })
        .await
    }

    async fn get_approval(&self, tenant_id: &TenantId, approval_id: &ApprovalId) -> Option<ApprovalState> {
        let tenant_id = tenant_id.as_str().to_string();
        let approval_id = approval_id.as_str().to_string();
        run_blocking(&self.conn, None, move |conn| {
            read_json_row(conn, "approval_state", "approval_id", &tenant_id, &approval_id, "get_approval")
        })
        .await
    }

    async fn compare_and_apply_approval(
        &self,
        tenant_id: &TenantId,
        approval_id: &ApprovalId,
        transition: ApprovalTransition,
    ) -> Result<ApprovalState, LifecycleError> {
        let tenant_id = tenant_id.as_str().to_string();
        let approval_id = approval_id.as_str().to_string();
        run_blocking(&self.conn, Err(LifecycleError::InvalidTransition), move |conn| {
            let existing: Option<ApprovalState> = read_json_row(
                conn,
                "approval_state",
                "approval_id",
                &tenant_id,
                &approval_id,
                "compare_and_apply_approval",
            );
            let next = transition(existing.as_ref())?;
            let Ok(json) = serde_json::to_string(&next) else {
                return Err(LifecycleError::InvalidTransition);
            };
            if let Err(err) = conn.execute(
                "INSERT INTO approval_state (tenant_id, approval_id, state_json) VALUES (?1, ?2, ?3)
                 ON CONFLICT (tenant_id, approval_id) DO UPDATE SET state_json = excluded.state_json",
                params![tenant_id, approval_id, json],
            ) {
                log_sql_error("compare_and_apply_approval", &err);
                return Err(LifecycleError::InvalidTransition);
            }
            Ok(next)
        })
        .await
    }

    async fn get_action_result(
        &self,
        tenant_id: &TenantId,
        plan_id: &PlanId,
        action_id: &ActionId,
    ) -> Option<ActionResult> {
        let tenant_id = tenant_id.as_str().to_string();
        let plan_id = plan_id.as_str().to_string();
        let action_id = action_id.as_str().to_string();
        run_blocking(&self.conn, None, move |conn| {
            read_action_result(conn, &tenant_id, &plan_id, &action_id)
        })
        .await
    }

    async fn first_write_wins_action_result(
        &self,
        tenant_id: &TenantId,
        plan_id: &PlanId,
        action_id: &ActionId,
        candidate: ActionResult,
    ) -> ActionResultOutcome {
        let tenant_id = tenant_id.as_str().to_string();
        let plan_id = plan_id.as_str().to_string();
        let action_id = action_id.as_str().to_string();
        run_blocking(
            &self.conn,
            ActionResultOutcome::Mismatch {
                existing_hash: String::new(),
                incoming_hash: candidate.payload_fingerprint.clone(),
            },
            move |conn| match read_action_result(conn, &tenant_id, &plan_id, &action_id) {
                Some(existing) => {
                    if existing.matches(&candidate.payload_fingerprint) {
                        ActionResultOutcome::AlreadyMatching(existing)
                    } else {
                        ActionResultOutcome::Mismatch {
                            existing_hash: existing.payload_fingerprint,
                            incoming_hash: candidate.payload_fingerprint,
                        }
                    }
                }
                None => {
                    let Ok(json) = serde_json::to_string(&candidate) else {
                        return ActionResultOutcome::Mismatch {
                            existing_hash: String::new(),
                            incoming_hash: candidate.payload_fingerprint.clone(),
                        };
                    };
                    if let Err(err) = conn.execute(
                        "INSERT INTO action_result (tenant_id, plan_id, action_id, result_json)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![tenant_id, plan_id, action_id, json],
                    ) {
                        log_sql_error("first_write_wins_action_result", &err);
                    }
                    ActionResultOutcome::Written(candidate)
                }
            },
        )
        .await
    }
}

// ============================================================================
// SECTION: Row Helpers
// ============================================================================

/// Reads the room state row for `(tenant_id, room_id)`, or the lazily
/// created default if absent.
fn read_room_state(conn: &Connection, tenant_id: &str, room_id: &str) -> RoomState {
    let result: rusqlite::Result<Option<String>> = conn
        .query_row(
            "SELECT state_json FROM room_state WHERE tenant_id = ?1 AND room_id = ?2",
            params![tenant_id, room_id],
            |row| row.get(0),
        )
        .optional();
    match result {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_default(),
        Ok(None) => RoomState::default(),
        Err(err) => {
            log_sql_error("read_room_state", &err);
            RoomState::default()
        }
    }
}

/// Reads the current tenant-rate count for `(tenant_id, minute_bucket)`.
fn read_tenant_rate_count(conn: &Connection, tenant_id: &str, minute_bucket: i64) -> u32 {
    let result: rusqlite::Result<Option<i64>> = conn
        .query_row(
            "SELECT count FROM tenant_rate WHERE tenant_id = ?1 AND minute_bucket = ?2",
            params![tenant_id, minute_bucket],
            |row| row.get(0),
        )
        .optional();
    match result {
        Ok(Some(count)) => u32::try_from(count).unwrap_or(0),
        Ok(None) => 0,
        Err(err) => {
            log_sql_error("read_tenant_rate_count", &err);
            0
        }
    }
}

/// Reads and deserializes one JSON-blob row keyed by `(tenant_id, secondary_id)`.
fn read_json_row<T: serde::de::DeserializeOwned>(
    conn: &Connection,
    table: &str,
    secondary_column: &str,
    tenant_id: &str,
    secondary_id: &str,
    context: &str,
) -> Option<T> {
    let sql =
        format!("SELECT state_json FROM {table} WHERE tenant_id = ?1 AND {secondary_column} = ?2");
    let result: rusqlite::Result<Option<String>> =
        conn.query_row(&sql, params![tenant_id, secondary_id], |row| row.get(0)).optional();
    match result {
        Ok(Some(json)) => serde_json::from_str(&json).ok(),
        Ok(None) => None,
        Err(err) => {
            log_sql_error(context, &err);
            None
        }
    }
}

/// Reads and deserializes the action-result row for
/// `(tenant_id, plan_id, action_id)`.
fn read_action_result(conn: &Connection, tenant_id: &str, plan_id: &str, action_id: &str) -> Option<ActionResult> {
    let result: rusqlite::Result<Option<String>> = conn
        .query_row(
            "SELECT result_json FROM action_result WHERE tenant_id = ?1 AND plan_id = ?2 AND action_id = ?3",
            params![tenant_id, plan_id, action_id],
            |row| row.get(0),
        )
        .optional();
    match result {
        Ok(Some(json)) => serde_json::from_str(&json).ok(),
        Ok(None) => None,
        Err(err) => {
            log_sql_error("read_action_result", &err);
            None
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use arbiter_core::model::time::Timestamp;

    use super::*;

    fn plan(tenant_id: &str, event_id: &str) -> arbiter_core::model::ResponsePlan {
        let occurred_at = Timestamp::parse("2026-02-14T00:00:00Z").expect("parse");
        arbiter_core::model::ResponsePlan::do_nothing(
            TenantId::new(tenant_id),
            EventId::new(event_id),
            "policy-v1",
            occurred_at,
            "test_reason",
        )
    }

    #[tokio::test]
    async fn idempotency_first_write_wins() {
        let store = SqliteStore::open_in_memory().expect("open");
        let tenant_id = TenantId::new("t1");
        let event_id = EventId::new("e1");
        let record = IdempotencyRecord::new(plan("t1", "e1"), "fp1".to_string());

        let first = store.put_idempotency_if_absent(&tenant_id, &event_id, record.clone()).await;
        assert!(first.is_none());

        let other = IdempotencyRecord::new(plan("t1", "e1"), "fp2".to_string());
        let second = store.put_idempotency_if_absent(&tenant_id, &event_id, other).await;
        assert_eq!(second, Some(record));
    }

    #[tokio::test]
    async fn room_state_mutation_persists() {
        let store = SqliteStore::open_in_memory().expect("open");
        let tenant_id = TenantId::new("t1");
        let room_id = RoomId::new("r1");

        let updated = store
            .mutate_room_state(
                &tenant_id,
                &room_id,
                Box::new(|room| {
                    room.generating = true;
                    room.pending_queue_size = 1;
                }),
            )
            .await;
        assert!(updated.generating);

        let read_back = store.get_room_state(&tenant_id, &room_id).await;
        assert!(read_back.generating);
        assert_eq!(read_back.pending_queue_size, 1);
    }

    #[tokio::test]
    async fn tenant_rate_increment_persists_and_evicts() {
        let store = SqliteStore::open_in_memory().expect("open");
        let tenant_id = TenantId::new("t1");

        assert_eq!(store.tenant_rate_increment(&tenant_id, 100).await, 1);
        assert_eq!(store.tenant_rate_increment(&tenant_id, 100).await, 2);
        assert_eq!(store.tenant_rate_count(&tenant_id, 100).await, 2);

        store.tenant_rate_increment(&tenant_id, 200).await;
        assert_eq!(store.tenant_rate_count(&tenant_id, 100).await, 0);
    }

    #[tokio::test]
    async fn job_transition_rejects_after_terminal() {
        use arbiter_core::model::JobStatus;

        let store = SqliteStore::open_in_memory().expect("open");
        let tenant_id = TenantId::new("t1");
        let job_id = JobId::new("j1");
        let ts = Timestamp::parse("2026-02-14T00:00:00Z").expect("parse");

        let started: JobTransition = Box::new(move |_existing| {
            Ok(JobState {
                status: JobStatus::Completed,
                reason_code: None,
                updated_at: ts,
                payload_fingerprint: "fp1".to_string(),
            })
        });
        store.compare_and_apply_job(&tenant_id, &job_id, started).await.expect("first transition");

        let retried: JobTransition = Box::new(move |existing| match existing {
            Some(state) if state.status.is_terminal() => Err(LifecycleError::InvalidTransition),
            _ => Ok(JobState {
                status: JobStatus::Heartbeat,
                reason_code: None,
                updated_at: ts,
                payload_fingerprint: "fp2".to_string(),
            }),
        });
        let result = store.compare_and_apply_job(&tenant_id, &job_id, retried).await;
        assert!(matches!(result, Err(LifecycleError::InvalidTransition)));
    }

    #[tokio::test]
    async fn action_result_first_write_wins() {
        use arbiter_core::model::ActionResultStatus;

        let store = SqliteStore::open_in_memory().expect("open");
        let tenant_id = TenantId::new("t1");
        let plan_id = PlanId::new("plan_1");
        let action_id = ActionId::new("act_1");
        let ts = Timestamp::parse("2026-02-14T00:00:00Z").expect("parse");

        let candidate = ActionResult {
            status: ActionResultStatus::Succeeded,
            occurred_at: ts,
            evidence: serde_json::json!({}),
            payload_fingerprint: "fp1".to_string(),
        };
        let first = store
            .first_write_wins_action_result(&tenant_id, &plan_id, &action_id, candidate.clone())
            .await;
        assert_eq!(first, ActionResultOutcome::Written(candidate.clone()));

        let repeat = store
            .first_write_wins_action_result(&tenant_id, &plan_id, &action_id, candidate.clone())
            .await;
        assert_eq!(repeat, ActionResultOutcome::AlreadyMatching(candidate));

        let mismatched = ActionResult {
            status: ActionResultStatus::Failed,
            occurred_at: ts,
            evidence: serde_json::json!({}),
            payload_fingerprint: "fp2".to_string(),
        };
        let conflict = store
            .first_write_wins_action_result(&tenant_id, &plan_id, &action_id, mismatched)
            .await;
        assert!(matches!(conflict, ActionResultOutcome::Mismatch { .. }));
    }
}
