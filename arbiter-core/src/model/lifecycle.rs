// arbiter-core/src/model/lifecycle.rs
// ============================================================================
// Module: Lifecycle State Machines
// Description: Job, approval, and action-result state with transition rules.
// Purpose: Share idempotency and conflict semantics across the three
//          lifecycle-tracked entities named in the data model.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Job and approval states follow the same shape: a status enum with a
//! terminal subset, `compare_and_apply` semantics enforced by the store, and
//! `conflict.invalid_transition` once terminal. Action-result is simpler:
//! first write wins, keyed by `(tenant, plan, action)`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::model::time::Timestamp;

// ============================================================================
// SECTION: Job
// ============================================================================

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job has started.
    Started,
    /// Job reported a heartbeat.
    Heartbeat,
    /// Job completed successfully. Terminal.
    Completed,
    /// Job failed. Terminal.
    Failed,
    /// Job was cancelled. Terminal.
    Cancelled,
}

impl JobStatus {
    /// Returns whether this status is terminal (no further transition allowed).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns whether a transition from `self` to `next` is permitted.
    ///
    /// Terminal states accept no transition, including into themselves; a
    /// replay of the terminal event is handled upstream via payload-fingerprint
    /// equality, not through this predicate.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Self::Started, Self::Heartbeat | Self::Completed | Self::Failed | Self::Cancelled) => {
                true
            }
            (Self::Heartbeat, Self::Heartbeat | Self::Completed | Self::Failed | Self::Cancelled) => {
                true
            }
            _ => false,
        }
    }
}

/// Job lifecycle state, keyed by `(tenant_id, job_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobState {
    /// Current status.
    pub status: JobStatus,
    /// Stable reason code for a terminal outcome, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    /// Event time of the last accepted transition.
    pub updated_at: Timestamp,
    /// Fingerprint of the canonical payload that produced this state, used to
    /// detect an exact-duplicate replay of the last accepted transition.
    pub payload_fingerprint: String,
}

// ============================================================================
// SECTION: Approval
// ============================================================================

/// Approval lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Approval has been requested.
    Requested,
    /// Approval was granted. Terminal.
    Approved,
    /// Approval was rejected. Terminal.
    Rejected,
    /// Approval expired. Terminal; set only by an explicit event, never by clock.
    Expired,
}

impl ApprovalStatus {
    /// Returns whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Expired)
    }

    /// Returns whether a transition from `self` to `next` is permitted.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Self::Requested, Self::Approved | Self::Rejected | Self::Expired)
        )
    }
}

/// Approval lifecycle state, keyed by `(tenant_id, approval_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalState {
    /// Current status.
    pub status: ApprovalStatus,
    /// Stable reason code for a terminal outcome, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    /// Event time of the last accepted transition.
    pub updated_at: Timestamp,
    /// Fingerprint of the canonical payload that produced this state, used to
    /// detect an exact-duplicate replay of the last accepted transition.
    pub payload_fingerprint: String,
}

// ============================================================================
// SECTION: Action Result
// ============================================================================

/// Outcome reported for a single action's (external) execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionResultStatus {
    /// The action succeeded.
    Succeeded,
    /// The action failed.
    Failed,
    /// The action was skipped.
    Skipped,
}

/// Action-result state, keyed by `(tenant_id, plan_id, action_id)`. First write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Reported outcome.
    pub status: ActionResultStatus,
    /// When the outcome occurred, per the reporting event.
    pub occurred_at: Timestamp,
    /// Opaque supporting evidence.
    pub evidence: serde_json::Value,
    /// JCS-SHA256 hex fingerprint of the canonical reporting payload.
    pub payload_fingerprint: String,
}

impl ActionResult {
    /// Returns whether `incoming_fingerprint` matches this stored result,
    /// i.e. whether a repeat write should be treated as a no-op success.
    #[must_use]
    pub fn matches(&self, incoming_fingerprint: &str) -> bool {
        self.payload_fingerprint == incoming_fingerprint
    }
}

// ============================================================================
// SECTION: Lifecycle Errors
// ============================================================================

/// Failure modes shared by the job and approval state machines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// The same key was reused with a different canonical payload.
    #[error("payload mismatch: existing {existing_hash}, incoming {incoming_hash}")]
    PayloadMismatch {
        /// Fingerprint of the payload already stored for this key.
        existing_hash: String,
        /// Fingerprint of the payload presented by this request.
        incoming_hash: String,
    },
    /// The requested transition is not permitted from the current state.
    #[error("invalid transition")]
    InvalidTransition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_terminal_states_reject_any_transition() {
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Heartbeat));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Cancelled.can_transition_to(JobStatus::Cancelled));
    }

    #[test]
    fn job_started_can_reach_any_terminal_state() {
        assert!(JobStatus::Started.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Cancelled));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Heartbeat));
    }

    #[test]
    fn approval_terminal_states_reject_any_transition() {
        assert!(!ApprovalStatus::Approved.can_transition_to(ApprovalStatus::Rejected));
        assert!(!ApprovalStatus::Expired.can_transition_to(ApprovalStatus::Approved));
    }

    #[test]
    fn approval_requested_can_reach_any_terminal_state() {
        assert!(ApprovalStatus::Requested.can_transition_to(ApprovalStatus::Approved));
        assert!(ApprovalStatus::Requested.can_transition_to(ApprovalStatus::Rejected));
        assert!(ApprovalStatus::Requested.can_transition_to(ApprovalStatus::Expired));
    }
}
