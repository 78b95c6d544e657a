// arbiter-core/src/gate.rs
// ============================================================================
// Module: Gate
// Description: Pure admission-control function over room state and tenant rate.
// Purpose: Decide, with no I/O, whether an event may proceed to authorization.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`evaluate`] is a pure function: given a room snapshot, the event's own
//! time, the tenant's current-bucket count, and the gate configuration, it
//! returns an admit/deny verdict with no side effects. Rules are evaluated in
//! the fixed order below; the first failing rule wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::model::RoomState;
use crate::model::Timestamp;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Gate rule thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum milliseconds between sends into a room; `0` disables the rule.
    pub cooldown_ms: u64,
    /// Maximum allowed pending-generation queue depth; `0` disables the rule.
    pub max_queue: u32,
    /// Maximum accepted events per tenant per minute; `0` disables the rule.
    pub tenant_rate_limit_per_min: u32,
}

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// The gate's admit/deny verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// The event may proceed to authorization.
    Allow,
    /// The event is denied with a stable reason code.
    Deny {
        /// Stable reason code explaining the denial.
        reason_code: &'static str,
    },
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates the gate rules in fixed order; the first failing rule wins.
#[must_use]
pub fn evaluate(
    room: RoomState,
    event_time: Timestamp,
    tenant_count: u32,
    cfg: GateConfig,
) -> GateVerdict {
    if room.generating {
        return GateVerdict::Deny {
            reason_code: "gate_generating_lock",
        };
    }

    if cfg.cooldown_ms > 0 {
        if let Some(last_send_at) = room.last_send_at {
            let cooldown_end = last_send_at.plus_millis(i64::try_from(cfg.cooldown_ms).unwrap_or(i64::MAX));
            if event_time < cooldown_end {
                return GateVerdict::Deny {
                    reason_code: "gate_cooldown",
                };
            }
        }
    }

    if cfg.max_queue > 0 && room.pending_queue_size >= cfg.max_queue {
        return GateVerdict::Deny {
            reason_code: "gate_backpressure",
        };
    }

    if cfg.tenant_rate_limit_per_min > 0 && tenant_count >= cfg.tenant_rate_limit_per_min {
        return GateVerdict::Deny {
            reason_code: "gate_tenant_rate_limit",
        };
    }

    GateVerdict::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> GateConfig {
        GateConfig {
            cooldown_ms: 3000,
            max_queue: 2,
            tenant_rate_limit_per_min: 5,
        }
    }

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn generating_lock_wins_over_every_other_rule() {
        let room = RoomState {
            generating: true,
            pending_queue_size: 100,
            last_send_at: Some(ts("2026-02-14T00:00:00Z")),
        };
        let verdict = evaluate(room, ts("2026-02-14T00:00:00Z"), 999, cfg());
        assert_eq!(
            verdict,
            GateVerdict::Deny {
                reason_code: "gate_generating_lock"
            }
        );
    }

    #[test]
    fn cooldown_blocks_before_window_elapses() {
        let room = RoomState {
            generating: false,
            pending_queue_size: 0,
            last_send_at: Some(ts("2026-02-14T00:00:00Z")),
        };
        let verdict = evaluate(room, ts("2026-02-14T00:00:01Z"), 0, cfg());
        assert_eq!(
            verdict,
            GateVerdict::Deny {
                reason_code: "gate_cooldown"
            }
        );
    }

    #[test]
    fn cooldown_allows_after_window_elapses() {
        let room = RoomState {
            generating: false,
            pending_queue_size: 0,
            last_send_at: Some(ts("2026-02-14T00:00:00Z")),
        };
        let verdict = evaluate(room, ts("2026-02-14T00:00:03Z"), 0, cfg());
        assert_eq!(verdict, GateVerdict::Allow);
    }

    #[test]
    fn backpressure_blocks_at_threshold() {
        let room = RoomState {
            generating: false,
            pending_queue_size: 2,
            last_send_at: None,
        };
        let verdict = evaluate(room, ts("2026-02-14T00:00:00Z"), 0, cfg());
        assert_eq!(
            verdict,
            GateVerdict::Deny {
                reason_code: "gate_backpressure"
            }
        );
    }

    #[test]
    fn tenant_rate_limit_blocks_at_threshold() {
        let room = RoomState::new();
        let verdict = evaluate(room, ts("2026-02-14T00:00:00Z"), 5, cfg());
        assert_eq!(
            verdict,
            GateVerdict::Deny {
                reason_code: "gate_tenant_rate_limit"
            }
        );
    }

    #[test]
    fn zero_thresholds_disable_their_rules() {
        let room = RoomState::new();
        let disabled = GateConfig {
            cooldown_ms: 0,
            max_queue: 0,
            tenant_rate_limit_per_min: 0,
        };
        let verdict = evaluate(room, ts("2026-02-14T00:00:00Z"), 10_000, disabled);
        assert_eq!(verdict, GateVerdict::Allow);
    }
}
