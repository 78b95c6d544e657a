// arbiter-core/src/planner.rs
// ============================================================================
// Module: Planner
// Description: Deterministic intent selection seeded from event_id.
// Purpose: Choose IGNORE/REPLY/MESSAGE without ever consulting a
//          non-deterministic random generator.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The planner's only source of "randomness" is a 64-bit FNV-1a hash of
//! `event_id`, reduced modulo 10000 and scaled to `[0, 1)`. The same
//! `event_id` and config always produce the same intent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::EventId;
use crate::model::EventEnvelope;
use crate::model::Intent;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// How the planner maps mention/seed signals to an [`Intent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyPolicy {
    /// Always respond with a new message.
    All,
    /// Respond only when mentioned, or with a message by seeded probability.
    MentionFirst,
    /// Respond with a message by seeded probability alone.
    Probabilistic,
    /// Reply only when mentioned; otherwise ignore.
    ReplyOnly,
}

/// Planner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Which reply policy to apply.
    pub reply_policy: ReplyPolicy,
    /// Probability threshold in `[0, 1]` used by probabilistic policies.
    pub reply_probability: f64,
}

// ============================================================================
// SECTION: Seeded Probability
// ============================================================================

/// FNV-1a 64-bit hash, matching the offset basis and prime from the FNV spec.
#[must_use]
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Reduces `event_id`'s FNV-1a hash modulo 10000 and scales to `[0, 1)`.
#[must_use]
pub fn seed(event_id: &EventId) -> f64 {
    let hash = fnv1a_64(event_id.as_str().as_bytes());
    f64::from(u32::try_from(hash % 10_000).unwrap_or(0)) / 10_000.0
}

// ============================================================================
// SECTION: Intent Selection
// ============================================================================

/// Selects the deterministic intent for `event` under `cfg`.
///
/// Rules are evaluated in fixed order; the first match wins:
/// a non-empty `reply_to` always yields [`Intent::Reply`], regardless of
/// policy.
#[must_use]
pub fn select_intent(event: &EventEnvelope, cfg: PlannerConfig) -> Intent {
    if event.reply_to().is_some() {
        return Intent::Reply;
    }

    let mentioned = event.mentions_arbiter();
    let seed = seed(&event.event_id);

    match cfg.reply_policy {
        ReplyPolicy::All => Intent::Message,
        ReplyPolicy::ReplyOnly => {
            if mentioned {
                Intent::Reply
            } else {
                Intent::Ignore
            }
        }
        ReplyPolicy::MentionFirst => {
            if mentioned {
                Intent::Reply
            } else if seed < cfg.reply_probability {
                Intent::Message
            } else {
                Intent::Ignore
            }
        }
        ReplyPolicy::Probabilistic => {
            if seed < cfg.reply_probability {
                Intent::Message
            } else {
                Intent::Ignore
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::identifiers::TenantId;
    use crate::model::Content;
    use crate::model::Timestamp;

    fn event(text: &str, reply_to: Option<&str>, event_id: &str) -> EventEnvelope {
        EventEnvelope {
            tenant_id: TenantId::new("t1"),
            event_id: EventId::new(event_id),
            source: "chat-gateway".to_string(),
            kind: "message".to_string(),
            subject: "room:r1".to_string(),
            summary: text.to_string(),
            payload_ref: "ref".to_string(),
            occurred_at: Timestamp::parse("2026-02-14T00:00:00Z").unwrap(),
            room_id: None,
            content: Some(Content {
                content_type: "text".to_string(),
                text: text.to_string(),
                reply_to: reply_to.map(str::to_string),
            }),
            labels: BTreeMap::new(),
            actor: None,
            context: BTreeMap::new(),
        }
    }

    #[test]
    fn same_event_id_always_yields_same_intent() {
        let cfg = PlannerConfig {
            reply_policy: ReplyPolicy::Probabilistic,
            reply_probability: 0.5,
        };
        let e = event("hello", None, "e-stable-1");
        let first = select_intent(&e, cfg);
        let second = select_intent(&e, cfg);
        assert_eq!(first, second);
    }

    #[test]
    fn reply_to_always_wins() {
        let cfg = PlannerConfig {
            reply_policy: ReplyPolicy::ReplyOnly,
            reply_probability: 0.0,
        };
        let e = event("unrelated text", Some("msg-1"), "e1");
        assert_eq!(select_intent(&e, cfg), Intent::Reply);
    }

    #[test]
    fn reply_only_ignores_when_not_mentioned() {
        let cfg = PlannerConfig {
            reply_policy: ReplyPolicy::ReplyOnly,
            reply_probability: 1.0,
        };
        let e = event("hello there", None, "e1");
        assert_eq!(select_intent(&e, cfg), Intent::Ignore);
    }

    #[test]
    fn reply_only_replies_when_mentioned() {
        let cfg = PlannerConfig {
            reply_policy: ReplyPolicy::ReplyOnly,
            reply_probability: 0.0,
        };
        let e = event("hi @arbiter", None, "e1");
        assert_eq!(select_intent(&e, cfg), Intent::Reply);
    }

    #[test]
    fn all_policy_always_messages() {
        let cfg = PlannerConfig {
            reply_policy: ReplyPolicy::All,
            reply_probability: 0.0,
        };
        let e = event("hello", None, "e1");
        assert_eq!(select_intent(&e, cfg), Intent::Message);
    }

    #[test]
    fn probabilistic_respects_threshold() {
        let always = PlannerConfig {
            reply_policy: ReplyPolicy::Probabilistic,
            reply_probability: 1.0,
        };
        let never = PlannerConfig {
            reply_policy: ReplyPolicy::Probabilistic,
            reply_probability: 0.0,
        };
        let e = event("hello", None, "e1");
        assert_eq!(select_intent(&e, always), Intent::Message);
        assert_eq!(select_intent(&e, never), Intent::Ignore);
    }

    #[test]
    fn fnv1a_matches_known_vector_for_empty_input() {
        assert_eq!(fnv1a_64(b""), 0xcbf2_9ce4_8422_2325);
    }
}
