// arbiter-core/src/model/event.rs
// ============================================================================
// Module: Event Envelope
// Description: Normalized input event accepted by the pipeline.
// Purpose: Define the wire shape validated at the schema stage and consumed
//          by gate/planner.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The envelope is provider-agnostic: `source`/`kind` identify where and what
//! kind of thing happened, `payload_ref` points at the original payload held
//! elsewhere. `room_id` and `content` are the two fields the gate and planner
//! actually read; they are optional at the type level because not every event
//! kind carries them (e.g. a bare lifecycle ping), but the planner and gate
//! require them to be present for any event that can produce a reply.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::EventId;
use crate::identifiers::RoomId;
use crate::identifiers::TenantId;
use crate::model::time::Timestamp;

// ============================================================================
// SECTION: Content
// ============================================================================

/// The normalized message content carried by chat-shaped events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Content {
    /// Content kind, e.g. `"text"`.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Message text the planner inspects for `@arbiter` mentions.
    pub text: String,
    /// Identifier of the message this one replies to, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

// ============================================================================
// SECTION: Event Envelope
// ============================================================================

/// A normalized input event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventEnvelope {
    /// Tenant that owns this event.
    pub tenant_id: TenantId,
    /// Event identifier, unique per tenant for idempotency scope.
    pub event_id: EventId,
    /// Originating system, e.g. `"chat-gateway"`.
    pub source: String,
    /// Event kind, e.g. `"message"`.
    pub kind: String,
    /// Subject of the event (opaque, provider-defined).
    pub subject: String,
    /// Short human-readable summary.
    pub summary: String,
    /// Reference to the full payload stored elsewhere.
    pub payload_ref: String,
    /// RFC3339 time the event occurred; the only clock decisions may use.
    pub occurred_at: Timestamp,
    /// Room the event applies to, when the event is room-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    /// Normalized message content, when the event carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    /// Free-form string labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Opaque actor reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<serde_json::Value>,
    /// Free-form string context.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl EventEnvelope {
    /// Returns whether the content text mentions `@arbiter`, case-insensitively.
    #[must_use]
    pub fn mentions_arbiter(&self) -> bool {
        self.content
            .as_ref()
            .is_some_and(|content| content.text.to_lowercase().contains("@arbiter"))
    }

    /// Returns the reply-to identifier when present and non-empty.
    #[must_use]
    pub fn reply_to(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(|content| content.reply_to.as_deref())
            .filter(|reply_to| !reply_to.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EventEnvelope {
        EventEnvelope {
            tenant_id: TenantId::new("t1"),
            event_id: EventId::new("e1"),
            source: "chat-gateway".to_string(),
            kind: "message".to_string(),
            subject: "room:r1".to_string(),
            summary: "hi".to_string(),
            payload_ref: "ref://e1".to_string(),
            occurred_at: Timestamp::parse("2026-02-14T00:00:00Z").unwrap(),
            room_id: Some(RoomId::new("r1")),
            content: Some(Content {
                content_type: "text".to_string(),
                text: "hi @arbiter".to_string(),
                reply_to: None,
            }),
            labels: BTreeMap::new(),
            actor: None,
            context: BTreeMap::new(),
        }
    }

    #[test]
    fn detects_mention_case_insensitively() {
        let mut event = sample();
        event.content.as_mut().unwrap().text = "hi @ARBITER".to_string();
        assert!(event.mentions_arbiter());
    }

    #[test]
    fn empty_reply_to_counts_as_absent() {
        let mut event = sample();
        event.content.as_mut().unwrap().reply_to = Some(String::new());
        assert_eq!(event.reply_to(), None);
    }

    #[test]
    fn rejects_unknown_fields() {
        let raw = r#"{
            "tenant_id":"t1","event_id":"e1","source":"s","kind":"k",
            "subject":"sub","summary":"sum","payload_ref":"r",
            "occurred_at":"2026-02-14T00:00:00Z","bogus":true
        }"#;
        assert!(serde_json::from_str::<EventEnvelope>(raw).is_err());
    }
}
