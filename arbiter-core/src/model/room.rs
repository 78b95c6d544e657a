// arbiter-core/src/model/room.rs
// ============================================================================
// Module: Room State
// Description: Per-(tenant, room) generation/backpressure state the gate reads.
// Purpose: Track whether a room has a generation in flight and how deep its
//          pending queue is.
// Dependencies: serde
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::model::time::Timestamp;

/// State keyed by `(tenant_id, room_id)`, created lazily on first reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomState {
    /// Whether a generation is currently in flight for this room.
    pub generating: bool,
    /// Number of pending-generation entries outstanding for this room.
    pub pending_queue_size: u32,
    /// Instant of the last send into this room, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_send_at: Option<Timestamp>,
}

impl RoomState {
    /// Returns the default, empty room state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_room_is_idle() {
        let room = RoomState::new();
        assert!(!room.generating);
        assert_eq!(room.pending_queue_size, 0);
        assert_eq!(room.last_send_at, None);
    }
}
