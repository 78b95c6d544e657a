// arbiter-core/src/identifiers.rs
// ============================================================================
// Module: Arbiter Identifiers
// Description: Canonical opaque identifiers for events, plans, and entities.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque newtypes over `String` that serialize transparently.
//! Validation (non-empty, length limits) happens at the envelope boundary, not
//! in these wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Declares a transparent string-backed identifier newtype.
macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(TenantId, "Tenant identifier scoping all keyed state.");
string_id!(EventId, "Event identifier, unique per tenant for idempotency.");
string_id!(RoomId, "Room identifier that gate and pending-generation state key on.");
string_id!(PlanId, "Response plan identifier, derived deterministically.");
string_id!(ActionId, "Action identifier, derived deterministically from its plan.");
string_id!(JobId, "Job identifier for job lifecycle state.");
string_id!(ApprovalId, "Approval identifier for approval lifecycle state.");
string_id!(CorrelationId, "Correlation identifier threaded through audit records.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        let id = TenantId::new("t1");
        assert_eq!(id.as_str(), "t1");
        assert_eq!(id.to_string(), "t1");
    }

    #[test]
    fn serializes_transparently() {
        let id = EventId::new("e1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"e1\"");
    }
}
