// arbiter-core/src/model/rate.rs
// ============================================================================
// Module: Tenant Rate Key
// Description: Minute-bucketed key for the per-tenant rate counter.
// Purpose: Give gate and store a shared, deterministic bucketing scheme.
// Dependencies: serde
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::TenantId;
use crate::model::time::Timestamp;

/// Identifies one minute bucket of a tenant's event-acceptance counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantRateKey {
    /// Tenant the bucket belongs to.
    pub tenant_id: TenantId,
    /// `floor(occurred_at_seconds / 60)`.
    pub minute_bucket: i64,
}

impl TenantRateKey {
    /// Builds the rate key for `tenant_id` at `event_time`.
    #[must_use]
    pub fn new(tenant_id: TenantId, event_time: Timestamp) -> Self {
        Self {
            tenant_id,
            minute_bucket: event_time.minute_bucket(),
        }
    }

    /// Returns whether this bucket is older than `current_bucket - 5` and
    /// therefore eligible for best-effort eviction.
    #[must_use]
    pub const fn is_evictable(&self, current_bucket: i64) -> bool {
        self.minute_bucket < current_bucket - 5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_buckets_are_evictable() {
        let key = TenantRateKey {
            tenant_id: TenantId::new("t1"),
            minute_bucket: 100,
        };
        assert!(key.is_evictable(106));
        assert!(!key.is_evictable(105));
    }
}
