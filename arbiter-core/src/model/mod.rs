// arbiter-core/src/model/mod.rs
// ============================================================================
// Module: Data Model
// Description: Wire and storage types shared by every pipeline stage.
// Purpose: Gather the event/plan/room/idempotency/pending/rate/lifecycle/audit
//          types in one place so the pipeline depends on a single module path.
// Dependencies: serde
// ============================================================================

pub mod audit;
pub mod event;
pub mod idempotency;
pub mod lifecycle;
pub mod pending;
pub mod plan;
pub mod rate;
pub mod room;
pub mod time;

pub use audit::AuditRecord;
pub use event::Content;
pub use event::EventEnvelope;
pub use idempotency::IdempotencyRecord;
pub use lifecycle::ActionResult;
pub use lifecycle::ActionResultStatus;
pub use lifecycle::ApprovalState;
pub use lifecycle::ApprovalStatus;
pub use lifecycle::JobState;
pub use lifecycle::JobStatus;
pub use pending::PendingGeneration;
pub use plan::Action;
pub use plan::ActionType;
pub use plan::Approval;
pub use plan::Decision;
pub use plan::Intent;
pub use plan::ResponsePlan;
pub use plan::Risk;
pub use rate::TenantRateKey;
pub use room::RoomState;
pub use time::Timestamp;
pub use time::TimestampError;
