//! Settlement engine: mission lifecycle, cap-enforced completion intake,
//! idempotent peer reviews, aggregate reconciliation, and degen/refund
//! settlement over a pluggable store.

pub mod aggregate;
pub mod caps;
pub mod engine;
pub mod proof;
pub mod reconcile;
pub mod records;
pub mod review;
pub mod storage;

pub use aggregate::{AggregateCounters, VersionedAggregate};
pub use caps::{CapEnforcer, RetryPolicy};
pub use engine::{EngineSettings, MissionDraft, SettlementEngine};
pub use proof::validate_proof_link;
pub use reconcile::{AggregateReconciler, DriftReport, ReconcileMode, ReconcileSummary, TaskDrift};
pub use records::{DegenPayoutRecord, RefundRecord};
pub use review::{
    ReviewGuard, ReviewReceipt, ReviewRecord, ReviewSkipRecord, ReviewerProfile, ReviewerStats,
    SkipReview, SubmitReview,
};
pub use storage::{MemoryStore, SettlementStore};

#[cfg(feature = "rocksdb")]
pub use storage::RocksStore;
