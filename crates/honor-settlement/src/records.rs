use chrono::{DateTime, Utc};
use honor_pricing::{DegenPayoutResult, RefundCalculation};
use honor_types::{MissionId, UserId};
use serde::{Deserialize, Serialize};

/// Persisted outcome of a degen settlement, written once per mission.
/// Downstream disbursement jobs read this record; the engine never pays
/// wallets itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegenPayoutRecord {
    pub mission_id: MissionId,
    pub result: DegenPayoutResult,
    pub settled_at: DateTime<Utc>,
}

/// Persisted outcome of a committed refund, written once per mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub mission_id: MissionId,
    pub calculation: RefundCalculation,
    pub requested_by: UserId,
    pub committed_at: DateTime<Utc>,
}
