use crate::id::{MissionId, TaskId, UserId};
use crate::keys::CompletionKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Pending,
    Verified,
    Rejected,
    Flagged,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Pending => "pending",
            CompletionStatus::Verified => "verified",
            CompletionStatus::Rejected => "rejected",
            CompletionStatus::Flagged => "flagged",
        }
    }

    /// Only verified events may increment aggregate counters.
    pub fn counts_toward_aggregates(&self) -> bool {
        matches!(self, CompletionStatus::Verified)
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the append-only completion log. Events are never mutated;
/// identity is the (mission, task, user) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub mission_id: MissionId,
    pub task_id: TaskId,
    pub user_id: UserId,
    pub status: CompletionStatus,
    pub occurred_at: DateTime<Utc>,
}

impl CompletionEvent {
    pub fn verified(
        mission_id: MissionId,
        task_id: TaskId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            mission_id,
            task_id,
            user_id,
            status: CompletionStatus::Verified,
            occurred_at,
        }
    }

    pub fn key(&self) -> CompletionKey {
        CompletionKey::new(
            self.mission_id.clone(),
            self.task_id.clone(),
            self.user_id.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_verified_counts() {
        assert!(CompletionStatus::Verified.counts_toward_aggregates());
        assert!(!CompletionStatus::Pending.counts_toward_aggregates());
        assert!(!CompletionStatus::Rejected.counts_toward_aggregates());
        assert!(!CompletionStatus::Flagged.counts_toward_aggregates());
    }

    #[test]
    fn test_event_key_is_status_independent() {
        let at = Utc::now();
        let verified = CompletionEvent::verified(
            MissionId::new("m1"),
            TaskId::new("t1"),
            UserId::new("u1"),
            at,
        );
        let mut flagged = verified.clone();
        flagged.status = CompletionStatus::Flagged;

        assert_eq!(verified.key(), flagged.key());
    }
}
