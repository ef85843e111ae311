use crate::id::{MissionId, TaskId};
use crate::mission::MissionStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Cap reached for task {task} in mission {mission} (cap {cap})")]
    CapReached {
        mission: MissionId,
        task: TaskId,
        cap: u32,
    },

    #[error("Mission {mission} is not accepting completions (status {status})")]
    MissionNotAccepting {
        mission: MissionId,
        status: MissionStatus,
    },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: MissionStatus,
        to: MissionStatus,
    },

    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("Transaction contention: {0}")]
    Contention(String),

    #[error("Storage error: {0}")]
    Store(String),
}

impl SettlementError {
    /// Contention is the only condition a caller should retry; everything
    /// else is terminal for the request that produced it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SettlementError::Contention(_))
    }
}

pub type Result<T> = std::result::Result<T, SettlementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_contention_is_retryable() {
        assert!(SettlementError::Contention("version changed".into()).is_retryable());
        assert!(!SettlementError::Validation("bad rating".into()).is_retryable());
        assert!(!SettlementError::AlreadyExists("review".into()).is_retryable());
        assert!(!SettlementError::CapReached {
            mission: MissionId::new("m1"),
            task: TaskId::new("t1"),
            cap: 200,
        }
        .is_retryable());
    }
}
