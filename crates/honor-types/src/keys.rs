use crate::id::{MissionId, ParticipationId, TaskId, UserId};
use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

// Composite keys hash their parts with a length prefix per part, so id
// values containing any delimiter character cannot collide.
fn digest_parts(parts: &[&str]) -> [u8; 32] {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// Deterministic idempotency key for a review or a review skip. The digest
/// is the storage key; the raw parts stay available for queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewKey {
    pub participation_id: ParticipationId,
    pub task_id: TaskId,
    pub submitter_id: UserId,
    pub reviewer_id: UserId,
}

impl ReviewKey {
    pub fn new(
        participation_id: ParticipationId,
        task_id: TaskId,
        submitter_id: UserId,
        reviewer_id: UserId,
    ) -> Self {
        Self {
            participation_id,
            task_id,
            submitter_id,
            reviewer_id,
        }
    }

    pub fn digest(&self) -> [u8; 32] {
        digest_parts(&[
            self.participation_id.as_str(),
            self.task_id.as_str(),
            self.submitter_id.as_str(),
            self.reviewer_id.as_str(),
        ])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.digest())
    }
}

impl fmt::Display for ReviewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "review:{}", &self.to_hex()[..12])
    }
}

/// Identity of a completion log entry: one completion per user per task per
/// mission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionKey {
    pub mission_id: MissionId,
    pub task_id: TaskId,
    pub user_id: UserId,
}

impl CompletionKey {
    pub fn new(mission_id: MissionId, task_id: TaskId, user_id: UserId) -> Self {
        Self {
            mission_id,
            task_id,
            user_id,
        }
    }

    pub fn digest(&self) -> [u8; 32] {
        digest_parts(&[
            self.mission_id.as_str(),
            self.task_id.as_str(),
            self.user_id.as_str(),
        ])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.digest())
    }
}

impl fmt::Display for CompletionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "completion:{}", &self.to_hex()[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(parts: [&str; 4]) -> ReviewKey {
        ReviewKey::new(
            ParticipationId::new(parts[0]),
            TaskId::new(parts[1]),
            UserId::new(parts[2]),
            UserId::new(parts[3]),
        )
    }

    #[test]
    fn test_review_key_deterministic() {
        let a = key(["p1", "t1", "alice", "bob"]);
        let b = key(["p1", "t1", "alice", "bob"]);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.to_hex(), b.to_hex());
    }

    #[test]
    fn test_review_key_part_order_matters() {
        let a = key(["p1", "t1", "alice", "bob"]);
        let b = key(["p1", "t1", "bob", "alice"]);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_delimiter_in_ids_cannot_collide() {
        // Naive "a:b:c:d" concatenation would make these two identical.
        let a = key(["p1:t1", "x", "alice", "bob"]);
        let b = key(["p1", "t1:x", "alice", "bob"]);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_completion_key_distinct_per_user() {
        let a = CompletionKey::new(MissionId::new("m1"), TaskId::new("t1"), UserId::new("u1"));
        let b = CompletionKey::new(MissionId::new("m1"), TaskId::new("t1"), UserId::new("u2"));
        assert_ne!(a.digest(), b.digest());
    }
}
