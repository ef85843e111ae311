use crate::proof::validate_proof_link;
use crate::storage::SettlementStore;
use chrono::{DateTime, Duration, Utc};
use honor_types::{
    HonorAmount, MissionId, ParticipationId, Platform, Result, ReviewKey, SettlementError, TaskId,
    UserId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Write-once review document. The key is its identity; a second write
/// under the same key is rejected, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub key: ReviewKey,
    pub mission_id: MissionId,
    pub rating: u8,
    pub proof_link: String,
    pub reward: HonorAmount,
    pub created_at: DateTime<Utc>,
}

/// Write-once skip marker under the same key scheme as reviews. No reward
/// side effect; queue reads filter on it until it expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSkipRecord {
    pub key: ReviewKey,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Running totals per reviewer, incremented only by a committed review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewerStats {
    pub reviews_done: u64,
    pub total_earned: HonorAmount,
}

/// On-file social handles per platform, the reference for proof-link
/// validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerProfile {
    pub user_id: UserId,
    pub handles: HashMap<Platform, String>,
}

impl ReviewerProfile {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            handles: HashMap::new(),
        }
    }

    pub fn with_handle(mut self, platform: Platform, handle: impl Into<String>) -> Self {
        self.handles.insert(platform, handle.into());
        self
    }

    pub fn handle_for(&self, platform: Platform) -> Option<&str> {
        self.handles.get(&platform).map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReview {
    pub mission_id: MissionId,
    pub participation_id: ParticipationId,
    pub submitter_id: UserId,
    pub task_id: TaskId,
    pub reviewer_id: UserId,
    pub rating: u8,
    pub proof_link: String,
}

impl SubmitReview {
    pub fn key(&self) -> ReviewKey {
        ReviewKey::new(
            self.participation_id.clone(),
            self.task_id.clone(),
            self.submitter_id.clone(),
            self.reviewer_id.clone(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipReview {
    pub participation_id: ParticipationId,
    pub task_id: TaskId,
    pub submitter_id: UserId,
    pub reviewer_id: UserId,
}

impl SkipReview {
    pub fn key(&self) -> ReviewKey {
        ReviewKey::new(
            self.participation_id.clone(),
            self.task_id.clone(),
            self.submitter_id.clone(),
            self.reviewer_id.clone(),
        )
    }
}

/// Returned on a successful review commit; the reward has been credited to
/// the reviewer's stats exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewReceipt {
    pub key: ReviewKey,
    pub reward: HonorAmount,
}

/// Mediates all review and skip writes: validates, derives the idempotency
/// key, and commits at most once per key.
pub struct ReviewGuard {
    store: Arc<dyn SettlementStore>,
    reward: HonorAmount,
    skip_ttl: Option<Duration>,
}

impl ReviewGuard {
    pub fn new(store: Arc<dyn SettlementStore>, reward: HonorAmount) -> Self {
        Self {
            store,
            reward,
            skip_ttl: None,
        }
    }

    pub fn with_skip_ttl(mut self, ttl: Duration) -> Self {
        self.skip_ttl = Some(ttl);
        self
    }

    /// Validate and commit one review. Ordering is part of the contract:
    /// self-review, then rating range, then mission/task lookup, then the
    /// on-file handle against the proof link, then the write-once commit.
    /// `AlreadyExists` means a review under this key was credited before;
    /// the caller knows no second credit was issued.
    pub async fn submit_review(
        &self,
        request: SubmitReview,
        now: DateTime<Utc>,
    ) -> Result<ReviewReceipt> {
        if request.reviewer_id == request.submitter_id {
            return Err(SettlementError::Validation(
                "reviewers cannot review their own submission".to_string(),
            ));
        }
        if !(1..=5).contains(&request.rating) {
            return Err(SettlementError::Validation(format!(
                "rating {} out of range (1-5)",
                request.rating
            )));
        }

        let mission = self
            .store
            .get_mission(&request.mission_id)
            .await?
            .ok_or_else(|| {
                SettlementError::NotFound(format!("mission {}", request.mission_id))
            })?;
        if !mission.has_task(&request.task_id) {
            return Err(SettlementError::Validation(format!(
                "task {} does not belong to mission {}",
                request.task_id, request.mission_id
            )));
        }

        let profile = self
            .store
            .get_reviewer_profile(&request.reviewer_id)
            .await?
            .ok_or_else(|| {
                SettlementError::Validation(format!(
                    "reviewer {} has no profile on file",
                    request.reviewer_id
                ))
            })?;
        let handle = profile.handle_for(mission.platform).ok_or_else(|| {
            SettlementError::Validation(format!(
                "reviewer {} has no {} handle on file",
                request.reviewer_id, mission.platform
            ))
        })?;
        validate_proof_link(mission.platform, &request.proof_link, handle)?;

        let record = ReviewRecord {
            key: request.key(),
            mission_id: request.mission_id.clone(),
            rating: request.rating,
            proof_link: request.proof_link.clone(),
            reward: self.reward,
            created_at: now,
        };
        let stats = self.store.commit_review(&record).await?;

        info!(
            key = %record.key,
            mission = %record.mission_id,
            reviewer = %request.reviewer_id,
            reward = %record.reward,
            reviews_done = stats.reviews_done,
            "✅ Review accepted"
        );
        Ok(ReviewReceipt {
            key: record.key,
            reward: record.reward,
        })
    }

    /// Record a reviewer passing on an item. Write-once under the review
    /// key scheme; expires after the configured TTL so skipped items
    /// eventually resurface.
    pub async fn skip_submission(&self, request: SkipReview, now: DateTime<Utc>) -> Result<()> {
        if request.reviewer_id == request.submitter_id {
            return Err(SettlementError::Validation(
                "reviewers cannot skip their own submission".to_string(),
            ));
        }
        let record = ReviewSkipRecord {
            key: request.key(),
            created_at: now,
            expires_at: self.skip_ttl.map(|ttl| now + ttl),
        };
        self.store.insert_skip(&record).await?;
        info!(key = %record.key, reviewer = %request.reviewer_id, "⏭️ Review skipped");
        Ok(())
    }

    /// Queue-read filter: whether an unexpired skip exists for this key.
    pub async fn is_skipped(&self, key: &ReviewKey, now: DateTime<Utc>) -> Result<bool> {
        self.store.is_skipped(key, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use honor_types::{Mission, MissionModel, MissionStatus, MissionTask, UsdAmount};

    fn mission() -> Mission {
        Mission {
            id: MissionId::new("m1"),
            owner: UserId::new("owner"),
            model: MissionModel::Fixed,
            platform: Platform::Twitter,
            tasks: vec![MissionTask::new("t1", "like")],
            cap: Some(100),
            winners_per_task: None,
            premium: false,
            reward_per_user: None,
            start_at: None,
            end_at: None,
            total_cost_honors: HonorAmount::from_honors(5_000),
            total_cost_usd: UsdAmount::from_cents(1_112),
            status: MissionStatus::Active,
            created_at: Utc::now(),
            cancelled_at: None,
        }
    }

    fn request(reviewer: &str) -> SubmitReview {
        SubmitReview {
            mission_id: MissionId::new("m1"),
            participation_id: ParticipationId::new("p1"),
            submitter_id: UserId::new("submitter"),
            task_id: TaskId::new("t1"),
            reviewer_id: UserId::new(reviewer),
            rating: 4,
            proof_link: format!("https://x.com/{}/status/123456", reviewer),
        }
    }

    async fn guard_with_profile(reviewer: &str) -> ReviewGuard {
        let store = Arc::new(MemoryStore::new());
        store.put_mission(&mission()).await.unwrap();
        store
            .put_reviewer_profile(
                &ReviewerProfile::new(UserId::new(reviewer))
                    .with_handle(Platform::Twitter, reviewer),
            )
            .await
            .unwrap();
        ReviewGuard::new(store, HonorAmount::from_honors(150))
    }

    #[tokio::test]
    async fn test_submit_review_happy_path() {
        let guard = guard_with_profile("rev1").await;
        let receipt = guard.submit_review(request("rev1"), Utc::now()).await.unwrap();
        assert_eq!(receipt.reward, HonorAmount::from_honors(150));

        let stats = guard
            .store
            .reviewer_stats(&UserId::new("rev1"))
            .await
            .unwrap();
        assert_eq!(stats.reviews_done, 1);
        assert_eq!(stats.total_earned, HonorAmount::from_honors(150));
    }

    #[tokio::test]
    async fn test_duplicate_review_is_terminal() {
        let guard = guard_with_profile("rev1").await;
        guard.submit_review(request("rev1"), Utc::now()).await.unwrap();

        let err = guard
            .submit_review(request("rev1"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::AlreadyExists(_)));
        assert!(!err.is_retryable());

        let stats = guard
            .store
            .reviewer_stats(&UserId::new("rev1"))
            .await
            .unwrap();
        assert_eq!(stats.reviews_done, 1);
    }

    #[tokio::test]
    async fn test_validation_order() {
        let guard = guard_with_profile("rev1").await;

        let mut self_review = request("rev1");
        self_review.reviewer_id = UserId::new("submitter");
        assert!(matches!(
            guard.submit_review(self_review, Utc::now()).await,
            Err(SettlementError::Validation(_))
        ));

        let mut bad_rating = request("rev1");
        bad_rating.rating = 6;
        assert!(matches!(
            guard.submit_review(bad_rating, Utc::now()).await,
            Err(SettlementError::Validation(_))
        ));

        let mut bad_task = request("rev1");
        bad_task.task_id = TaskId::new("nope");
        assert!(matches!(
            guard.submit_review(bad_task, Utc::now()).await,
            Err(SettlementError::Validation(_))
        ));

        let mut wrong_handle = request("rev1");
        wrong_handle.proof_link = "https://x.com/someoneelse/status/1".to_string();
        assert!(matches!(
            guard.submit_review(wrong_handle, Utc::now()).await,
            Err(SettlementError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_profile_rejected() {
        let store = Arc::new(MemoryStore::new());
        store.put_mission(&mission()).await.unwrap();
        let guard = ReviewGuard::new(store, HonorAmount::from_honors(150));

        assert!(matches!(
            guard.submit_review(request("ghost"), Utc::now()).await,
            Err(SettlementError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_skip_has_no_reward_side_effect() {
        let guard = guard_with_profile("rev1").await.with_skip_ttl(Duration::days(7));
        let now = Utc::now();
        let skip = SkipReview {
            participation_id: ParticipationId::new("p1"),
            task_id: TaskId::new("t1"),
            submitter_id: UserId::new("submitter"),
            reviewer_id: UserId::new("rev1"),
        };

        guard.skip_submission(skip.clone(), now).await.unwrap();
        assert!(guard.is_skipped(&skip.key(), now).await.unwrap());
        assert!(!guard
            .is_skipped(&skip.key(), now + Duration::days(8))
            .await
            .unwrap());

        let stats = guard
            .store
            .reviewer_stats(&UserId::new("rev1"))
            .await
            .unwrap();
        assert_eq!(stats.reviews_done, 0);
        assert_eq!(stats.total_earned, HonorAmount::ZERO);

        // Skipping does not consume the review key: the reviewer can still
        // review the item while the skip stands.
        guard.submit_review(request("rev1"), now).await.unwrap();
    }
}
