use crate::aggregate::AggregateCounters;
use crate::caps::{CapEnforcer, RetryPolicy};
use crate::reconcile::{AggregateReconciler, ReconcileMode, ReconcileSummary};
use crate::records::{DegenPayoutRecord, RefundRecord};
use crate::review::{ReviewGuard, ReviewReceipt, SkipReview, SubmitReview};
use crate::storage::SettlementStore;
use chrono::{DateTime, Duration, Utc};
use honor_pricing::{
    calculate_refund, check_eligibility, quote, split_prize, MissionQuote, PricingConfig,
    QuoteRequest, RefundEligibility, Winner,
};
use honor_types::{
    CompletionEvent, HonorAmount, Mission, MissionId, MissionModel, MissionStatus, MissionTask,
    Platform, Result, SettlementError, TaskId, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// Runtime knobs the node wires in from its config file.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub retry: RetryPolicy,
    pub skip_ttl: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            skip_ttl: None,
        }
    }
}

/// Everything a mission owner supplies at creation time. Cost fields are
/// computed, never accepted from the caller.
#[derive(Debug, Clone)]
pub struct MissionDraft {
    pub id: MissionId,
    pub owner: UserId,
    pub model: MissionModel,
    pub platform: Platform,
    pub tasks: Vec<MissionTask>,
    pub premium: bool,
    pub cap: Option<u32>,
    pub winners_per_task: Option<u32>,
    pub duration_hours: Option<u32>,
    pub reward_per_user: Option<HonorAmount>,
    pub start_at: Option<DateTime<Utc>>,
}

/// Facade over the settlement subsystems, sharing one store handle.
pub struct SettlementEngine {
    pub store: Arc<dyn SettlementStore>,
    pub caps: Arc<CapEnforcer>,
    pub reviews: Arc<ReviewGuard>,
    pub reconciler: Arc<AggregateReconciler>,
    pricing: PricingConfig,
}

impl SettlementEngine {
    pub fn new(store: Arc<dyn SettlementStore>, pricing: PricingConfig) -> Result<Self> {
        Self::with_settings(store, pricing, EngineSettings::default())
    }

    pub fn with_settings(
        store: Arc<dyn SettlementStore>,
        pricing: PricingConfig,
        settings: EngineSettings,
    ) -> Result<Self> {
        pricing.validate()?;

        let caps = Arc::new(CapEnforcer::new(store.clone()).with_retry_policy(settings.retry));
        let mut reviews = ReviewGuard::new(store.clone(), pricing.review_reward);
        if let Some(ttl) = settings.skip_ttl {
            reviews = reviews.with_skip_ttl(ttl);
        }
        let reconciler = Arc::new(AggregateReconciler::new(store.clone()));

        Ok(Self {
            store,
            caps,
            reviews: Arc::new(reviews),
            reconciler,
            pricing,
        })
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Price and persist a new mission plus its zeroed aggregate document.
    pub async fn create_mission(&self, draft: MissionDraft, now: DateTime<Utc>) -> Result<Mission> {
        if draft.id.is_empty() {
            return Err(SettlementError::Validation("mission id is empty".to_string()));
        }
        if draft.owner.is_empty() {
            return Err(SettlementError::Validation(
                "mission owner is empty".to_string(),
            ));
        }
        if draft.tasks.is_empty() {
            return Err(SettlementError::Validation(
                "mission needs at least one task".to_string(),
            ));
        }
        let mut seen_tasks = HashSet::new();
        for task in &draft.tasks {
            if !seen_tasks.insert(task.id.clone()) {
                return Err(SettlementError::Validation(format!(
                    "duplicate task id {}",
                    task.id
                )));
            }
        }
        if draft.model == MissionModel::Degen && draft.winners_per_task.unwrap_or(0) == 0 {
            return Err(SettlementError::Validation(
                "degen mission needs a positive winners-per-task".to_string(),
            ));
        }

        let request = QuoteRequest {
            model: draft.model,
            platform: draft.platform,
            task_types: draft.tasks.iter().map(|t| t.task_type.clone()).collect(),
            premium: draft.premium,
            cap: draft.cap,
            duration_hours: draft.duration_hours,
            reward_per_user: draft.reward_per_user,
        };
        let quoted = quote(&self.pricing, &request)?;

        let (start_at, end_at) = match draft.model {
            MissionModel::Fixed => (None, None),
            MissionModel::Degen => {
                // quote() already required the duration.
                let hours = draft.duration_hours.unwrap_or(0);
                let start = draft.start_at.unwrap_or(now);
                (Some(start), Some(start + Duration::hours(hours as i64)))
            }
        };

        let mission = Mission {
            id: draft.id,
            owner: draft.owner,
            model: draft.model,
            platform: draft.platform,
            tasks: draft.tasks,
            cap: draft.cap,
            winners_per_task: draft.winners_per_task,
            premium: draft.premium,
            reward_per_user: draft.reward_per_user,
            start_at,
            end_at,
            total_cost_honors: quoted.total_honors,
            total_cost_usd: quoted.total_usd,
            status: MissionStatus::Active,
            created_at: now,
            cancelled_at: None,
        };

        self.store.put_mission(&mission).await?;
        self.store
            .put_aggregate(&mission.id, 0, AggregateCounters::for_mission(&mission, now))
            .await?;

        info!(
            mission = %mission.id,
            model = %mission.model,
            platform = %mission.platform,
            total_cost = %mission.total_cost_honors,
            total_usd = %mission.total_cost_usd,
            "🚀 Mission created"
        );
        Ok(mission)
    }

    pub async fn set_mission_status(
        &self,
        id: &MissionId,
        to: MissionStatus,
        now: DateTime<Utc>,
    ) -> Result<Mission> {
        let mission = self.store.update_mission_status(id, to, now).await?;
        info!(mission = %id, status = %to, "🔁 Mission status changed");
        Ok(mission)
    }

    /// Record one verified completion through the cap enforcer.
    pub async fn record_completion(
        &self,
        mission_id: MissionId,
        task_id: TaskId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Result<AggregateCounters> {
        let event = CompletionEvent::verified(mission_id, task_id, user_id, occurred_at);
        self.caps.record_completion(&event).await
    }

    pub async fn submit_review(
        &self,
        request: SubmitReview,
        now: DateTime<Utc>,
    ) -> Result<ReviewReceipt> {
        self.reviews.submit_review(request, now).await
    }

    pub async fn skip_submission(&self, request: SkipReview, now: DateTime<Utc>) -> Result<()> {
        self.reviews.skip_submission(request, now).await
    }

    /// Read-only pricing quote with the engine's config.
    pub fn quote_pricing(&self, request: &QuoteRequest) -> Result<MissionQuote> {
        quote(&self.pricing, request)
    }

    /// Split a completed degen mission's pool across the selected winners
    /// and persist the payout record. Settling twice is `AlreadyExists`.
    pub async fn settle_degen(
        &self,
        mission_id: &MissionId,
        winners: &[Winner],
        now: DateTime<Utc>,
    ) -> Result<DegenPayoutRecord> {
        let mission = self.require_mission(mission_id).await?;
        if mission.model != MissionModel::Degen {
            return Err(SettlementError::Validation(format!(
                "mission {} is not a degen mission",
                mission_id
            )));
        }
        let end = mission.end_at.ok_or_else(|| {
            SettlementError::Validation(format!("degen mission {} has no time window", mission_id))
        })?;
        if now < end {
            return Err(SettlementError::Validation(format!(
                "mission {} window is still open until {}",
                mission_id, end
            )));
        }
        if mission.status != MissionStatus::Completed {
            return Err(SettlementError::Validation(format!(
                "mission {} must be completed before settlement (status {})",
                mission_id, mission.status
            )));
        }

        let mut per_task: HashMap<&TaskId, u32> = HashMap::new();
        for winner in winners {
            if !mission.has_task(&winner.task_id) {
                return Err(SettlementError::Validation(format!(
                    "winner task {} does not belong to mission {}",
                    winner.task_id, mission_id
                )));
            }
            *per_task.entry(&winner.task_id).or_insert(0) += 1;
        }
        if let Some(limit) = mission.winners_per_task {
            for (task_id, count) in &per_task {
                if *count > limit {
                    return Err(SettlementError::Validation(format!(
                        "{} winners for task {} exceeds the {} per-task slots",
                        count, task_id, limit
                    )));
                }
            }
        }

        let result = split_prize(mission.total_cost_honors, winners)?;
        let record = DegenPayoutRecord {
            mission_id: mission_id.clone(),
            result,
            settled_at: now,
        };
        self.store.record_degen_payout(&record).await?;

        info!(
            mission = %mission_id,
            winners = record.result.total_winners,
            total_payout = %record.result.total_payout,
            "💰 Degen mission settled"
        );
        Ok(record)
    }

    /// Pure read: what a refund commit right now would produce.
    pub async fn refund_eligibility(
        &self,
        mission_id: &MissionId,
        now: DateTime<Utc>,
    ) -> Result<RefundEligibility> {
        let mission = self.require_mission(mission_id).await?;
        let participants = self.current_participants(mission_id).await?;
        check_eligibility(&self.pricing, &mission, participants, now)
    }

    /// Commit the refund for an eligible mission, write-once. A second
    /// commit attempt is `AlreadyExists`.
    pub async fn commit_refund(
        &self,
        mission_id: &MissionId,
        requested_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<RefundRecord> {
        let mission = self.require_mission(mission_id).await?;
        let participants = self.current_participants(mission_id).await?;

        let eligibility = check_eligibility(&self.pricing, &mission, participants, now)?;
        if !eligibility.eligible {
            return Err(SettlementError::Validation(eligibility.reason));
        }

        let calculation = calculate_refund(&self.pricing, &mission, participants, now)?;
        let record = RefundRecord {
            mission_id: mission_id.clone(),
            calculation,
            requested_by,
            committed_at: now,
        };
        self.store.record_refund(&record).await?;

        info!(
            mission = %mission_id,
            refund = %record.calculation.total_refund_honors,
            refund_usd = %record.calculation.total_refund_usd,
            "💸 Refund committed"
        );
        Ok(record)
    }

    /// Reconcile one mission or every mission.
    pub async fn reconcile(
        &self,
        mission_id: Option<&MissionId>,
        mode: ReconcileMode,
    ) -> Result<ReconcileSummary> {
        match mission_id {
            Some(id) => {
                let report = self.reconciler.reconcile_mission(id, mode).await?;
                Ok(ReconcileSummary::single(report))
            }
            None => self.reconciler.reconcile_all(mode).await,
        }
    }

    /// Current counters document, as progress consumers read it.
    pub async fn aggregate(&self, mission_id: &MissionId) -> Result<Option<AggregateCounters>> {
        Ok(self
            .store
            .get_aggregate(mission_id)
            .await?
            .map(|v| v.counters))
    }

    async fn require_mission(&self, mission_id: &MissionId) -> Result<Mission> {
        self.store
            .get_mission(mission_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("mission {}", mission_id)))
    }

    // Participant count for fixed refunds: a slot is taken once a user has
    // completed the fullest task, so the busiest task is the measure.
    async fn current_participants(&self, mission_id: &MissionId) -> Result<u32> {
        Ok(self
            .store
            .get_aggregate(mission_id)
            .await?
            .map(|v| v.counters.max_task_count())
            .unwrap_or(0))
    }
}
