use crate::aggregate::{AggregateCounters, VersionedAggregate};
use crate::storage::SettlementStore;
use honor_types::{
    CompletionEvent, MissionModel, MissionStatus, Result, SettlementError,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Bounded retry on aggregate-version contention. Exhaustion surfaces
/// `Contention` to the caller, which may retry with its own backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(10),
        }
    }
}

/// Accepts or rejects verified completions against the mission cap, and
/// commits accepted ones through the store's atomic append.
pub struct CapEnforcer {
    store: Arc<dyn SettlementStore>,
    retry: RetryPolicy,
}

impl CapEnforcer {
    pub fn new(store: Arc<dyn SettlementStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Accept one verified completion. Exactly-once semantics: under
    /// concurrent callers racing for the last cap slot, one commit wins and
    /// every other caller gets `CapReached`. Returns the counters as
    /// committed.
    pub async fn record_completion(&self, event: &CompletionEvent) -> Result<AggregateCounters> {
        if !event.status.counts_toward_aggregates() {
            return Err(SettlementError::Validation(format!(
                "only verified completions are counted, got '{}'",
                event.status
            )));
        }

        let mission = self
            .store
            .get_mission(&event.mission_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("mission {}", event.mission_id)))?;
        if mission.status != MissionStatus::Active {
            return Err(SettlementError::MissionNotAccepting {
                mission: mission.id.clone(),
                status: mission.status,
            });
        }
        if !mission.has_task(&event.task_id) {
            return Err(SettlementError::Validation(format!(
                "task {} does not belong to mission {}",
                event.task_id, event.mission_id
            )));
        }
        if mission.model == MissionModel::Degen && !mission.is_open_at(event.occurred_at) {
            return Err(SettlementError::Validation(format!(
                "mission {} window is closed at {}",
                mission.id, event.occurred_at
            )));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;

            let VersionedAggregate { version, mut counters } = self
                .store
                .get_aggregate(&event.mission_id)
                .await?
                .unwrap_or_else(|| {
                    VersionedAggregate::initial(AggregateCounters::for_mission(
                        &mission,
                        event.occurred_at,
                    ))
                });

            if mission.model == MissionModel::Fixed {
                let cap = mission.cap.ok_or_else(|| {
                    SettlementError::Validation(format!("fixed mission {} has no cap", mission.id))
                })?;
                if counters.count_for(&event.task_id) >= cap {
                    return Err(SettlementError::CapReached {
                        mission: mission.id.clone(),
                        task: event.task_id.clone(),
                        cap,
                    });
                }
            }

            counters.record(&event.task_id, event.occurred_at);
            match self
                .store
                .append_completion(event, version, counters.clone())
                .await
            {
                Ok(()) => {
                    info!(
                        mission = %event.mission_id,
                        task = %event.task_id,
                        user = %event.user_id,
                        count = counters.count_for(&event.task_id),
                        total = counters.total_completions,
                        "🎯 Completion accepted"
                    );
                    return Ok(counters);
                }
                Err(SettlementError::Contention(detail)) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(SettlementError::Contention(detail));
                    }
                    debug!(
                        mission = %event.mission_id,
                        attempt,
                        "Aggregate contention, retrying"
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(other) => return Err(other),
            }
        }
    }
}
