use chrono::{DateTime, Utc};
use honor_types::{Mission, MissionId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-mission completion counters. Derived state: always reproducible from
/// the completion log, never authoritative on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCounters {
    pub mission_id: MissionId,
    pub task_counts: HashMap<TaskId, u32>,
    pub total_completions: u32,
    pub winners_per_task: Option<u32>,
    pub task_count: u32,
    pub updated_at: DateTime<Utc>,
    pub reconciled_at: Option<DateTime<Utc>>,
}

impl AggregateCounters {
    /// Fresh zeroed counters for a mission, one slot per task.
    pub fn for_mission(mission: &Mission, now: DateTime<Utc>) -> Self {
        let task_counts = mission
            .tasks
            .iter()
            .map(|task| (task.id.clone(), 0))
            .collect();
        Self {
            mission_id: mission.id.clone(),
            task_counts,
            total_completions: 0,
            winners_per_task: mission.winners_per_task,
            task_count: mission.tasks.len() as u32,
            updated_at: now,
            reconciled_at: None,
        }
    }

    pub fn count_for(&self, task_id: &TaskId) -> u32 {
        self.task_counts.get(task_id).copied().unwrap_or(0)
    }

    /// Count one more verified completion for `task_id`.
    pub fn record(&mut self, task_id: &TaskId, now: DateTime<Utc>) {
        *self.task_counts.entry(task_id.clone()).or_insert(0) += 1;
        self.total_completions += 1;
        self.updated_at = now;
    }

    /// Highest per-task count, used as the participant figure for fixed
    /// missions (a user completes every task to fill one slot).
    pub fn max_task_count(&self) -> u32 {
        self.task_counts.values().copied().max().unwrap_or(0)
    }
}

/// Aggregate document plus its optimistic-concurrency version. Version 0
/// means the document does not exist yet, so the first write is a CAS
/// against 0 like every later write is against its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedAggregate {
    pub version: u64,
    pub counters: AggregateCounters,
}

impl VersionedAggregate {
    pub fn initial(counters: AggregateCounters) -> Self {
        Self {
            version: 0,
            counters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use honor_types::{
        HonorAmount, MissionModel, MissionStatus, MissionTask, Platform, UsdAmount, UserId,
    };

    fn mission() -> Mission {
        Mission {
            id: MissionId::new("m1"),
            owner: UserId::new("owner"),
            model: MissionModel::Fixed,
            platform: Platform::Twitter,
            tasks: vec![MissionTask::new("t1", "like"), MissionTask::new("t2", "retweet")],
            cap: Some(100),
            winners_per_task: None,
            premium: false,
            reward_per_user: None,
            start_at: None,
            end_at: None,
            total_cost_honors: HonorAmount::from_honors(15_000),
            total_cost_usd: UsdAmount::from_cents(3_334),
            status: MissionStatus::Active,
            created_at: Utc::now(),
            cancelled_at: None,
        }
    }

    #[test]
    fn test_for_mission_zero_fills_tasks() {
        let counters = AggregateCounters::for_mission(&mission(), Utc::now());
        assert_eq!(counters.task_count, 2);
        assert_eq!(counters.total_completions, 0);
        assert_eq!(counters.count_for(&TaskId::new("t1")), 0);
        assert_eq!(counters.count_for(&TaskId::new("t2")), 0);
        assert_eq!(counters.count_for(&TaskId::new("missing")), 0);
    }

    #[test]
    fn test_record_increments_task_and_total() {
        let now = Utc::now();
        let mut counters = AggregateCounters::for_mission(&mission(), now);

        counters.record(&TaskId::new("t1"), now);
        counters.record(&TaskId::new("t1"), now);
        counters.record(&TaskId::new("t2"), now);

        assert_eq!(counters.count_for(&TaskId::new("t1")), 2);
        assert_eq!(counters.count_for(&TaskId::new("t2")), 1);
        assert_eq!(counters.total_completions, 3);
        assert_eq!(counters.max_task_count(), 2);
    }
}
