use crate::aggregate::AggregateCounters;
use crate::storage::SettlementStore;
use chrono::{DateTime, Utc};
use honor_types::{MissionId, Result, SettlementError, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// Report drift without touching stored state.
    DryRun,
    /// Overwrite drifted aggregates with the recomputed values.
    Execute,
}

/// One task whose stored counter disagrees with the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDrift {
    pub task_id: TaskId,
    pub stored: u32,
    pub recomputed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub mission_id: MissionId,
    pub task_drift: Vec<TaskDrift>,
    pub stored_total: u32,
    pub recomputed_total: u32,
    pub drifted: bool,
    pub corrected: bool,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub missions_checked: usize,
    pub missions_drifted: usize,
    pub missions_corrected: usize,
    pub reports: Vec<DriftReport>,
}

impl ReconcileSummary {
    pub fn single(report: DriftReport) -> Self {
        Self {
            missions_checked: 1,
            missions_drifted: report.drifted as usize,
            missions_corrected: report.corrected as usize,
            reports: vec![report],
        }
    }
}

/// Recomputes aggregates from the completion log and repairs drift. The log
/// is the source of truth; a stuck or half-applied enforcer transaction can
/// leave counters wrong, and this is the convergence path back.
pub struct AggregateReconciler {
    store: Arc<dyn SettlementStore>,
}

impl AggregateReconciler {
    pub fn new(store: Arc<dyn SettlementStore>) -> Self {
        Self { store }
    }

    /// Check one mission. Always recomputes from the log, never from the
    /// previous aggregate, so repeated runs converge instead of compounding
    /// an earlier mistake.
    pub async fn reconcile_mission(
        &self,
        mission_id: &MissionId,
        mode: ReconcileMode,
    ) -> Result<DriftReport> {
        let mission = self
            .store
            .get_mission(mission_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("mission {}", mission_id)))?;

        let mut recomputed: HashMap<TaskId, u32> = mission
            .tasks
            .iter()
            .map(|task| (task.id.clone(), 0))
            .collect();
        let mut recomputed_total = 0u32;
        for event in self.store.scan_completions(mission_id).await? {
            if event.status.counts_toward_aggregates() {
                *recomputed.entry(event.task_id.clone()).or_insert(0) += 1;
                recomputed_total += 1;
            }
        }

        let stored = self.store.get_aggregate(mission_id).await?;
        let stored_counts = stored
            .as_ref()
            .map(|v| v.counters.task_counts.clone())
            .unwrap_or_default();
        let stored_total = stored
            .as_ref()
            .map(|v| v.counters.total_completions)
            .unwrap_or(0);

        // Drift in either direction: a stored task the log never saw, or a
        // logged task missing from the stored document.
        let task_ids: BTreeSet<TaskId> = stored_counts
            .keys()
            .chain(recomputed.keys())
            .cloned()
            .collect();
        let task_drift: Vec<TaskDrift> = task_ids
            .into_iter()
            .filter_map(|task_id| {
                let stored = stored_counts.get(&task_id).copied().unwrap_or(0);
                let fresh = recomputed.get(&task_id).copied().unwrap_or(0);
                (stored != fresh).then(|| TaskDrift {
                    task_id,
                    stored,
                    recomputed: fresh,
                })
            })
            .collect();

        let drifted = !task_drift.is_empty() || stored_total != recomputed_total;
        let now = Utc::now();
        let mut corrected = false;

        if drifted {
            warn!(
                mission = %mission_id,
                stored_total,
                recomputed_total,
                drifted_tasks = task_drift.len(),
                "⚠️ Aggregate drift detected"
            );
            if mode == ReconcileMode::Execute {
                let counters = AggregateCounters {
                    mission_id: mission_id.clone(),
                    task_counts: recomputed,
                    total_completions: recomputed_total,
                    winners_per_task: mission.winners_per_task,
                    task_count: mission.tasks.len() as u32,
                    updated_at: now,
                    reconciled_at: Some(now),
                };
                self.store.force_put_aggregate(mission_id, counters).await?;
                corrected = true;
                info!(mission = %mission_id, recomputed_total, "🔧 Aggregate corrected");
            }
        }

        Ok(DriftReport {
            mission_id: mission_id.clone(),
            task_drift,
            stored_total,
            recomputed_total,
            drifted,
            corrected,
            checked_at: now,
        })
    }

    /// Check every mission in the store.
    pub async fn reconcile_all(&self, mode: ReconcileMode) -> Result<ReconcileSummary> {
        let missions = self.store.list_missions().await?;
        let mut reports = Vec::with_capacity(missions.len());
        let mut drifted = 0;
        let mut corrected = 0;

        for mission in &missions {
            let report = self.reconcile_mission(&mission.id, mode).await?;
            drifted += report.drifted as usize;
            corrected += report.corrected as usize;
            reports.push(report);
        }

        info!(
            missions_checked = missions.len(),
            missions_drifted = drifted,
            missions_corrected = corrected,
            "🔍 Reconciliation pass finished"
        );
        Ok(ReconcileSummary {
            missions_checked: missions.len(),
            missions_drifted: drifted,
            missions_corrected: corrected,
            reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::VersionedAggregate;
    use crate::storage::MemoryStore;
    use honor_types::{
        CompletionEvent, HonorAmount, Mission, MissionModel, MissionStatus, MissionTask,
        Platform, UsdAmount, UserId,
    };

    fn mission(id: &str) -> Mission {
        Mission {
            id: MissionId::new(id),
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

    async fn seed_log(store: &MemoryStore, mission: &Mission, users: usize) {
        for i in 0..users {
            let event = CompletionEvent::verified(
                mission.id.clone(),
                TaskId::new("t1"),
                UserId::new(format!("u{}", i)),
                Utc::now(),
            );
            let version = store
                .get_aggregate(&mission.id)
                .await
                .unwrap()
                .map(|v| v.version)
                .unwrap_or(0);
            let mut counters = store
                .get_aggregate(&mission.id)
                .await
                .unwrap()
                .map(|v| v.counters)
                .unwrap_or_else(|| AggregateCounters::for_mission(mission, Utc::now()));
            counters.record(&TaskId::new("t1"), Utc::now());
            store
                .append_completion(&event, version, counters)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_clean_mission_reports_no_drift() {
        let store = Arc::new(MemoryStore::new());
        let m = mission("m1");
        store.put_mission(&m).await.unwrap();
        seed_log(&store, &m, 3).await;

        let reconciler = AggregateReconciler::new(store);
        let report = reconciler
            .reconcile_mission(&m.id, ReconcileMode::DryRun)
            .await
            .unwrap();
        assert!(!report.drifted);
        assert!(!report.corrected);
        assert_eq!(report.recomputed_total, 3);
        assert_eq!(report.stored_total, 3);
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_correcting() {
        let store = Arc::new(MemoryStore::new());
        let m = mission("m1");
        store.put_mission(&m).await.unwrap();
        seed_log(&store, &m, 3).await;

        // Sabotage the stored counter.
        let mut wrong = AggregateCounters::for_mission(&m, Utc::now());
        wrong.record(&TaskId::new("t1"), Utc::now());
        store.force_put_aggregate(&m.id, wrong).await.unwrap();

        let reconciler = AggregateReconciler::new(store.clone());
        let report = reconciler
            .reconcile_mission(&m.id, ReconcileMode::DryRun)
            .await
            .unwrap();
        assert!(report.drifted);
        assert!(!report.corrected);
        assert_eq!(report.stored_total, 1);
        assert_eq!(report.recomputed_total, 3);

        // Still wrong after a dry run.
        let stored = store.get_aggregate(&m.id).await.unwrap().unwrap();
        assert_eq!(stored.counters.total_completions, 1);
    }

    #[tokio::test]
    async fn test_execute_converges_to_log() {
        let store = Arc::new(MemoryStore::new());
        let m = mission("m1");
        store.put_mission(&m).await.unwrap();
        seed_log(&store, &m, 5).await;

        let mut wrong = AggregateCounters::for_mission(&m, Utc::now());
        wrong.task_counts.insert(TaskId::new("t1"), 42);
        wrong.task_counts.insert(TaskId::new("ghost"), 7);
        wrong.total_completions = 49;
        store.force_put_aggregate(&m.id, wrong).await.unwrap();

        let reconciler = AggregateReconciler::new(store.clone());
        let report = reconciler
            .reconcile_mission(&m.id, ReconcileMode::Execute)
            .await
            .unwrap();
        assert!(report.drifted);
        assert!(report.corrected);
        // Both directions show up: the inflated real task and the phantom.
        assert_eq!(report.task_drift.len(), 2);

        let stored = store.get_aggregate(&m.id).await.unwrap().unwrap();
        assert_eq!(stored.counters.count_for(&TaskId::new("t1")), 5);
        assert_eq!(stored.counters.count_for(&TaskId::new("ghost")), 0);
        assert_eq!(stored.counters.total_completions, 5);
        assert!(stored.counters.reconciled_at.is_some());

        // A second pass sees a clean state.
        let second = reconciler
            .reconcile_mission(&m.id, ReconcileMode::Execute)
            .await
            .unwrap();
        assert!(!second.drifted);
        assert!(!second.corrected);
    }

    #[tokio::test]
    async fn test_zeroed_aggregate_counts_as_drift() {
        let store = Arc::new(MemoryStore::new());
        let m = mission("m1");
        store.put_mission(&m).await.unwrap();
        seed_log(&store, &m, 2).await;

        // A wiped document reads as zeroes; the log still has the events.
        store
            .force_put_aggregate(&m.id, AggregateCounters::for_mission(&m, Utc::now()))
            .await
            .unwrap();

        let reconciler = AggregateReconciler::new(store.clone());
        let report = reconciler
            .reconcile_mission(&m.id, ReconcileMode::Execute)
            .await
            .unwrap();
        assert!(report.drifted);
        let stored: VersionedAggregate = store.get_aggregate(&m.id).await.unwrap().unwrap();
        assert_eq!(stored.counters.total_completions, 2);
    }

    #[tokio::test]
    async fn test_reconcile_all_rolls_up_counts() {
        let store = Arc::new(MemoryStore::new());
        let clean = mission("m-clean");
        let dirty = mission("m-dirty");
        store.put_mission(&clean).await.unwrap();
        store.put_mission(&dirty).await.unwrap();
        seed_log(&store, &clean, 2).await;
        seed_log(&store, &dirty, 2).await;

        let mut wrong = AggregateCounters::for_mission(&dirty, Utc::now());
        wrong.record(&TaskId::new("t1"), Utc::now());
        store.force_put_aggregate(&dirty.id, wrong).await.unwrap();

        let reconciler = AggregateReconciler::new(store);
        let summary = reconciler.reconcile_all(ReconcileMode::Execute).await.unwrap();
        assert_eq!(summary.missions_checked, 2);
        assert_eq!(summary.missions_drifted, 1);
        assert_eq!(summary.missions_corrected, 1);
        assert_eq!(summary.reports.len(), 2);
    }
}
