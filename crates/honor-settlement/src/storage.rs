use crate::aggregate::{AggregateCounters, VersionedAggregate};
use crate::records::{DegenPayoutRecord, RefundRecord};
use crate::review::{ReviewRecord, ReviewSkipRecord, ReviewerProfile, ReviewerStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use honor_types::{
    CompletionEvent, CompletionKey, Mission, MissionId, MissionStatus, Result, ReviewKey,
    SettlementError, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Abstract document store for the settlement engine. Each method is one
/// atomic unit: implementations must guarantee that the read-check-write
/// sequences described below cannot interleave with each other.
#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Create a mission document. Missions are created once; an existing
    /// id is `AlreadyExists`.
    async fn put_mission(&self, mission: &Mission) -> Result<()>;
    async fn get_mission(&self, id: &MissionId) -> Result<Option<Mission>>;
    async fn list_missions(&self) -> Result<Vec<Mission>>;

    /// Apply a status transition, validating the state machine inside the
    /// store op. Cancelling stamps `cancelled_at`.
    async fn update_mission_status(
        &self,
        id: &MissionId,
        to: MissionStatus,
        now: DateTime<Utc>,
    ) -> Result<Mission>;

    /// The one transaction behind cap enforcement: reject a duplicate
    /// completion identity (`AlreadyExists`), reject a stale aggregate
    /// version (`Contention`), otherwise append the event and store the
    /// counters at `expected_version + 1`, all atomically.
    async fn append_completion(
        &self,
        event: &CompletionEvent,
        expected_version: u64,
        counters: AggregateCounters,
    ) -> Result<()>;
    async fn scan_completions(&self, mission_id: &MissionId) -> Result<Vec<CompletionEvent>>;

    async fn get_aggregate(&self, mission_id: &MissionId) -> Result<Option<VersionedAggregate>>;
    /// Plain CAS write of the aggregate document. Version 0 creates it.
    async fn put_aggregate(
        &self,
        mission_id: &MissionId,
        expected_version: u64,
        counters: AggregateCounters,
    ) -> Result<()>;
    /// Unconditional last-writer-wins overwrite; only the reconciler's
    /// corrective rewrite uses this.
    async fn force_put_aggregate(
        &self,
        mission_id: &MissionId,
        counters: AggregateCounters,
    ) -> Result<()>;

    /// Write-once review insert plus the reviewer stats increment, with the
    /// existence check in the same transaction. A duplicate key is
    /// `AlreadyExists` and must leave the stats untouched.
    async fn commit_review(&self, record: &ReviewRecord) -> Result<ReviewerStats>;
    async fn get_review(&self, key: &ReviewKey) -> Result<Option<ReviewRecord>>;
    async fn reviewer_stats(&self, reviewer: &UserId) -> Result<ReviewerStats>;

    /// Write-once skip marker; duplicate is `AlreadyExists`.
    async fn insert_skip(&self, record: &ReviewSkipRecord) -> Result<()>;
    /// Whether an unexpired skip exists for the key at `now`.
    async fn is_skipped(&self, key: &ReviewKey, now: DateTime<Utc>) -> Result<bool>;

    async fn put_reviewer_profile(&self, profile: &ReviewerProfile) -> Result<()>;
    async fn get_reviewer_profile(&self, user: &UserId) -> Result<Option<ReviewerProfile>>;

    /// Write-once settlement outcome records, one per mission.
    async fn record_degen_payout(&self, record: &DegenPayoutRecord) -> Result<()>;
    async fn get_degen_payout(&self, mission_id: &MissionId) -> Result<Option<DegenPayoutRecord>>;
    async fn record_refund(&self, record: &RefundRecord) -> Result<()>;
    async fn get_refund(&self, mission_id: &MissionId) -> Result<Option<RefundRecord>>;
}

#[derive(Default)]
struct CompletionLog {
    events: HashMap<MissionId, Vec<CompletionEvent>>,
    seen: HashSet<CompletionKey>,
}

#[derive(Default)]
struct ReviewBook {
    records: HashMap<ReviewKey, ReviewRecord>,
    stats: HashMap<UserId, ReviewerStats>,
}

/// In-memory store. Atomicity comes from holding the relevant write guard
/// for the whole read-check-write; `append_completion` takes the log guard
/// first and the aggregate guard second, and is the only op taking both.
pub struct MemoryStore {
    missions: Arc<RwLock<HashMap<MissionId, Mission>>>,
    log: Arc<RwLock<CompletionLog>>,
    aggregates: Arc<RwLock<HashMap<MissionId, VersionedAggregate>>>,
    reviews: Arc<RwLock<ReviewBook>>,
    skips: Arc<RwLock<HashMap<ReviewKey, ReviewSkipRecord>>>,
    profiles: Arc<RwLock<HashMap<UserId, ReviewerProfile>>>,
    payouts: Arc<RwLock<HashMap<MissionId, DegenPayoutRecord>>>,
    refunds: Arc<RwLock<HashMap<MissionId, RefundRecord>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            missions: Arc::new(RwLock::new(HashMap::new())),
            log: Arc::new(RwLock::new(CompletionLog::default())),
            aggregates: Arc::new(RwLock::new(HashMap::new())),
            reviews: Arc::new(RwLock::new(ReviewBook::default())),
            skips: Arc::new(RwLock::new(HashMap::new())),
            profiles: Arc::new(RwLock::new(HashMap::new())),
            payouts: Arc::new(RwLock::new(HashMap::new())),
            refunds: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl SettlementStore for MemoryStore {
    async fn put_mission(&self, mission: &Mission) -> Result<()> {
        let mut missions = self.missions.write().await;
        if missions.contains_key(&mission.id) {
            return Err(SettlementError::AlreadyExists(format!(
                "mission {}",
                mission.id
            )));
        }
        missions.insert(mission.id.clone(), mission.clone());
        info!(
            mission = %mission.id,
            model = %mission.model,
            storage_type = "memory",
            "💾 Mission stored"
        );
        Ok(())
    }

    async fn get_mission(&self, id: &MissionId) -> Result<Option<Mission>> {
        let missions = self.missions.read().await;
        Ok(missions.get(id).cloned())
    }

    async fn list_missions(&self) -> Result<Vec<Mission>> {
        let missions = self.missions.read().await;
        let mut all: Vec<Mission> = missions.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn update_mission_status(
        &self,
        id: &MissionId,
        to: MissionStatus,
        now: DateTime<Utc>,
    ) -> Result<Mission> {
        let mut missions = self.missions.write().await;
        let mission = missions
            .get_mut(id)
            .ok_or_else(|| SettlementError::NotFound(format!("mission {}", id)))?;
        if !mission.status.can_transition(to) {
            return Err(SettlementError::InvalidTransition {
                from: mission.status,
                to,
            });
        }
        mission.status = to;
        if to == MissionStatus::Cancelled {
            mission.cancelled_at = Some(now);
        }
        Ok(mission.clone())
    }

    async fn append_completion(
        &self,
        event: &CompletionEvent,
        expected_version: u64,
        counters: AggregateCounters,
    ) -> Result<()> {
        let mut log = self.log.write().await;
        let key = event.key();
        if log.seen.contains(&key) {
            return Err(SettlementError::AlreadyExists(format!(
                "completion {}",
                key.to_hex()
            )));
        }

        let mut aggregates = self.aggregates.write().await;
        let current_version = aggregates
            .get(&event.mission_id)
            .map(|v| v.version)
            .unwrap_or(0);
        if current_version != expected_version {
            return Err(SettlementError::Contention(format!(
                "aggregate for {} at version {} (expected {})",
                event.mission_id, current_version, expected_version
            )));
        }

        log.seen.insert(key);
        log.events
            .entry(event.mission_id.clone())
            .or_default()
            .push(event.clone());
        aggregates.insert(
            event.mission_id.clone(),
            VersionedAggregate {
                version: expected_version + 1,
                counters,
            },
        );
        debug!(
            mission = %event.mission_id,
            task = %event.task_id,
            user = %event.user_id,
            version = expected_version + 1,
            "📥 Completion appended"
        );
        Ok(())
    }

    async fn scan_completions(&self, mission_id: &MissionId) -> Result<Vec<CompletionEvent>> {
        let log = self.log.read().await;
        Ok(log.events.get(mission_id).cloned().unwrap_or_default())
    }

    async fn get_aggregate(&self, mission_id: &MissionId) -> Result<Option<VersionedAggregate>> {
        let aggregates = self.aggregates.read().await;
        Ok(aggregates.get(mission_id).cloned())
    }

    async fn put_aggregate(
        &self,
        mission_id: &MissionId,
        expected_version: u64,
        counters: AggregateCounters,
    ) -> Result<()> {
        let mut aggregates = self.aggregates.write().await;
        let current_version = aggregates.get(mission_id).map(|v| v.version).unwrap_or(0);
        if current_version != expected_version {
            return Err(SettlementError::Contention(format!(
                "aggregate for {} at version {} (expected {})",
                mission_id, current_version, expected_version
            )));
        }
        aggregates.insert(
            mission_id.clone(),
            VersionedAggregate {
                version: expected_version + 1,
                counters,
            },
        );
        Ok(())
    }

    async fn force_put_aggregate(
        &self,
        mission_id: &MissionId,
        counters: AggregateCounters,
    ) -> Result<()> {
        let mut aggregates = self.aggregates.write().await;
        let next_version = aggregates.get(mission_id).map(|v| v.version).unwrap_or(0) + 1;
        aggregates.insert(
            mission_id.clone(),
            VersionedAggregate {
                version: next_version,
                counters,
            },
        );
        debug!(
            mission = %mission_id,
            version = next_version,
            "Aggregate overwritten"
        );
        Ok(())
    }

    async fn commit_review(&self, record: &ReviewRecord) -> Result<ReviewerStats> {
        let mut reviews = self.reviews.write().await;
        if reviews.records.contains_key(&record.key) {
            return Err(SettlementError::AlreadyExists(format!(
                "review {}",
                record.key
            )));
        }
        reviews.records.insert(record.key.clone(), record.clone());
        let stats = reviews
            .stats
            .entry(record.key.reviewer_id.clone())
            .or_default();
        stats.reviews_done += 1;
        stats.total_earned = stats.total_earned.saturating_add(record.reward);
        let updated = stats.clone();
        info!(
            reviewer = %record.key.reviewer_id,
            reward = %record.reward,
            reviews_done = updated.reviews_done,
            storage_type = "memory",
            "🧾 Review committed"
        );
        Ok(updated)
    }

    async fn get_review(&self, key: &ReviewKey) -> Result<Option<ReviewRecord>> {
        let reviews = self.reviews.read().await;
        Ok(reviews.records.get(key).cloned())
    }

    async fn reviewer_stats(&self, reviewer: &UserId) -> Result<ReviewerStats> {
        let reviews = self.reviews.read().await;
        Ok(reviews.stats.get(reviewer).cloned().unwrap_or_default())
    }

    async fn insert_skip(&self, record: &ReviewSkipRecord) -> Result<()> {
        let mut skips = self.skips.write().await;
        if skips.contains_key(&record.key) {
            return Err(SettlementError::AlreadyExists(format!(
                "skip {}",
                record.key
            )));
        }
        skips.insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn is_skipped(&self, key: &ReviewKey, now: DateTime<Utc>) -> Result<bool> {
        let skips = self.skips.read().await;
        Ok(skips
            .get(key)
            .map(|record| record.expires_at.map(|at| now < at).unwrap_or(true))
            .unwrap_or(false))
    }

    async fn put_reviewer_profile(&self, profile: &ReviewerProfile) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn get_reviewer_profile(&self, user: &UserId) -> Result<Option<ReviewerProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(user).cloned())
    }

    async fn record_degen_payout(&self, record: &DegenPayoutRecord) -> Result<()> {
        let mut payouts = self.payouts.write().await;
        if payouts.contains_key(&record.mission_id) {
            return Err(SettlementError::AlreadyExists(format!(
                "degen payout for mission {}",
                record.mission_id
            )));
        }
        payouts.insert(record.mission_id.clone(), record.clone());
        Ok(())
    }

    async fn get_degen_payout(&self, mission_id: &MissionId) -> Result<Option<DegenPayoutRecord>> {
        let payouts = self.payouts.read().await;
        Ok(payouts.get(mission_id).cloned())
    }

    async fn record_refund(&self, record: &RefundRecord) -> Result<()> {
        let mut refunds = self.refunds.write().await;
        if refunds.contains_key(&record.mission_id) {
            return Err(SettlementError::AlreadyExists(format!(
                "refund for mission {}",
                record.mission_id
            )));
        }
        refunds.insert(record.mission_id.clone(), record.clone());
        Ok(())
    }

    async fn get_refund(&self, mission_id: &MissionId) -> Result<Option<RefundRecord>> {
        let refunds = self.refunds.read().await;
        Ok(refunds.get(mission_id).cloned())
    }
}

#[cfg(feature = "rocksdb")]
mod rocks {
    use super::*;
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use std::path::Path;
    use tokio::sync::Mutex;

    const CF_MISSIONS: &str = "missions";
    const CF_COMPLETIONS: &str = "completions";
    const CF_COMPLETION_KEYS: &str = "completion_keys";
    const CF_AGGREGATES: &str = "aggregates";
    const CF_REVIEWS: &str = "reviews";
    const CF_REVIEWER_STATS: &str = "reviewer_stats";
    const CF_REVIEW_SKIPS: &str = "review_skips";
    const CF_REVIEWER_PROFILES: &str = "reviewer_profiles";
    const CF_DEGEN_PAYOUTS: &str = "degen_payouts";
    const CF_REFUNDS: &str = "refunds";

    fn store_err(err: impl std::fmt::Display) -> SettlementError {
        SettlementError::Store(err.to_string())
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(store_err)
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(store_err)
    }

    /// Persistent store on RocksDB, one column family per collection.
    /// Mutations are serialized through a single write gate so every
    /// read-check-write sequence is atomic, mirroring the document-store
    /// transaction the trait models.
    pub struct RocksStore {
        db: Arc<rocksdb::DB>,
        write_gate: Mutex<()>,
    }

    impl RocksStore {
        pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
            use rocksdb::{Options, DB};

            let mut opts = Options::default();
            opts.create_if_missing(true);
            opts.create_missing_column_families(true);
            opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

            let cf_names = vec![
                CF_MISSIONS,
                CF_COMPLETIONS,
                CF_COMPLETION_KEYS,
                CF_AGGREGATES,
                CF_REVIEWS,
                CF_REVIEWER_STATS,
                CF_REVIEW_SKIPS,
                CF_REVIEWER_PROFILES,
                CF_DEGEN_PAYOUTS,
                CF_REFUNDS,
            ];

            let db = DB::open_cf(&opts, path, &cf_names).map_err(store_err)?;
            Ok(Self {
                db: Arc::new(db),
                write_gate: Mutex::new(()),
            })
        }

        fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
            self.db
                .cf_handle(name)
                .ok_or_else(|| SettlementError::Store(format!("missing column family {}", name)))
        }

        fn get_doc<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
            let cf = self.cf(cf_name)?;
            match self.db.get_cf(cf, key).map_err(store_err)? {
                Some(bytes) => Ok(Some(decode(&bytes)?)),
                None => Ok(None),
            }
        }

        fn put_doc<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
            let cf = self.cf(cf_name)?;
            self.db.put_cf(cf, key, encode(value)?).map_err(store_err)
        }

        fn stored_aggregate_version(&self, mission_id: &MissionId) -> Result<u64> {
            Ok(self
                .get_doc::<VersionedAggregate>(CF_AGGREGATES, mission_id.as_str().as_bytes())?
                .map(|v| v.version)
                .unwrap_or(0))
        }

        // Hex keeps the mission prefix free of the '/' separator, so prefix
        // scans cannot bleed across missions.
        fn completion_log_key(event: &CompletionEvent) -> Vec<u8> {
            format!(
                "{}/{:020}/{}",
                hex::encode(event.mission_id.as_str()),
                event.occurred_at.timestamp_millis().max(0),
                event.key().to_hex()
            )
            .into_bytes()
        }
    }

    #[async_trait]
    impl SettlementStore for RocksStore {
        async fn put_mission(&self, mission: &Mission) -> Result<()> {
            let _gate = self.write_gate.lock().await;
            let key = mission.id.as_str().as_bytes();
            if self.get_doc::<Mission>(CF_MISSIONS, key)?.is_some() {
                return Err(SettlementError::AlreadyExists(format!(
                    "mission {}",
                    mission.id
                )));
            }
            self.put_doc(CF_MISSIONS, key, mission)?;
            info!(
                mission = %mission.id,
                model = %mission.model,
                storage_type = "rocksdb",
                "💾 Mission stored"
            );
            Ok(())
        }

        async fn get_mission(&self, id: &MissionId) -> Result<Option<Mission>> {
            self.get_doc(CF_MISSIONS, id.as_str().as_bytes())
        }

        async fn list_missions(&self) -> Result<Vec<Mission>> {
            use rocksdb::IteratorMode;

            let cf = self.cf(CF_MISSIONS)?;
            let mut all = Vec::new();
            for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
                let (_, value) = entry.map_err(store_err)?;
                all.push(decode::<Mission>(&value)?);
            }
            all.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(all)
        }

        async fn update_mission_status(
            &self,
            id: &MissionId,
            to: MissionStatus,
            now: DateTime<Utc>,
        ) -> Result<Mission> {
            let _gate = self.write_gate.lock().await;
            let key = id.as_str().as_bytes();
            let mut mission = self
                .get_doc::<Mission>(CF_MISSIONS, key)?
                .ok_or_else(|| SettlementError::NotFound(format!("mission {}", id)))?;
            if !mission.status.can_transition(to) {
                return Err(SettlementError::InvalidTransition {
                    from: mission.status,
                    to,
                });
            }
            mission.status = to;
            if to == MissionStatus::Cancelled {
                mission.cancelled_at = Some(now);
            }
            self.put_doc(CF_MISSIONS, key, &mission)?;
            Ok(mission)
        }

        async fn append_completion(
            &self,
            event: &CompletionEvent,
            expected_version: u64,
            counters: AggregateCounters,
        ) -> Result<()> {
            let _gate = self.write_gate.lock().await;

            let identity = event.key().digest();
            if self
                .db
                .get_cf(self.cf(CF_COMPLETION_KEYS)?, identity)
                .map_err(store_err)?
                .is_some()
            {
                return Err(SettlementError::AlreadyExists(format!(
                    "completion {}",
                    event.key().to_hex()
                )));
            }

            let current_version = self.stored_aggregate_version(&event.mission_id)?;
            if current_version != expected_version {
                return Err(SettlementError::Contention(format!(
                    "aggregate for {} at version {} (expected {})",
                    event.mission_id, current_version, expected_version
                )));
            }

            let mut batch = rocksdb::WriteBatch::default();
            batch.put_cf(self.cf(CF_COMPLETION_KEYS)?, identity, []);
            batch.put_cf(
                self.cf(CF_COMPLETIONS)?,
                Self::completion_log_key(event),
                encode(event)?,
            );
            batch.put_cf(
                self.cf(CF_AGGREGATES)?,
                event.mission_id.as_str().as_bytes(),
                encode(&VersionedAggregate {
                    version: expected_version + 1,
                    counters,
                })?,
            );
            self.db.write(batch).map_err(store_err)?;
            debug!(
                mission = %event.mission_id,
                task = %event.task_id,
                version = expected_version + 1,
                "📥 Completion appended"
            );
            Ok(())
        }

        async fn scan_completions(&self, mission_id: &MissionId) -> Result<Vec<CompletionEvent>> {
            use rocksdb::{Direction, IteratorMode};

            let prefix = format!("{}/", hex::encode(mission_id.as_str())).into_bytes();
            let cf = self.cf(CF_COMPLETIONS)?;
            let mut events = Vec::new();
            for entry in self
                .db
                .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward))
            {
                let (key, value) = entry.map_err(store_err)?;
                if !key.starts_with(&prefix) {
                    break;
                }
                events.push(decode::<CompletionEvent>(&value)?);
            }
            Ok(events)
        }

        async fn get_aggregate(
            &self,
            mission_id: &MissionId,
        ) -> Result<Option<VersionedAggregate>> {
            self.get_doc(CF_AGGREGATES, mission_id.as_str().as_bytes())
        }

        async fn put_aggregate(
            &self,
            mission_id: &MissionId,
            expected_version: u64,
            counters: AggregateCounters,
        ) -> Result<()> {
            let _gate = self.write_gate.lock().await;
            let current_version = self.stored_aggregate_version(mission_id)?;
            if current_version != expected_version {
                return Err(SettlementError::Contention(format!(
                    "aggregate for {} at version {} (expected {})",
                    mission_id, current_version, expected_version
                )));
            }
            self.put_doc(
                CF_AGGREGATES,
                mission_id.as_str().as_bytes(),
                &VersionedAggregate {
                    version: expected_version + 1,
                    counters,
                },
            )
        }

        async fn force_put_aggregate(
            &self,
            mission_id: &MissionId,
            counters: AggregateCounters,
        ) -> Result<()> {
            let _gate = self.write_gate.lock().await;
            let next_version = self.stored_aggregate_version(mission_id)? + 1;
            self.put_doc(
                CF_AGGREGATES,
                mission_id.as_str().as_bytes(),
                &VersionedAggregate {
                    version: next_version,
                    counters,
                },
            )
        }

        async fn commit_review(&self, record: &ReviewRecord) -> Result<ReviewerStats> {
            let _gate = self.write_gate.lock().await;

            let key = record.key.digest();
            if self
                .db
                .get_cf(self.cf(CF_REVIEWS)?, key)
                .map_err(store_err)?
                .is_some()
            {
                return Err(SettlementError::AlreadyExists(format!(
                    "review {}",
                    record.key
                )));
            }

            let stats_key = record.key.reviewer_id.as_str().as_bytes();
            let mut stats = self
                .get_doc::<ReviewerStats>(CF_REVIEWER_STATS, stats_key)?
                .unwrap_or_default();
            stats.reviews_done += 1;
            stats.total_earned = stats.total_earned.saturating_add(record.reward);

            let mut batch = rocksdb::WriteBatch::default();
            batch.put_cf(self.cf(CF_REVIEWS)?, key, encode(record)?);
            batch.put_cf(self.cf(CF_REVIEWER_STATS)?, stats_key, encode(&stats)?);
            self.db.write(batch).map_err(store_err)?;
            info!(
                reviewer = %record.key.reviewer_id,
                reward = %record.reward,
                reviews_done = stats.reviews_done,
                storage_type = "rocksdb",
                "🧾 Review committed"
            );
            Ok(stats)
        }

        async fn get_review(&self, key: &ReviewKey) -> Result<Option<ReviewRecord>> {
            self.get_doc(CF_REVIEWS, &key.digest())
        }

        async fn reviewer_stats(&self, reviewer: &UserId) -> Result<ReviewerStats> {
            Ok(self
                .get_doc::<ReviewerStats>(CF_REVIEWER_STATS, reviewer.as_str().as_bytes())?
                .unwrap_or_default())
        }

        async fn insert_skip(&self, record: &ReviewSkipRecord) -> Result<()> {
            let _gate = self.write_gate.lock().await;
            let key = record.key.digest();
            if self
                .db
                .get_cf(self.cf(CF_REVIEW_SKIPS)?, key)
                .map_err(store_err)?
                .is_some()
            {
                return Err(SettlementError::AlreadyExists(format!(
                    "skip {}",
                    record.key
                )));
            }
            self.put_doc(CF_REVIEW_SKIPS, &key, record)
        }

        async fn is_skipped(&self, key: &ReviewKey, now: DateTime<Utc>) -> Result<bool> {
            Ok(self
                .get_doc::<ReviewSkipRecord>(CF_REVIEW_SKIPS, &key.digest())?
                .map(|record| record.expires_at.map(|at| now < at).unwrap_or(true))
                .unwrap_or(false))
        }

        async fn put_reviewer_profile(&self, profile: &ReviewerProfile) -> Result<()> {
            let _gate = self.write_gate.lock().await;
            self.put_doc(
                CF_REVIEWER_PROFILES,
                profile.user_id.as_str().as_bytes(),
                profile,
            )
        }

        async fn get_reviewer_profile(&self, user: &UserId) -> Result<Option<ReviewerProfile>> {
            self.get_doc(CF_REVIEWER_PROFILES, user.as_str().as_bytes())
        }

        async fn record_degen_payout(&self, record: &DegenPayoutRecord) -> Result<()> {
            let _gate = self.write_gate.lock().await;
            let key = record.mission_id.as_str().as_bytes();
            if self
                .get_doc::<DegenPayoutRecord>(CF_DEGEN_PAYOUTS, key)?
                .is_some()
            {
                return Err(SettlementError::AlreadyExists(format!(
                    "degen payout for mission {}",
                    record.mission_id
                )));
            }
            self.put_doc(CF_DEGEN_PAYOUTS, key, record)
        }

        async fn get_degen_payout(
            &self,
            mission_id: &MissionId,
        ) -> Result<Option<DegenPayoutRecord>> {
            self.get_doc(CF_DEGEN_PAYOUTS, mission_id.as_str().as_bytes())
        }

        async fn record_refund(&self, record: &RefundRecord) -> Result<()> {
            let _gate = self.write_gate.lock().await;
            let key = record.mission_id.as_str().as_bytes();
            if self.get_doc::<RefundRecord>(CF_REFUNDS, key)?.is_some() {
                return Err(SettlementError::AlreadyExists(format!(
                    "refund for mission {}",
                    record.mission_id
                )));
            }
            self.put_doc(CF_REFUNDS, key, record)
        }

        async fn get_refund(&self, mission_id: &MissionId) -> Result<Option<RefundRecord>> {
            self.get_doc(CF_REFUNDS, mission_id.as_str().as_bytes())
        }
    }
}

#[cfg(feature = "rocksdb")]
pub use rocks::RocksStore;
