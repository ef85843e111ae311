use honor_types::{HonorAmount, Result, SettlementError, UsdAmount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Case-insensitive task-type price table. Keys are normalized to lowercase
/// on construction so lookups never depend on caller casing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, u64>", into = "HashMap<String, u64>")]
pub struct TaskPriceTable {
    prices: HashMap<String, u64>,
}

impl TaskPriceTable {
    pub fn new(entries: impl IntoIterator<Item = (String, u64)>) -> Self {
        Self {
            prices: entries
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
        }
    }

    /// Price lookup that fails closed: an unknown task type is a
    /// configuration anomaly, never a valid zero-cost task.
    pub fn price_of(&self, task_type: &str) -> Result<HonorAmount> {
        match self.prices.get(&task_type.to_ascii_lowercase()) {
            Some(&honors) => Ok(HonorAmount::from_honors(honors)),
            None => Err(SettlementError::UnknownTaskType(task_type.to_string())),
        }
    }

    /// Documented zero-default path for consumers that tolerate a price-table
    /// miss. The miss is flagged for operators, not silently accepted.
    pub fn price_or_zero(&self, task_type: &str) -> HonorAmount {
        match self.prices.get(&task_type.to_ascii_lowercase()) {
            Some(&honors) => HonorAmount::from_honors(honors),
            None => {
                warn!(task_type = %task_type, "⚠️ Unknown task type priced at zero");
                HonorAmount::ZERO
            }
        }
    }

    pub fn knows(&self, task_type: &str) -> bool {
        self.prices.contains_key(&task_type.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for TaskPriceTable {
    fn default() -> Self {
        Self::new([
            ("like".to_string(), 50),
            ("retweet".to_string(), 100),
            ("comment".to_string(), 150),
            ("quote".to_string(), 200),
            ("follow".to_string(), 250),
        ])
    }
}

impl From<HashMap<String, u64>> for TaskPriceTable {
    fn from(map: HashMap<String, u64>) -> Self {
        Self::new(map)
    }
}

impl From<TaskPriceTable> for HashMap<String, u64> {
    fn from(table: TaskPriceTable) -> Self {
        table.prices
    }
}

/// One row of the degen duration -> cost table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegenPreset {
    pub hours: u32,
    pub cost_usd: UsdAmount,
}

/// Every tunable the calculators consume. Threaded explicitly through each
/// call; there is no package-level pricing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Exchange rate: Honors per 1 USD.
    pub honors_per_usd: u64,
    pub premium_multiplier: u64,
    pub task_prices: TaskPriceTable,
    pub degen_presets: Vec<DegenPreset>,
    pub review_reward: HonorAmount,
    /// Reviews required before a verdict is final.
    pub review_quorum: u32,
    /// Platform-fee refund rate in basis points (1000 = 10%).
    pub fee_refund_rate_bps: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            honors_per_usd: 450,
            premium_multiplier: 5,
            task_prices: TaskPriceTable::default(),
            degen_presets: vec![
                DegenPreset {
                    hours: 1,
                    cost_usd: UsdAmount::from_cents(10_000),
                },
                DegenPreset {
                    hours: 3,
                    cost_usd: UsdAmount::from_cents(25_000),
                },
                DegenPreset {
                    hours: 6,
                    cost_usd: UsdAmount::from_cents(45_000),
                },
                DegenPreset {
                    hours: 12,
                    cost_usd: UsdAmount::from_cents(80_000),
                },
                DegenPreset {
                    hours: 24,
                    cost_usd: UsdAmount::from_cents(150_000),
                },
            ],
            review_reward: HonorAmount::from_honors(150),
            review_quorum: 5,
            fee_refund_rate_bps: 1_000,
        }
    }
}

impl PricingConfig {
    pub fn preset_for_hours(&self, hours: u32) -> Option<&DegenPreset> {
        self.degen_presets.iter().find(|p| p.hours == hours)
    }

    pub fn validate(&self) -> Result<()> {
        if self.honors_per_usd == 0 {
            return Err(SettlementError::Validation(
                "honors_per_usd must be positive".to_string(),
            ));
        }
        if self.premium_multiplier == 0 {
            return Err(SettlementError::Validation(
                "premium_multiplier must be positive".to_string(),
            ));
        }
        if self.review_quorum == 0 {
            return Err(SettlementError::Validation(
                "review_quorum must be positive".to_string(),
            ));
        }
        if self.fee_refund_rate_bps > 10_000 {
            return Err(SettlementError::Validation(
                "fee_refund_rate_bps cannot exceed 10000".to_string(),
            ));
        }
        Ok(())
    }
}
