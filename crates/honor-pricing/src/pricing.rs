use crate::config::PricingConfig;
use honor_types::{HonorAmount, MissionModel, Platform, Result, SettlementError, UsdAmount};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Quoted cost of a mission. For degen missions `per_user_honors` is zero;
/// the pool is split at settlement, not per participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionQuote {
    pub per_user_honors: HonorAmount,
    pub total_honors: HonorAmount,
    pub total_usd: UsdAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub model: MissionModel,
    pub platform: Platform,
    pub task_types: Vec<String>,
    pub premium: bool,
    pub cap: Option<u32>,
    pub duration_hours: Option<u32>,
    pub reward_per_user: Option<HonorAmount>,
}

// Round-half-up integer division, widened so money math cannot overflow.
fn div_round_half_up(num: u128, den: u128) -> u128 {
    (2 * num + den) / (2 * den)
}

/// Honors -> USD cents at the configured rate, rounded to 2 decimals.
pub fn usd_from_honors(amount: HonorAmount, honors_per_usd: u64) -> UsdAmount {
    let cents = div_round_half_up(amount.to_honors() as u128 * 100, honors_per_usd as u128);
    UsdAmount::from_cents(cents as u64)
}

/// USD cents -> Honors at the configured rate, rounded to the nearest Honor.
pub fn honors_from_usd(cost: UsdAmount, honors_per_usd: u64) -> HonorAmount {
    let honors = div_round_half_up(cost.to_cents() as u128 * honors_per_usd as u128, 100);
    HonorAmount::from_honors(honors as u64)
}

/// Fixed-model quote: per-user reward times the participation cap. An
/// explicit `reward_override` wins over the summed task prices.
pub fn quote_fixed(
    config: &PricingConfig,
    task_types: &[String],
    premium: bool,
    cap: u32,
    reward_override: Option<HonorAmount>,
) -> Result<MissionQuote> {
    if cap == 0 {
        return Err(SettlementError::Validation(
            "fixed mission cap must be positive".to_string(),
        ));
    }

    let per_user = match reward_override {
        // The override is the final per-user reward; premium is already
        // baked into whatever the owner chose.
        Some(reward) => reward,
        None => {
            if task_types.is_empty() {
                return Err(SettlementError::Validation(
                    "fixed mission needs at least one task".to_string(),
                ));
            }
            let mut sum = HonorAmount::ZERO;
            for task_type in task_types {
                let price = config.task_prices.price_of(task_type)?;
                sum = sum.checked_add(price).ok_or_else(|| {
                    SettlementError::Validation("task price sum overflow".to_string())
                })?;
            }
            let multiplier = if premium {
                config.premium_multiplier
            } else {
                1
            };
            sum.checked_mul(multiplier).ok_or_else(|| {
                SettlementError::Validation("premium multiplier overflow".to_string())
            })?
        }
    };

    let total = per_user
        .checked_mul(cap as u64)
        .ok_or_else(|| SettlementError::Validation("mission total overflow".to_string()))?;

    Ok(MissionQuote {
        per_user_honors: per_user,
        total_honors: total,
        total_usd: usd_from_honors(total, config.honors_per_usd),
    })
}

/// Degen-model quote: cost comes from the duration preset table, never from
/// the task list.
pub fn quote_degen(config: &PricingConfig, duration_hours: u32) -> Result<MissionQuote> {
    let preset = config.preset_for_hours(duration_hours).ok_or_else(|| {
        SettlementError::Validation(format!(
            "no degen preset for a {}h duration",
            duration_hours
        ))
    })?;

    Ok(MissionQuote {
        per_user_honors: HonorAmount::ZERO,
        total_honors: honors_from_usd(preset.cost_usd, config.honors_per_usd),
        total_usd: preset.cost_usd,
    })
}

/// Model-dispatched quote for the read-only pricing interface. Pure and
/// deterministic: identical request and config always produce the same
/// quote.
pub fn quote(config: &PricingConfig, request: &QuoteRequest) -> Result<MissionQuote> {
    config.validate()?;

    debug!(
        model = %request.model,
        platform = %request.platform,
        tasks = request.task_types.len(),
        premium = request.premium,
        "Quoting mission"
    );

    match request.model {
        MissionModel::Fixed => {
            let cap = request.cap.ok_or_else(|| {
                SettlementError::Validation("fixed mission requires a cap".to_string())
            })?;
            quote_fixed(
                config,
                &request.task_types,
                request.premium,
                cap,
                request.reward_per_user,
            )
        }
        MissionModel::Degen => {
            let hours = request.duration_hours.ok_or_else(|| {
                SettlementError::Validation("degen mission requires a duration".to_string())
            })?;
            quote_degen(config, hours)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_tasks() -> Vec<String> {
        ["like", "retweet", "comment", "quote", "follow"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_fixed_quote_worked_example() {
        // like(50) + retweet(100) + comment(150) + quote(200) + follow(250)
        // at cap 100 and the default 450 Honors/USD rate.
        let config = PricingConfig::default();
        let quote = quote_fixed(&config, &standard_tasks(), false, 100, None).unwrap();

        assert_eq!(quote.per_user_honors, HonorAmount::from_honors(750));
        assert_eq!(quote.total_honors, HonorAmount::from_honors(75_000));
        assert_eq!(quote.total_usd, UsdAmount::from_cents(16_667));
    }

    #[test]
    fn test_premium_multiplies_per_user() {
        let config = PricingConfig::default();
        let quote = quote_fixed(&config, &standard_tasks(), true, 10, None).unwrap();

        assert_eq!(quote.per_user_honors, HonorAmount::from_honors(3_750));
        assert_eq!(quote.total_honors, HonorAmount::from_honors(37_500));
    }

    #[test]
    fn test_reward_override_wins_over_task_sum() {
        let config = PricingConfig::default();
        let quote = quote_fixed(
            &config,
            &standard_tasks(),
            true,
            10,
            Some(HonorAmount::from_honors(1_000)),
        )
        .unwrap();

        // Override is final: premium is not re-applied on top of it.
        assert_eq!(quote.per_user_honors, HonorAmount::from_honors(1_000));
        assert_eq!(quote.total_honors, HonorAmount::from_honors(10_000));
    }

    #[test]
    fn test_unknown_task_type_rejected() {
        let config = PricingConfig::default();
        let tasks = vec!["like".to_string(), "subscribe".to_string()];
        let err = quote_fixed(&config, &tasks, false, 100, None).unwrap_err();
        assert!(matches!(err, SettlementError::UnknownTaskType(t) if t == "subscribe"));
    }

    #[test]
    fn test_degen_quote_uses_preset_not_tasks() {
        let config = PricingConfig::default();
        let quote = quote_degen(&config, 24).unwrap();

        assert_eq!(quote.total_usd, UsdAmount::from_cents(150_000));
        // $1500 * 450 Honors/USD
        assert_eq!(quote.total_honors, HonorAmount::from_honors(675_000));
        assert_eq!(quote.per_user_honors, HonorAmount::ZERO);

        assert!(quote_degen(&config, 13).is_err());
    }

    #[test]
    fn test_quote_is_deterministic() {
        let config = PricingConfig::default();
        let request = QuoteRequest {
            model: MissionModel::Fixed,
            platform: Platform::Twitter,
            task_types: standard_tasks(),
            premium: true,
            cap: Some(250),
            duration_hours: None,
            reward_per_user: None,
        };

        let first = quote(&config, &request).unwrap();
        let second = quote(&config, &request).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_usd_rounding_half_up() {
        // 1 Honor at 450/USD is 0.2222 cents -> rounds to 0 cents; 3 Honors
        // is 0.6667 cents -> rounds to 1 cent.
        assert_eq!(
            usd_from_honors(HonorAmount::from_honors(1), 450),
            UsdAmount::ZERO
        );
        assert_eq!(
            usd_from_honors(HonorAmount::from_honors(3), 450),
            UsdAmount::from_cents(1)
        );
        assert_eq!(
            usd_from_honors(HonorAmount::from_honors(75_000), 450),
            UsdAmount::from_cents(16_667)
        );
    }

    #[test]
    fn test_missing_cap_or_duration_rejected() {
        let config = PricingConfig::default();
        let mut request = QuoteRequest {
            model: MissionModel::Fixed,
            platform: Platform::Twitter,
            task_types: standard_tasks(),
            premium: false,
            cap: None,
            duration_hours: None,
            reward_per_user: None,
        };
        assert!(quote(&config, &request).is_err());

        request.model = MissionModel::Degen;
        assert!(quote(&config, &request).is_err());
    }
}
