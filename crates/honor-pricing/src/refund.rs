use crate::config::PricingConfig;
use crate::pricing::usd_from_honors;
use chrono::{DateTime, Utc};
use honor_types::{
    HonorAmount, Mission, MissionId, MissionModel, MissionStatus, Result, SettlementError,
    UsdAmount,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The two components of a refund: the unused-value base and the
/// proportional platform-fee give-back on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundBreakdown {
    pub base: HonorAmount,
    pub platform_fee: HonorAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundCalculation {
    pub mission_id: MissionId,
    pub model: MissionModel,
    pub total_refund_honors: HonorAmount,
    pub total_refund_usd: UsdAmount,
    pub reason: String,
    pub breakdown: RefundBreakdown,
}

/// Pure eligibility report. `estimated_refund` is what a commit at the same
/// instant would produce; nothing is persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundEligibility {
    pub eligible: bool,
    pub reason: String,
    pub estimated_refund: HonorAmount,
}

fn mul_fraction(total: HonorAmount, num: u64, den: u64) -> HonorAmount {
    // Floor division, widened so total × num cannot overflow.
    let value = total.to_honors() as u128 * num as u128 / den as u128;
    HonorAmount::from_honors(value as u64)
}

fn fee_on(config: &PricingConfig, base: HonorAmount) -> HonorAmount {
    let fee = base.to_honors() as u128 * config.fee_refund_rate_bps as u128 / 10_000;
    HonorAmount::from_honors(fee as u64)
}

fn build(
    config: &PricingConfig,
    mission: &Mission,
    base: HonorAmount,
    reason: String,
) -> RefundCalculation {
    let platform_fee = fee_on(config, base);
    let total = base.saturating_add(platform_fee);
    RefundCalculation {
        mission_id: mission.id.clone(),
        model: mission.model,
        total_refund_honors: total,
        total_refund_usd: usd_from_honors(total, config.honors_per_usd),
        reason,
        breakdown: RefundBreakdown { base, platform_fee },
    }
}

/// Fixed-model refund: unused participant slots, pro-rated against the cap.
pub fn refund_fixed(
    config: &PricingConfig,
    mission: &Mission,
    current_participants: u32,
) -> Result<RefundCalculation> {
    let cap = mission.cap.ok_or_else(|| {
        SettlementError::Validation(format!("fixed mission {} has no cap", mission.id))
    })?;
    if cap == 0 {
        return Err(SettlementError::Validation(format!(
            "fixed mission {} has a zero cap",
            mission.id
        )));
    }

    let unused = cap.saturating_sub(current_participants);
    let base = mul_fraction(mission.total_cost_honors, unused as u64, cap as u64);
    let reason = format!(
        "{} of {} participant slots unused ({} filled)",
        unused, cap, current_participants
    );
    Ok(build(config, mission, base, reason))
}

/// Degen-model refund: unused time remaining in the mission window. A
/// mission past its end has consumed its window and refunds nothing,
/// regardless of participation.
pub fn refund_degen(
    config: &PricingConfig,
    mission: &Mission,
    now: DateTime<Utc>,
) -> Result<RefundCalculation> {
    let (start, end) = mission.window().ok_or_else(|| {
        SettlementError::Validation(format!("degen mission {} has no time window", mission.id))
    })?;
    let window_secs = (end - start).num_seconds();
    if window_secs <= 0 {
        return Err(SettlementError::Validation(format!(
            "degen mission {} has an empty time window",
            mission.id
        )));
    }

    if now >= end {
        return Ok(build(
            config,
            mission,
            HonorAmount::ZERO,
            "mission window fully consumed".to_string(),
        ));
    }

    let remaining_secs = (end - now).num_seconds().min(window_secs).max(0) as u64;
    let base = mul_fraction(
        mission.total_cost_honors,
        remaining_secs,
        window_secs as u64,
    );
    let reason = format!(
        "{}s of {}s mission window remaining",
        remaining_secs, window_secs
    );
    Ok(build(config, mission, base, reason))
}

/// Model-dispatched refund calculation. Pure: reads mission state and the
/// clock, mutates nothing.
pub fn calculate_refund(
    config: &PricingConfig,
    mission: &Mission,
    current_participants: u32,
    now: DateTime<Utc>,
) -> Result<RefundCalculation> {
    let calculation = match mission.model {
        MissionModel::Fixed => refund_fixed(config, mission, current_participants)?,
        MissionModel::Degen => refund_degen(config, mission, evaluation_instant(mission, now))?,
    };
    debug!(
        mission = %mission.id,
        model = %mission.model,
        refund = %calculation.total_refund_honors,
        "Refund calculated"
    );
    Ok(calculation)
}

// Cancelled degen missions are valued at the moment of cancellation, so a
// late refund request does not shrink what the owner gets back.
fn evaluation_instant(mission: &Mission, now: DateTime<Utc>) -> DateTime<Utc> {
    if mission.status == MissionStatus::Cancelled {
        mission.cancelled_at.unwrap_or(now)
    } else {
        now
    }
}

/// Status-gated eligibility check. Only cancelled missions are refundable;
/// the rules per status are enumerated here, nowhere else.
pub fn check_eligibility(
    config: &PricingConfig,
    mission: &Mission,
    current_participants: u32,
    now: DateTime<Utc>,
) -> Result<RefundEligibility> {
    match mission.status {
        MissionStatus::Cancelled => {
            let calculation = calculate_refund(config, mission, current_participants, now)?;
            Ok(RefundEligibility {
                eligible: true,
                reason: calculation.reason.clone(),
                estimated_refund: calculation.total_refund_honors,
            })
        }
        MissionStatus::Completed => Ok(RefundEligibility {
            eligible: false,
            reason: "completed missions are not refundable".to_string(),
            estimated_refund: HonorAmount::ZERO,
        }),
        MissionStatus::Active | MissionStatus::Paused => Ok(RefundEligibility {
            eligible: false,
            reason: "mission must be cancelled before a refund".to_string(),
            estimated_refund: HonorAmount::ZERO,
        }),
    }
}
