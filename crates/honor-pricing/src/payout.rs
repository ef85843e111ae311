use honor_types::{HonorAmount, Result, SettlementError, TaskId, UserId};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A user selected to receive a share of a degen prize pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub user_id: UserId,
    pub task_id: TaskId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerPayout {
    pub user_id: UserId,
    pub task_id: TaskId,
    pub amount: HonorAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegenPayoutResult {
    pub total_winners: usize,
    pub total_payout: HonorAmount,
    pub winners: Vec<WinnerPayout>,
}

impl DegenPayoutResult {
    /// Settlement with nobody to pay: the pool stays where it is.
    pub fn empty() -> Self {
        Self {
            total_winners: 0,
            total_payout: HonorAmount::ZERO,
            winners: Vec::new(),
        }
    }
}

/// Split a prize pool across winners. Every winner gets the floor share;
/// the remainder goes one Honor at a time to the earliest winners in input
/// order, so the full pool is always paid out and the split is stable for
/// a given winner ordering. Zero winners is a valid outcome and pays out
/// nothing.
pub fn split_prize(pool: HonorAmount, winners: &[Winner]) -> Result<DegenPayoutResult> {
    if winners.is_empty() {
        return Ok(DegenPayoutResult::empty());
    }

    let count = winners.len() as u64;
    let base = pool.to_honors() / count;
    let remainder = pool.to_honors() % count;

    let payouts: Vec<WinnerPayout> = winners
        .iter()
        .enumerate()
        .map(|(i, winner)| WinnerPayout {
            user_id: winner.user_id.clone(),
            task_id: winner.task_id.clone(),
            amount: HonorAmount::from_honors(if (i as u64) < remainder {
                base + 1
            } else {
                base
            }),
        })
        .collect();

    let result = DegenPayoutResult {
        total_winners: winners.len(),
        total_payout: pool,
        winners: payouts,
    };
    verify_conservation(&result)?;

    info!(
        winners = result.total_winners,
        pool = %pool,
        "💰 Prize pool split"
    );

    Ok(result)
}

/// Check that the individual payouts sum exactly to `total_payout`. A
/// mismatch means the split logic itself is broken, so this is an internal
/// error, not a validation failure the caller can correct.
pub fn verify_conservation(result: &DegenPayoutResult) -> Result<()> {
    let mut sum = HonorAmount::ZERO;
    for payout in &result.winners {
        sum = sum
            .checked_add(payout.amount)
            .ok_or_else(|| SettlementError::Store("payout sum overflow".to_string()))?;
    }
    if sum != result.total_payout {
        return Err(SettlementError::Store(format!(
            "payout conservation violated: pool {} split into {}",
            result.total_payout, sum
        )));
    }
    Ok(())
}
