use crate::config::PricingConfig;
use honor_types::{HonorAmount, Result, SettlementError};

/// Flat reward credited for one accepted review.
pub fn review_reward(config: &PricingConfig) -> HonorAmount {
    config.review_reward
}

/// Total Honors a submission consumes once its full review quorum has been
/// paid out.
pub fn quorum_spend(config: &PricingConfig) -> Result<HonorAmount> {
    config
        .review_reward
        .checked_mul(config.review_quorum as u64)
        .ok_or_else(|| SettlementError::Validation("review quorum spend overflow".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quorum_spend() {
        let config = PricingConfig::default();
        assert_eq!(review_reward(&config), HonorAmount::from_honors(150));
        assert_eq!(quorum_spend(&config).unwrap(), HonorAmount::from_honors(750));
    }
}
