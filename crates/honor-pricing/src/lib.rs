//! Pure pricing, payout, and refund calculators.
//!
//! Everything in this crate is deterministic and I/O-free: the same inputs
//! and the same [`PricingConfig`] always produce the same amounts. Persisted
//! state lives in `honor-settlement`; this crate only does the arithmetic.

pub mod config;
pub mod payout;
pub mod pricing;
pub mod refund;
pub mod reviewer;

pub use config::{DegenPreset, PricingConfig, TaskPriceTable};
pub use payout::{split_prize, verify_conservation, DegenPayoutResult, Winner, WinnerPayout};
pub use pricing::{honors_from_usd, quote, usd_from_honors, MissionQuote, QuoteRequest};
pub use refund::{
    calculate_refund, check_eligibility, RefundBreakdown, RefundCalculation, RefundEligibility,
};
pub use reviewer::{quorum_spend, review_reward};
