use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer Honors. The platform reward unit has no fractional part; every
/// price, payout and refund is a whole number of Honors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HonorAmount(u64);

impl HonorAmount {
    pub const ZERO: Self = Self(0);

    pub fn from_honors(honors: u64) -> Self {
        Self(honors)
    }

    pub fn to_honors(&self) -> u64 {
        self.0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_mul(&self, factor: u64) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for HonorAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} HONOR", self.0)
    }
}

/// USD held as whole cents so two-decimal rounding is exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsdAmount(u64);

impl UsdAmount {
    pub const ZERO: Self = Self(0);

    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub fn to_cents(&self) -> u64 {
        self.0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for UsdAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_honor_arithmetic() {
        let a = HonorAmount::from_honors(750);
        let b = HonorAmount::from_honors(250);

        assert_eq!(a.checked_add(b), Some(HonorAmount::from_honors(1000)));
        assert_eq!(a.checked_sub(b), Some(HonorAmount::from_honors(500)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(a.checked_mul(100), Some(HonorAmount::from_honors(75_000)));
        assert_eq!(b.saturating_sub(a), HonorAmount::ZERO);
    }

    #[test]
    fn test_usd_display() {
        assert_eq!(format!("{}", UsdAmount::from_cents(16667)), "$166.67");
        assert_eq!(format!("{}", UsdAmount::from_cents(5)), "$0.05");
        assert_eq!(format!("{}", UsdAmount::ZERO), "$0.00");
    }

    #[test]
    fn test_honor_display() {
        assert_eq!(format!("{}", HonorAmount::from_honors(150)), "150 HONOR");
    }
}
