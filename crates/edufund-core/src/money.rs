//! # Rupiah Amounts
//!
//! All money on the platform is whole Indonesian Rupiah held in a `u64`.
//! Arithmetic is checked; an overflow is a validation failure, never a wrap.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Smallest donation the platform accepts.
pub const MIN_DONATION: Rupiah = Rupiah(10_000);

/// A whole-unit Rupiah amount.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Rupiah(pub u64);

impl Rupiah {
    pub const ZERO: Rupiah = Rupiah(0);

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Rupiah) -> Result<Rupiah, ValidationError> {
        self.0
            .checked_add(other.0)
            .map(Rupiah)
            .ok_or(ValidationError::AmountOverflow)
    }

    /// Reject amounts below [`MIN_DONATION`].
    pub fn require_donation_minimum(self) -> Result<Rupiah, ValidationError> {
        if self < MIN_DONATION {
            return Err(ValidationError::BelowMinimum {
                amount: self,
                minimum: MIN_DONATION,
            });
        }
        Ok(self)
    }

    /// Whole-percent progress of `self` toward `target`, capped at 100.
    pub fn percent_of(self, target: Rupiah) -> u8 {
        if target.0 == 0 {
            return 0;
        }
        let pct = (u128::from(self.0) * 100) / u128::from(target.0);
        pct.min(100) as u8
    }
}

impl std::iter::Sum for Rupiah {
    fn sum<I: Iterator<Item = Rupiah>>(iter: I) -> Self {
        Rupiah(iter.fold(0u64, |acc, r| acc.saturating_add(r.0)))
    }
}

/// Renders with Indonesian grouping, e.g. `Rp 1.250.000`.
impl std::fmt::Display for Rupiah {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.0.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        write!(f, "Rp {grouped}")
    }
}
