//! # Validation Errors
//!
//! Errors raised by the validated constructors in this crate. The API layer
//! maps every variant to a 422 response.

use thiserror::Error;

use crate::money::Rupiah;

/// A domain primitive failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// NPSN is not exactly eight ASCII digits.
    #[error("invalid NPSN {0:?}: expected exactly 8 digits")]
    InvalidNpsn(String),

    /// Email address is malformed.
    #[error("invalid email address {0:?}")]
    InvalidEmail(String),

    /// Donation amount is below the platform minimum.
    #[error("amount {amount} is below the minimum of {minimum}")]
    BelowMinimum {
        /// Offered amount.
        amount: Rupiah,
        /// Platform minimum.
        minimum: Rupiah,
    },

    /// Amount arithmetic overflowed.
    #[error("amount overflow")]
    AmountOverflow,
}
