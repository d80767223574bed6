//! # edufund-core: Foundational Types for EduFund
//!
//! Leaf crate of the workspace. Defines the validated primitives every
//! other crate builds on:
//!
//! - [`Npsn`]: the 8-digit national school identifier.
//! - [`Email`]: a normalized (trimmed, lowercased) account email.
//! - [`Rupiah`]: whole-unit currency amounts. Money is never a float.
//! - [`Timestamp`]: UTC-only timestamps truncated to seconds.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `edufund-*` crates.
//! - No `.unwrap()` outside tests.
//! - Validated constructors only; there is no way to build an `Npsn`
//!   that is not eight ASCII digits.

pub mod error;
pub mod identity;
pub mod money;
pub mod temporal;

pub use error::ValidationError;
pub use identity::{Email, Npsn};
pub use money::{Rupiah, MIN_DONATION};
pub use temporal::Timestamp;
