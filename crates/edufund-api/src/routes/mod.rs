//! # API Route Modules
//!
//! - `auth`: school registration, school and admin login, logout, `me`.
//! - `schools`: school profile, admin school directory, public NPSN check.
//! - `proposals`: proposal drafting, submission, and admin decisions.
//!   Approval creates the donor-facing campaign.
//! - `reports`: fund-usage reports for approved proposals.
//! - `timeline`: dated activity entries for approved proposals.
//! - `donor`: public campaign browsing and simulated donations.
//! - `upload`: authenticated image/document upload.
//! - `dashboard`: admin and school summary counts.
//!
//! Each module exposes `router()` for routes behind the auth middleware and,
//! where it has any, `public_router()` for unauthenticated routes.

pub mod auth;
pub mod dashboard;
pub mod donor;
pub mod proposals;
pub mod reports;
pub mod schools;
pub mod timeline;
pub mod upload;

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Pagination parameters for list endpoints.
#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
pub struct PaginationParams {
    /// Maximum number of items to return (default: 100, max: 1000).
    pub limit: Option<usize>,
    /// Number of items to skip (default: 0).
    pub offset: Option<usize>,
}

impl PaginationParams {
    const DEFAULT_LIMIT: usize = 100;
    const MAX_LIMIT: usize = 1000;

    fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT)
    }

    fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    /// Apply to an already-sorted list.
    pub(crate) fn page<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.effective_offset())
            .take(self.effective_limit())
            .collect()
    }
}

/// `?status=` filter plus pagination, for moderation queues.
#[derive(Debug, Deserialize, Default, IntoParams)]
pub struct StatusQuery {
    /// Lifecycle status, case-insensitive.
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl StatusQuery {
    pub(crate) fn pagination(&self) -> PaginationParams {
        PaginationParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}
