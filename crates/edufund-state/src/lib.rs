//! # edufund-state: Lifecycle State Machines
//!
//! Two moderated lifecycles drive the platform:
//!
//! ```text
//! Proposal:  Draft ──submit──▶ Pending ──decide──▶ Approved (terminal)
//!                                        └───────▶ Rejected (terminal)
//!
//! Report:    Draft ──submit──▶ Submitted ──review──▶ Approved (terminal)
//!                                          └───────▶ Rejected (terminal)
//! ```
//!
//! Every transition goes through one validator per machine
//! ([`ProposalStatus::transition`], [`ReportStatus::transition`]) and yields
//! a [`TransitionRecord`] for the audit log. Every status-gated operation in
//! the API asks [`ProposalStatus::require`] or [`ReportStatus::require`]
//! instead of comparing status strings.

pub mod proposal;
pub mod report;
pub mod transition;

pub use proposal::{check_submittable, ProposalAction, ProposalError, ProposalStatus};
pub use report::{ReportAction, ReportError, ReportStatus};
pub use transition::{Decision, TransitionEvidence, TransitionRecord};
