//! # Fund-Usage Report Lifecycle
//!
//! Reports disclose how an approved proposal's money was spent. A school
//! edits a report while it is a draft; once submitted it is read-only and
//! waits for an admin review. Only approved reports are published to donors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transition::{Decision, TransitionEvidence, TransitionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportAction {
    Edit,
    Delete,
    Submit,
    Review,
    Publish,
}

impl ReportAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Submit => "submit",
            Self::Review => "review",
            Self::Publish => "publish",
        }
    }
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 4] = [
        Self::Draft,
        Self::Submitted,
        Self::Approved,
        Self::Rejected,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn valid_transitions(&self) -> &'static [ReportStatus] {
        match self {
            Self::Draft => &[Self::Submitted],
            Self::Submitted => &[Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => &[],
        }
    }

    pub fn permits(&self, action: ReportAction) -> bool {
        match action {
            ReportAction::Edit | ReportAction::Delete | ReportAction::Submit => {
                *self == Self::Draft
            }
            ReportAction::Review => *self == Self::Submitted,
            ReportAction::Publish => *self == Self::Approved,
        }
    }

    pub fn require(&self, action: ReportAction) -> Result<(), ReportError> {
        if self.permits(action) {
            Ok(())
        } else {
            Err(ReportError::NotPermitted {
                action: action.as_str(),
                status: *self,
            })
        }
    }

    pub fn transition(
        self,
        to: ReportStatus,
        evidence: &TransitionEvidence,
    ) -> Result<TransitionRecord<ReportStatus>, ReportError> {
        if self.is_terminal() {
            return Err(ReportError::TerminalState { status: self });
        }
        if !self.valid_transitions().contains(&to) {
            return Err(ReportError::InvalidTransition { from: self, to });
        }
        Ok(TransitionRecord::new(self, to, evidence))
    }

    /// DRAFT → SUBMITTED.
    pub fn submit(
        self,
        evidence: &TransitionEvidence,
    ) -> Result<TransitionRecord<ReportStatus>, ReportError> {
        self.transition(Self::Submitted, evidence)
    }

    /// SUBMITTED → APPROVED | REJECTED.
    pub fn review(
        self,
        decision: Decision,
        evidence: &TransitionEvidence,
    ) -> Result<TransitionRecord<ReportStatus>, ReportError> {
        let to = match decision {
            Decision::Approve => Self::Approved,
            Decision::Reject => Self::Rejected,
        };
        self.transition(to, evidence)
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ReportError::UnknownStatus(s.to_string()))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("invalid report transition: {from} -> {to}")]
    InvalidTransition { from: ReportStatus, to: ReportStatus },

    #[error("report is in terminal state {status}")]
    TerminalState { status: ReportStatus },

    #[error("cannot {action} a report in state {status}")]
    NotPermitted {
        action: &'static str,
        status: ReportStatus,
    },

    #[error("unknown report status {0:?}")]
    UnknownStatus(String),
}
