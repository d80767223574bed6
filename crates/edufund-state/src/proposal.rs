//! # Proposal Lifecycle
//!
//! A proposal is a school's funding request. It is edited freely as a draft,
//! frozen on submission, and then decided once by an admin. Both decisions
//! are terminal: a rejected proposal is never re-opened, the school drafts a
//! new one instead.
//!
//! Approval is what unlocks everything downstream. Instead of each feature
//! checking `status == approved` on its own, callers name the action they
//! want via [`ProposalAction`] and ask [`ProposalStatus::require`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use edufund_core::Rupiah;

use crate::transition::{Decision, TransitionEvidence, TransitionRecord};

// ─── Status ──────────────────────────────────────────────────────────

/// Lifecycle status of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    /// Editable by the owning school.
    Draft,
    /// Submitted, awaiting admin decision.
    Pending,
    /// Approved (terminal). Campaign is live.
    Approved,
    /// Rejected (terminal).
    Rejected,
}

/// Something a caller wants to do that depends on proposal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalAction {
    Edit,
    Delete,
    Submit,
    Decide,
    AttachReport,
    AddTimelineEntry,
    ReceiveDonation,
}

impl ProposalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Submit => "submit",
            Self::Decide => "decide",
            Self::AttachReport => "attach a report to",
            Self::AddTimelineEntry => "add a timeline entry to",
            Self::ReceiveDonation => "donate to",
        }
    }
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 4] = [
        Self::Draft,
        Self::Pending,
        Self::Approved,
        Self::Rejected,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// States reachable in one step.
    pub fn valid_transitions(&self) -> &'static [ProposalStatus] {
        match self {
            Self::Draft => &[Self::Pending],
            Self::Pending => &[Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => &[],
        }
    }

    /// Whether `action` is allowed in this status.
    pub fn permits(&self, action: ProposalAction) -> bool {
        match action {
            ProposalAction::Edit | ProposalAction::Delete | ProposalAction::Submit => {
                *self == Self::Draft
            }
            ProposalAction::Decide => *self == Self::Pending,
            ProposalAction::AttachReport
            | ProposalAction::AddTimelineEntry
            | ProposalAction::ReceiveDonation => *self == Self::Approved,
        }
    }

    /// Gate for every status-dependent operation.
    pub fn require(&self, action: ProposalAction) -> Result<(), ProposalError> {
        if self.permits(action) {
            Ok(())
        } else {
            Err(ProposalError::NotPermitted {
                action: action.as_str(),
                status: *self,
            })
        }
    }

    /// Validate a transition and produce its audit record.
    pub fn transition(
        self,
        to: ProposalStatus,
        evidence: &TransitionEvidence,
    ) -> Result<TransitionRecord<ProposalStatus>, ProposalError> {
        if self.is_terminal() {
            return Err(ProposalError::TerminalState { status: self });
        }
        if !self.valid_transitions().contains(&to) {
            return Err(ProposalError::InvalidTransition { from: self, to });
        }
        Ok(TransitionRecord::new(self, to, evidence))
    }

    /// DRAFT → PENDING.
    pub fn submit(
        self,
        evidence: &TransitionEvidence,
    ) -> Result<TransitionRecord<ProposalStatus>, ProposalError> {
        self.transition(Self::Pending, evidence)
    }

    /// PENDING → APPROVED | REJECTED.
    pub fn decide(
        self,
        decision: Decision,
        evidence: &TransitionEvidence,
    ) -> Result<TransitionRecord<ProposalStatus>, ProposalError> {
        let to = match decision {
            Decision::Approve => Self::Approved,
            Decision::Reject => Self::Rejected,
        };
        self.transition(to, evidence)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ProposalStatus {
    type Err = ProposalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProposalError::UnknownStatus(s.to_string()))
    }
}

// ─── Submission check ────────────────────────────────────────────────

/// Required-field check run before DRAFT → PENDING.
///
/// Drafts may be saved incomplete; a submitted proposal may not.
pub fn check_submittable(
    title: &str,
    description: &str,
    target_amount: Rupiah,
) -> Result<(), ProposalError> {
    let mut missing = Vec::new();
    if title.trim().is_empty() {
        missing.push("title");
    }
    if description.trim().is_empty() {
        missing.push("description");
    }
    if target_amount == Rupiah::ZERO {
        missing.push("target_amount");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProposalError::Incomplete { missing })
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProposalError {
    #[error("invalid proposal transition: {from} -> {to}")]
    InvalidTransition {
        from: ProposalStatus,
        to: ProposalStatus,
    },

    #[error("proposal is in terminal state {status}")]
    TerminalState { status: ProposalStatus },

    #[error("cannot {action} a proposal in state {status}")]
    NotPermitted {
        action: &'static str,
        status: ProposalStatus,
    },

    #[error("proposal is missing required fields: {}", missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },

    #[error("unknown proposal status {0:?}")]
    UnknownStatus(String),
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn school() -> TransitionEvidence {
        TransitionEvidence::new("school:test")
    }

    fn admin(note: &str) -> TransitionEvidence {
        TransitionEvidence::new("admin:root").with_reason(Some(note.to_string()))
    }

    #[test]
    fn submit_moves_draft_to_pending() {
        let rec = ProposalStatus::Draft.submit(&school()).unwrap();
        assert_eq!(rec.from_state, ProposalStatus::Draft);
        assert_eq!(rec.to_state, ProposalStatus::Pending);
        assert_eq!(rec.actor, "school:test");
    }

    #[test]
    fn second_submit_rejected() {
        let err = ProposalStatus::Pending.submit(&school()).unwrap_err();
        assert_eq!(
            err,
            ProposalError::InvalidTransition {
                from: ProposalStatus::Pending,
                to: ProposalStatus::Pending,
            }
        );
    }

    #[test]
    fn decide_pending() {
        let rec = ProposalStatus::Pending
            .decide(Decision::Approve, &admin("looks good"))
            .unwrap();
        assert_eq!(rec.to_state, ProposalStatus::Approved);
        assert_eq!(rec.reason.as_deref(), Some("looks good"));

        let rec = ProposalStatus::Pending
            .decide(Decision::Reject, &admin("budget unclear"))
            .unwrap();
        assert_eq!(rec.to_state, ProposalStatus::Rejected);
    }

    #[test]
    fn decide_draft_is_invalid() {
        assert!(matches!(
            ProposalStatus::Draft.decide(Decision::Approve, &admin("x")),
            Err(ProposalError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn terminal_states_cannot_move() {
        for st in [ProposalStatus::Approved, ProposalStatus::Rejected] {
            assert!(st.is_terminal());
            assert!(st.valid_transitions().is_empty());
            for decision in [Decision::Approve, Decision::Reject] {
                assert_eq!(
                    st.decide(decision, &admin("again")).unwrap_err(),
                    ProposalError::TerminalState { status: st }
                );
            }
            assert!(st.submit(&school()).is_err());
        }
    }

    #[test]
    fn rejected_cannot_be_resubmitted() {
        assert!(matches!(
            ProposalStatus::Rejected.submit(&school()),
            Err(ProposalError::TerminalState { .. })
        ));
    }

    #[test]
    fn edit_and_delete_only_in_draft() {
        for action in [ProposalAction::Edit, ProposalAction::Delete, ProposalAction::Submit] {
            assert!(ProposalStatus::Draft.permits(action));
            assert!(!ProposalStatus::Pending.permits(action));
            assert!(!ProposalStatus::Approved.permits(action));
            assert!(!ProposalStatus::Rejected.permits(action));
        }
    }

    #[test]
    fn downstream_features_require_approval() {
        for action in [
            ProposalAction::AttachReport,
            ProposalAction::AddTimelineEntry,
            ProposalAction::ReceiveDonation,
        ] {
            for st in ProposalStatus::ALL {
                assert_eq!(st.permits(action), st == ProposalStatus::Approved, "{st} {action:?}");
            }
        }
    }

    #[test]
    fn require_reports_action_and_state() {
        let err = ProposalStatus::Pending
            .require(ProposalAction::AddTimelineEntry)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("timeline entry"), "{msg}");
        assert!(msg.contains("PENDING"), "{msg}");
    }

    #[test]
    fn check_submittable_lists_missing_fields() {
        assert!(check_submittable("Roof repair", "Leaking roof", Rupiah(5_000_000)).is_ok());
        let err = check_submittable(" ", "", Rupiah::ZERO).unwrap_err();
        assert_eq!(
            err,
            ProposalError::Incomplete {
                missing: vec!["title", "description", "target_amount"]
            }
        );
        assert!(err.to_string().contains("title, description, target_amount"));
    }

    #[test]
    fn status_parse_and_wire_format() {
        assert_eq!("pending".parse::<ProposalStatus>().unwrap(), ProposalStatus::Pending);
        assert_eq!("APPROVED".parse::<ProposalStatus>().unwrap(), ProposalStatus::Approved);
        assert!("archived".parse::<ProposalStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&ProposalStatus::Draft).unwrap(),
            "\"draft\""
        );
    }

    #[test]
    fn transition_record_serializes() {
        let rec = ProposalStatus::Draft.submit(&school()).unwrap();
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["from_state"], "draft");
        assert_eq!(json["to_state"], "pending");
        assert!(json.get("reason").is_none());
    }
}
