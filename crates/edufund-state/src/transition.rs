//! Transition evidence and audit records shared by both lifecycles.

use serde::{Deserialize, Serialize};

use edufund_core::Timestamp;

/// Who is performing a transition and why.
#[derive(Debug, Clone)]
pub struct TransitionEvidence {
    /// Actor identifier (`school:<uuid>` or `admin:<username>`).
    pub actor: String,
    /// Free-text reason, e.g. the admin's decision note.
    pub reason: Option<String>,
}

impl TransitionEvidence {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason.filter(|r| !r.trim().is_empty());
        self
    }
}

/// One entry in a lifecycle's transition log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord<S> {
    pub from_state: S,
    pub to_state: S,
    pub timestamp: Timestamp,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl<S: Copy> TransitionRecord<S> {
    pub(crate) fn new(from: S, to: S, evidence: &TransitionEvidence) -> Self {
        Self {
            from_state: from,
            to_state: to,
            timestamp: Timestamp::now(),
            actor: evidence.actor.clone(),
            reason: evidence.reason.clone(),
        }
    }
}

/// An admin moderation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_reason_is_dropped() {
        let ev = TransitionEvidence::new("admin:root").with_reason(Some("   ".into()));
        assert!(ev.reason.is_none());
        let ev = TransitionEvidence::new("admin:root").with_reason(Some("ok".into()));
        assert_eq!(ev.reason.as_deref(), Some("ok"));
    }

    #[test]
    fn decision_wire_format() {
        assert_eq!(serde_json::to_string(&Decision::Approve).unwrap(), "\"approve\"");
        let d: Decision = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(d, Decision::Reject);
        assert!(serde_json::from_str::<Decision>("\"maybe\"").is_err());
    }
}
