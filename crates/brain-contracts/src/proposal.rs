// proposal.rs — Time-boxed human approval proposals.
//
// A proposal is created when a rule requires approval and nothing on the
// request resolves it. Its token is a deterministic digest of the request
// content, so byte-identical retries map to the same proposal. Lifecycle
// status is tracked alongside the proposal in storage, not embedded in the
// value object itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an approval proposal.
///
/// `pending` is the only non-terminal state; every transition out of it is
/// one-way. An expired or rejected token is never resurrected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl ProposalStatus {
    /// Whether this state permits no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// A request for human approval tied to one capability invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalProposal {
    /// Deterministic short token identifying this proposal.
    pub proposal_token: String,
    /// Canonical id of the capability awaiting approval.
    pub capability_id: String,
    /// Declared capability version.
    pub capability_version: String,
    /// Human-readable summary shown in the approval notification.
    pub summary: String,
    /// Actor whose invocation is awaiting approval.
    pub actor: String,
    /// Channel the invocation (and its approval conversation) lives in.
    pub channel: String,
    /// Trace id of the originating request.
    pub trace_id: String,
    /// Caller-side invocation id of the originating request.
    pub invocation_id: String,
    /// Regime that was active when the proposal was created.
    pub policy_regime_id: Uuid,
    /// When the proposal was created.
    pub created_at: DateTime<Utc>,
    /// When the proposal stops being resolvable.
    pub expires_at: DateTime<Utc>,
}

impl ApprovalProposal {
    /// Whether the proposal's TTL has elapsed at `now`.
    ///
    /// Expiry is checked lazily on read; storage may still say `pending`
    /// until the next lookup transitions it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn proposal(expires_at: DateTime<Utc>) -> ApprovalProposal {
        ApprovalProposal {
            proposal_token: "deadbeef00112233".to_string(),
            capability_id: "capability:demo/demo-x".to_string(),
            capability_version: "1.0".to_string(),
            summary: "Approve demo-x".to_string(),
            actor: "alice".to_string(),
            channel: "ops".to_string(),
            trace_id: "trace-1".to_string(),
            invocation_id: "inv-1".to_string(),
            policy_regime_id: Uuid::new_v4(),
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn pending_is_the_only_non_terminal_status() {
        assert!(!ProposalStatus::Pending.is_terminal());
        assert!(ProposalStatus::Approved.is_terminal());
        assert!(ProposalStatus::Rejected.is_terminal());
        assert!(ProposalStatus::Expired.is_terminal());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProposalStatus::Approved).unwrap(),
            "\"approved\""
        );
        assert_eq!(ProposalStatus::Expired.to_string(), "expired");
    }

    #[test]
    fn expiry_is_inclusive_at_the_deadline() {
        let now = Utc::now();
        assert!(proposal(now).is_expired(now));
        assert!(proposal(now - Duration::seconds(1)).is_expired(now));
        assert!(!proposal(now + Duration::seconds(1)).is_expired(now));
    }
}
