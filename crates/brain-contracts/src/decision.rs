// decision.rs — Policy decisions and execution results.
//
// A PolicyDecision is produced for every evaluation attempt — allowed or
// denied, including the post-callback re-evaluation — and is immutable once
// persisted. Reason codes are ordered but deduplicated so a single decision
// can report several violations without repeating itself.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::proposal::ApprovalProposal;
use crate::reason::ReasonCode;

/// Obligation attached to a decision when a proposal is awaiting a human.
pub const OBLIGATION_APPROVAL_REQUIRED: &str = "approval_required";

/// Metadata key carrying the proposal token relevant to a decision.
pub const METADATA_PROPOSAL_TOKEN: &str = "proposal_token";

/// The outcome of evaluating one invocation against the active regime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyDecision {
    /// Unique id of this evaluation attempt.
    pub decision_id: Uuid,
    /// Regime the request was evaluated against.
    pub policy_regime_id: Uuid,
    /// Content hash of that regime's effective document.
    pub policy_hash: String,
    /// Name of the policy document.
    pub policy_id: String,
    /// Version label of the policy document.
    pub policy_version: String,
    /// Whether the invocation may execute.
    pub allowed: bool,
    /// Ordered, deduplicated reasons explaining the outcome.
    pub reason_codes: Vec<ReasonCode>,
    /// Obligations the caller must discharge (e.g. "approval_required").
    pub obligations: Vec<String>,
    /// Free-form metadata (e.g. the proposal token to approve).
    pub metadata: BTreeMap<String, String>,
    /// When the decision was made.
    pub decided_at: DateTime<Utc>,
}

impl PolicyDecision {
    /// Record a reason code, preserving first-seen order without duplicates.
    pub fn push_reason(&mut self, code: ReasonCode) {
        if !self.reason_codes.contains(&code) {
            self.reason_codes.push(code);
        }
    }

    /// Mark the decision denied with the given reason.
    pub fn deny(&mut self, code: ReasonCode) {
        self.allowed = false;
        self.push_reason(code);
    }

    /// Record an obligation, deduplicated.
    pub fn push_obligation(&mut self, obligation: &str) {
        if !self.obligations.iter().any(|o| o == obligation) {
            self.obligations.push(obligation.to_string());
        }
    }

    /// The proposal token attached to this decision, if any.
    pub fn proposal_token(&self) -> Option<&str> {
        self.metadata.get(METADATA_PROPOSAL_TOKEN).map(String::as_str)
    }
}

/// What an execution callback reports back to the orchestrator.
///
/// A callback may veto the invocation it was handed — a nested capability
/// re-authorization is the typical case — by returning `allowed = false`
/// with its own reason codes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionOutcome {
    /// Whether the capability considers the execution committed.
    pub allowed: bool,
    /// Capability output payload.
    pub output: Value,
    /// Reasons supplied on veto. Empty on success.
    #[serde(default)]
    pub reason_codes: Vec<ReasonCode>,
}

impl ExecutionOutcome {
    /// A committed execution with the given output.
    pub fn ok(output: Value) -> Self {
        Self {
            allowed: true,
            output,
            reason_codes: Vec::new(),
        }
    }

    /// A vetoed execution carrying the callback's own reasons.
    pub fn denied(reason_codes: Vec<ReasonCode>) -> Self {
        Self {
            allowed: false,
            output: Value::Null,
            reason_codes,
        }
    }
}

/// One caller-facing error folded out of a denied decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyExecutionError {
    /// The reason code this error corresponds to.
    pub code: ReasonCode,
    /// Human-readable description, including the proposal token when one
    /// is relevant.
    pub message: String,
}

/// The complete result of `authorize_and_execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyExecutionResult {
    /// Whether the invocation executed and committed.
    pub allowed: bool,
    /// Callback output when executed; `Null` otherwise.
    pub output: Value,
    /// Errors derived from the final decision's reason codes. Empty when
    /// allowed.
    pub errors: Vec<PolicyExecutionError>,
    /// The final decision for this attempt.
    pub decision: PolicyDecision,
    /// The proposal created by this attempt, when approval was required
    /// and unresolved.
    pub proposal: Option<ApprovalProposal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision() -> PolicyDecision {
        PolicyDecision {
            decision_id: Uuid::new_v4(),
            policy_regime_id: Uuid::new_v4(),
            policy_hash: "ab".repeat(32),
            policy_id: "p".to_string(),
            policy_version: "1".to_string(),
            allowed: true,
            reason_codes: Vec::new(),
            obligations: Vec::new(),
            metadata: BTreeMap::new(),
            decided_at: Utc::now(),
        }
    }

    #[test]
    fn push_reason_deduplicates_but_keeps_order() {
        let mut d = decision();
        d.push_reason(ReasonCode::ActorDenied);
        d.push_reason(ReasonCode::ChannelDenied);
        d.push_reason(ReasonCode::ActorDenied);
        assert_eq!(
            d.reason_codes,
            vec![ReasonCode::ActorDenied, ReasonCode::ChannelDenied]
        );
    }

    #[test]
    fn deny_flips_allowed_and_records_reason() {
        let mut d = decision();
        d.deny(ReasonCode::CapabilityDisabled);
        assert!(!d.allowed);
        assert_eq!(d.reason_codes, vec![ReasonCode::CapabilityDisabled]);
    }

    #[test]
    fn proposal_token_reads_metadata() {
        let mut d = decision();
        assert!(d.proposal_token().is_none());
        d.metadata
            .insert(METADATA_PROPOSAL_TOKEN.to_string(), "abc123".to_string());
        assert_eq!(d.proposal_token(), Some("abc123"));
    }

    #[test]
    fn obligations_deduplicate() {
        let mut d = decision();
        d.push_obligation(OBLIGATION_APPROVAL_REQUIRED);
        d.push_obligation(OBLIGATION_APPROVAL_REQUIRED);
        assert_eq!(d.obligations, vec![OBLIGATION_APPROVAL_REQUIRED]);
    }

    #[test]
    fn execution_outcome_constructors() {
        let ok = ExecutionOutcome::ok(serde_json::json!({"sent": true}));
        assert!(ok.allowed);
        assert!(ok.reason_codes.is_empty());

        let vetoed = ExecutionOutcome::denied(vec![ReasonCode::ExecutionDenied]);
        assert!(!vetoed.allowed);
        assert_eq!(vetoed.reason_codes, vec![ReasonCode::ExecutionDenied]);
    }
}
