// reason.rs — The closed set of policy reason codes.
//
// Every policy outcome is explained by reason codes, never by error types.
// The set is closed on purpose: callers and audit tooling can enumerate it,
// and "why was I denied" is always answerable from a decision's codes.

use serde::{Deserialize, Serialize};

/// A stable, enumerable identifier for why a policy decision allowed or
/// denied a capability invocation.
///
/// Serialized as `snake_case` strings so audit rows and decision objects
/// read the same on the wire and in logs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// The resolved rule has `enabled = false`.
    CapabilityDisabled,
    /// No rule matched the capability and the document has no `*` fallback.
    UnknownCallTarget,
    /// The actor appears on the rule's deny list.
    ActorDenied,
    /// The rule has a non-empty allow list and the actor is not on it.
    ActorNotAllowed,
    /// The channel appears on the rule's deny list.
    ChannelDenied,
    /// The rule has a non-empty allow list and the channel is not on it.
    ChannelNotAllowed,
    /// The declared autonomy level exceeds the rule's configured ceiling.
    AutonomyExceedsLimit,
    /// The envelope id was already seen inside the dedupe window.
    DedupeDuplicateRequest,
    /// Human approval is required and has not been granted.
    ApprovalRequired,
    /// The supplied approval token matched no pending proposal for this
    /// actor and channel.
    ApprovalTokenInvalid,
    /// The referenced proposal's TTL elapsed before it was resolved.
    ApprovalTokenExpired,
    /// Free-text or confidence-scored correlation could not pick a single
    /// pending proposal.
    ApprovalAmbiguous,
    /// A mid-confidence match needs one round of human clarification.
    ApprovalClarificationRequired,
    /// A proposal was created but the approval notification could not be
    /// delivered.
    ApprovalNotificationFailed,
    /// The execution callback vetoed or failed the invocation.
    ExecutionDenied,
    /// An internal, unexpected failure inside the policy engine.
    PolicyError,
}

impl ReasonCode {
    /// The `snake_case` wire form of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::CapabilityDisabled => "capability_disabled",
            ReasonCode::UnknownCallTarget => "unknown_call_target",
            ReasonCode::ActorDenied => "actor_denied",
            ReasonCode::ActorNotAllowed => "actor_not_allowed",
            ReasonCode::ChannelDenied => "channel_denied",
            ReasonCode::ChannelNotAllowed => "channel_not_allowed",
            ReasonCode::AutonomyExceedsLimit => "autonomy_exceeds_limit",
            ReasonCode::DedupeDuplicateRequest => "dedupe_duplicate_request",
            ReasonCode::ApprovalRequired => "approval_required",
            ReasonCode::ApprovalTokenInvalid => "approval_token_invalid",
            ReasonCode::ApprovalTokenExpired => "approval_token_expired",
            ReasonCode::ApprovalAmbiguous => "approval_ambiguous",
            ReasonCode::ApprovalClarificationRequired => "approval_clarification_required",
            ReasonCode::ApprovalNotificationFailed => "approval_notification_failed",
            ReasonCode::ExecutionDenied => "execution_denied",
            ReasonCode::PolicyError => "policy_error",
        }
    }

    /// A short human-readable description, used when folding reason codes
    /// into caller-facing errors.
    pub fn describe(&self) -> &'static str {
        match self {
            ReasonCode::CapabilityDisabled => "capability is disabled by policy",
            ReasonCode::UnknownCallTarget => "no policy rule matches this capability",
            ReasonCode::ActorDenied => "actor is deny-listed for this capability",
            ReasonCode::ActorNotAllowed => "actor is not on the capability allow list",
            ReasonCode::ChannelDenied => "channel is deny-listed for this capability",
            ReasonCode::ChannelNotAllowed => "channel is not on the capability allow list",
            ReasonCode::AutonomyExceedsLimit => "declared autonomy exceeds the configured ceiling",
            ReasonCode::DedupeDuplicateRequest => "duplicate envelope inside the dedupe window",
            ReasonCode::ApprovalRequired => "human approval is required",
            ReasonCode::ApprovalTokenInvalid => "approval token does not match a pending proposal",
            ReasonCode::ApprovalTokenExpired => "approval proposal expired before resolution",
            ReasonCode::ApprovalAmbiguous => "approval correlation is ambiguous",
            ReasonCode::ApprovalClarificationRequired => "approval match needs clarification",
            ReasonCode::ApprovalNotificationFailed => "approval notification could not be sent",
            ReasonCode::ExecutionDenied => "execution was denied by the capability",
            ReasonCode::PolicyError => "internal policy engine error",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
