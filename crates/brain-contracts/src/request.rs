// request.rs — The capability invocation envelope submitted for authorization.
//
// The request and its payload are owned by the caller and read-only to the
// engine. The only payload field the engine interprets is the optional
// `_policy_disambiguation` candidate list, which is parsed once at this
// boundary into typed structs instead of carrying untyped maps through the
// evaluation core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload key carrying confidence-scored proposal candidates.
pub const DISAMBIGUATION_FIELD: &str = "_policy_disambiguation";

/// Reference to the capability being invoked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilityRef {
    /// Kind of target (e.g. "capability").
    pub kind: String,
    /// Namespace the capability lives in (e.g. "messaging").
    pub namespace: String,
    /// Capability name (e.g. "send-message").
    pub name: String,
    /// Declared capability version.
    pub version: String,
}

impl CapabilityRef {
    /// The canonical capability id used as the policy rule key:
    /// `<kind>:<namespace>/<name>`.
    ///
    /// The version is deliberately excluded — rules gate a capability, not
    /// one release of it.
    pub fn canonical_id(&self) -> String {
        format!("{}:{}/{}", self.kind, self.namespace, self.name)
    }
}

/// One confidence-scored candidate for resolving a pending proposal from
/// free-text input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisambiguationCandidate {
    /// Token of the pending proposal this candidate refers to.
    pub proposal_token: String,
    /// Match confidence in `[0.0, 1.0]`.
    pub confidence: f64,
}

/// A capability invocation submitted to `authorize_and_execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityInvocationRequest {
    /// Unique envelope id — the dedupe key for replay detection.
    pub envelope_id: String,
    /// Trace id propagated across services.
    pub trace_id: String,
    /// When the envelope was produced.
    pub submitted_at: DateTime<Utc>,

    /// What is being invoked.
    pub capability: CapabilityRef,
    /// Autonomy level the caller declares for this invocation.
    pub autonomy_level: u8,
    /// Whether the caller itself asks for human approval. A rule's
    /// `require_approval` override takes precedence when set.
    pub requires_approval: bool,

    /// Who is acting.
    pub actor: String,
    /// Where the invocation originated (chat channel, API surface, ...).
    pub channel: String,
    /// Caller-side invocation id, carried into proposals for correlation.
    pub invocation_id: String,

    /// Explicit approval token from a prior proposal, if the caller has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_token: Option<String>,
    /// Proposal token referenced by a chat reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_proposal_token: Option<String>,
    /// Proposal token referenced by a chat reaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction_to_proposal_token: Option<String>,
    /// Free-text message accompanying the invocation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_text: Option<String>,

    /// Arbitrary capability input. Opaque to the engine except for
    /// [`DISAMBIGUATION_FIELD`].
    #[serde(default)]
    pub input: Value,
}

impl CapabilityInvocationRequest {
    /// Parse the `_policy_disambiguation` candidate list from the payload.
    ///
    /// A payload that is absent or does not deserialize as a candidate list
    /// is treated as no candidates.
    pub fn disambiguation_candidates(&self) -> Vec<DisambiguationCandidate> {
        self.input
            .get(DISAMBIGUATION_FIELD)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }
}
