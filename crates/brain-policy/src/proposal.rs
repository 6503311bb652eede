// proposal.rs — Proposal factory.
//
// The proposal token is a content digest over the request fields that
// identify "the same ask": capability id, version, actor, channel, and the
// input payload. A byte-identical retry therefore derives the same token,
// which together with the store's token-idempotent append keeps proposal
// creation idempotent even when a retry slips past the dedupe guard.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use brain_contracts::{ApprovalProposal, CapabilityInvocationRequest};

use crate::hash::sha256_hex_truncated;

/// Length of a proposal token: the first 16 hex characters of the digest.
pub const PROPOSAL_TOKEN_LEN: usize = 16;

/// Derive the deterministic proposal token for a request.
///
/// The seed object serializes with sorted keys (serde_json maps are
/// BTree-backed), so the digest is stable across processes.
pub fn proposal_token(request: &CapabilityInvocationRequest) -> String {
    let seed = json!({
        "actor": request.actor,
        "capability_id": request.capability.canonical_id(),
        "channel": request.channel,
        "input": request.input,
        "version": request.capability.version,
    });
    sha256_hex_truncated(&seed.to_string(), PROPOSAL_TOKEN_LEN)
}

/// Build a time-boxed proposal for a request awaiting human approval.
pub fn build_proposal(
    request: &CapabilityInvocationRequest,
    policy_regime_id: Uuid,
    approval_ttl_seconds: i64,
    now: DateTime<Utc>,
) -> ApprovalProposal {
    let capability_id = request.capability.canonical_id();
    ApprovalProposal {
        proposal_token: proposal_token(request),
        summary: format!(
            "Approve {} v{} for {} in {}",
            capability_id, request.capability.version, request.actor, request.channel
        ),
        capability_id,
        capability_version: request.capability.version.clone(),
        actor: request.actor.clone(),
        channel: request.channel.clone(),
        trace_id: request.trace_id.clone(),
        invocation_id: request.invocation_id.clone(),
        policy_regime_id,
        created_at: now,
        expires_at: now + Duration::seconds(approval_ttl_seconds),
    }
}
