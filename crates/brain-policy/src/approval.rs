// approval.rs — The approval resolution state machine.
//
// Runs only when the resolved rule (or the request itself) requires human
// approval. Resolution strategies are tried in a fixed order, first
// success wins:
//
// 1. Explicit token on the request.
// 2. Deterministic correlation — a reply/reaction token, or a free-text
//    affirmative/negative when exactly one proposal is pending for the
//    actor+channel pair.
// 3. Confidence-scored disambiguation over `_policy_disambiguation`
//    candidates, with auto-bind / clarify / ambiguous tiers.
// 4. Unresolved — the orchestrator creates a proposal and notifies.
//
// Pending lookups only ever consider status `pending`; a proposal found
// past its TTL is transitioned to `expired` on the spot and resolves as
// `approval_token_expired`, never `approval_token_invalid`.

use chrono::{DateTime, Utc};

use brain_contracts::{
    ApprovalProposal, CapabilityInvocationRequest, DisambiguationCandidate, PolicyStore,
    ProposalStatus, ReasonCode, StoreError,
};

/// Replies that approve the single pending proposal for an actor+channel.
const AFFIRMATIVE_REPLIES: &[&str] = &["approve", "yes", "ok", "ship it", "do it"];

/// Replies that reject it.
const NEGATIVE_REPLIES: &[&str] = &["deny", "no", "reject", "cancel"];

/// How one resolution pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// A pending proposal was approved; the invocation may proceed.
    Approved { proposal_token: String },
    /// Resolution failed with a specific reason; no new proposal is needed.
    Denied {
        reason: ReasonCode,
        proposal_token: Option<String>,
    },
    /// Nothing on the request resolved approval; a proposal must be
    /// created and a human notified.
    Unresolved,
}

/// Resolves approval state for one request against the proposal store.
pub struct ApprovalResolver<'a> {
    store: &'a dyn PolicyStore,
    auto_bind_threshold: f64,
    clarify_threshold: f64,
}

impl<'a> ApprovalResolver<'a> {
    pub fn new(store: &'a dyn PolicyStore, auto_bind_threshold: f64, clarify_threshold: f64) -> Self {
        Self {
            store,
            auto_bind_threshold,
            clarify_threshold,
        }
    }

    /// Run the resolution strategies in order.
    pub fn resolve(
        &self,
        request: &CapabilityInvocationRequest,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, StoreError> {
        // Step 1: explicit token.
        if let Some(token) = non_empty(request.approval_token.as_deref()) {
            return self.resolve_token(token, request, now);
        }

        // Step 2: deterministic correlation.
        let correlated = non_empty(request.reply_to_proposal_token.as_deref())
            .or_else(|| non_empty(request.reaction_to_proposal_token.as_deref()));
        if let Some(token) = correlated {
            return self.resolve_token(token, request, now);
        }
        if let Some(text) = non_empty(request.message_text.as_deref()) {
            if let Some(outcome) = self.resolve_text(text, request, now)? {
                return Ok(outcome);
            }
        }

        // Step 3: confidence-scored disambiguation.
        let candidates = request.disambiguation_candidates();
        if let Some(best) = best_candidate(&candidates) {
            return self.resolve_candidate(best, request, now);
        }

        Ok(ApprovalOutcome::Unresolved)
    }

    /// Validate a token against its pending proposal: existence, expiry
    /// (opportunistically transitioned), then actor/channel binding.
    fn resolve_token(
        &self,
        token: &str,
        request: &CapabilityInvocationRequest,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, StoreError> {
        let Some(proposal) = self.store.find_pending_proposal(token)? else {
            return Ok(ApprovalOutcome::Denied {
                reason: ReasonCode::ApprovalTokenInvalid,
                proposal_token: None,
            });
        };

        if proposal.is_expired(now) {
            self.store
                .mark_proposal_status(token, ProposalStatus::Expired)?;
            return Ok(ApprovalOutcome::Denied {
                reason: ReasonCode::ApprovalTokenExpired,
                proposal_token: Some(token.to_string()),
            });
        }

        if proposal.actor != request.actor || proposal.channel != request.channel {
            return Ok(ApprovalOutcome::Denied {
                reason: ReasonCode::ApprovalTokenInvalid,
                proposal_token: Some(token.to_string()),
            });
        }

        self.store
            .mark_proposal_status(token, ProposalStatus::Approved)?;
        Ok(ApprovalOutcome::Approved {
            proposal_token: token.to_string(),
        })
    }

    /// Free-text resolution: only applies when exactly one proposal is
    /// pending for this actor+channel. Returns `None` to fall through.
    fn resolve_text(
        &self,
        text: &str,
        request: &CapabilityInvocationRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<ApprovalOutcome>, StoreError> {
        let pending = self.pending_for(&request.actor, &request.channel, now)?;
        if pending.len() != 1 {
            return Ok(None);
        }
        let proposal = &pending[0];

        let normalized = text.trim().to_lowercase();
        if AFFIRMATIVE_REPLIES.contains(&normalized.as_str()) {
            self.store
                .mark_proposal_status(&proposal.proposal_token, ProposalStatus::Approved)?;
            return Ok(Some(ApprovalOutcome::Approved {
                proposal_token: proposal.proposal_token.clone(),
            }));
        }
        if NEGATIVE_REPLIES.contains(&normalized.as_str()) {
            self.store
                .mark_proposal_status(&proposal.proposal_token, ProposalStatus::Rejected)?;
            return Ok(Some(ApprovalOutcome::Denied {
                reason: ReasonCode::ApprovalRequired,
                proposal_token: Some(proposal.proposal_token.clone()),
            }));
        }
        Ok(None)
    }

    /// Resolve the highest-confidence disambiguation candidate through the
    /// auto-bind / clarify / ambiguous tiers.
    fn resolve_candidate(
        &self,
        best: &DisambiguationCandidate,
        request: &CapabilityInvocationRequest,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, StoreError> {
        if best.confidence >= self.auto_bind_threshold {
            return self.resolve_token(&best.proposal_token, request, now);
        }

        if best.confidence >= self.clarify_threshold {
            let attempts = match self
                .store
                .increment_proposal_clarification_attempts(&best.proposal_token)
            {
                Ok(attempts) => attempts,
                Err(StoreError::ProposalNotFound { .. }) => {
                    return Ok(ApprovalOutcome::Denied {
                        reason: ReasonCode::ApprovalTokenInvalid,
                        proposal_token: Some(best.proposal_token.clone()),
                    });
                }
                Err(other) => return Err(other),
            };
            let reason = if attempts > 1 {
                ReasonCode::ApprovalAmbiguous
            } else {
                ReasonCode::ApprovalClarificationRequired
            };
            return Ok(ApprovalOutcome::Denied {
                reason,
                proposal_token: Some(best.proposal_token.clone()),
            });
        }

        Ok(ApprovalOutcome::Denied {
            reason: ReasonCode::ApprovalAmbiguous,
            proposal_token: Some(best.proposal_token.clone()),
        })
    }

    /// Pending, non-expired proposals for an actor+channel. Proposals found
    /// past their TTL are transitioned to `expired` here.
    fn pending_for(
        &self,
        actor: &str,
        channel: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ApprovalProposal>, StoreError> {
        let mut live = Vec::new();
        for proposal in self.store.list_pending_proposals(actor, channel)? {
            if proposal.is_expired(now) {
                self.store
                    .mark_proposal_status(&proposal.proposal_token, ProposalStatus::Expired)?;
            } else {
                live.push(proposal);
            }
        }
        Ok(live)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn best_candidate(candidates: &[DisambiguationCandidate]) -> Option<&DisambiguationCandidate> {
    candidates.iter().max_by(|a, b| {
        a.confidence
            .partial_cmp(&b.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}
