// engine.rs — The authorization orchestrator.
//
// `authorize_and_execute` chains the collaborators in a fixed order:
// dedupe check → rule evaluation → approval resolution → persist →
// execute. The allowed decision is persisted BEFORE the callback runs, so
// the audit trail shows what the engine authorized even if the process
// dies mid-execution; a callback veto or failure produces a second,
// post-callback decision row rather than mutating the first.
//
// The public surface is infallible. Store or serialization failures fold
// into a denied result carrying `policy_error` — a caller never has to
// distinguish "the policy said no" from "the engine broke" by error type.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use brain_contracts::{
    ApprovalNotifier, ApprovalProposal, CapabilityInvocationRequest, ExecutionOutcome,
    PolicyDecision, PolicyDecisionLogRow, PolicyDedupeLogRow, PolicyExecutionError,
    PolicyExecutionResult, PolicyRegimeSnapshot, PolicyStore, ReasonCode,
    METADATA_PROPOSAL_TOKEN, OBLIGATION_APPROVAL_REQUIRED,
};

use crate::approval::{ApprovalOutcome, ApprovalResolver};
use crate::config::PolicyServiceConfig;
use crate::dedupe::DedupeGuard;
use crate::error::PolicyServiceError;
use crate::evaluate::evaluate_rules;
use crate::merge::merge_effective_document;
use crate::proposal::build_proposal;
use crate::regime::install_regime;
use crate::retention::apply_retention;

/// Execution callback: runs the capability once authorization passes. A
/// callback may veto by returning `allowed = false` with its own reasons.
pub type ExecuteFn<'a> = Box<
    dyn FnOnce(
            &CapabilityInvocationRequest,
        ) -> Result<ExecutionOutcome, Box<dyn std::error::Error + Send + Sync>>
        + 'a,
>;

/// Service readiness and table sizes, for liveness endpoints.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub service_ready: bool,
    pub policy_regime_id: Uuid,
    pub policy_hash: String,
    pub regime_rows: usize,
    pub decision_rows: usize,
    pub proposal_rows: usize,
    pub dedupe_rows: usize,
    pub detail: String,
}

/// The policy service: owns the active regime, the dedupe guard, and the
/// orchestration flow.
pub struct PolicyService {
    config: PolicyServiceConfig,
    store: Arc<dyn PolicyStore>,
    notifier: Arc<dyn ApprovalNotifier>,
    dedupe: DedupeGuard,
    regime: PolicyRegimeSnapshot,
    effective: brain_contracts::PolicyDocument,
}

impl std::fmt::Debug for PolicyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyService")
            .field("regime", &self.regime)
            .finish_non_exhaustive()
    }
}

impl PolicyService {
    /// Validate the configuration, merge the effective document, install it
    /// as the active regime, and return a ready service.
    pub fn new(
        config: PolicyServiceConfig,
        store: Arc<dyn PolicyStore>,
        notifier: Arc<dyn ApprovalNotifier>,
    ) -> Result<Self, PolicyServiceError> {
        config.validate()?;

        let effective = merge_effective_document(&config.base_document, &config.overlays);
        let regime = install_regime(store.as_ref(), &effective, Utc::now())?;
        info!(
            policy_regime_id = %regime.policy_regime_id,
            policy_hash = %regime.policy_hash,
            policy_id = %regime.policy_id,
            policy_version = %regime.policy_version,
            "policy regime active"
        );

        let dedupe = DedupeGuard::new(config.dedupe_window_seconds);
        Ok(Self {
            config,
            store,
            notifier,
            dedupe,
            regime,
            effective,
        })
    }

    /// The active regime snapshot.
    pub fn active_regime(&self) -> &PolicyRegimeSnapshot {
        &self.regime
    }

    /// Authorize a request and, when allowed, run the execution callback.
    pub fn authorize_and_execute(
        &self,
        request: &CapabilityInvocationRequest,
        execute: ExecuteFn<'_>,
    ) -> PolicyExecutionResult {
        self.authorize_and_execute_at(request, execute, Utc::now())
    }

    /// Same as [`authorize_and_execute`](Self::authorize_and_execute) with
    /// an explicit clock, for deterministic callers.
    pub fn authorize_and_execute_at(
        &self,
        request: &CapabilityInvocationRequest,
        execute: ExecuteFn<'_>,
        now: DateTime<Utc>,
    ) -> PolicyExecutionResult {
        match self.try_authorize_and_execute(request, execute, now) {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    envelope_id = %request.envelope_id,
                    error = %err,
                    "authorization failed internally"
                );
                let mut decision = self.fresh_decision(now);
                decision.deny(ReasonCode::PolicyError);
                self.finish_denied(request, decision, None)
            }
        }
    }

    /// Report readiness and table sizes.
    pub fn health(&self) -> Result<HealthReport, PolicyServiceError> {
        let regime_rows = self.store.list_policy_regimes()?.len();
        let decision_rows = self.store.count_decisions()?;
        let proposal_rows = self.store.count_proposals()?;
        let dedupe_rows = self.store.count_dedupe()?;
        Ok(HealthReport {
            service_ready: true,
            policy_regime_id: self.regime.policy_regime_id,
            policy_hash: self.regime.policy_hash.clone(),
            regime_rows,
            decision_rows,
            proposal_rows,
            dedupe_rows,
            detail: format!(
                "regime {} ({} v{}), {regime_rows} regimes, {decision_rows} decisions, \
                 {proposal_rows} proposals, {dedupe_rows} dedupe rows",
                self.regime.policy_regime_id, self.regime.policy_id, self.regime.policy_version
            ),
        })
    }

    fn try_authorize_and_execute(
        &self,
        request: &CapabilityInvocationRequest,
        execute: ExecuteFn<'_>,
        now: DateTime<Utc>,
    ) -> Result<PolicyExecutionResult, PolicyServiceError> {
        // Phase 1: dedupe. The sighting is recorded before the verdict is
        // acted on, so even a denied duplicate refreshes the window.
        let duplicate = self.dedupe.check(&request.envelope_id, now);
        self.store.append_dedupe(PolicyDedupeLogRow {
            envelope_id: request.envelope_id.clone(),
            capability_id: request.capability.canonical_id(),
            actor: request.actor.clone(),
            channel: request.channel.clone(),
            denied: duplicate,
            seen_at: now,
        })?;

        let mut decision = self.fresh_decision(now);

        if duplicate {
            debug!(envelope_id = %request.envelope_id, "duplicate envelope denied");
            decision.deny(ReasonCode::DedupeDuplicateRequest);
            self.persist_decision(request, &decision)?;
            return Ok(self.denied_result(decision, None));
        }

        // Phase 2: rule evaluation.
        let evaluation = evaluate_rules(&self.effective, request);
        for code in &evaluation.reason_codes {
            decision.deny(*code);
        }

        // Phase 3: approval, only when the rule (or the request, absent a
        // rule-level override) asks for it and nothing else already denied.
        let needs_approval = evaluation
            .rule
            .require_approval
            .unwrap_or(request.requires_approval);
        let mut created_proposal: Option<ApprovalProposal> = None;

        if needs_approval && decision.allowed {
            let resolver = ApprovalResolver::new(
                self.store.as_ref(),
                self.config.auto_bind_threshold,
                self.config.clarify_threshold,
            );
            match resolver.resolve(request, now)? {
                ApprovalOutcome::Approved { proposal_token } => {
                    debug!(
                        envelope_id = %request.envelope_id,
                        proposal_token = %proposal_token,
                        "approval resolved"
                    );
                    decision
                        .metadata
                        .insert(METADATA_PROPOSAL_TOKEN.to_string(), proposal_token);
                }
                ApprovalOutcome::Denied {
                    reason,
                    proposal_token,
                } => {
                    decision.deny(reason);
                    if let Some(token) = proposal_token {
                        decision
                            .metadata
                            .insert(METADATA_PROPOSAL_TOKEN.to_string(), token);
                    }
                }
                ApprovalOutcome::Unresolved => {
                    let proposal = build_proposal(
                        request,
                        self.regime.policy_regime_id,
                        self.config.approval_ttl_seconds,
                        now,
                    );
                    self.store.append_proposal(proposal.clone())?;
                    info!(
                        envelope_id = %request.envelope_id,
                        proposal_token = %proposal.proposal_token,
                        "approval proposal created"
                    );

                    decision.deny(ReasonCode::ApprovalRequired);
                    decision.push_obligation(OBLIGATION_APPROVAL_REQUIRED);
                    decision.metadata.insert(
                        METADATA_PROPOSAL_TOKEN.to_string(),
                        proposal.proposal_token.clone(),
                    );

                    if !self.notifier.notify_approval(&proposal) {
                        warn!(
                            proposal_token = %proposal.proposal_token,
                            "approval notification failed"
                        );
                        decision.push_reason(ReasonCode::ApprovalNotificationFailed);
                    }
                    created_proposal = Some(proposal);
                }
            }
        }

        // Phase 4: persist the decision for this attempt, then trim.
        self.persist_decision(request, &decision)?;

        if !decision.allowed {
            return Ok(self.denied_result(decision, created_proposal));
        }

        // Phase 5: execute. The allowed decision is already on record.
        match execute(request) {
            Ok(outcome) if outcome.allowed => Ok(PolicyExecutionResult {
                allowed: true,
                output: outcome.output,
                errors: Vec::new(),
                decision,
                proposal: None,
            }),
            Ok(outcome) => {
                // Callback veto: a second decision row records it.
                let mut post = self.fresh_decision(now);
                post.metadata = decision.metadata.clone();
                if outcome.reason_codes.is_empty() {
                    post.deny(ReasonCode::ExecutionDenied);
                } else {
                    for code in outcome.reason_codes {
                        post.deny(code);
                    }
                }
                self.persist_decision(request, &post)?;
                Ok(self.denied_result(post, None))
            }
            Err(err) => {
                warn!(
                    envelope_id = %request.envelope_id,
                    error = %err,
                    "execution callback failed"
                );
                let mut post = self.fresh_decision(now);
                post.metadata = decision.metadata.clone();
                post.deny(ReasonCode::ExecutionDenied);
                post.push_reason(ReasonCode::PolicyError);
                self.persist_decision(request, &post)?;
                Ok(self.denied_result(post, None))
            }
        }
    }

    fn fresh_decision(&self, now: DateTime<Utc>) -> PolicyDecision {
        PolicyDecision {
            decision_id: Uuid::new_v4(),
            policy_regime_id: self.regime.policy_regime_id,
            policy_hash: self.regime.policy_hash.clone(),
            policy_id: self.regime.policy_id.clone(),
            policy_version: self.regime.policy_version.clone(),
            allowed: true,
            reason_codes: Vec::new(),
            obligations: Vec::new(),
            metadata: BTreeMap::new(),
            decided_at: now,
        }
    }

    fn persist_decision(
        &self,
        request: &CapabilityInvocationRequest,
        decision: &PolicyDecision,
    ) -> Result<(), PolicyServiceError> {
        self.store.append_decision(PolicyDecisionLogRow {
            decision_id: decision.decision_id,
            envelope_id: request.envelope_id.clone(),
            capability_id: request.capability.canonical_id(),
            actor: request.actor.clone(),
            channel: request.channel.clone(),
            allowed: decision.allowed,
            reason_codes: decision.reason_codes.clone(),
            policy_regime_id: decision.policy_regime_id,
            decided_at: decision.decided_at,
        })?;
        apply_retention(&self.config.retention, self.store.as_ref(), decision.decided_at)?;
        Ok(())
    }

    fn denied_result(
        &self,
        decision: PolicyDecision,
        proposal: Option<ApprovalProposal>,
    ) -> PolicyExecutionResult {
        let errors = decision
            .reason_codes
            .iter()
            .map(|code| PolicyExecutionError {
                code: *code,
                message: match (code, decision.proposal_token()) {
                    (ReasonCode::ApprovalRequired, Some(token)) => {
                        format!("{} (proposal token: {token})", code.describe())
                    }
                    _ => code.describe().to_string(),
                },
            })
            .collect();
        PolicyExecutionResult {
            allowed: false,
            output: serde_json::Value::Null,
            errors,
            decision,
            proposal,
        }
    }

    // Internal-error fallback path: best-effort persistence, never errors.
    fn finish_denied(
        &self,
        request: &CapabilityInvocationRequest,
        decision: PolicyDecision,
        proposal: Option<ApprovalProposal>,
    ) -> PolicyExecutionResult {
        if self.persist_decision(request, &decision).is_err() {
            warn!(
                envelope_id = %request.envelope_id,
                "could not persist policy_error decision"
            );
        }
        self.denied_result(decision, proposal)
    }
}
