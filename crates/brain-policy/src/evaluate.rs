// evaluate.rs — Rule evaluation against the effective document.
//
// Resolves the capability-specific rule (wildcard fallback; an unknown
// target short-circuits with `unknown_call_target` and a synthetic
// disabled rule) and collects every applicable violation rather than
// stopping at the first, so one decision can report all the reasons a
// request was denied. The check order is fixed:
//
// 1. disabled
// 2. actor deny-listed
// 3. actor not allow-listed (only when the allow list is non-empty)
// 4. channel deny-listed
// 5. channel not allow-listed (only when the allow list is non-empty)
// 6. autonomy ceiling exceeded (only when a ceiling is set)

use brain_contracts::{CapabilityInvocationRequest, PolicyDocument, PolicyRule, ReasonCode};

/// The outcome of matching one request against the document's rules.
#[derive(Debug, Clone)]
pub struct RuleEvaluation {
    /// Violations found, in check order.
    pub reason_codes: Vec<ReasonCode>,
    /// The rule the request resolved to (synthetic disabled rule when no
    /// rule and no wildcard matched).
    pub rule: PolicyRule,
}

/// Match a request against the document and collect all violations.
pub fn evaluate_rules(
    document: &PolicyDocument,
    request: &CapabilityInvocationRequest,
) -> RuleEvaluation {
    let capability_id = request.capability.canonical_id();
    let mut reason_codes = Vec::new();

    let Some(rule) = document.resolve_rule(&capability_id).cloned() else {
        // Nothing to check against: the one reason is the unknown target.
        return RuleEvaluation {
            reason_codes: vec![ReasonCode::UnknownCallTarget],
            rule: PolicyRule::disabled(),
        };
    };

    if !rule.enabled {
        reason_codes.push(ReasonCode::CapabilityDisabled);
    }
    if rule.actors_deny.contains(&request.actor) {
        reason_codes.push(ReasonCode::ActorDenied);
    }
    if !rule.actors_allow.is_empty() && !rule.actors_allow.contains(&request.actor) {
        reason_codes.push(ReasonCode::ActorNotAllowed);
    }
    if rule.channels_deny.contains(&request.channel) {
        reason_codes.push(ReasonCode::ChannelDenied);
    }
    if !rule.channels_allow.is_empty() && !rule.channels_allow.contains(&request.channel) {
        reason_codes.push(ReasonCode::ChannelNotAllowed);
    }
    if let Some(ceiling) = rule.autonomy_ceiling {
        if request.autonomy_level > ceiling {
            reason_codes.push(ReasonCode::AutonomyExceedsLimit);
        }
    }

    RuleEvaluation { reason_codes, rule }
}
