// policy.rs — Policy documents, rules, and overlays.
//
// A PolicyDocument is the immutable value object the engine evaluates
// requests against: a named, versioned map of capability-id → PolicyRule,
// with "*" as the wildcard fallback rule. Overlays patch a base document;
// merging them into one effective document happens in the engine crate.
//
// All collections are BTree-backed so serialization is deterministic —
// the regime content hash depends on stable key ordering.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The capability id that acts as the fallback rule for any capability
/// without its own entry.
pub const WILDCARD_CAPABILITY: &str = "*";

/// A per-capability gate inside a policy document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyRule {
    /// Whether the capability may execute at all. Defaults to enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Actors explicitly permitted. Empty means "no allow-list enforcement".
    #[serde(default)]
    pub actors_allow: BTreeSet<String>,

    /// Actors explicitly forbidden. Deny wins over allow.
    #[serde(default)]
    pub actors_deny: BTreeSet<String>,

    /// Channels explicitly permitted. Empty means "no allow-list enforcement".
    #[serde(default)]
    pub channels_allow: BTreeSet<String>,

    /// Channels explicitly forbidden. Deny wins over allow.
    #[serde(default)]
    pub channels_deny: BTreeSet<String>,

    /// Maximum autonomy level a request may declare for this capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomy_ceiling: Option<u8>,

    /// Tri-state approval override: `Some(true)` forces approval,
    /// `Some(false)` waives it, `None` defers to the request's own flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_approval: Option<bool>,
}

fn default_enabled() -> bool {
    true
}

impl Default for PolicyRule {
    fn default() -> Self {
        Self {
            enabled: true,
            actors_allow: BTreeSet::new(),
            actors_deny: BTreeSet::new(),
            channels_allow: BTreeSet::new(),
            channels_deny: BTreeSet::new(),
            autonomy_ceiling: None,
            require_approval: None,
        }
    }
}

impl PolicyRule {
    /// The synthetic rule used when no rule (and no wildcard) matches a
    /// capability: everything denied.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// A named, versioned set of per-capability rules. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyDocument {
    /// Stable name of the policy (e.g. "brain-default").
    pub policy_id: String,

    /// Version label of the policy (free-form, operator-assigned).
    pub policy_version: String,

    /// Capability-id → rule. `*` is the fallback entry.
    #[serde(default)]
    pub rules: BTreeMap<String, PolicyRule>,
}

impl PolicyDocument {
    /// Resolve the rule for a capability, falling back to the wildcard
    /// entry. Returns `None` when neither exists.
    pub fn resolve_rule(&self, capability_id: &str) -> Option<&PolicyRule> {
        self.rules
            .get(capability_id)
            .or_else(|| self.rules.get(WILDCARD_CAPABILITY))
    }
}

/// A partial rule: only present fields override the current value.
///
/// Clearing a previously-set field is expressed through an overlay's
/// `unset` paths, not through the patch itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RulePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actors_allow: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actors_deny: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels_allow: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels_deny: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomy_ceiling: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_approval: Option<bool>,
}

/// A named patch applied on top of the base policy document.
///
/// Overlays are applied sorted by `name` ascending. For each overlay the
/// `unset` paths run first (restoring fields to the base document's value),
/// then the rule patches are merged in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyOverlay {
    /// Sort key for deterministic apply ordering (e.g. "001-weekend").
    pub name: String,

    /// Capability-id → partial rule patch.
    #[serde(default)]
    pub rules: BTreeMap<String, RulePatch>,

    /// Dotted paths `rules.<capability_id>.<field>` to reset before the
    /// patches apply. Malformed paths are ignored.
    #[serde(default)]
    pub unset: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_defaults_to_enabled_with_no_constraints() {
        let rule = PolicyRule::default();
        assert!(rule.enabled);
        assert!(rule.actors_allow.is_empty());
        assert!(rule.autonomy_ceiling.is_none());
        assert!(rule.require_approval.is_none());
    }

    #[test]
    fn disabled_rule_denies() {
        assert!(!PolicyRule::disabled().enabled);
    }

    #[test]
    fn resolve_rule_prefers_exact_over_wildcard() {
        let mut rules = BTreeMap::new();
        rules.insert(
            "capability:demo/send".to_string(),
            PolicyRule {
                autonomy_ceiling: Some(1),
                ..PolicyRule::default()
            },
        );
        rules.insert(WILDCARD_CAPABILITY.to_string(), PolicyRule::disabled());
        let doc = PolicyDocument {
            policy_id: "p".to_string(),
            policy_version: "1".to_string(),
            rules,
        };

        let exact = doc.resolve_rule("capability:demo/send").unwrap();
        assert_eq!(exact.autonomy_ceiling, Some(1));

        let fallback = doc.resolve_rule("capability:demo/other").unwrap();
        assert!(!fallback.enabled);
    }

    #[test]
    fn resolve_rule_none_without_wildcard() {
        let doc = PolicyDocument {
            policy_id: "p".to_string(),
            policy_version: "1".to_string(),
            rules: BTreeMap::new(),
        };
        assert!(doc.resolve_rule("capability:demo/x").is_none());
    }

    #[test]
    fn document_serialization_is_key_ordered() {
        let mut rules = BTreeMap::new();
        rules.insert("b".to_string(), PolicyRule::default());
        rules.insert("a".to_string(), PolicyRule::default());
        let doc = PolicyDocument {
            policy_id: "p".to_string(),
            policy_version: "1".to_string(),
            rules,
        };

        let json = serde_json::to_string(&doc).unwrap();
        // BTreeMap guarantees "a" serializes before "b" regardless of
        // insertion order.
        assert!(json.find("\"a\"").unwrap() < json.find("\"b\"").unwrap());
    }

    #[test]
    fn rule_deserializes_with_defaults() {
        let rule: PolicyRule = serde_json::from_str("{}").unwrap();
        assert_eq!(rule, PolicyRule::default());
    }

    #[test]
    fn overlay_deserializes_from_yaml_shape() {
        let json = r#"{
            "name": "001-weekend",
            "rules": { "capability:demo/send": { "enabled": false } },
            "unset": ["rules.capability:demo/send.autonomy_ceiling"]
        }"#;
        let overlay: PolicyOverlay = serde_json::from_str(json).unwrap();
        assert_eq!(overlay.name, "001-weekend");
        assert_eq!(
            overlay.rules["capability:demo/send"].enabled,
            Some(false)
        );
        assert_eq!(overlay.unset.len(), 1);
    }
}
