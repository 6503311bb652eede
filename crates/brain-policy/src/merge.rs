// merge.rs — Overlay merging into one effective policy document.
//
// Overlays apply in name order, ascending. For each overlay the `unset`
// paths run first — restoring the named field to the base document's value
// (or the field default when the base has no rule for that capability) —
// then the patch fields merge in, winning over any prior value.
//
// Unset paths are `rules.<capability_id>.<field>`. The field is taken from
// the segment after the *last* dot so capability ids may themselves contain
// dots. Malformed paths and unknown fields are ignored: overlay
// configuration is reviewed operator input, not adversarial.

use brain_contracts::{PolicyDocument, PolicyOverlay, PolicyRule, RulePatch};

/// The enumerated set of rule fields an unset path may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleField {
    Enabled,
    ActorsAllow,
    ActorsDeny,
    ChannelsAllow,
    ChannelsDeny,
    AutonomyCeiling,
    RequireApproval,
}

impl RuleField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "enabled" => Some(RuleField::Enabled),
            "actors_allow" => Some(RuleField::ActorsAllow),
            "actors_deny" => Some(RuleField::ActorsDeny),
            "channels_allow" => Some(RuleField::ChannelsAllow),
            "channels_deny" => Some(RuleField::ChannelsDeny),
            "autonomy_ceiling" => Some(RuleField::AutonomyCeiling),
            "require_approval" => Some(RuleField::RequireApproval),
            _ => None,
        }
    }
}

/// Merge the base document with its overlays into the effective document.
///
/// Deterministic: the same inputs always produce the same output, which is
/// what makes regime hashing stable.
pub fn merge_effective_document(
    base: &PolicyDocument,
    overlays: &[PolicyOverlay],
) -> PolicyDocument {
    let mut effective = base.clone();

    let mut ordered: Vec<&PolicyOverlay> = overlays.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));

    for overlay in ordered {
        for path in &overlay.unset {
            let Some((capability_id, field)) = parse_unset_path(path) else {
                tracing::debug!(overlay = %overlay.name, path = %path, "ignoring malformed unset path");
                continue;
            };
            if let Some(rule) = effective.rules.get_mut(capability_id) {
                restore_field(rule, base.rules.get(capability_id), field);
            }
        }

        for (capability_id, patch) in &overlay.rules {
            let rule = effective.rules.entry(capability_id.clone()).or_default();
            apply_patch(rule, patch);
        }
    }

    effective
}

/// Parse `rules.<capability_id>.<field>`, taking the field from the
/// rightmost segment. Returns `None` for anything malformed.
fn parse_unset_path(path: &str) -> Option<(&str, RuleField)> {
    let rest = path.strip_prefix("rules.")?;
    let (capability_id, field_name) = rest.rsplit_once('.')?;
    if capability_id.is_empty() {
        return None;
    }
    let field = RuleField::from_name(field_name)?;
    Some((capability_id, field))
}

/// Reset one field of `rule` to the base document's value, or the field
/// default when the base has no rule for this capability.
fn restore_field(rule: &mut PolicyRule, base_rule: Option<&PolicyRule>, field: RuleField) {
    let fallback = base_rule.cloned().unwrap_or_default();
    match field {
        RuleField::Enabled => rule.enabled = fallback.enabled,
        RuleField::ActorsAllow => rule.actors_allow = fallback.actors_allow,
        RuleField::ActorsDeny => rule.actors_deny = fallback.actors_deny,
        RuleField::ChannelsAllow => rule.channels_allow = fallback.channels_allow,
        RuleField::ChannelsDeny => rule.channels_deny = fallback.channels_deny,
        RuleField::AutonomyCeiling => rule.autonomy_ceiling = fallback.autonomy_ceiling,
        RuleField::RequireApproval => rule.require_approval = fallback.require_approval,
    }
}

/// Merge present patch fields into `rule`. Patch wins over any prior value.
fn apply_patch(rule: &mut PolicyRule, patch: &RulePatch) {
    if let Some(enabled) = patch.enabled {
        rule.enabled = enabled;
    }
    if let Some(actors_allow) = &patch.actors_allow {
        rule.actors_allow = actors_allow.clone();
    }
    if let Some(actors_deny) = &patch.actors_deny {
        rule.actors_deny = actors_deny.clone();
    }
    if let Some(channels_allow) = &patch.channels_allow {
        rule.channels_allow = channels_allow.clone();
    }
    if let Some(channels_deny) = &patch.channels_deny {
        rule.channels_deny = channels_deny.clone();
    }
    if let Some(ceiling) = patch.autonomy_ceiling {
        rule.autonomy_ceiling = Some(ceiling);
    }
    if let Some(require_approval) = patch.require_approval {
        rule.require_approval = Some(require_approval);
    }
}
