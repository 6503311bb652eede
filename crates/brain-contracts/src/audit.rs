// audit.rs — Append-only audit rows.
//
// One decision row per evaluation attempt and one dedupe row per dedupe
// check. Rows are never mutated after append; the only thing that removes
// them is retention trimming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reason::ReasonCode;

/// Audit record of one policy evaluation attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyDecisionLogRow {
    /// Id of the decision this row records.
    pub decision_id: Uuid,
    /// Envelope id of the evaluated request.
    pub envelope_id: String,
    /// Canonical capability id of the evaluated request.
    pub capability_id: String,
    /// Acting identity.
    pub actor: String,
    /// Originating channel.
    pub channel: String,
    /// Outcome of the attempt.
    pub allowed: bool,
    /// Reasons recorded on the decision.
    pub reason_codes: Vec<ReasonCode>,
    /// Regime the request was evaluated against.
    pub policy_regime_id: Uuid,
    /// When the decision was made.
    pub decided_at: DateTime<Utc>,
}

/// Audit record of one dedupe check.
///
/// Appended on every check — `denied` says whether the envelope was judged
/// a duplicate inside the window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyDedupeLogRow {
    /// Envelope id that was checked.
    pub envelope_id: String,
    /// Canonical capability id of the request carrying the envelope.
    pub capability_id: String,
    /// Acting identity.
    pub actor: String,
    /// Originating channel.
    pub channel: String,
    /// Whether the check flagged a duplicate.
    pub denied: bool,
    /// When the sighting was recorded.
    pub seen_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_row_serializes_denied_flag() {
        let row = PolicyDedupeLogRow {
            envelope_id: "env-1".to_string(),
            capability_id: "capability:demo/demo-x".to_string(),
            actor: "alice".to_string(),
            channel: "ops".to_string(),
            denied: true,
            seen_at: Utc::now(),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"denied\":true"));
    }
}
