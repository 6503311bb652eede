// regime.rs — Content-addressed policy regime snapshots.
//
// A regime is one immutable snapshot of the fully-merged effective policy
// document. The content hash is the dedup key: re-deriving the same
// effective document must resolve to the same existing regime, never a
// duplicate row. Exactly one regime is active at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::policy::PolicyDocument;

/// One content-hashed snapshot of an effective policy document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyRegimeSnapshot {
    /// Unique id of this regime.
    pub policy_regime_id: Uuid,
    /// SHA-256 (lowercase hex) of the canonical document serialization.
    /// Unique across regimes.
    pub policy_hash: String,
    /// The canonical serialized effective document.
    pub document_json: String,
    /// Name of the source policy document.
    pub policy_id: String,
    /// Version label of the source policy document.
    pub policy_version: String,
    /// When this regime was first stored.
    pub created_at: DateTime<Utc>,
}

impl PolicyRegimeSnapshot {
    /// Deserialize the stored effective document.
    pub fn document(&self) -> Result<PolicyDocument, serde_json::Error> {
        serde_json::from_str(&self.document_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn stored_document_round_trips() {
        let doc = PolicyDocument {
            policy_id: "brain-default".to_string(),
            policy_version: "3".to_string(),
            rules: BTreeMap::new(),
        };
        let snapshot = PolicyRegimeSnapshot {
            policy_regime_id: Uuid::new_v4(),
            policy_hash: "00".repeat(32),
            document_json: serde_json::to_string(&doc).unwrap(),
            policy_id: doc.policy_id.clone(),
            policy_version: doc.policy_version.clone(),
            created_at: Utc::now(),
        };
        assert_eq!(snapshot.document().unwrap(), doc);
    }
}
