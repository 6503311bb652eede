// regime.rs — Regime versioning: canonical serialization, hashing, upsert.
//
// The effective document serializes with stable key ordering (all document
// collections are BTree-backed), so its SHA-256 is a content address.
// Installing a regime is idempotent: the store's upsert returns the
// existing snapshot when the hash is already known, and the active pointer
// is moved to whichever snapshot won.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use brain_contracts::{PolicyDocument, PolicyRegimeSnapshot, PolicyStore};

use crate::error::PolicyServiceError;
use crate::hash::sha256_hex;

/// Serialize the document canonically (stable key ordering).
pub fn canonical_document_json(document: &PolicyDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string(document)
}

/// Content hash of the document's canonical serialization.
pub fn document_hash(document: &PolicyDocument) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(&canonical_document_json(document)?))
}

/// Store the document as a regime snapshot (reusing an existing snapshot
/// with the same hash) and make it the active regime.
pub fn install_regime(
    store: &dyn PolicyStore,
    document: &PolicyDocument,
    now: DateTime<Utc>,
) -> Result<PolicyRegimeSnapshot, PolicyServiceError> {
    let document_json = canonical_document_json(document)?;
    let policy_hash = sha256_hex(&document_json);

    let snapshot = store.upsert_policy_regime(PolicyRegimeSnapshot {
        policy_regime_id: Uuid::new_v4(),
        policy_hash,
        document_json,
        policy_id: document.policy_id.clone(),
        policy_version: document.policy_version.clone(),
        created_at: now,
    })?;
    store.set_active_policy_regime(snapshot.policy_regime_id)?;

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPolicyStore;
    use brain_contracts::PolicyRule;
    use std::collections::BTreeMap;

    fn document(version: &str, ceiling: Option<u8>) -> PolicyDocument {
        let mut rules = BTreeMap::new();
        rules.insert(
            "*".to_string(),
            PolicyRule {
                autonomy_ceiling: ceiling,
                ..PolicyRule::default()
            },
        );
        PolicyDocument {
            policy_id: "brain-default".to_string(),
            policy_version: version.to_string(),
            rules,
        }
    }

    #[test]
    fn hash_is_stable_for_equal_documents() {
        let a = document("1", Some(2));
        let b = document("1", Some(2));
        assert_eq!(document_hash(&a).unwrap(), document_hash(&b).unwrap());
    }

    #[test]
    fn hash_changes_when_a_rule_changes() {
        let a = document("1", Some(2));
        let b = document("1", Some(3));
        assert_ne!(document_hash(&a).unwrap(), document_hash(&b).unwrap());
    }

    #[test]
    fn install_twice_reuses_the_same_regime() {
        let store = MemoryPolicyStore::new();
        let doc = document("1", Some(2));

        let first = install_regime(&store, &doc, Utc::now()).unwrap();
        let second = install_regime(&store, &doc, Utc::now()).unwrap();

        assert_eq!(first.policy_regime_id, second.policy_regime_id);
        assert_eq!(store.list_policy_regimes().unwrap().len(), 1);
        assert_eq!(
            store.get_active_policy_regime_id().unwrap(),
            Some(first.policy_regime_id)
        );
    }

    #[test]
    fn changed_document_installs_a_new_regime_and_moves_the_pointer() {
        let store = MemoryPolicyStore::new();

        let first = install_regime(&store, &document("1", Some(2)), Utc::now()).unwrap();
        let second = install_regime(&store, &document("1", Some(3)), Utc::now()).unwrap();

        assert_ne!(first.policy_regime_id, second.policy_regime_id);
        assert_eq!(store.list_policy_regimes().unwrap().len(), 2);
        assert_eq!(
            store.get_active_policy_regime_id().unwrap(),
            Some(second.policy_regime_id)
        );
    }
}
