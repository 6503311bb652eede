// memory.rs — In-memory reference implementation of the persistence
// contract.
//
// Backs the test suite and small single-process deployments. A single
// mutex over the whole state gives the per-operation atomicity the trait
// asks for; poisoning is recovered because no operation leaves the state
// half-written.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use brain_contracts::{
    ApprovalProposal, PolicyDecisionLogRow, PolicyDedupeLogRow, PolicyRegimeSnapshot, PolicyStore,
    ProposalStatus, StoreError,
};

struct ProposalRow {
    proposal: ApprovalProposal,
    status: ProposalStatus,
    clarification_attempts: u32,
}

#[derive(Default)]
struct Inner {
    regimes: Vec<PolicyRegimeSnapshot>,
    active_regime_id: Option<Uuid>,
    decisions: Vec<PolicyDecisionLogRow>,
    // Keyed by token; insertion time lives on the proposal itself.
    proposals: BTreeMap<String, ProposalRow>,
    dedupe: Vec<PolicyDedupeLogRow>,
}

/// Mutex-guarded in-memory policy store.
pub struct MemoryPolicyStore {
    inner: Mutex<Inner>,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current status of a proposal, for assertions in tests.
    pub fn proposal_status(&self, token: &str) -> Option<ProposalStatus> {
        self.lock().proposals.get(token).map(|row| row.status)
    }

    /// Clarification counter of a proposal, for assertions in tests.
    pub fn clarification_attempts(&self, token: &str) -> Option<u32> {
        self.lock()
            .proposals
            .get(token)
            .map(|row| row.clarification_attempts)
    }
}

impl Default for MemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn upsert_policy_regime(
        &self,
        snapshot: PolicyRegimeSnapshot,
    ) -> Result<PolicyRegimeSnapshot, StoreError> {
        let mut inner = self.lock();
        if let Some(existing) = inner
            .regimes
            .iter()
            .find(|r| r.policy_hash == snapshot.policy_hash)
        {
            return Ok(existing.clone());
        }
        inner.regimes.push(snapshot.clone());
        Ok(snapshot)
    }

    fn set_active_policy_regime(&self, regime_id: Uuid) -> Result<(), StoreError> {
        self.lock().active_regime_id = Some(regime_id);
        Ok(())
    }

    fn get_active_policy_regime_id(&self) -> Result<Option<Uuid>, StoreError> {
        Ok(self.lock().active_regime_id)
    }

    fn list_policy_regimes(&self) -> Result<Vec<PolicyRegimeSnapshot>, StoreError> {
        Ok(self.lock().regimes.clone())
    }

    fn append_decision(&self, row: PolicyDecisionLogRow) -> Result<(), StoreError> {
        self.lock().decisions.push(row);
        Ok(())
    }

    fn count_decisions(&self) -> Result<usize, StoreError> {
        Ok(self.lock().decisions.len())
    }

    fn append_proposal(&self, proposal: ApprovalProposal) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner
            .proposals
            .entry(proposal.proposal_token.clone())
            .or_insert(ProposalRow {
                proposal,
                status: ProposalStatus::Pending,
                clarification_attempts: 0,
            });
        Ok(())
    }

    fn find_pending_proposal(
        &self,
        token: &str,
    ) -> Result<Option<ApprovalProposal>, StoreError> {
        Ok(self
            .lock()
            .proposals
            .get(token)
            .filter(|row| row.status == ProposalStatus::Pending)
            .map(|row| row.proposal.clone()))
    }

    fn list_pending_proposals(
        &self,
        actor: &str,
        channel: &str,
    ) -> Result<Vec<ApprovalProposal>, StoreError> {
        let inner = self.lock();
        let mut matches: Vec<ApprovalProposal> = inner
            .proposals
            .values()
            .filter(|row| {
                row.status == ProposalStatus::Pending
                    && row.proposal.actor == actor
                    && row.proposal.channel == channel
            })
            .map(|row| row.proposal.clone())
            .collect();
        matches.sort_by_key(|p| p.created_at);
        Ok(matches)
    }

    fn mark_proposal_status(
        &self,
        token: &str,
        status: ProposalStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let row = inner
            .proposals
            .get_mut(token)
            .ok_or_else(|| StoreError::ProposalNotFound {
                token: token.to_string(),
            })?;
        if !row.status.is_terminal() {
            row.status = status;
        }
        Ok(())
    }

    fn increment_proposal_clarification_attempts(
        &self,
        token: &str,
    ) -> Result<u32, StoreError> {
        let mut inner = self.lock();
        let row = inner
            .proposals
            .get_mut(token)
            .ok_or_else(|| StoreError::ProposalNotFound {
                token: token.to_string(),
            })?;
        row.clarification_attempts += 1;
        Ok(row.clarification_attempts)
    }

    fn count_proposals(&self) -> Result<usize, StoreError> {
        Ok(self.lock().proposals.len())
    }

    fn append_dedupe(&self, row: PolicyDedupeLogRow) -> Result<(), StoreError> {
        self.lock().dedupe.push(row);
        Ok(())
    }

    fn count_dedupe(&self) -> Result<usize, StoreError> {
        Ok(self.lock().dedupe.len())
    }

    fn trim_by_max_age(
        &self,
        max_age_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let cutoff = now - chrono::Duration::seconds(max_age_seconds);
        inner.decisions.retain(|row| row.decided_at >= cutoff);
        inner.dedupe.retain(|row| row.seen_at >= cutoff);
        inner
            .proposals
            .retain(|_, row| row.proposal.created_at >= cutoff);
        Ok(())
    }

    fn trim_by_max_rows(&self, max_rows: usize) -> Result<(), StoreError> {
        let mut inner = self.lock();

        if inner.decisions.len() > max_rows {
            let drop = inner.decisions.len() - max_rows;
            inner.decisions.drain(..drop);
        }
        if inner.dedupe.len() > max_rows {
            let drop = inner.dedupe.len() - max_rows;
            inner.dedupe.drain(..drop);
        }
        if inner.proposals.len() > max_rows {
            let mut tokens: Vec<(DateTime<Utc>, String)> = inner
                .proposals
                .values()
                .map(|row| (row.proposal.created_at, row.proposal.proposal_token.clone()))
                .collect();
            tokens.sort();
            let drop = tokens.len() - max_rows;
            for (_, token) in tokens.into_iter().take(drop) {
                inner.proposals.remove(&token);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot(hash: &str) -> PolicyRegimeSnapshot {
        PolicyRegimeSnapshot {
            policy_regime_id: Uuid::new_v4(),
            policy_hash: hash.to_string(),
            document_json: "{}".to_string(),
            policy_id: "p".to_string(),
            policy_version: "1".to_string(),
            created_at: Utc::now(),
        }
    }

    fn proposal(token: &str, created_at: DateTime<Utc>) -> ApprovalProposal {
        ApprovalProposal {
            proposal_token: token.to_string(),
            capability_id: "capability:demo/demo-x".to_string(),
            capability_version: "1.0".to_string(),
            summary: "Approve demo-x".to_string(),
            actor: "alice".to_string(),
            channel: "ops".to_string(),
            trace_id: "trace-1".to_string(),
            invocation_id: "inv-1".to_string(),
            policy_regime_id: Uuid::new_v4(),
            created_at,
            expires_at: created_at + Duration::seconds(600),
        }
    }

    #[test]
    fn regime_upsert_is_idempotent_by_hash() {
        let store = MemoryPolicyStore::new();
        let first = store.upsert_policy_regime(snapshot("h1")).unwrap();
        let second = store.upsert_policy_regime(snapshot("h1")).unwrap();
        assert_eq!(first.policy_regime_id, second.policy_regime_id);
        assert_eq!(store.list_policy_regimes().unwrap().len(), 1);
    }

    #[test]
    fn proposal_append_is_idempotent_by_token() {
        let store = MemoryPolicyStore::new();
        let now = Utc::now();
        store.append_proposal(proposal("tok", now)).unwrap();
        store
            .mark_proposal_status("tok", ProposalStatus::Approved)
            .unwrap();
        // A replayed append must not resurrect the pending status.
        store.append_proposal(proposal("tok", now)).unwrap();
        assert_eq!(store.proposal_status("tok"), Some(ProposalStatus::Approved));
        assert_eq!(store.count_proposals().unwrap(), 1);
    }

    #[test]
    fn terminal_statuses_are_one_way() {
        let store = MemoryPolicyStore::new();
        store.append_proposal(proposal("tok", Utc::now())).unwrap();
        store
            .mark_proposal_status("tok", ProposalStatus::Rejected)
            .unwrap();
        store
            .mark_proposal_status("tok", ProposalStatus::Approved)
            .unwrap();
        assert_eq!(store.proposal_status("tok"), Some(ProposalStatus::Rejected));
    }

    #[test]
    fn find_pending_ignores_settled_proposals() {
        let store = MemoryPolicyStore::new();
        store.append_proposal(proposal("tok", Utc::now())).unwrap();
        assert!(store.find_pending_proposal("tok").unwrap().is_some());
        store
            .mark_proposal_status("tok", ProposalStatus::Expired)
            .unwrap();
        assert!(store.find_pending_proposal("tok").unwrap().is_none());
    }

    #[test]
    fn pending_list_is_scoped_to_actor_and_channel() {
        let store = MemoryPolicyStore::new();
        let now = Utc::now();
        store.append_proposal(proposal("tok-a", now)).unwrap();
        let mut other = proposal("tok-b", now);
        other.actor = "bob".to_string();
        store.append_proposal(other).unwrap();

        let pending = store.list_pending_proposals("alice", "ops").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].proposal_token, "tok-a");
    }

    #[test]
    fn mark_status_for_unknown_token_errors() {
        let store = MemoryPolicyStore::new();
        let err = store
            .mark_proposal_status("ghost", ProposalStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, StoreError::ProposalNotFound { .. }));
    }

    #[test]
    fn clarification_counter_increments() {
        let store = MemoryPolicyStore::new();
        store.append_proposal(proposal("tok", Utc::now())).unwrap();
        assert_eq!(
            store.increment_proposal_clarification_attempts("tok").unwrap(),
            1
        );
        assert_eq!(
            store.increment_proposal_clarification_attempts("tok").unwrap(),
            2
        );
    }

    #[test]
    fn row_trim_keeps_the_newest_proposals() {
        let store = MemoryPolicyStore::new();
        let now = Utc::now();
        store.append_proposal(proposal("tok-old", now - Duration::seconds(30))).unwrap();
        store.append_proposal(proposal("tok-new", now)).unwrap();

        store.trim_by_max_rows(1).unwrap();
        assert_eq!(store.count_proposals().unwrap(), 1);
        assert!(store.find_pending_proposal("tok-new").unwrap().is_some());
    }

    #[test]
    fn age_trim_cuts_each_table_independently() {
        let store = MemoryPolicyStore::new();
        let now = Utc::now();
        store.append_proposal(proposal("tok-old", now - Duration::seconds(7200))).unwrap();
        store
            .append_dedupe(PolicyDedupeLogRow {
                envelope_id: "env-1".to_string(),
                capability_id: "capability:demo/demo-x".to_string(),
                actor: "alice".to_string(),
                channel: "ops".to_string(),
                denied: false,
                seen_at: now,
            })
            .unwrap();

        store.trim_by_max_age(3600, now).unwrap();
        assert_eq!(store.count_proposals().unwrap(), 0);
        assert_eq!(store.count_dedupe().unwrap(), 1);
    }
}
