// store.rs — The persistence contract.
//
// The engine exclusively owns regime, decision, proposal, and dedupe state,
// but how rows are stored is a collaborator concern. Implementations are
// responsible for serializing conflicting writes (unique-constraint style
// idempotent upserts for regime hashes and proposal tokens); the engine
// holds no long-lived locks of its own.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::audit::{PolicyDecisionLogRow, PolicyDedupeLogRow};
use crate::proposal::{ApprovalProposal, ProposalStatus};
use crate::regime::PolicyRegimeSnapshot;

/// Errors surfaced by a persistence implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No proposal row exists for the given token.
    #[error("no proposal found for token '{token}'")]
    ProposalNotFound { token: String },

    /// The backing store failed.
    #[error("storage backend failure: {message}")]
    Backend { message: String },
}

/// Persistence operations the policy engine needs.
///
/// All mutation belonging to one logical engine operation is expected to be
/// applied atomically by the implementation.
pub trait PolicyStore: Send + Sync {
    /// Insert the snapshot, or return the existing snapshot with the same
    /// `policy_hash`. Idempotent by hash.
    fn upsert_policy_regime(
        &self,
        snapshot: PolicyRegimeSnapshot,
    ) -> Result<PolicyRegimeSnapshot, StoreError>;

    /// Point the singleton active-regime pointer at `regime_id`.
    fn set_active_policy_regime(&self, regime_id: Uuid) -> Result<(), StoreError>;

    /// Read the active-regime pointer.
    fn get_active_policy_regime_id(&self) -> Result<Option<Uuid>, StoreError>;

    /// All stored regime snapshots.
    fn list_policy_regimes(&self) -> Result<Vec<PolicyRegimeSnapshot>, StoreError>;

    /// Append one decision audit row.
    fn append_decision(&self, row: PolicyDecisionLogRow) -> Result<(), StoreError>;

    /// Number of decision rows currently stored.
    fn count_decisions(&self) -> Result<usize, StoreError>;

    /// Persist a proposal with status `pending`. Idempotent by token: a
    /// token that already exists is left untouched.
    fn append_proposal(&self, proposal: ApprovalProposal) -> Result<(), StoreError>;

    /// Find a proposal by token, only if its status is `pending`. Expiry is
    /// the caller's concern — storage does not inspect `expires_at`.
    fn find_pending_proposal(&self, token: &str)
        -> Result<Option<ApprovalProposal>, StoreError>;

    /// All `pending` proposals for one actor+channel pair.
    fn list_pending_proposals(
        &self,
        actor: &str,
        channel: &str,
    ) -> Result<Vec<ApprovalProposal>, StoreError>;

    /// Transition a proposal's status. Transitions out of a terminal state
    /// are ignored — terminal states are one-way.
    fn mark_proposal_status(&self, token: &str, status: ProposalStatus)
        -> Result<(), StoreError>;

    /// Increment the clarification counter for a proposal and return the
    /// post-increment value.
    fn increment_proposal_clarification_attempts(&self, token: &str)
        -> Result<u32, StoreError>;

    /// Number of proposal rows currently stored.
    fn count_proposals(&self) -> Result<usize, StoreError>;

    /// Append one dedupe audit row.
    fn append_dedupe(&self, row: PolicyDedupeLogRow) -> Result<(), StoreError>;

    /// Number of dedupe rows currently stored.
    fn count_dedupe(&self) -> Result<usize, StoreError>;

    /// Delete decision/dedupe/proposal rows older than `max_age_seconds`
    /// relative to `now`, independently per table.
    fn trim_by_max_age(&self, max_age_seconds: i64, now: DateTime<Utc>)
        -> Result<(), StoreError>;

    /// Keep at most `max_rows` newest rows in each of the decision, dedupe,
    /// and proposal tables, independently.
    fn trim_by_max_rows(&self, max_rows: usize) -> Result<(), StoreError>;
}
