//! # brain-contracts
//!
//! Shared domain types and collaborator traits for the Brain policy
//! service: policy documents and overlays, invocation requests, decisions,
//! approval proposals, audit rows, and the persistence/notification
//! contracts the engine is built against.
//!
//! Everything here is an immutable value object or a trait seam. The
//! evaluation logic itself lives in the `brain-policy` crate.

pub mod audit;
pub mod decision;
pub mod notify;
pub mod policy;
pub mod proposal;
pub mod reason;
pub mod regime;
pub mod request;
pub mod store;

pub use audit::{PolicyDecisionLogRow, PolicyDedupeLogRow};
pub use decision::{
    ExecutionOutcome, PolicyDecision, PolicyExecutionError, PolicyExecutionResult,
    METADATA_PROPOSAL_TOKEN, OBLIGATION_APPROVAL_REQUIRED,
};
pub use notify::ApprovalNotifier;
pub use policy::{PolicyDocument, PolicyOverlay, PolicyRule, RulePatch, WILDCARD_CAPABILITY};
pub use proposal::{ApprovalProposal, ProposalStatus};
pub use reason::ReasonCode;
pub use regime::PolicyRegimeSnapshot;
pub use request::{
    CapabilityInvocationRequest, CapabilityRef, DisambiguationCandidate, DISAMBIGUATION_FIELD,
};
pub use store::{PolicyStore, StoreError};
