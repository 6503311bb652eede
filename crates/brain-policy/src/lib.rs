//! # brain-policy
//!
//! The Brain policy service engine: merges base policy and overlays into an
//! effective document, versions it as a content-hashed regime, and
//! authorizes capability invocations through a fixed pipeline of dedupe,
//! rule evaluation, and human-approval resolution before running the
//! execution callback.
//!
//! The public entry point is [`PolicyService`]; collaborators (persistence
//! and notification) come in through the traits in `brain-contracts`. An
//! in-memory [`MemoryPolicyStore`] is provided for embedders and tests.
//!
//! ```no_run
//! use std::sync::Arc;
//! use brain_contracts::{ApprovalNotifier, ApprovalProposal, ExecutionOutcome};
//! use brain_policy::{MemoryPolicyStore, PolicyService, PolicyServiceConfig};
//!
//! struct LogNotifier;
//! impl ApprovalNotifier for LogNotifier {
//!     fn notify_approval(&self, proposal: &ApprovalProposal) -> bool {
//!         println!("approval needed: {}", proposal.summary);
//!         true
//!     }
//! }
//!
//! # fn main() -> Result<(), brain_policy::PolicyServiceError> {
//! let config = PolicyServiceConfig::from_yaml_file("policy.yaml")?;
//! let service = PolicyService::new(
//!     config,
//!     Arc::new(MemoryPolicyStore::new()),
//!     Arc::new(LogNotifier),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod approval;
pub mod config;
pub mod dedupe;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod hash;
pub mod memory;
pub mod merge;
pub mod proposal;
pub mod regime;
pub mod retention;

pub use approval::{ApprovalOutcome, ApprovalResolver};
pub use config::{
    ConfigError, PolicyServiceConfig, RetentionConfig, DEFAULT_AUTO_BIND_THRESHOLD,
    DEFAULT_CLARIFY_THRESHOLD,
};
pub use dedupe::DedupeGuard;
pub use engine::{ExecuteFn, HealthReport, PolicyService};
pub use error::PolicyServiceError;
pub use evaluate::{evaluate_rules, RuleEvaluation};
pub use memory::MemoryPolicyStore;
pub use merge::merge_effective_document;
pub use proposal::{build_proposal, proposal_token, PROPOSAL_TOKEN_LEN};
pub use regime::{canonical_document_json, document_hash, install_regime};
pub use retention::apply_retention;
