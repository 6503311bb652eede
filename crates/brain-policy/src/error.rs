// error.rs — Error types for the policy engine.
//
// Expected policy outcomes are reason codes on the decision object, never
// errors. These types cover the remaining cases: configuration rejected at
// construction, store failures, and serialization failures while building
// the regime.

use thiserror::Error;

pub use crate::config::ConfigError;

/// Errors that can occur constructing or operating the policy service.
#[derive(Debug, Error)]
pub enum PolicyServiceError {
    /// The configuration failed validation; the engine must not start.
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),

    /// The persistence collaborator failed.
    #[error(transparent)]
    Store(#[from] brain_contracts::StoreError),

    /// The effective policy document could not be serialized canonically.
    #[error("failed to serialize effective policy document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The execution callback failed outright.
    #[error("execution callback failed: {message}")]
    Execution { message: String },
}
