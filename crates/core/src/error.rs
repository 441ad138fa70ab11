//! Error types shared across collaborator boundaries

use thiserror::Error;

/// Voice provider failures
///
/// Transient failures are retried with backoff by the HTTP client layer;
/// fatal failures surface to the operator and move the agent to `error`.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("provider rejected the call: {0}")]
    Rejected(String),

    #[error("unknown provider call: {0}")]
    UnknownCall(String),

    #[error("fatal provider failure: {0}")]
    Fatal(String),
}

impl ProviderError {
    /// Whether the failure is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// CRM store failures
#[derive(Error, Debug)]
pub enum CrmError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(String),
}

/// Workflow relay delivery failures
///
/// Delivery is fire-and-forget; these are logged and never block
/// orchestration.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}
