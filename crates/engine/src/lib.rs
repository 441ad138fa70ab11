//! Call orchestration engine
//!
//! Features:
//! - Agent registry with a per-agent status machine, quota, and daily reset
//! - Schedule gating of outbound dials
//! - Call session lifecycle: admission, dialing, polling, forced stop,
//!   max-duration timeout
//! - Event routing with sequence-based idempotency across the polling and
//!   callback paths
//! - Escalation of finalized outcomes to the CRM and workflow relay

pub mod escalation;
pub mod manager;
pub mod registry;
pub mod router;
pub mod schedule;
pub mod sessions;

pub use escalation::EscalationRouter;
pub use manager::{CallSessionManager, EngineEvent, EngineHandles};
pub use registry::AgentRegistry;
pub use router::EventRouter;
pub use schedule::is_within_window;
pub use sessions::SessionTable;

use thiserror::Error;

use callflow_core::{AgentStatus, ProviderError};

/// Why an admission request was rejected
///
/// All recoverable; the dispatcher may retry later.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("agent is not idle")]
    NotIdle,

    #[error("daily call quota exhausted")]
    QuotaExceeded,

    #[error("outside the agent's calling window")]
    OutsideSchedule,
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("admission rejected: {0}")]
    Admission(#[from] AdmissionError),

    #[error("unknown agent: {0}")]
    AgentNotFound(String),

    #[error("unknown session: {0}")]
    SessionNotFound(String),

    #[error("contact is flagged do-not-contact: {0}")]
    ContactExcluded(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A state-graph violation. This is a programming error, never
    /// retried and never silently ignored.
    #[error("illegal transition {from} -> {to} for agent {agent_id}")]
    IllegalTransition {
        agent_id: String,
        from: AgentStatus,
        to: AgentStatus,
    },
}
