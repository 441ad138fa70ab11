//! Core types and collaborator traits for the call orchestration engine
//!
//! This crate provides the foundational types used across all other crates:
//! - Agent identity, status machine, and calling windows
//! - Call session lifecycle types
//! - Lead, pipeline stage, and deal types (the engine's slice of the CRM)
//! - Motivation factor inputs
//! - Call and relay event vocabularies
//! - Traits for the external collaborators (provider, CRM, relay)

pub mod agent;
pub mod deal;
pub mod error;
pub mod event;
pub mod lead;
pub mod motivation;
pub mod session;
pub mod traits;

pub use agent::{Agent, AgentProfile, AgentRole, AgentStatus, AgentUpdate, CallWindow};
pub use deal::{Deal, DealStatus};
pub use error::{CrmError, ProviderError, RelayError};
pub use event::{
    CallEvent, CallEventBody, CallEventKind, ProviderCallState, ProviderCallStatus, RelayEvent,
};
pub use lead::{ContactRef, LeadSource, LeadUpdate, PipelineStage};
pub use motivation::{
    DemandLevel, MarketContext, MotivationFactors, PropertyFacts, PropertyKind, StructuredCallData,
};
pub use session::{
    CallArtifacts, CallContext, CallDirection, CallOutcome, CallRecord, CallSession, SessionState,
};

pub use traits::{CallProvider, CrmStore, EventSink};
