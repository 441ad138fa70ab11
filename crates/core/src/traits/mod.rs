//! Collaborator traits
//!
//! Everything external to the orchestration core sits behind one of these:
//! the voice-call provider, the CRM store, and the workflow relay.

pub mod crm;
pub mod provider;
pub mod relay;

pub use crm::CrmStore;
pub use provider::CallProvider;
pub use relay::EventSink;
