//! Collaborator implementations
//!
//! Concrete backends for the core's collaborator traits:
//! - [`HttpCallProvider`]: the hosted voice-calling platform
//! - [`WebhookRelay`] / [`NullRelay`]: the workflow automation relay
//! - [`MemoryCrmStore`] / [`HttpCrmStore`]: the CRM store

pub mod crm;
pub mod provider;
pub mod relay;

pub use crm::{HttpCrmStore, LeadRecord, MemoryCrmStore};
pub use provider::HttpCallProvider;
pub use relay::{NullRelay, WebhookRelay};
