//! Voice-call provider trait

use async_trait::async_trait;

use crate::agent::AgentProfile;
use crate::error::ProviderError;
use crate::event::ProviderCallStatus;
use crate::session::{CallArtifacts, CallContext};

/// The external voice-call provider
///
/// Treated as an at-least-once, possibly-slow, possibly-failing dependency:
/// status queries may repeat themselves, terminal facts may arrive through
/// both polling and callbacks, and every method can fail transiently.
#[async_trait]
pub trait CallProvider: Send + Sync {
    /// Place an outbound call; returns the provider's call ID on acceptance
    async fn place_call(
        &self,
        profile: &AgentProfile,
        address: &str,
        context: &CallContext,
    ) -> Result<String, ProviderError>;

    /// Query the current status of a call
    async fn query_status(&self, provider_call_id: &str)
        -> Result<ProviderCallStatus, ProviderError>;

    /// Retrieve transcript, summary, and structured data for a finished call
    async fn fetch_transcript(&self, provider_call_id: &str)
        -> Result<CallArtifacts, ProviderError>;

    /// Force-terminate a call
    async fn terminate(&self, provider_call_id: &str) -> Result<(), ProviderError>;
}
