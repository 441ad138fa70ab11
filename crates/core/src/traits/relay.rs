//! Workflow relay sink trait

use async_trait::async_trait;

use crate::error::RelayError;
use crate::event::RelayEvent;

/// Outbound side of the workflow/notification relay
///
/// Deliveries are fire-and-forget requests; a failed delivery is logged by
/// the caller and never blocks orchestration.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: RelayEvent) -> Result<(), RelayError>;
}
