//! Workflow relay sinks
//!
//! The relay fans engine events out to email/SMS/storage automations. All
//! delivery here is fire-and-forget: the caller logs failures and moves
//! on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use callflow_config::RelayConfig;
use callflow_core::{EventSink, RelayError, RelayEvent};

/// Posts relay events to the workflow automation webhook
#[derive(Clone)]
pub struct WebhookRelay {
    client: Client,
    endpoint: String,
}

impl WebhookRelay {
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RelayError::Delivery(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl EventSink for WebhookRelay {
    async fn deliver(&self, event: RelayEvent) -> Result<(), RelayError> {
        let name = event.name();
        let response = self
            .client
            .post(&self.endpoint)
            .json(&event)
            .send()
            .await
            .map_err(|e| RelayError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RelayError::Delivery(format!(
                "relay returned {}",
                response.status()
            )));
        }

        tracing::debug!(event = name, "relay event delivered");
        Ok(())
    }
}

/// Sink that drops everything; used when the relay is disabled and in tests
#[derive(Debug, Clone, Default)]
pub struct NullRelay;

#[async_trait]
impl EventSink for NullRelay {
    async fn deliver(&self, event: RelayEvent) -> Result<(), RelayError> {
        tracing::debug!(event = event.name(), "relay disabled, event dropped");
        Ok(())
    }
}
