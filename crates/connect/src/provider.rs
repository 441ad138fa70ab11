//! HTTP voice-provider client
//!
//! Talks to the hosted calling platform's REST API. Transient failures
//! (network, timeouts, 5xx, rate limits) are retried with exponential
//! backoff; auth and configuration failures are fatal and surface to the
//! operator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use callflow_config::ProviderConfig;
use callflow_core::{
    AgentProfile, CallArtifacts, CallContext, CallProvider, ProviderCallStatus, ProviderError,
};

/// Reqwest-backed [`CallProvider`]
#[derive(Clone)]
pub struct HttpCallProvider {
    client: Client,
    config: ProviderConfig,
}

impl HttpCallProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Fatal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v1{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Execute a request, retrying transient failures with backoff
    async fn send_with_retry<F>(&self, build: F) -> Result<reqwest::Response, ProviderError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error = None;
        let mut backoff = Duration::from_millis(self.config.initial_backoff_ms);

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    "provider request failed, retrying in {:?} (attempt {}/{})",
                    backoff,
                    attempt,
                    self.config.max_retries
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            let response = self.authorize(build()).send().await;
            match response {
                Ok(response) => match classify_status(response.status()) {
                    StatusClass::Ok => return Ok(response),
                    StatusClass::Transient => {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        last_error =
                            Some(ProviderError::Transient(format!("{}: {}", status, body)));
                    }
                    StatusClass::Fatal => {
                        let body = response.text().await.unwrap_or_default();
                        return Err(ProviderError::Fatal(body));
                    }
                    StatusClass::NotFound => {
                        let body = response.text().await.unwrap_or_default();
                        return Err(ProviderError::UnknownCall(body));
                    }
                    StatusClass::Rejected => {
                        let body = response.text().await.unwrap_or_default();
                        return Err(ProviderError::Rejected(body));
                    }
                },
                Err(e) => {
                    last_error = Some(ProviderError::Transient(e.to_string()));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ProviderError::Transient("max retries exceeded".to_string())))
    }
}

enum StatusClass {
    Ok,
    Transient,
    Fatal,
    NotFound,
    Rejected,
}

fn classify_status(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Ok
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        StatusClass::Fatal
    } else if status == StatusCode::NOT_FOUND {
        StatusClass::NotFound
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusClass::Transient
    } else {
        StatusClass::Rejected
    }
}

#[async_trait]
impl CallProvider for HttpCallProvider {
    async fn place_call(
        &self,
        profile: &AgentProfile,
        address: &str,
        context: &CallContext,
    ) -> Result<String, ProviderError> {
        let request = DialRequest {
            agent: profile.clone(),
            to: address.to_string(),
            context: context.clone(),
        };

        let response = self
            .send_with_retry(|| self.client.post(self.api_url("/calls")).json(&request))
            .await?;

        let dial: DialResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("invalid dial response: {}", e)))?;

        tracing::debug!(call_id = %dial.call_id, to = address, "dial accepted");
        Ok(dial.call_id)
    }

    async fn query_status(
        &self,
        provider_call_id: &str,
    ) -> Result<ProviderCallStatus, ProviderError> {
        let url = self.api_url(&format!("/calls/{}", provider_call_id));
        let response = self.send_with_retry(|| self.client.get(&url)).await?;

        response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("invalid status response: {}", e)))
    }

    async fn fetch_transcript(
        &self,
        provider_call_id: &str,
    ) -> Result<CallArtifacts, ProviderError> {
        let url = self.api_url(&format!("/calls/{}/artifacts", provider_call_id));
        let response = self.send_with_retry(|| self.client.get(&url)).await?;

        response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("invalid artifacts response: {}", e)))
    }

    async fn terminate(&self, provider_call_id: &str) -> Result<(), ProviderError> {
        let url = self.api_url(&format!("/calls/{}/terminate", provider_call_id));
        self.send_with_retry(|| self.client.post(&url)).await?;
        Ok(())
    }
}

// Provider API wire types

#[derive(Debug, Serialize)]
struct DialRequest {
    agent: AgentProfile,
    to: String,
    context: CallContext,
}

#[derive(Debug, Deserialize)]
struct DialResponse {
    call_id: String,
}
