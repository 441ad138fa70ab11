//! Webhook ingestion
//!
//! Two inbound surfaces:
//! - the voice provider's asynchronous callbacks (call events, inbound
//!   call handoffs), which feed the same event router as polling and are
//!   therefore safe to deliver more than once
//! - the workflow relay's buyer responses, which move deal records

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use callflow_core::{CallEvent, CallEventBody, ContactRef, DealStatus, RelayEvent};

use crate::metrics::record_webhook_event;
use crate::state::AppState;
use crate::ServerError;

/// Asynchronous call event callback from the provider
#[derive(Debug, Deserialize)]
pub struct ProviderEventPayload {
    pub call_id: String,
    pub sequence: u64,
    pub body: CallEventBody,
}

/// `POST /webhooks/provider/events`
///
/// Duplicate deliveries are expected from an at-least-once provider; the
/// router's idempotency gate discards them and we report `applied: false`.
pub async fn provider_event(
    State(state): State<AppState>,
    Json(payload): Json<ProviderEventPayload>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let Some(session_id) = state
        .engine
        .sessions()
        .resolve_provider_id(&payload.call_id)
    else {
        return Err(ServerError::NotFound(format!("call {}", payload.call_id)));
    };

    let applied = state
        .engine
        .router()
        .ingest(CallEvent::new(&session_id, payload.sequence, payload.body))
        .await?;
    record_webhook_event("call_event", applied);

    Ok(Json(serde_json::json!({
        "session_id": session_id,
        "applied": applied,
    })))
}

/// Inbound call handoff from the provider
#[derive(Debug, Deserialize)]
pub struct InboundCallPayload {
    pub call_id: String,
    pub agent_id: String,
    pub contact: ContactRef,
}

/// `POST /webhooks/provider/inbound`
pub async fn provider_inbound(
    State(state): State<AppState>,
    Json(payload): Json<InboundCallPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServerError> {
    let session_id = state
        .engine
        .accept_inbound(&payload.agent_id, &payload.call_id, payload.contact)
        .await?;
    record_webhook_event("inbound_call", true);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "session_id": session_id })),
    ))
}

/// `POST /webhooks/relay`
///
/// Buyer responses fanned back by the workflow relay. Everything else in
/// the relay vocabulary is outbound-only and ignored here.
pub async fn relay_event(
    State(state): State<AppState>,
    Json(event): Json<RelayEvent>,
) -> Result<StatusCode, ServerError> {
    match event {
        RelayEvent::OfferReceived {
            deal_id,
            buyer_name,
            amount,
        } => {
            tracing::info!(%deal_id, %buyer_name, amount, "buyer offer received");
            state
                .crm
                .update_deal_status(&deal_id, DealStatus::Disposition)
                .await?;
        }
        RelayEvent::ContractSigned {
            deal_id,
            contract_price,
        } => {
            tracing::info!(%deal_id, contract_price, "contract signed");
            state
                .crm
                .update_deal_status(&deal_id, DealStatus::Contracted)
                .await?;
        }
        other => {
            tracing::debug!(event = other.name(), "relay event ignored");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
