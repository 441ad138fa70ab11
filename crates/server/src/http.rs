//! HTTP endpoints
//!
//! REST operator surface for the call engine, plus the webhook routes.

use axum::{
    extract::{Path, State},
    http::{HeaderValue, Method, StatusCode},
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use callflow_core::{
    Agent, AgentUpdate, CallContext, CallSession, Deal, DealStatus, LeadUpdate, PipelineStage,
};
use callflow_scoring::{
    compute_mao, estimate_rehab_range, profit_estimate, round_cents, ConditionTier, MaoQuote,
};

use crate::auth::auth_middleware;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::webhook;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.settings.server.cors_origins,
        state.settings.server.cors_enabled,
    );

    Router::new()
        // Agent roster and operator commands
        .route("/api/agents", get(list_agents))
        .route("/api/agents/:id", get(get_agent).patch(update_agent))
        .route("/api/agents/:id/call", post(start_call))
        .route("/api/agents/:id/disable", post(disable_agent))
        .route("/api/agents/:id/enable", post(enable_agent))
        .route("/api/agents/:id/reset-daily", post(reset_daily))
        // Sessions
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/stop", post(stop_call))
        // Lead stage override (privileged, bypasses forward-only movement)
        .route("/api/leads/:id/stage", patch(override_stage))
        // Deals
        .route("/api/deals", post(create_deal))
        // Deal calculator
        .route("/api/calculator/mao", post(calculate_mao))
        .route("/api/calculator/rehab", post(calculate_rehab))
        // Webhooks
        .route("/webhooks/provider/events", post(webhook::provider_event))
        .route("/webhooks/provider/inbound", post(webhook::provider_inbound))
        .route("/webhooks/relay", post(webhook::relay_event))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build the CORS layer from configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed.is_empty() {
        tracing::info!("no CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(true)
}

// ---- agents ----

async fn list_agents(State(state): State<AppState>) -> Json<Vec<Agent>> {
    Json(state.engine.registry().list())
}

async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Agent>, ServerError> {
    state
        .engine
        .registry()
        .get(&id)
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("agent {}", id)))
}

async fn update_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<AgentUpdate>,
) -> Result<Json<Agent>, ServerError> {
    let agent = state.engine.registry().update(&id, &update)?;
    Ok(Json(agent))
}

async fn disable_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.registry().disable(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn enable_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.registry().reset(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reset_daily(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.registry().reset_daily(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- calls ----

#[derive(Debug, Deserialize)]
struct StartCallRequest {
    lead_id: String,
}

async fn start_call(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(request): Json<StartCallRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServerError> {
    let contact = state
        .crm
        .get_contact(&request.lead_id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("lead {}", request.lead_id)))?;

    let context = CallContext::for_contact(&contact);
    let session_id = state.engine.start_call(&agent_id, contact, context).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "session_id": session_id })),
    ))
}

async fn stop_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.stop_call(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_sessions(State(state): State<AppState>) -> Json<Vec<CallSession>> {
    Json(state.engine.sessions().list())
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CallSession>, ServerError> {
    state
        .engine
        .sessions()
        .get(&id)
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("session {}", id)))
}

// ---- leads ----

#[derive(Debug, Deserialize)]
struct StageOverrideRequest {
    stage: PipelineStage,
}

/// Operator stage override; the one path allowed to move a lead backwards
async fn override_stage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StageOverrideRequest>,
) -> Result<StatusCode, ServerError> {
    tracing::info!(lead_id = %id, stage = %request.stage, "operator stage override");
    state
        .crm
        .update_lead(&id, &LeadUpdate::stage(request.stage))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- deals ----

#[derive(Debug, Deserialize)]
struct CreateDealRequest {
    lead_id: String,
    property_address: String,
    arv: f64,
    rehab_estimate: f64,
    contract_price: f64,
    #[serde(default = "default_assignment_fee")]
    assignment_fee: f64,
}

fn default_assignment_fee() -> f64 {
    10_000.0
}

async fn create_deal(
    State(state): State<AppState>,
    Json(request): Json<CreateDealRequest>,
) -> Result<(StatusCode, Json<Deal>), ServerError> {
    let deal = Deal {
        id: uuid::Uuid::new_v4().to_string(),
        lead_id: request.lead_id.clone(),
        property_address: request.property_address,
        arv: request.arv,
        rehab_estimate: request.rehab_estimate,
        contract_price: request.contract_price,
        assignment_fee: request.assignment_fee,
        max_allowable_offer: round_cents(compute_mao(
            request.arv,
            request.rehab_estimate,
            request.assignment_fee,
        )),
        profit_estimate: round_cents(profit_estimate(
            request.arv,
            request.contract_price,
            request.rehab_estimate,
            request.assignment_fee,
        )),
        status: DealStatus::Negotiating,
        created_at: Utc::now(),
    };
    state.crm.upsert_deal(&deal).await?;

    // A lead with a deal on paper has converted
    if let Err(e) = state
        .crm
        .update_lead(&request.lead_id, &LeadUpdate::stage(PipelineStage::Converted))
        .await
    {
        tracing::warn!(lead_id = %request.lead_id, error = %e, "lead stage update failed");
    }

    Ok((StatusCode::CREATED, Json(deal)))
}

// ---- calculator ----

#[derive(Debug, Deserialize)]
struct MaoRequest {
    arv: f64,
    rehab_estimate: f64,
    #[serde(default = "default_assignment_fee")]
    assignment_fee: f64,
}

async fn calculate_mao(Json(request): Json<MaoRequest>) -> Json<MaoQuote> {
    Json(MaoQuote::compute(
        request.arv,
        request.rehab_estimate,
        request.assignment_fee,
    ))
}

#[derive(Debug, Deserialize)]
struct RehabRequest {
    sqft: u32,
    condition: ConditionTier,
}

async fn calculate_rehab(Json(request): Json<RehabRequest>) -> Json<serde_json::Value> {
    let (min, max) = estimate_rehab_range(request.sqft, request.condition);
    Json(serde_json::json!({
        "sqft": request.sqft,
        "condition": request.condition,
        "min": min,
        "max": max,
    }))
}

// ---- health ----

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn readiness_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ready",
        "agents": state.engine.registry().list().len(),
        "live_sessions": state.engine.sessions().count_non_terminal(),
    }))
}
