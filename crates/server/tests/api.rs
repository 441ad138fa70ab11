//! HTTP surface tests

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::util::ServiceExt;

use callflow_config::{EngineSettings, Settings};
use callflow_connect::{MemoryCrmStore, NullRelay};
use callflow_core::{
    Agent, AgentProfile, AgentRole, CallArtifacts, CallContext, CallProvider,
    ContactRef, CrmStore, DealStatus, EventSink, LeadSource, PipelineStage, ProviderCallState,
    ProviderCallStatus, ProviderError,
};
use callflow_engine::CallSessionManager;
use callflow_scoring::ScoringEngine;
use callflow_server::{create_router, AppState};

/// Provider that accepts every dial and reports the call in progress
struct AlwaysLiveProvider;

#[async_trait]
impl CallProvider for AlwaysLiveProvider {
    async fn place_call(
        &self,
        profile: &AgentProfile,
        _address: &str,
        _context: &CallContext,
    ) -> Result<String, ProviderError> {
        Ok(format!("prov-{}", profile.agent_id))
    }

    async fn query_status(&self, _id: &str) -> Result<ProviderCallStatus, ProviderError> {
        Ok(ProviderCallStatus {
            state: ProviderCallState::InProgress,
            connected_at: Some(chrono::Utc::now()),
            ended_at: None,
            outcome: None,
            failure_reason: None,
            sequence: 1,
        })
    }

    async fn fetch_transcript(&self, _id: &str) -> Result<CallArtifacts, ProviderError> {
        Ok(CallArtifacts::default())
    }

    async fn terminate(&self, _id: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

fn contact(lead_id: &str) -> ContactRef {
    ContactRef {
        lead_id: lead_id.to_string(),
        name: "John Smith".into(),
        phone: "+17135551234".into(),
        property_address: "1234 Main St".into(),
        territory: "Harris".into(),
        source: LeadSource::TaxDelinquent,
        stage: PipelineStage::New,
        motivation_score: None,
        do_not_contact: false,
    }
}

struct TestApp {
    router: axum::Router,
    crm: Arc<MemoryCrmStore>,
}

fn test_app(settings: Settings) -> TestApp {
    let crm = Arc::new(MemoryCrmStore::new());
    let mut agent = Agent::new("ace", "Ace", AgentRole::ColdCaller);
    agent.daily_call_limit = 40;

    let engine = CallSessionManager::new(
        EngineSettings {
            poll_interval_ms: 25,
            ..Default::default()
        },
        ScoringEngine::default(),
        Arc::new(AlwaysLiveProvider),
        Arc::clone(&crm) as Arc<dyn CrmStore>,
        Arc::new(NullRelay) as Arc<dyn EventSink>,
        vec![agent],
    );

    let state = AppState {
        engine,
        crm: Arc::clone(&crm) as Arc<dyn CrmStore>,
        sink: Arc::new(NullRelay),
        settings: Arc::new(settings),
        metrics: None,
    };
    TestApp {
        router: create_router(state),
        crm,
    }
}

async fn request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn test_health_and_agents() {
    let app = test_app(Settings::default());

    let (status, body) = request(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = request(&app.router, "GET", "/api/agents", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], "ace");
    assert_eq!(body[0]["status"], "idle");

    let (status, _) = request(&app.router, "GET", "/api/agents/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mao_calculator_contract() {
    let app = test_app(Settings::default());

    let (status, body) = request(
        &app.router,
        "POST",
        "/api/calculator/mao",
        Some(serde_json::json!({
            "arv": 200000.0,
            "rehab_estimate": 35000.0,
            "assignment_fee": 10000.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["max_allowable_offer"], 95000.0);
    assert_eq!(body["seventy_percent_arv"], 140000.0);

    let (status, body) = request(
        &app.router,
        "POST",
        "/api/calculator/rehab",
        Some(serde_json::json!({ "sqft": 1500, "condition": "moderate" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["min"], 37500.0);
    assert_eq!(body["max"], 67500.0);
}

#[tokio::test]
async fn test_call_flow_over_http() {
    let app = test_app(Settings::default());
    app.crm.insert_lead(contact("l1"));

    // Start a call
    let (status, body) = request(
        &app.router,
        "POST",
        "/api/agents/ace/call",
        Some(serde_json::json!({ "lead_id": "l1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = body["session_id"].as_str().unwrap().to_string();

    // A second start while the agent is busy is rejected
    let (status, _) = request(
        &app.router,
        "POST",
        "/api/agents/ace/call",
        Some(serde_json::json!({ "lead_id": "l1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Provider callback ends the call
    let (status, body) = request(
        &app.router,
        "POST",
        "/webhooks/provider/events",
        Some(serde_json::json!({
            "call_id": "prov-ace",
            "sequence": 7,
            "body": {"kind": "ended", "outcome": "completed", "duration_secs": 42},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], true);

    // A duplicate delivery is acknowledged but discarded
    let (status, body) = request(
        &app.router,
        "POST",
        "/webhooks/provider/events",
        Some(serde_json::json!({
            "call_id": "prov-ace",
            "sequence": 7,
            "body": {"kind": "ended", "outcome": "completed", "duration_secs": 42},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], false);

    let (status, body) = request(
        &app.router,
        "GET",
        &format!("/api/sessions/{}", session_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "ended");
    assert_eq!(body["outcome"], "completed");

    // Stopping a finished call is a no-op
    let (status, _) = request(
        &app.router,
        "POST",
        &format!("/api/sessions/{}/stop", session_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_stage_override_and_deals() {
    let app = test_app(Settings::default());
    app.crm.insert_lead(contact("l1"));

    // Operator override may move a lead anywhere
    let (status, _) = request(
        &app.router,
        "PATCH",
        "/api/leads/l1/stage",
        Some(serde_json::json!({ "stage": "qualified" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        app.crm.lead_record("l1").unwrap().contact.stage,
        PipelineStage::Qualified
    );

    // Creating a deal derives the economics and converts the lead
    let (status, body) = request(
        &app.router,
        "POST",
        "/api/deals",
        Some(serde_json::json!({
            "lead_id": "l1",
            "property_address": "1234 Main St",
            "arv": 180000.0,
            "rehab_estimate": 35000.0,
            "contract_price": 85000.0,
            "assignment_fee": 12000.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["max_allowable_offer"], 79000.0);
    assert_eq!(body["profit_estimate"], 48000.0);
    assert_eq!(
        app.crm.lead_record("l1").unwrap().contact.stage,
        PipelineStage::Converted
    );

    // Relay webhook moves the deal through its lifecycle
    let deal_id = body["id"].as_str().unwrap().to_string();
    let (status, _) = request(
        &app.router,
        "POST",
        "/webhooks/relay",
        Some(serde_json::json!({
            "event": "contract_signed",
            "deal_id": deal_id,
            "contract_price": 85000.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        app.crm.deal(&deal_id).unwrap().status,
        DealStatus::Contracted
    );
}

#[tokio::test]
async fn test_auth_gates_operator_surface() {
    let mut settings = Settings::default();
    settings.server.auth.enabled = true;
    settings.server.auth.api_key = Some("swordfish".to_string());
    let app = test_app(settings);

    // Public paths stay open
    let (status, _) = request(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    // Operator routes need the key
    let (status, _) = request(&app.router, "GET", "/api/agents", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/agents")
                .header(header::AUTHORIZATION, "Bearer swordfish")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/agents")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_webhook_call() {
    let app = test_app(Settings::default());

    let (status, _) = request(
        &app.router,
        "POST",
        "/webhooks/provider/events",
        Some(serde_json::json!({
            "call_id": "prov-unknown",
            "sequence": 1,
            "body": {"kind": "failed", "reason": "gone"},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inbound_webhook_creates_session() {
    let app = test_app(Settings::default());

    let (status, body) = request(
        &app.router,
        "POST",
        "/webhooks/provider/inbound",
        Some(serde_json::json!({
            "call_id": "prov-in-1",
            "agent_id": "ace",
            "contact": contact("l9"),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["session_id"].is_string());

    let (_, agents) = request(&app.router, "GET", "/api/agents", None).await;
    assert_eq!(agents[0]["status"], "ringing");
}

#[tokio::test]
async fn test_excluded_lead_rejected() {
    let app = test_app(Settings::default());
    let mut lead = contact("l1");
    lead.do_not_contact = true;
    app.crm.insert_lead(lead);

    let (status, _) = request(
        &app.router,
        "POST",
        "/api/agents/ace/call",
        Some(serde_json::json!({ "lead_id": "l1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
