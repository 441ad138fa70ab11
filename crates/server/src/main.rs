//! callflow server binary

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use callflow_config::{load_settings, RosterConfig};
use callflow_connect::{HttpCallProvider, HttpCrmStore, MemoryCrmStore, NullRelay, WebhookRelay};
use callflow_core::{CrmStore, EventSink};
use callflow_engine::CallSessionManager;
use callflow_scoring::ScoringEngine;
use callflow_server::{create_router, init_metrics, spawn_engine_metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args().nth(1);
    let settings = Arc::new(load_settings(config_path.as_deref()).context("loading settings")?);

    let roster = match std::env::var("CALLFLOW_ROSTER") {
        Ok(path) => RosterConfig::load(&path).context("loading roster")?,
        Err(_) => RosterConfig::default(),
    };

    let provider = Arc::new(
        HttpCallProvider::new(settings.provider.clone()).context("creating provider client")?,
    );

    let sink: Arc<dyn EventSink> = if settings.relay.enabled {
        Arc::new(WebhookRelay::new(&settings.relay).context("creating relay client")?)
    } else {
        Arc::new(NullRelay)
    };

    let crm: Arc<dyn CrmStore> = match HttpCrmStore::new(&settings.crm)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
    {
        Some(store) => Arc::new(store),
        None => {
            tracing::warn!("no CRM endpoint configured, using in-memory store");
            Arc::new(MemoryCrmStore::new())
        }
    };

    let scoring = ScoringEngine::new(settings.scoring.policy);
    let engine = CallSessionManager::new(
        settings.engine.clone(),
        scoring,
        provider,
        Arc::clone(&crm),
        Arc::clone(&sink),
        roster.into_agents(),
    );
    let _handles = engine.start_background_tasks();

    let metrics = init_metrics();
    spawn_engine_metrics(engine.subscribe());

    let state = AppState {
        engine,
        crm,
        sink,
        settings: Arc::clone(&settings),
        metrics,
    };

    let app = create_router(state);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    tracing::info!(%addr, "callflow server listening");
    axum::serve(listener, app).await.context("serving")?;

    Ok(())
}
