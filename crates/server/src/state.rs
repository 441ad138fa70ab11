//! Shared application state

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use callflow_config::Settings;
use callflow_core::{CrmStore, EventSink};
use callflow_engine::CallSessionManager;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CallSessionManager>,
    pub crm: Arc<dyn CrmStore>,
    pub sink: Arc<dyn EventSink>,
    pub settings: Arc<Settings>,
    pub metrics: Option<PrometheusHandle>,
}
