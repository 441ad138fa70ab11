//! Call engine HTTP server
//!
//! Exposes the operator surface (agents, sessions, leads, deal calculator)
//! and the provider/relay webhooks over axum.

pub mod auth;
pub mod http;
pub mod metrics;
pub mod state;
pub mod webhook;

pub use auth::auth_middleware;
pub use http::create_router;
pub use metrics::{init_metrics, spawn_engine_metrics};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use callflow_engine::{AdmissionError, EngineError};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("admission rejected: {0}")]
    Rejected(AdmissionError),

    #[error("contact excluded: {0}")]
    ContactExcluded(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("upstream provider failure: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Rejected(_) => StatusCode::CONFLICT,
            ServerError::ContactExcluded(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = axum::Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Admission(reason) => ServerError::Rejected(reason),
            EngineError::AgentNotFound(id) => ServerError::NotFound(format!("agent {}", id)),
            EngineError::SessionNotFound(id) => ServerError::NotFound(format!("session {}", id)),
            EngineError::ContactExcluded(id) => ServerError::ContactExcluded(id),
            EngineError::Provider(e) => ServerError::Upstream(e.to_string()),
            EngineError::IllegalTransition { .. } => ServerError::Internal(err.to_string()),
        }
    }
}

impl From<callflow_core::CrmError> for ServerError {
    fn from(err: callflow_core::CrmError) -> Self {
        match err {
            callflow_core::CrmError::NotFound(id) => ServerError::NotFound(id),
            callflow_core::CrmError::Store(e) => ServerError::Internal(e),
        }
    }
}
