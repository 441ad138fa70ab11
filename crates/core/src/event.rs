//! Event vocabulary
//!
//! Two families:
//! - [`CallEvent`]: normalized lifecycle signals about one session, fed to
//!   the event router from polling and from provider callbacks
//! - [`RelayEvent`]: typed fire-and-forget payloads emitted to the workflow
//!   relay (and in two cases received back from it)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::CallOutcome;

/// Closed set of call event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallEventKind {
    Started,
    TranscriptChunk,
    FunctionInvoked,
    Ended,
    Failed,
}

impl CallEventKind {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallEventKind::Ended | CallEventKind::Failed)
    }
}

/// A normalized call lifecycle event
///
/// `(session_id, kind, sequence)` is the idempotency key: the router keeps
/// the highest applied sequence per session and kind and discards anything
/// at or below it, which makes duplicate delivery from the polling and
/// callback paths harmless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    pub session_id: String,
    pub sequence: u64,
    pub body: CallEventBody,
}

impl CallEvent {
    pub fn new(session_id: impl Into<String>, sequence: u64, body: CallEventBody) -> Self {
        Self {
            session_id: session_id.into(),
            sequence,
            body,
        }
    }

    pub fn kind(&self) -> CallEventKind {
        self.body.kind()
    }
}

/// Event payloads, one variant per kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallEventBody {
    Started {
        connected_at: DateTime<Utc>,
    },
    TranscriptChunk {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        speaker: Option<String>,
    },
    /// Mid-call structured request raised by the calling script
    FunctionInvoked {
        name: String,
        #[serde(default)]
        arguments: serde_json::Value,
    },
    Ended {
        outcome: CallOutcome,
        duration_secs: u32,
    },
    Failed {
        reason: String,
    },
}

impl CallEventBody {
    pub fn kind(&self) -> CallEventKind {
        match self {
            CallEventBody::Started { .. } => CallEventKind::Started,
            CallEventBody::TranscriptChunk { .. } => CallEventKind::TranscriptChunk,
            CallEventBody::FunctionInvoked { .. } => CallEventKind::FunctionInvoked,
            CallEventBody::Ended { .. } => CallEventKind::Ended,
            CallEventBody::Failed { .. } => CallEventKind::Failed,
        }
    }
}

/// Provider-side call state as reported by a status query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCallState {
    Queued,
    Ringing,
    InProgress,
    Ended,
    Failed,
}

impl ProviderCallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProviderCallState::Ended | ProviderCallState::Failed)
    }
}

/// Status snapshot returned by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCallStatus {
    pub state: ProviderCallState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Provider's outcome hint for terminal states
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CallOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Monotonic event counter on the provider side
    #[serde(default)]
    pub sequence: u64,
}

/// Typed payloads exchanged with the workflow relay
///
/// Outbound events are fire-and-forget; `offer_received` and
/// `contract_signed` also arrive inbound from the relay when a buyer
/// responds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RelayEvent {
    NewLead {
        lead_id: String,
        name: String,
        phone: String,
        property_address: String,
        territory: String,
    },
    CallCompleted {
        session_id: String,
        agent_id: String,
        lead_id: String,
        outcome: CallOutcome,
        duration_secs: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        motivation_score: Option<f32>,
    },
    HotLeadAlert {
        lead_id: String,
        name: String,
        phone: String,
        property_address: String,
        motivation_score: f32,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    DealPackageRequest {
        lead_id: String,
        property_address: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        asking_price: Option<f64>,
        motivation_score: f32,
    },
    OfferReceived {
        deal_id: String,
        buyer_name: String,
        amount: f64,
    },
    ContractSigned {
        deal_id: String,
        contract_price: f64,
    },
    DailyReportRequest {
        date: chrono::NaiveDate,
    },
    DoNotContact {
        lead_id: String,
        phone: String,
    },
}

impl RelayEvent {
    /// Stable name used for logging and metrics labels
    pub fn name(&self) -> &'static str {
        match self {
            RelayEvent::NewLead { .. } => "new_lead",
            RelayEvent::CallCompleted { .. } => "call_completed",
            RelayEvent::HotLeadAlert { .. } => "hot_lead_alert",
            RelayEvent::DealPackageRequest { .. } => "deal_package_request",
            RelayEvent::OfferReceived { .. } => "offer_received",
            RelayEvent::ContractSigned { .. } => "contract_signed",
            RelayEvent::DailyReportRequest { .. } => "daily_report_request",
            RelayEvent::DoNotContact { .. } => "do_not_contact",
        }
    }
}
