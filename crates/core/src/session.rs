//! Call session lifecycle types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::lead::ContactRef;
use crate::motivation::StructuredCallData;

/// Call direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum CallDirection {
    #[default]
    Outbound,
    Inbound,
}

/// State of one call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Dialing, not yet connected
    Ringing,
    /// Connected and in conversation
    Active,
    /// Terminal: call completed normally
    Ended,
    /// Terminal: provider reported failure
    Failed,
    /// Terminal: forcibly finalized after the max-duration cutoff
    TimedOut,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Ended | SessionState::Failed | SessionState::TimedOut
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Ringing => "Ringing",
            SessionState::Active => "Active",
            SessionState::Ended => "Ended",
            SessionState::Failed => "Failed",
            SessionState::TimedOut => "Timed Out",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Outcome classification of a finalized call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    NoAnswer,
    Voicemail,
    /// Reached the contact and held a conversation
    Completed,
    /// Contact asked never to be called again
    DoNotCall,
    /// Handed to a human operator mid-call
    Transferred,
    Failed,
    TimedOut,
}

impl CallOutcome {
    /// Outcomes that mean the contact was actually reached
    pub fn reached_contact(&self) -> bool {
        matches!(
            self,
            CallOutcome::Completed | CallOutcome::DoNotCall | CallOutcome::Transferred
        )
    }

    /// Stable name used for logging and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::NoAnswer => "no_answer",
            CallOutcome::Voicemail => "voicemail",
            CallOutcome::Completed => "completed",
            CallOutcome::DoNotCall => "do_not_call",
            CallOutcome::Transferred => "transferred",
            CallOutcome::Failed => "failed",
            CallOutcome::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One call attempt, from admission to terminal outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    /// Session ID
    pub id: String,
    /// Owning agent
    pub agent_id: String,
    pub direction: CallDirection,
    /// Snapshot of the counterpart at dial time
    pub contact: ContactRef,
    /// Provider-assigned call ID, set once the dial is accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_call_id: Option<String>,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Accumulated talk time
    #[serde(default)]
    pub duration_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CallOutcome>,
    /// Motivation score computed at finalize
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motivation_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
}

impl CallSession {
    pub fn new(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        direction: CallDirection,
        contact: ContactRef,
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            direction,
            contact,
            provider_call_id: None,
            state: SessionState::Ringing,
            started_at: Utc::now(),
            connected_at: None,
            ended_at: None,
            duration_secs: 0,
            outcome: None,
            motivation_score: None,
            transcript_summary: None,
            recording_url: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Context payload handed to the provider with a dial request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallContext {
    /// Summary of the previous call with this contact, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_call_summary: Option<String>,
    /// Templated script variables (owner name, address, county, ...)
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl CallContext {
    /// Standard variables for a contact snapshot
    pub fn for_contact(contact: &ContactRef) -> Self {
        let mut variables = HashMap::new();
        variables.insert("owner_name".to_string(), contact.name.clone());
        variables.insert(
            "property_address".to_string(),
            contact.property_address.clone(),
        );
        variables.insert("county".to_string(), contact.territory.clone());
        variables.insert("lead_source".to_string(), contact.source.to_string());
        Self {
            prior_call_summary: None,
            variables,
        }
    }

    pub fn with_prior_summary(mut self, summary: impl Into<String>) -> Self {
        self.prior_call_summary = Some(summary.into());
        self
    }
}

/// Transcript and structured data retrieved from the provider at finalize
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallArtifacts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    /// Structured facts the calling script collected
    #[serde(default)]
    pub data: StructuredCallData,
}

/// Flattened call log entry proposed to the CRM store after finalize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub session_id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub direction: CallDirection,
    pub lead_id: String,
    pub contact_phone: String,
    pub property_address: String,
    pub territory: String,
    pub duration_secs: u32,
    pub outcome: CallOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motivation_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
