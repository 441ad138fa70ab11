//! Event routing
//!
//! Normalizes inbound signals (poll results and provider callbacks) into
//! the closed call-event vocabulary, deduplicates them by
//! `(session, kind, sequence)`, and drives finalization: scoring, CRM
//! writes, agent release, and escalation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::broadcast;

use callflow_core::{
    AgentStatus, CallArtifacts, CallEvent, CallEventBody, CallEventKind, CallOutcome, CallProvider,
    CallRecord, CallSession, ContactRef, CrmStore, LeadSource, PipelineStage, SessionState,
    StructuredCallData,
};
use callflow_scoring::ScoringEngine;

use crate::escalation::EscalationRouter;
use crate::manager::EngineEvent;
use crate::registry::AgentRegistry;
use crate::sessions::SessionTable;
use crate::EngineError;

/// Routes normalized call events into session state
pub struct EventRouter {
    registry: Arc<AgentRegistry>,
    sessions: Arc<SessionTable>,
    escalation: Arc<EscalationRouter>,
    provider: Arc<dyn CallProvider>,
    crm: Arc<dyn CrmStore>,
    scoring: ScoringEngine,
    /// Highest applied sequence per (session, kind)
    applied: Mutex<HashMap<(String, CallEventKind), u64>>,
    events_tx: broadcast::Sender<EngineEvent>,
}

impl EventRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<AgentRegistry>,
        sessions: Arc<SessionTable>,
        escalation: Arc<EscalationRouter>,
        provider: Arc<dyn CallProvider>,
        crm: Arc<dyn CrmStore>,
        scoring: ScoringEngine,
        events_tx: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self {
            registry,
            sessions,
            escalation,
            provider,
            crm,
            scoring,
            applied: Mutex::new(HashMap::new()),
            events_tx,
        }
    }

    /// The next sequence number that would be accepted for `(session, kind)`
    ///
    /// Used to stamp internally synthesized events (operator stop, timeout)
    /// so they pass the same idempotency gate as provider events.
    pub fn next_sequence(&self, session_id: &str, kind: CallEventKind) -> u64 {
        let applied = self.applied.lock();
        applied
            .get(&(session_id.to_string(), kind))
            .map(|last| last + 1)
            .unwrap_or(1)
    }

    /// Ingest one event; returns whether it was applied or discarded
    ///
    /// Duplicate and stale events (the same underlying fact observed via
    /// both polling and a callback) are discarded here, so the rest of the
    /// pipeline is single-shot.
    pub async fn ingest(&self, event: CallEvent) -> Result<bool, EngineError> {
        let session = self
            .sessions
            .get(&event.session_id)
            .ok_or_else(|| EngineError::SessionNotFound(event.session_id.clone()))?;
        let kind = event.kind();

        {
            let mut applied = self.applied.lock();
            let key = (event.session_id.clone(), kind);
            if let Some(&last) = applied.get(&key) {
                if event.sequence <= last {
                    tracing::debug!(
                        session_id = %event.session_id,
                        ?kind,
                        sequence = event.sequence,
                        last,
                        "stale event discarded"
                    );
                    return Ok(false);
                }
            }
            applied.insert(key, event.sequence);
        }

        match event.body {
            CallEventBody::Started { connected_at } => {
                self.sessions.with_session_mut(&event.session_id, |s| {
                    if s.state == SessionState::Ringing {
                        s.state = SessionState::Active;
                        s.connected_at = Some(connected_at);
                    }
                });
                self.registry
                    .try_transition(&session.agent_id, AgentStatus::Ringing, AgentStatus::Active);
                self.emit(EngineEvent::CallConnected {
                    session_id: event.session_id.clone(),
                    agent_id: session.agent_id.clone(),
                });
                Ok(true)
            }
            CallEventBody::TranscriptChunk { text, .. } => {
                tracing::debug!(
                    session_id = %event.session_id,
                    chars = text.len(),
                    "transcript chunk"
                );
                Ok(true)
            }
            CallEventBody::FunctionInvoked { name, arguments } => {
                self.emit(EngineEvent::FunctionInvoked {
                    session_id: event.session_id.clone(),
                    name: name.clone(),
                });
                self.handle_function(&session, &name, arguments).await;
                Ok(true)
            }
            CallEventBody::Ended {
                outcome,
                duration_secs,
            } => self.finalize(&event.session_id, outcome, duration_secs).await,
            CallEventBody::Failed { reason } => {
                tracing::warn!(session_id = %event.session_id, %reason, "call failed");
                self.finalize(&event.session_id, CallOutcome::Failed, 0).await
            }
        }
    }

    /// Mid-call structured requests raised by the calling script
    ///
    /// Applied immediately; a hot-lead transfer or a do-not-contact request
    /// must not wait for the call to end.
    async fn handle_function(
        &self,
        session: &CallSession,
        name: &str,
        arguments: serde_json::Value,
    ) {
        match name {
            "create_lead" => match serde_json::from_value::<LeadCaptureArgs>(arguments) {
                Ok(args) => {
                    let contact = ContactRef {
                        lead_id: uuid::Uuid::new_v4().to_string(),
                        name: args.name,
                        phone: args.phone,
                        property_address: args.property_address,
                        territory: args
                            .territory
                            .unwrap_or_else(|| session.contact.territory.clone()),
                        source: LeadSource::Inbound,
                        stage: PipelineStage::New,
                        motivation_score: None,
                        do_not_contact: false,
                    };
                    self.escalation.capture_lead(&contact).await;
                }
                Err(e) => {
                    tracing::warn!(session_id = %session.id, error = %e, "bad create_lead arguments");
                }
            },
            "transfer_to_operator" => {
                self.escalation.escalate_live(session).await;
            }
            "mark_do_not_contact" => {
                // Flag the session so finalize routes to exclusion even if
                // the call later reports a high score
                self.sessions.with_session_mut(&session.id, |s| {
                    s.contact.do_not_contact = true;
                });
                self.escalation
                    .exclude(&session.contact.lead_id, &session.contact.phone)
                    .await;
            }
            other => {
                tracing::warn!(session_id = %session.id, function = other, "unknown function invocation");
            }
        }
    }

    /// Finalize a session on its first terminal event
    ///
    /// Exactly one caller wins the terminal claim; replays and races
    /// (operator stop vs. provider hangup) are discarded.
    pub async fn finalize(
        &self,
        session_id: &str,
        outcome: CallOutcome,
        duration_secs: u32,
    ) -> Result<bool, EngineError> {
        let terminal_state = match outcome {
            CallOutcome::TimedOut => SessionState::TimedOut,
            CallOutcome::Failed => SessionState::Failed,
            _ => SessionState::Ended,
        };

        let claimed = self
            .sessions
            .with_session_mut(session_id, |s| {
                if s.is_terminal() {
                    false
                } else {
                    s.state = terminal_state;
                    s.outcome = Some(outcome);
                    s.ended_at = Some(Utc::now());
                    s.duration_secs = duration_secs;
                    true
                }
            })
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

        if !claimed {
            tracing::debug!(session_id, "finalize replay discarded");
            return Ok(false);
        }

        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

        // Transcript retrieval is best effort; a provider outage must not
        // leave the agent stuck.
        let artifacts = match &session.provider_call_id {
            Some(provider_id) => match self.provider.fetch_transcript(provider_id).await {
                Ok(artifacts) => artifacts,
                Err(e) => {
                    tracing::warn!(session_id, error = %e, "transcript fetch failed");
                    CallArtifacts::default()
                }
            },
            None => CallArtifacts::default(),
        };

        let score = self.refine_score(&session, outcome, &artifacts.data);

        let session = self
            .sessions
            .with_session_mut(session_id, |s| {
                if let Some(duration) = artifacts.duration_secs {
                    s.duration_secs = duration;
                }
                s.transcript_summary = artifacts.summary.clone();
                s.recording_url = artifacts.recording_url.clone();
                s.motivation_score = score;
                s.clone()
            })
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

        // Release the agent into cooldown; skipped if an operator disabled
        // or errored it mid-call
        self.registry.begin_cooldown(&session.agent_id);

        self.flush_call_log(&session).await;
        self.escalation.route(&session, &artifacts.data).await;

        self.emit(EngineEvent::CallFinalized {
            session_id: session.id.clone(),
            agent_id: session.agent_id.clone(),
            outcome,
            motivation_score: session.motivation_score,
        });

        tracing::info!(
            session_id,
            agent_id = %session.agent_id,
            outcome = ?outcome,
            score = ?session.motivation_score,
            "session finalized"
        );
        Ok(true)
    }

    /// Merge the call's structured data into the lead's motivation score
    ///
    /// A call that never reached the contact carries no new information;
    /// otherwise the call score only ever raises the stored one.
    fn refine_score(
        &self,
        session: &CallSession,
        outcome: CallOutcome,
        data: &StructuredCallData,
    ) -> Option<f32> {
        let prior = session.contact.motivation_score;
        if !outcome.reached_contact() {
            return prior;
        }
        let call_score = self.scoring.score(&data.factors);
        Some(prior.map_or(call_score, |p| p.max(call_score)))
    }

    async fn flush_call_log(&self, session: &CallSession) {
        let agent_name = self
            .registry
            .get(&session.agent_id)
            .map(|a| a.name)
            .unwrap_or_else(|| session.agent_id.clone());

        let record = CallRecord {
            session_id: session.id.clone(),
            agent_id: session.agent_id.clone(),
            agent_name,
            direction: session.direction,
            lead_id: session.contact.lead_id.clone(),
            contact_phone: session.contact.phone.clone(),
            property_address: session.contact.property_address.clone(),
            territory: session.contact.territory.clone(),
            duration_secs: session.duration_secs,
            outcome: session.outcome.unwrap_or(CallOutcome::Failed),
            motivation_score: session.motivation_score,
            transcript_summary: session.transcript_summary.clone(),
            recording_url: session.recording_url.clone(),
            created_at: Utc::now(),
        };

        if let Err(e) = self.crm.append_call_log(&record).await {
            tracing::warn!(session_id = %session.id, error = %e, "call log write failed");
        }
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events_tx.send(event);
    }
}

/// Arguments of the `create_lead` function invocation
#[derive(Debug, Deserialize)]
struct LeadCaptureArgs {
    name: String,
    phone: String,
    property_address: String,
    #[serde(default)]
    territory: Option<String>,
}
