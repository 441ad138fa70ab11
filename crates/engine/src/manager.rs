//! Call session manager
//!
//! The operational surface of the engine: admits and dials outbound calls,
//! registers inbound ones, runs one polling task per live session, enforces
//! the max-duration cutoff, and handles operator force-stops.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use callflow_core::{
    Agent, CallContext, CallDirection, CallEvent, CallEventBody, CallEventKind, CallOutcome,
    CallProvider, CallSession, ContactRef, CrmStore, EventSink, PipelineStage, ProviderCallState,
    ProviderError,
};
use callflow_config::EngineSettings;
use callflow_scoring::ScoringEngine;

use crate::escalation::EscalationRouter;
use crate::registry::AgentRegistry;
use crate::router::EventRouter;
use crate::sessions::SessionTable;
use crate::EngineError;

/// How often terminal sessions are swept out of the table
const ARCHIVE_INTERVAL: Duration = Duration::from_secs(300);
/// How long a finalized session stays visible to the operator surface
const ARCHIVE_RETENTION_SECS: i64 = 3600;

/// Engine lifecycle events, broadcast to observers (metrics, dashboards)
#[derive(Debug, Clone)]
pub enum EngineEvent {
    CallStarted {
        session_id: String,
        agent_id: String,
    },
    CallConnected {
        session_id: String,
        agent_id: String,
    },
    FunctionInvoked {
        session_id: String,
        name: String,
    },
    CallFinalized {
        session_id: String,
        agent_id: String,
        outcome: CallOutcome,
        motivation_score: Option<f32>,
    },
}

/// Shutdown handles for the engine's background tasks
pub struct EngineHandles {
    pub daily_reset: watch::Sender<bool>,
    pub session_prune: watch::Sender<bool>,
}

/// Creates, polls, and finalizes call sessions
///
/// At most one non-terminal session exists per agent at any time; the
/// admission checkpoint enforces that structurally by requiring (and
/// leaving) the `idle` state.
pub struct CallSessionManager {
    settings: EngineSettings,
    registry: Arc<AgentRegistry>,
    sessions: Arc<SessionTable>,
    router: Arc<EventRouter>,
    provider: Arc<dyn CallProvider>,
    sink: Arc<dyn EventSink>,
    /// Cancellation handles for per-session polling tasks
    poll_cancels: Mutex<HashMap<String, watch::Sender<bool>>>,
    events_tx: broadcast::Sender<EngineEvent>,
}

impl CallSessionManager {
    /// Wire up the engine around its collaborators and seed the roster
    pub fn new(
        settings: EngineSettings,
        scoring: ScoringEngine,
        provider: Arc<dyn CallProvider>,
        crm: Arc<dyn CrmStore>,
        sink: Arc<dyn EventSink>,
        roster: Vec<Agent>,
    ) -> Arc<Self> {
        let (events_tx, _) = broadcast::channel(256);

        let registry = Arc::new(AgentRegistry::new(Duration::from_secs(
            settings.cooldown_secs,
        )));
        registry.seed(roster);

        let sessions = Arc::new(SessionTable::new());
        let escalation = Arc::new(EscalationRouter::new(
            Arc::clone(&crm),
            Arc::clone(&sink),
            settings.warm_follow_up_days,
            settings.cold_recontact_days,
        ));
        let router = Arc::new(EventRouter::new(
            Arc::clone(&registry),
            Arc::clone(&sessions),
            escalation,
            Arc::clone(&provider),
            crm,
            scoring,
            events_tx.clone(),
        ));

        Arc::new(Self {
            settings,
            registry,
            sessions,
            router,
            provider,
            sink,
            poll_cancels: Mutex::new(HashMap::new()),
            events_tx,
        })
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<SessionTable> {
        &self.sessions
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    /// Subscribe to engine lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events_tx.subscribe()
    }

    /// Start an outbound call for an agent
    ///
    /// Admission (status + quota + schedule) happens atomically before the
    /// provider round-trip. A provider rejection frees the agent but does
    /// not refund the quota.
    pub async fn start_call(
        self: &Arc<Self>,
        agent_id: &str,
        contact: ContactRef,
        context: CallContext,
    ) -> Result<String, EngineError> {
        if contact.do_not_contact || contact.stage == PipelineStage::Excluded {
            return Err(EngineError::ContactExcluded(contact.lead_id));
        }

        self.registry
            .admit_call_request(agent_id, Utc::now().time())?;
        let agent = self
            .registry
            .get(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.to_string()))?;

        match self
            .provider
            .place_call(&agent.profile(), &contact.phone, &context)
            .await
        {
            Ok(provider_call_id) => {
                let session_id = uuid::Uuid::new_v4().to_string();
                let mut session = CallSession::new(
                    &session_id,
                    agent_id,
                    CallDirection::Outbound,
                    contact,
                );
                session.provider_call_id = Some(provider_call_id);
                self.sessions.insert(session);
                self.registry.attach_session(agent_id, &session_id);
                self.spawn_poll_loop(&session_id);

                let _ = self.events_tx.send(EngineEvent::CallStarted {
                    session_id: session_id.clone(),
                    agent_id: agent_id.to_string(),
                });
                tracing::info!(agent_id, %session_id, "outbound call started");
                Ok(session_id)
            }
            Err(ProviderError::Fatal(reason)) => {
                tracing::error!(agent_id, %reason, "fatal provider failure on dial");
                self.registry.mark_error(agent_id);
                Err(ProviderError::Fatal(reason).into())
            }
            Err(e) => {
                // Quota was consumed at admission and stays consumed
                let _ = self.registry.release_rejected_dial(agent_id);
                tracing::warn!(agent_id, error = %e, "provider rejected dial");
                Err(e.into())
            }
        }
    }

    /// Register an inbound call the provider has handed to an agent
    ///
    /// Goes through the same admission checkpoint as outbound dials, so a
    /// busy or disabled receptionist refuses the call.
    pub async fn accept_inbound(
        self: &Arc<Self>,
        agent_id: &str,
        provider_call_id: &str,
        contact: ContactRef,
    ) -> Result<String, EngineError> {
        if contact.do_not_contact || contact.stage == PipelineStage::Excluded {
            return Err(EngineError::ContactExcluded(contact.lead_id));
        }

        self.registry
            .admit_call_request(agent_id, Utc::now().time())?;

        let session_id = uuid::Uuid::new_v4().to_string();
        let mut session =
            CallSession::new(&session_id, agent_id, CallDirection::Inbound, contact);
        session.provider_call_id = Some(provider_call_id.to_string());
        self.sessions.insert(session);
        self.registry.attach_session(agent_id, &session_id);
        self.spawn_poll_loop(&session_id);

        let _ = self.events_tx.send(EngineEvent::CallStarted {
            session_id: session_id.clone(),
            agent_id: agent_id.to_string(),
        });
        tracing::info!(agent_id, %session_id, provider_call_id, "inbound call accepted");
        Ok(session_id)
    }

    /// Query the provider once and route whatever it reports
    pub async fn poll_once(&self, session_id: &str) -> Result<(), EngineError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        if session.is_terminal() {
            return Ok(());
        }
        let Some(provider_call_id) = session.provider_call_id.clone() else {
            return Ok(());
        };

        let status = self.provider.query_status(&provider_call_id).await?;

        let event = match status.state {
            ProviderCallState::Queued | ProviderCallState::Ringing => None,
            ProviderCallState::InProgress => Some(CallEventBody::Started {
                connected_at: status.connected_at.unwrap_or_else(Utc::now),
            }),
            ProviderCallState::Ended => {
                let connected = session.connected_at.is_some() || status.connected_at.is_some();
                let outcome = status.outcome.unwrap_or(if connected {
                    CallOutcome::Completed
                } else {
                    CallOutcome::NoAnswer
                });
                let duration = match (status.connected_at, status.ended_at) {
                    (Some(start), Some(end)) => (end - start).num_seconds().max(0) as u32,
                    _ => 0,
                };
                Some(CallEventBody::Ended {
                    outcome,
                    duration_secs: duration,
                })
            }
            ProviderCallState::Failed => Some(CallEventBody::Failed {
                reason: status
                    .failure_reason
                    .unwrap_or_else(|| "provider reported failure".to_string()),
            }),
        };

        if let Some(body) = event {
            self.router
                .ingest(CallEvent::new(session_id, status.sequence, body))
                .await?;
        }
        Ok(())
    }

    /// Operator force-stop
    ///
    /// Idempotent: stopping an already-terminal session is a no-op. Safe to
    /// race with a provider terminal event; whichever reaches finalize
    /// first wins and the other is discarded.
    pub async fn stop_call(&self, session_id: &str) -> Result<(), EngineError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        if session.is_terminal() {
            return Ok(());
        }

        if let Some(cancel) = self.poll_cancels.lock().remove(session_id) {
            let _ = cancel.send(true);
        }

        if let Some(provider_call_id) = &session.provider_call_id {
            if let Err(e) = self.provider.terminate(provider_call_id).await {
                tracing::warn!(session_id, error = %e, "provider terminate failed");
            }
        }

        let sequence = self
            .router
            .next_sequence(session_id, CallEventKind::Failed);
        self.router
            .ingest(CallEvent::new(
                session_id,
                sequence,
                CallEventBody::Failed {
                    reason: "stopped by operator".to_string(),
                },
            ))
            .await?;
        Ok(())
    }

    /// One polling task per live session
    fn spawn_poll_loop(self: &Arc<Self>, session_id: &str) {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        self.poll_cancels
            .lock()
            .insert(session_id.to_string(), cancel_tx);

        let manager = Arc::clone(self);
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_millis(manager.settings.poll_interval_ms));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let max_duration =
                chrono::Duration::seconds(manager.settings.max_call_duration_secs as i64);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let Some(session) = manager.sessions.get(&session_id) else { break };
                        if session.is_terminal() {
                            break;
                        }
                        if Utc::now() - session.started_at >= max_duration {
                            manager.force_timeout(&session_id).await;
                            break;
                        }
                        if let Err(e) = manager.poll_once(&session_id).await {
                            if manager.handle_poll_error(&session_id, &session.agent_id, e).await {
                                break;
                            }
                        }
                    }
                    _ = cancel_rx.changed() => {
                        if *cancel_rx.borrow() {
                            tracing::debug!(%session_id, "poll loop cancelled");
                            break;
                        }
                    }
                }
            }
            manager.poll_cancels.lock().remove(&session_id);
        });
    }

    /// Returns true when the poll loop should stop
    async fn handle_poll_error(
        &self,
        session_id: &str,
        agent_id: &str,
        error: EngineError,
    ) -> bool {
        match error {
            EngineError::Provider(e) if e.is_transient() => {
                // Retried on the next tick; the client layer already
                // backed off
                tracing::warn!(session_id, error = %e, "transient poll failure");
                false
            }
            EngineError::Provider(ProviderError::Fatal(reason)) => {
                tracing::error!(session_id, agent_id, %reason, "fatal provider failure");
                let _ = self
                    .router
                    .finalize(session_id, CallOutcome::Failed, 0)
                    .await;
                self.registry.mark_error(agent_id);
                true
            }
            EngineError::Provider(e) => {
                // The provider no longer knows the call
                tracing::warn!(session_id, error = %e, "call lost by provider");
                let _ = self
                    .router
                    .finalize(session_id, CallOutcome::Failed, 0)
                    .await;
                true
            }
            other => {
                tracing::warn!(session_id, error = %other, "poll error");
                false
            }
        }
    }

    /// Forcibly finalize an over-age session
    ///
    /// Routed through the normal event gate, so a terminal event racing in
    /// from the provider still wins cleanly.
    async fn force_timeout(&self, session_id: &str) {
        tracing::warn!(session_id, "session exceeded max duration, timing out");
        let sequence = self.router.next_sequence(session_id, CallEventKind::Ended);
        let event = CallEvent::new(
            session_id,
            sequence,
            CallEventBody::Ended {
                outcome: CallOutcome::TimedOut,
                duration_secs: self.settings.max_call_duration_secs as u32,
            },
        );
        if let Err(e) = self.router.ingest(event).await {
            tracing::warn!(session_id, error = %e, "timeout finalize failed");
        }
    }

    /// Start the daily-reset and session-archive background tasks
    pub fn start_background_tasks(self: &Arc<Self>) -> EngineHandles {
        let daily_reset = self
            .registry
            .spawn_daily_reset(self.settings.daily_reset_hour, Arc::clone(&self.sink));

        let (prune_tx, mut prune_rx) = watch::channel(false);
        let sessions = Arc::clone(&self.sessions);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(ARCHIVE_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let retention = chrono::Duration::seconds(ARCHIVE_RETENTION_SECS);
                        let pruned = sessions.prune_terminal(Utc::now() - retention);
                        if pruned > 0 {
                            tracing::info!(pruned, "archived finalized sessions");
                        }
                    }
                    _ = prune_rx.changed() => {
                        if *prune_rx.borrow() {
                            tracing::info!("session archive task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        EngineHandles {
            daily_reset,
            session_prune: prune_tx,
        }
    }
}
