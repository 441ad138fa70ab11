//! Agent registry
//!
//! Owns the canonical in-memory state of every calling agent. All mutation
//! goes through this type under a single write lock, which is what makes
//! the quota/schedule checks atomic with the admission decision.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveTime, Timelike, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;

use callflow_core::{Agent, AgentStatus, AgentUpdate, EventSink, RelayEvent};

use crate::schedule::is_within_window;
use crate::{AdmissionError, EngineError};

/// Registry of calling agents
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Agent>>,
    /// Post-call settling interval before an agent returns to idle
    cooldown: Duration,
}

impl AgentRegistry {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            cooldown,
        }
    }

    /// Seed the registry from a roster, replacing any existing entries
    pub fn seed(&self, roster: Vec<Agent>) {
        let mut agents = self.agents.write();
        for agent in roster {
            agents.insert(agent.id.clone(), agent);
        }
        tracing::info!(count = agents.len(), "agent roster seeded");
    }

    pub fn get(&self, agent_id: &str) -> Option<Agent> {
        self.agents.read().get(agent_id).cloned()
    }

    pub fn list(&self) -> Vec<Agent> {
        let mut agents: Vec<Agent> = self.agents.read().values().cloned().collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    /// The single admission checkpoint
    ///
    /// Checks status, quota, and schedule and, on success, increments the
    /// counters and reserves the agent in `ringing`, all under one write
    /// lock. No other path may create a session. A dial that later fails
    /// still consumed its quota.
    pub fn admit_call_request(
        &self,
        agent_id: &str,
        now: NaiveTime,
    ) -> Result<(), EngineError> {
        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.to_string()))?;

        if agent.status != AgentStatus::Idle {
            return Err(AdmissionError::NotIdle.into());
        }
        if agent.quota_exhausted() {
            return Err(AdmissionError::QuotaExceeded.into());
        }
        if !is_within_window(agent, now) {
            return Err(AdmissionError::OutsideSchedule.into());
        }

        agent.calls_today += 1;
        agent.total_calls += 1;
        agent.status = AgentStatus::Ringing;

        tracing::debug!(
            agent_id,
            calls_today = agent.calls_today,
            "call request admitted"
        );
        Ok(())
    }

    /// Validated status transition
    pub fn transition(&self, agent_id: &str, target: AgentStatus) -> Result<(), EngineError> {
        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.to_string()))?;

        if !agent.status.can_transition_to(target) {
            return Err(EngineError::IllegalTransition {
                agent_id: agent_id.to_string(),
                from: agent.status,
                to: target,
            });
        }

        tracing::debug!(agent_id, from = %agent.status, to = %target, "agent transition");
        agent.status = target;
        Ok(())
    }

    /// Compare-and-set transition for concurrent signal paths
    ///
    /// Returns false without touching state when the agent is not in
    /// `from`: the signal raced with something else (operator disable, a
    /// duplicate poll) and is simply stale, not a programming error.
    pub fn try_transition(&self, agent_id: &str, from: AgentStatus, to: AgentStatus) -> bool {
        let mut agents = self.agents.write();
        match agents.get_mut(agent_id) {
            Some(agent) if agent.status == from && from.can_transition_to(to) => {
                tracing::debug!(agent_id, from = %from, to = %to, "agent transition");
                agent.status = to;
                true
            }
            _ => false,
        }
    }

    /// Record the agent's one non-terminal session
    pub fn attach_session(&self, agent_id: &str, session_id: &str) {
        if let Some(agent) = self.agents.write().get_mut(agent_id) {
            agent.active_session = Some(session_id.to_string());
        }
    }

    /// Release the reservation after the provider refused the dial
    ///
    /// Quota stays consumed; only the agent slot is freed.
    pub fn release_rejected_dial(&self, agent_id: &str) -> Result<(), EngineError> {
        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.to_string()))?;
        if agent.status == AgentStatus::Ringing {
            agent.status = AgentStatus::Idle;
            agent.active_session = None;
        }
        Ok(())
    }

    /// Move the agent into cooldown and schedule its release back to idle
    ///
    /// Returns false when the agent is no longer ringing or active (an
    /// operator disabled or errored it while the call was being finalized).
    pub fn begin_cooldown(self: &Arc<Self>, agent_id: &str) -> bool {
        let moved = {
            let mut agents = self.agents.write();
            match agents.get_mut(agent_id) {
                Some(agent)
                    if matches!(agent.status, AgentStatus::Ringing | AgentStatus::Active) =>
                {
                    agent.status = AgentStatus::Cooldown;
                    agent.active_session = None;
                    true
                }
                _ => false,
            }
        };

        if moved {
            let registry = Arc::clone(self);
            let agent_id = agent_id.to_string();
            let cooldown = self.cooldown;
            tokio::spawn(async move {
                tokio::time::sleep(cooldown).await;
                registry.on_cooldown_expired(&agent_id);
            });
        }
        moved
    }

    /// Return a cooled-down agent to idle
    ///
    /// A no-op if an operator disabled or errored the agent meanwhile.
    pub fn on_cooldown_expired(&self, agent_id: &str) {
        let mut agents = self.agents.write();
        if let Some(agent) = agents.get_mut(agent_id) {
            if agent.status == AgentStatus::Cooldown {
                agent.status = AgentStatus::Idle;
                tracing::debug!(agent_id, "cooldown expired, agent idle");
            }
        }
    }

    /// Mark a fatal provider failure; requires an operator reset
    pub fn mark_error(&self, agent_id: &str) {
        let mut agents = self.agents.write();
        if let Some(agent) = agents.get_mut(agent_id) {
            tracing::warn!(agent_id, from = %agent.status, "agent moved to error");
            agent.status = AgentStatus::Error;
            agent.active_session = None;
        }
    }

    /// Operator: take the agent out of rotation
    pub fn disable(&self, agent_id: &str) -> Result<(), EngineError> {
        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.to_string()))?;
        agent.status = AgentStatus::Disabled;
        agent.active_session = None;
        tracing::info!(agent_id, "agent disabled");
        Ok(())
    }

    /// Operator: return a disabled or errored agent to idle
    pub fn reset(&self, agent_id: &str) -> Result<(), EngineError> {
        self.transition(agent_id, AgentStatus::Idle)
    }

    /// Operator: partial agent update
    pub fn update(&self, agent_id: &str, update: &AgentUpdate) -> Result<Agent, EngineError> {
        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.to_string()))?;
        agent.apply(update);
        Ok(agent.clone())
    }

    /// Zero one agent's daily counter
    pub fn reset_daily(&self, agent_id: &str) -> Result<(), EngineError> {
        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.to_string()))?;
        agent.calls_today = 0;
        Ok(())
    }

    /// Zero every agent's daily counter
    pub fn reset_all_daily(&self) {
        let mut agents = self.agents.write();
        for agent in agents.values_mut() {
            agent.calls_today = 0;
        }
        tracing::info!("daily call counters reset");
    }

    /// Start the daily quota-reset task
    ///
    /// Fires at `reset_hour` UTC each day, zeroes the counters, and asks
    /// the relay for the daily report. Returns a shutdown sender.
    pub fn spawn_daily_reset(
        self: &Arc<Self>,
        reset_hour: u32,
        sink: Arc<dyn EventSink>,
    ) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                let wait = until_next_boundary(reset_hour);
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        registry.reset_all_daily();
                        let report = RelayEvent::DailyReportRequest {
                            date: Utc::now().date_naive(),
                        };
                        if let Err(e) = sink.deliver(report).await {
                            tracing::warn!(error = %e, "daily report request delivery failed");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("daily reset task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}

/// Time until the next occurrence of `hour`:00 UTC
fn until_next_boundary(hour: u32) -> Duration {
    let now = Utc::now();
    let seconds_today = now.time().num_seconds_from_midnight() as i64;
    let boundary = (hour.min(23) * 3600) as i64;
    let mut delta = boundary - seconds_today;
    if delta <= 0 {
        delta += 24 * 3600;
    }
    Duration::from_secs(delta as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use callflow_core::{AgentRole, CallWindow};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn registry_with(agent: Agent) -> AgentRegistry {
        let registry = AgentRegistry::new(Duration::from_millis(10));
        registry.agents.write().insert(agent.id.clone(), agent);
        registry
    }

    fn caller() -> Agent {
        let mut agent = Agent::new("ace", "Ace", AgentRole::ColdCaller);
        agent.daily_call_limit = 2;
        agent.window = CallWindow::parse("9:00 AM - 11:30 AM");
        agent
    }

    #[test]
    fn test_admission_happy_path() {
        let registry = registry_with(caller());

        registry.admit_call_request("ace", t(9, 30)).unwrap();

        let agent = registry.get("ace").unwrap();
        assert_eq!(agent.status, AgentStatus::Ringing);
        assert_eq!(agent.calls_today, 1);
        assert_eq!(agent.total_calls, 1);
    }

    #[test]
    fn test_admission_rejects_busy_agent() {
        let registry = registry_with(caller());
        registry.admit_call_request("ace", t(9, 30)).unwrap();

        let err = registry.admit_call_request("ace", t(9, 31)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Admission(AdmissionError::NotIdle)
        ));
        // The failed attempt did not consume quota
        assert_eq!(registry.get("ace").unwrap().calls_today, 1);
    }

    #[test]
    fn test_admission_rejects_exhausted_quota() {
        let mut agent = caller();
        agent.calls_today = 2;
        let registry = registry_with(agent);

        // Quota beats schedule: rejected even inside the window
        let err = registry.admit_call_request("ace", t(9, 30)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Admission(AdmissionError::QuotaExceeded)
        ));

        // And outside it
        let err = registry.admit_call_request("ace", t(14, 0)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Admission(AdmissionError::QuotaExceeded)
        ));
    }

    #[test]
    fn test_admission_rejects_outside_window() {
        let registry = registry_with(caller());

        let err = registry.admit_call_request("ace", t(14, 0)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Admission(AdmissionError::OutsideSchedule)
        ));
        assert_eq!(registry.get("ace").unwrap().calls_today, 0);
    }

    #[test]
    fn test_admission_unknown_agent() {
        let registry = AgentRegistry::new(Duration::from_secs(1));
        assert!(matches!(
            registry.admit_call_request("ghost", t(9, 0)),
            Err(EngineError::AgentNotFound(_))
        ));
    }

    #[test]
    fn test_illegal_transition_is_fatal() {
        let registry = registry_with(caller());

        let err = registry.transition("ace", AgentStatus::Active).unwrap_err();
        assert!(matches!(err, EngineError::IllegalTransition { .. }));
        // State is untouched
        assert_eq!(registry.get("ace").unwrap().status, AgentStatus::Idle);
    }

    #[test]
    fn test_rejected_dial_keeps_quota() {
        let registry = registry_with(caller());
        registry.admit_call_request("ace", t(9, 30)).unwrap();

        registry.release_rejected_dial("ace").unwrap();

        let agent = registry.get("ace").unwrap();
        assert_eq!(agent.status, AgentStatus::Idle);
        assert_eq!(agent.calls_today, 1);
    }

    #[tokio::test]
    async fn test_cooldown_release() {
        let registry = Arc::new(AgentRegistry::new(Duration::from_millis(20)));
        registry.seed(vec![caller()]);
        registry.admit_call_request("ace", t(9, 30)).unwrap();
        registry.transition("ace", AgentStatus::Active).unwrap();

        assert!(registry.begin_cooldown("ace"));
        assert_eq!(registry.get("ace").unwrap().status, AgentStatus::Cooldown);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(registry.get("ace").unwrap().status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_cooldown_release_skipped_when_disabled() {
        let registry = Arc::new(AgentRegistry::new(Duration::from_millis(20)));
        registry.seed(vec![caller()]);
        registry.admit_call_request("ace", t(9, 30)).unwrap();
        registry.transition("ace", AgentStatus::Active).unwrap();
        assert!(registry.begin_cooldown("ace"));

        registry.disable("ace").unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(registry.get("ace").unwrap().status, AgentStatus::Disabled);

        // Explicit reset brings it back
        registry.reset("ace").unwrap();
        assert_eq!(registry.get("ace").unwrap().status, AgentStatus::Idle);
    }

    #[test]
    fn test_daily_reset() {
        let registry = registry_with(caller());
        registry.admit_call_request("ace", t(9, 30)).unwrap();
        registry.release_rejected_dial("ace").unwrap();
        assert_eq!(registry.get("ace").unwrap().calls_today, 1);

        registry.reset_all_daily();
        let agent = registry.get("ace").unwrap();
        assert_eq!(agent.calls_today, 0);
        // Lifetime counter is untouched
        assert_eq!(agent.total_calls, 1);
    }

    #[test]
    fn test_until_next_boundary_bounds() {
        let wait = until_next_boundary(6);
        assert!(wait <= Duration::from_secs(24 * 3600));
        assert!(wait > Duration::ZERO);
    }
}
