//! Session table
//!
//! Owns every live and recently-finalized call session. Mutation happens
//! through short closures so no lock is ever held across an await point;
//! the provider-id index answers webhook lookups without scanning.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use callflow_core::CallSession;

/// In-memory table of call sessions
#[derive(Default)]
pub struct SessionTable {
    sessions: RwLock<HashMap<String, CallSession>>,
    /// provider call id → session id
    by_provider_id: DashMap<String, String>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: CallSession) {
        if let Some(provider_id) = &session.provider_call_id {
            self.by_provider_id
                .insert(provider_id.clone(), session.id.clone());
        }
        self.sessions.write().insert(session.id.clone(), session);
    }

    pub fn get(&self, session_id: &str) -> Option<CallSession> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Resolve a provider call id to our session id
    pub fn resolve_provider_id(&self, provider_call_id: &str) -> Option<String> {
        self.by_provider_id
            .get(provider_call_id)
            .map(|entry| entry.clone())
    }

    /// Mutate a session under the table lock
    ///
    /// The closure's return value is passed through, which lets callers
    /// claim state changes (e.g. "first to mark terminal") atomically.
    pub fn with_session_mut<F, R>(&self, session_id: &str, mutate: F) -> Option<R>
    where
        F: FnOnce(&mut CallSession) -> R,
    {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(session_id)?;
        Some(mutate(session))
    }

    pub fn list(&self) -> Vec<CallSession> {
        let mut sessions: Vec<CallSession> =
            self.sessions.read().values().cloned().collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions
    }

    pub fn count_non_terminal(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|s| !s.is_terminal())
            .count()
    }

    /// Drop finalized sessions that ended before `cutoff`
    ///
    /// The CRM call log is the durable record; the table only keeps recent
    /// history for the operator surface.
    pub fn prune_terminal(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let stale: Vec<String> = sessions
            .values()
            .filter(|s| s.is_terminal() && s.ended_at.map(|t| t < cutoff).unwrap_or(false))
            .map(|s| s.id.clone())
            .collect();

        for id in &stale {
            if let Some(session) = sessions.remove(id) {
                if let Some(provider_id) = &session.provider_call_id {
                    self.by_provider_id.remove(provider_id);
                }
            }
        }
        stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callflow_core::{CallDirection, ContactRef, LeadSource, SessionState};

    fn contact() -> ContactRef {
        ContactRef {
            lead_id: "l1".into(),
            name: "John Smith".into(),
            phone: "+17135551234".into(),
            property_address: "1234 Main St".into(),
            territory: "Harris".into(),
            source: LeadSource::TaxDelinquent,
            stage: Default::default(),
            motivation_score: None,
            do_not_contact: false,
        }
    }

    #[test]
    fn test_provider_index() {
        let table = SessionTable::new();
        let mut session = CallSession::new("s1", "ace", CallDirection::Outbound, contact());
        session.provider_call_id = Some("prov-9".into());
        table.insert(session);

        assert_eq!(table.resolve_provider_id("prov-9").as_deref(), Some("s1"));
        assert!(table.resolve_provider_id("prov-0").is_none());
    }

    #[test]
    fn test_prune_terminal() {
        let table = SessionTable::new();
        let mut session = CallSession::new("s1", "ace", CallDirection::Outbound, contact());
        session.provider_call_id = Some("prov-9".into());
        table.insert(session);

        // Non-terminal sessions are never pruned
        assert_eq!(table.prune_terminal(Utc::now()), 0);

        table.with_session_mut("s1", |s| {
            s.state = SessionState::Ended;
            s.ended_at = Some(Utc::now() - chrono::Duration::hours(2));
        });

        assert_eq!(table.prune_terminal(Utc::now() - chrono::Duration::hours(1)), 1);
        assert!(table.get("s1").is_none());
        assert!(table.resolve_provider_id("prov-9").is_none());
    }
}
