//! Schedule gating
//!
//! Decides whether an agent may originate a call at a given time of day.
//! This is advisory input to [`AgentRegistry::admit_call_request`], not a
//! separate enforcement point, so the check and the admission decision
//! happen under the same lock.
//!
//! [`AgentRegistry::admit_call_request`]: crate::AgentRegistry::admit_call_request

use chrono::NaiveTime;

use callflow_core::Agent;

/// Whether `now` falls inside the agent's calling window
///
/// Agents without a window are always eligible. Malformed windows were
/// already collapsed to a never-matching range at parse time, so they fail
/// closed here.
pub fn is_within_window(agent: &Agent, now: NaiveTime) -> bool {
    match &agent.window {
        None => true,
        Some(window) => window.contains(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callflow_core::{AgentRole, CallWindow};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_unwindowed_always_eligible() {
        let agent = Agent::new("zara", "Zara", AgentRole::Receptionist);
        assert!(is_within_window(&agent, t(3, 0)));
        assert!(is_within_window(&agent, t(23, 59)));
    }

    #[test]
    fn test_window_gating() {
        let mut agent = Agent::new("ace", "Ace", AgentRole::ColdCaller);
        agent.window = CallWindow::parse("9:00 AM - 11:30 AM");

        assert!(is_within_window(&agent, t(9, 0)));
        assert!(is_within_window(&agent, t(10, 45)));
        assert!(!is_within_window(&agent, t(11, 30)));
        assert!(!is_within_window(&agent, t(14, 0)));
        assert!(!is_within_window(&agent, t(8, 59)));
    }

    #[test]
    fn test_malformed_window_fails_closed() {
        let mut agent = Agent::new("ace", "Ace", AgentRole::ColdCaller);
        agent.window = CallWindow::parse("9:00 PM - 9:00 AM");

        assert!(!is_within_window(&agent, t(22, 0)));
        assert!(!is_within_window(&agent, t(8, 0)));
        assert!(!is_within_window(&agent, t(12, 0)));
    }
}
