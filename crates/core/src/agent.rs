//! Calling agent identity, status machine, and schedule windows

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Role of a calling agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Answers inbound calls, no dial quota
    Receptionist,
    /// Outbound first-touch calling
    ColdCaller,
    /// Re-contacts warm leads
    FollowUp,
    /// Works contracted deals with buyers
    Disposition,
}

impl AgentRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentRole::Receptionist => "Receptionist",
            AgentRole::ColdCaller => "Cold Caller",
            AgentRole::FollowUp => "Follow Up",
            AgentRole::Disposition => "Disposition",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Agent lifecycle status
///
/// The normal cycle is `idle → ringing → active → cooldown → idle`.
/// `disabled` and `error` are reachable from any state via operator action
/// or a fatal provider failure, and return only to `idle` via explicit
/// reset/enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum AgentStatus {
    #[default]
    Idle,
    /// Reserved for a dial that has not yet connected
    Ringing,
    /// On a live call
    Active,
    /// Post-call settling interval before the next dial
    Cooldown,
    /// Taken out of rotation by an operator
    Disabled,
    /// Fatal provider failure, needs operator reset
    Error,
}

impl AgentStatus {
    /// Legal transitions out of this status
    pub fn allowed_transitions(&self) -> Vec<AgentStatus> {
        match self {
            AgentStatus::Idle => vec![
                AgentStatus::Ringing,
                AgentStatus::Disabled,
                AgentStatus::Error,
            ],
            AgentStatus::Ringing => vec![
                AgentStatus::Active,
                AgentStatus::Cooldown,
                // Provider rejected the dial before it rang
                AgentStatus::Idle,
                AgentStatus::Disabled,
                AgentStatus::Error,
            ],
            AgentStatus::Active => vec![
                AgentStatus::Cooldown,
                AgentStatus::Disabled,
                AgentStatus::Error,
            ],
            AgentStatus::Cooldown => vec![
                AgentStatus::Idle,
                AgentStatus::Disabled,
                AgentStatus::Error,
            ],
            AgentStatus::Disabled => vec![AgentStatus::Idle],
            AgentStatus::Error => vec![AgentStatus::Idle],
        }
    }

    /// Check whether a transition to `target` is legal
    pub fn can_transition_to(&self, target: AgentStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "Idle",
            AgentStatus::Ringing => "Ringing",
            AgentStatus::Active => "Active",
            AgentStatus::Cooldown => "Cooldown",
            AgentStatus::Disabled => "Disabled",
            AgentStatus::Error => "Error",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Daily calling window, time-of-day only, `[start, end)`
///
/// Windows never cross midnight; an inverted or empty range admits nothing
/// so a misconfigured roster fails closed instead of calling around the
/// clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl CallWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// A window that never admits a call
    pub fn never() -> Self {
        let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        Self {
            start: midnight,
            end: midnight,
        }
    }

    /// Whether `now` falls inside the window
    pub fn contains(&self, now: NaiveTime) -> bool {
        self.start < self.end && now >= self.start && now < self.end
    }

    /// Parse a roster window spec like `"9:00 AM - 11:30 AM"`
    ///
    /// `"24/7"`, `"always"`, and the empty string mean no window (always
    /// eligible). Anything unparsable maps to [`CallWindow::never`] so a
    /// typo in the roster disables the agent's dialing rather than freeing
    /// it from its schedule.
    pub fn parse(spec: &str) -> Option<CallWindow> {
        let spec = spec.trim();
        if spec.is_empty() || spec.eq_ignore_ascii_case("24/7") || spec.eq_ignore_ascii_case("always")
        {
            return None;
        }

        let parsed = spec.split_once('-').and_then(|(lhs, rhs)| {
            let start = parse_time_of_day(lhs.trim())?;
            let end = parse_time_of_day(rhs.trim())?;
            Some(CallWindow::new(start, end))
        });

        match parsed {
            Some(window) if window.start < window.end => Some(window),
            Some(_) => {
                tracing::warn!(spec, "inverted calling window, failing closed");
                Some(CallWindow::never())
            }
            None => {
                tracing::warn!(spec, "unparsable calling window, failing closed");
                Some(CallWindow::never())
            }
        }
    }
}

fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%I:%M %p")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// A calling agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Agent ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Role
    pub role: AgentRole,
    /// Current status
    #[serde(default)]
    pub status: AgentStatus,
    /// Assigned territory tags (counties)
    #[serde(default)]
    pub territories: Vec<String>,
    /// Daily calling window; `None` means always eligible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<CallWindow>,
    /// Daily dial quota; 0 means unlimited
    #[serde(default)]
    pub daily_call_limit: u32,
    /// Dials admitted since the last daily reset
    #[serde(default)]
    pub calls_today: u32,
    /// Lifetime dials admitted
    #[serde(default)]
    pub total_calls: u64,
    /// The one non-terminal session this agent owns, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_session: Option<String>,
    /// Provider voice identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    /// Dashboard avatar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            status: AgentStatus::Idle,
            territories: Vec::new(),
            window: None,
            daily_call_limit: 0,
            calls_today: 0,
            total_calls: 0,
            active_session: None,
            voice_id: None,
            avatar_url: None,
        }
    }

    /// Whether today's quota is used up
    pub fn quota_exhausted(&self) -> bool {
        self.daily_call_limit > 0 && self.calls_today >= self.daily_call_limit
    }

    /// Apply a partial update, field by field
    pub fn apply(&mut self, update: &AgentUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(limit) = update.daily_call_limit {
            self.daily_call_limit = limit;
        }
        if let Some(calls) = update.calls_today {
            self.calls_today = calls;
        }
        if let Some(ref territories) = update.territories {
            self.territories = territories.clone();
        }
        if let Some(ref window) = update.window {
            self.window = *window;
        }
    }

    /// The slice of agent identity the voice provider needs
    pub fn profile(&self) -> AgentProfile {
        AgentProfile {
            agent_id: self.id.clone(),
            name: self.name.clone(),
            role: self.role,
            voice_id: self.voice_id.clone(),
        }
    }
}

/// Explicit field-level agent update
///
/// `None` leaves the field untouched; the double `Option` on `window`
/// distinguishes "keep" from "clear the window".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_call_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calls_today: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub territories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<Option<CallWindow>>,
}

/// Agent identity as handed to the voice provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: String,
    pub name: String,
    pub role: AgentRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_status_transitions() {
        assert!(AgentStatus::Idle.can_transition_to(AgentStatus::Ringing));
        assert!(AgentStatus::Ringing.can_transition_to(AgentStatus::Active));
        assert!(AgentStatus::Ringing.can_transition_to(AgentStatus::Idle));
        assert!(AgentStatus::Active.can_transition_to(AgentStatus::Cooldown));
        assert!(AgentStatus::Cooldown.can_transition_to(AgentStatus::Idle));

        assert!(!AgentStatus::Idle.can_transition_to(AgentStatus::Active));
        assert!(!AgentStatus::Active.can_transition_to(AgentStatus::Idle));
        assert!(!AgentStatus::Cooldown.can_transition_to(AgentStatus::Active));

        // Disabled/error only return to idle
        assert!(AgentStatus::Disabled.can_transition_to(AgentStatus::Idle));
        assert!(AgentStatus::Error.can_transition_to(AgentStatus::Idle));
        assert!(!AgentStatus::Error.can_transition_to(AgentStatus::Ringing));
    }

    #[test]
    fn test_window_parse() {
        let window = CallWindow::parse("9:00 AM - 11:30 AM").unwrap();
        assert_eq!(window.start, t(9, 0));
        assert_eq!(window.end, t(11, 30));

        let window = CallWindow::parse("1:30 PM - 4:00 PM").unwrap();
        assert_eq!(window.start, t(13, 30));
        assert_eq!(window.end, t(16, 0));

        assert!(CallWindow::parse("24/7").is_none());
        assert!(CallWindow::parse("").is_none());
    }

    #[test]
    fn test_window_fails_closed() {
        // Inverted range admits nothing
        let window = CallWindow::parse("4:00 PM - 9:00 AM").unwrap();
        assert!(!window.contains(t(17, 0)));
        assert!(!window.contains(t(8, 0)));

        // Garbage admits nothing
        let window = CallWindow::parse("whenever").unwrap();
        assert!(!window.contains(t(12, 0)));
    }

    #[test]
    fn test_window_half_open() {
        let window = CallWindow::parse("9:00 AM - 11:30 AM").unwrap();
        assert!(window.contains(t(9, 0)));
        assert!(window.contains(t(11, 29)));
        assert!(!window.contains(t(11, 30)));
        assert!(!window.contains(t(14, 0)));
    }

    #[test]
    fn test_quota() {
        let mut agent = Agent::new("ace", "Ace", AgentRole::ColdCaller);
        agent.daily_call_limit = 2;
        assert!(!agent.quota_exhausted());
        agent.calls_today = 2;
        assert!(agent.quota_exhausted());

        // 0 means unlimited
        agent.daily_call_limit = 0;
        agent.calls_today = 500;
        assert!(!agent.quota_exhausted());
    }

    #[test]
    fn test_partial_update() {
        let mut agent = Agent::new("ace", "Ace", AgentRole::ColdCaller);
        agent.daily_call_limit = 40;

        agent.apply(&AgentUpdate {
            calls_today: Some(0),
            ..Default::default()
        });
        assert_eq!(agent.calls_today, 0);
        assert_eq!(agent.daily_call_limit, 40);

        agent.apply(&AgentUpdate {
            window: Some(None),
            ..Default::default()
        });
        assert!(agent.window.is_none());
    }
}
