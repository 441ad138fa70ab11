//! Agent roster configuration
//!
//! The roster seeds the registry at startup. A built-in default covers the
//! Houston-area deployment; a TOML or YAML file overrides it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use callflow_core::{Agent, AgentRole, CallWindow};

use crate::ConfigError;

/// One roster entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSeed {
    pub id: String,
    pub name: String,
    pub role: AgentRole,
    #[serde(default)]
    pub territories: Vec<String>,
    /// Human-format window spec ("9:00 AM - 11:30 AM", "24/7")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default = "default_daily_call_limit")]
    pub daily_call_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

fn default_daily_call_limit() -> u32 {
    40
}

impl AgentSeed {
    /// Materialize the seed into a registry agent
    pub fn into_agent(self) -> Agent {
        let window = self.schedule.as_deref().and_then(CallWindow::parse);
        let mut agent = Agent::new(self.id, self.name, self.role);
        agent.territories = self.territories;
        agent.window = window;
        agent.daily_call_limit = self.daily_call_limit;
        agent.voice_id = self.voice_id;
        agent.avatar_url = self.avatar_url;
        agent
    }
}

/// The full roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub agents: Vec<AgentSeed>,
}

impl RosterConfig {
    /// Load a roster file, TOML or YAML by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;

        let roster = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?,
            _ => toml::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?,
        };

        Ok(roster)
    }

    pub fn into_agents(self) -> Vec<Agent> {
        self.agents.into_iter().map(AgentSeed::into_agent).collect()
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        let seed = |id: &str,
                    name: &str,
                    role: AgentRole,
                    territories: &[&str],
                    schedule: Option<&str>,
                    limit: u32| AgentSeed {
            id: id.to_string(),
            name: name.to_string(),
            role,
            territories: territories.iter().map(|t| t.to_string()).collect(),
            schedule: schedule.map(|s| s.to_string()),
            daily_call_limit: limit,
            voice_id: None,
            avatar_url: None,
        };

        Self {
            agents: vec![
                seed("zara", "Zara", AgentRole::Receptionist, &["All"], Some("24/7"), 0),
                seed("ace", "Ace", AgentRole::ColdCaller, &["Harris N", "Harris E"], Some("9:00 AM - 11:30 AM"), 40),
                seed("maya", "Maya", AgentRole::ColdCaller, &["Harris S", "Harris W"], Some("9:30 AM - 12:00 PM"), 40),
                seed("eli", "Eli", AgentRole::ColdCaller, &["Fort Bend", "Brazoria"], Some("10:00 AM - 12:30 PM"), 40),
                seed("nova", "Nova", AgentRole::ColdCaller, &["Montgomery", "Walker"], Some("10:30 AM - 1:00 PM"), 40),
                seed("raven", "Raven", AgentRole::ColdCaller, &["Galveston", "Chambers"], Some("1:00 PM - 3:30 PM"), 40),
                seed("jett", "Jett", AgentRole::ColdCaller, &["Liberty", "San Jacinto"], Some("1:30 PM - 4:00 PM"), 40),
                seed("sage", "Sage", AgentRole::ColdCaller, &["Waller", "Austin Co"], Some("2:00 PM - 4:30 PM"), 40),
                seed("finn", "Finn", AgentRole::ColdCaller, &["Colorado", "Wharton", "Matagorda"], Some("2:30 PM - 5:00 PM"), 40),
                seed("luna", "Luna", AgentRole::FollowUp, &["All"], Some("10:00 AM - 2:00 PM"), 30),
                seed("blaze", "Blaze", AgentRole::Disposition, &["All"], Some("9:00 AM - 5:00 PM"), 25),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callflow_core::AgentStatus;
    use std::io::Write;

    #[test]
    fn test_default_roster() {
        let roster = RosterConfig::default();
        assert_eq!(roster.agents.len(), 11);

        let agents = roster.into_agents();
        let zara = agents.iter().find(|a| a.id == "zara").unwrap();
        assert_eq!(zara.role, AgentRole::Receptionist);
        assert!(zara.window.is_none()); // 24/7
        assert_eq!(zara.daily_call_limit, 0);

        let ace = agents.iter().find(|a| a.id == "ace").unwrap();
        assert!(ace.window.is_some());
        assert_eq!(ace.status, AgentStatus::Idle);
        assert_eq!(ace.daily_call_limit, 40);
    }

    #[test]
    fn test_load_toml_roster() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[[agents]]
id = "rex"
name = "Rex"
role = "cold_caller"
territories = ["Harris"]
schedule = "8:00 AM - 10:00 AM"
daily_call_limit = 20
"#
        )
        .unwrap();

        let roster = RosterConfig::load(file.path()).unwrap();
        assert_eq!(roster.agents.len(), 1);
        let agent = roster.into_agents().remove(0);
        assert_eq!(agent.id, "rex");
        assert_eq!(agent.daily_call_limit, 20);
        assert!(agent.window.is_some());
    }

    #[test]
    fn test_load_yaml_roster() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
agents:
  - id: ivy
    name: Ivy
    role: follow_up
    territories: ["All"]
"#
        )
        .unwrap();

        let roster = RosterConfig::load(file.path()).unwrap();
        let agent = roster.into_agents().remove(0);
        assert_eq!(agent.role, AgentRole::FollowUp);
        assert!(agent.window.is_none());
        assert_eq!(agent.daily_call_limit, 40);
    }

    #[test]
    fn test_missing_roster_file() {
        assert!(matches!(
            RosterConfig::load("/nonexistent/roster.toml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
