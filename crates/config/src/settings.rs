//! Runtime settings
//!
//! Layered loading: built-in defaults, then an optional TOML file, then
//! `CALLFLOW__`-prefixed environment variables (`CALLFLOW__SERVER__PORT`,
//! `CALLFLOW__PROVIDER__API_KEY`, ...).

use serde::{Deserialize, Serialize};

use callflow_scoring::ScorePolicy;

use crate::ConfigError;

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub crm: CrmConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            auth: AuthConfig::default(),
        }
    }
}

/// Operator API authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Path prefixes that bypass auth (health, metrics, provider webhooks)
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec![
        "/health".to_string(),
        "/ready".to_string(),
        "/metrics".to_string(),
        "/webhooks".to_string(),
    ]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            public_paths: default_public_paths(),
        }
    }
}

/// Orchestration timing and cadence knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Post-call settling interval before an agent may dial again
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Provider status poll interval for non-terminal sessions
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Sessions older than this are forcibly finalized as timed out
    #[serde(default = "default_max_call_secs")]
    pub max_call_duration_secs: u64,
    /// Hour of day (UTC) at which daily quotas reset
    #[serde(default = "default_daily_reset_hour")]
    pub daily_reset_hour: u32,
    /// Follow-up cadence for warm leads, days
    #[serde(default = "default_warm_follow_up_days")]
    pub warm_follow_up_days: i64,
    /// Recontact cadence for cold leads, days
    #[serde(default = "default_cold_recontact_days")]
    pub cold_recontact_days: i64,
}

fn default_cooldown_secs() -> u64 {
    90
}
fn default_poll_interval_ms() -> u64 {
    2_000
}
fn default_max_call_secs() -> u64 {
    900 // 15 minutes
}
fn default_daily_reset_hour() -> u32 {
    6 // midnight Central, in UTC
}
fn default_warm_follow_up_days() -> i64 {
    3
}
fn default_cold_recontact_days() -> i64 {
    90
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_call_duration_secs: default_max_call_secs(),
            daily_reset_hour: default_daily_reset_hour(),
            warm_follow_up_days: default_warm_follow_up_days(),
            cold_recontact_days: default_cold_recontact_days(),
        }
    }
}

/// Voice provider client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_endpoint")]
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff, doubles each retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_provider_endpoint() -> String {
    "http://localhost:7070".to_string()
}
fn default_provider_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    100
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_provider_endpoint(),
            api_key: None,
            timeout_secs: default_provider_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

/// Workflow relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_relay_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_relay_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_relay_endpoint() -> String {
    "http://localhost:5678/webhook/callflow".to_string()
}
fn default_relay_timeout_secs() -> u64 {
    10
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_relay_endpoint(),
            timeout_secs: default_relay_timeout_secs(),
        }
    }
}

/// CRM store configuration
///
/// No endpoint means the in-memory store, which is the dev/test default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrmConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Scoring configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub policy: ScorePolicy,
}

/// Load settings from an optional file plus the environment
pub fn load_settings(path: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path).required(true));
    } else {
        builder = builder.add_source(config::File::with_name("callflow").required(false));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("CALLFLOW")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?
        .try_deserialize::<Settings>()?;

    if settings.server.auth.enabled && settings.server.auth.api_key.is_none() {
        return Err(ConfigError::MissingField("server.auth.api_key".to_string()));
    }

    tracing::info!(
        port = settings.server.port,
        provider = %settings.provider.endpoint,
        relay_enabled = settings.relay.enabled,
        "settings loaded"
    );

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.engine.cooldown_secs, 90);
        assert_eq!(settings.engine.max_call_duration_secs, 900);
        assert!(!settings.relay.enabled);
        assert_eq!(settings.scoring.policy, ScorePolicy::Clamp);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[engine]
cooldown_secs = 5

[scoring.policy]
mode = "rescale"
ceiling = 12.0
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.engine.cooldown_secs, 5);
        assert_eq!(
            settings.scoring.policy,
            ScorePolicy::Rescale { ceiling: 12.0 }
        );
        // Untouched sections keep their defaults
        assert_eq!(settings.provider.max_retries, 3);
    }

    #[test]
    fn test_auth_requires_key() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "[server.auth]\nenabled = true").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        assert!(matches!(
            load_settings(Some(&path)),
            Err(ConfigError::MissingField(_))
        ));
    }
}
