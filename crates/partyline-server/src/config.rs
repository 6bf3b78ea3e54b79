use std::time::Duration;

use serde::Deserialize;

use partyline_core::net::protocol::MAX_MESSAGE_SIZE;
use partyline_core::registry::DEFAULT_MAX_PLAYERS;

/// Upper bound on a `PhaseEntered` frame without its prompts: type byte,
/// session code, phase tag, round, array headers and the forced flag.
const PHASE_ENTRY_ENVELOPE: usize = 128;
/// Upper bound on one encoded prompt besides its content bytes.
const PROMPT_OVERHEAD: usize = 32;

/// Top-level server configuration, loaded from `partyline.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub limits: LimitsConfig,
    pub sessions: SessionsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            web_root: "public".to_string(),
            limits: LimitsConfig::default(),
            sessions: SessionsConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits,
/// input lengths).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub ws_rate_limit_per_sec: f64,
    pub player_message_buffer: usize,
    /// Longest accepted display name, in characters.
    pub max_name_len: usize,
    /// Longest accepted submission, in bytes.
    pub max_submission_len: usize,
    /// Roster cap for a single session.
    pub max_players_per_session: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            ws_rate_limit_per_sec: 20.0,
            player_message_buffer: 64,
            max_name_len: 32,
            max_submission_len: 500,
            max_players_per_session: DEFAULT_MAX_PLAYERS,
        }
    }
}

impl LimitsConfig {
    /// Worst-case size of a `PhaseEntered` frame: a full roster where every
    /// player submitted the longest allowed content.
    pub fn max_phase_entry_size(&self) -> usize {
        let per_prompt = self.max_submission_len.saturating_add(PROMPT_OVERHEAD);
        self.max_players_per_session
            .saturating_mul(per_prompt)
            .saturating_add(PHASE_ENTRY_ENVELOPE)
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    /// Force a phase forward once it has been open this long. Disabled when
    /// unset.
    pub phase_timeout_secs: Option<u64>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3600,
            sweep_interval_secs: 30,
            phase_timeout_secs: None,
        }
    }
}

impl SessionsConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn phase_timeout(&self) -> Option<Duration> {
        self.phase_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidListenAddr(String),
    /// A setting that must be strictly positive was zero (or negative).
    NotPositive(&'static str),
    /// A full session could produce a phase broadcast larger than a frame.
    PhaseEntryTooLarge { size: usize, limit: usize },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidListenAddr(addr) => {
                write!(f, "listen_addr {addr:?} is not a valid socket address")
            },
            Self::NotPositive(key) => write!(f, "{key} must be > 0"),
            Self::PhaseEntryTooLarge { size, limit } => write!(
                f,
                "limits.max_players_per_session x limits.max_submission_len allows \
                 {size}-byte phase broadcasts, over the {limit}-byte message limit"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Check the configuration for values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidListenAddr(self.listen_addr.clone()));
        }

        let limits = &self.limits;
        if limits.max_ws_connections == 0 {
            return Err(ConfigError::NotPositive("limits.max_ws_connections"));
        }
        if limits.ws_rate_limit_per_sec <= 0.0 {
            return Err(ConfigError::NotPositive("limits.ws_rate_limit_per_sec"));
        }
        if limits.player_message_buffer == 0 {
            return Err(ConfigError::NotPositive("limits.player_message_buffer"));
        }
        if limits.max_name_len == 0 {
            return Err(ConfigError::NotPositive("limits.max_name_len"));
        }
        if limits.max_submission_len == 0 {
            return Err(ConfigError::NotPositive("limits.max_submission_len"));
        }
        if limits.max_players_per_session == 0 {
            return Err(ConfigError::NotPositive("limits.max_players_per_session"));
        }
        let size = limits.max_phase_entry_size();
        if size > MAX_MESSAGE_SIZE {
            return Err(ConfigError::PhaseEntryTooLarge {
                size,
                limit: MAX_MESSAGE_SIZE,
            });
        }

        let sessions = &self.sessions;
        if sessions.idle_timeout_secs == 0 {
            return Err(ConfigError::NotPositive("sessions.idle_timeout_secs"));
        }
        if sessions.sweep_interval_secs == 0 {
            return Err(ConfigError::NotPositive("sessions.sweep_interval_secs"));
        }
        if sessions.phase_timeout_secs == Some(0) {
            return Err(ConfigError::NotPositive("sessions.phase_timeout_secs"));
        }
        Ok(())
    }

    /// Load config from `partyline.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("partyline.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from partyline.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse partyline.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No partyline.toml found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `PARTYLINE_*` overrides. `lookup` resolves a variable name to
    /// its value; empty or unparsable values are ignored.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("PARTYLINE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Some(root) = lookup("PARTYLINE_WEB_ROOT")
            && !root.is_empty()
        {
            self.web_root = root;
        }
        if let Some(val) = lookup("PARTYLINE_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_ws_connections = n;
        }
        if let Some(val) = lookup("PARTYLINE_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            self.limits.ws_rate_limit_per_sec = n;
        }
        if let Some(val) = lookup("PARTYLINE_MAX_PLAYERS_PER_SESSION")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_players_per_session = n;
        }
        if let Some(val) = lookup("PARTYLINE_PHASE_TIMEOUT_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.sessions.phase_timeout_secs = Some(n);
        }
    }
}
