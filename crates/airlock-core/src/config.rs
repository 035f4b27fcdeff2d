//! Configuration loading and typed config structures for the Airlock
//! simulation.
//!
//! The canonical configuration lives in `airlock-config.yaml` at the project
//! root. Every section and field has a default, so an empty file is a valid
//! configuration: eight agents, two Byzantine, ten rounds of four movement
//! sub-steps on the default ship.
//!
//! Parsing runs field-level checks through `validator` and then the
//! cross-field checks (team split, map connectivity) that a derive cannot
//! express.

use std::path::Path;
use std::time::Duration;

use airlock_agents::{
    DEFAULT_BYZANTINE_EXCLUDED_PREFIXES, DEFAULT_DISPLAY_TAGS, DEFAULT_MODELS, RosterPlan,
};
use airlock_world::{MapDefinition, RoomGraph, WorldError, ship_graph};
use serde::Deserialize;
use validator::Validate;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A field is out of range.
    #[error("invalid config: {source}")]
    Validation {
        /// Field-level validation failures.
        #[from]
        source: validator::ValidationErrors,
    },

    /// Fields are individually valid but inconsistent.
    #[error("invalid config: {message}")]
    Inconsistent {
        /// What is inconsistent.
        message: String,
    },

    /// The configured map is unusable.
    #[error("invalid map: {source}")]
    Map {
        /// The underlying graph error.
        #[from]
        source: WorldError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct AirlockConfig {
    /// Game pacing.
    #[serde(default)]
    #[validate(nested)]
    pub game: GameConfig,

    /// Seating.
    #[serde(default)]
    #[validate(nested)]
    pub roster: RosterConfig,

    /// Rule parameters.
    #[serde(default)]
    #[validate(nested)]
    pub rules: RulesConfig,

    /// Decision oracle parameters.
    #[serde(default)]
    #[validate(nested)]
    pub oracle: OracleConfig,

    /// Custom map; the default ship when absent.
    #[serde(default)]
    pub map: Option<MapDefinition>,

    /// Logging.
    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingConfig,

    /// Infrastructure endpoints.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,
}

impl AirlockConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for infrastructure:
    /// - `DATABASE_URL` overrides `infrastructure.postgres_url`
    /// - `OBSERVER_PORT` overrides `infrastructure.observer_port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, and any
    /// error [`AirlockConfig::parse`] returns.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and check configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] for malformed YAML,
    /// [`ConfigError::Validation`] for out-of-range fields,
    /// [`ConfigError::Inconsistent`] for an invalid team split, and
    /// [`ConfigError::Map`] for an unusable custom map.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.infrastructure.apply_env_overrides();
        config.check()?;
        Ok(config)
    }

    /// Run field-level and cross-field checks.
    ///
    /// # Errors
    ///
    /// See [`AirlockConfig::parse`].
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.roster_plan()
            .check_split()
            .map_err(|e| ConfigError::Inconsistent {
                message: e.to_string(),
            })?;
        self.room_graph()?;
        Ok(())
    }

    /// Build the room graph: the custom map if configured, else the ship.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Map`] if the map is unusable.
    pub fn room_graph(&self) -> Result<RoomGraph, ConfigError> {
        let graph = match &self.map {
            Some(def) => RoomGraph::from_definition(def)?,
            None => ship_graph()?,
        };
        Ok(graph)
    }

    /// The seating plan for a game.
    pub fn roster_plan(&self) -> RosterPlan {
        RosterPlan {
            agent_count: self.roster.agent_count,
            byzantine_count: self.roster.byzantine_count,
            models: self.roster.models.clone(),
            display_tags: self.roster.display_tags.clone(),
            shuffle_models: self.roster.shuffle_models,
            single_model: self.roster.single_model.clone(),
            byzantine_excluded_prefixes: self.roster.byzantine_excluded_prefixes.clone(),
        }
    }

    /// The rule parameters the scheduler runs with.
    pub const fn rules(&self) -> GameRules {
        GameRules {
            round_limit: self.game.round_limit,
            max_sub_steps: self.game.max_movement_sub_steps,
            discussion_turns: self.game.discussion_turns,
            decision_timeout: Duration::from_millis(self.oracle.decision_timeout_ms),
            elimination_cooldown_sub_steps: self.rules.elimination_cooldown_sub_steps,
            feed_capacity: self.logging.feed_capacity,
        }
    }
}

/// Runtime rule parameters, derived from [`AirlockConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    /// Rounds before passive resolution.
    pub round_limit: u32,
    /// Movement sub-steps per round.
    pub max_sub_steps: u32,
    /// Discussion turns per meeting.
    pub discussion_turns: u32,
    /// Per-call oracle deadline.
    pub decision_timeout: Duration,
    /// Sub-steps a Byzantine agent waits after eliminating.
    pub elimination_cooldown_sub_steps: u64,
    /// Capacity of the observer event feed.
    pub feed_capacity: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        AirlockConfig::default().rules()
    }
}

/// Game pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct GameConfig {
    /// Human-readable name, used in logs.
    #[serde(default = "default_game_name")]
    pub name: String,

    /// Seed for roster setup; `None` draws from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Rounds before passive resolution.
    #[serde(default = "default_round_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub round_limit: u32,

    /// Movement sub-steps per round.
    #[serde(default = "default_max_movement_sub_steps")]
    #[validate(range(min = 1, max = 100))]
    pub max_movement_sub_steps: u32,

    /// Discussion turns per meeting.
    #[serde(default = "default_discussion_turns")]
    #[validate(range(min = 1, max = 10))]
    pub discussion_turns: u32,

    /// Games to run back to back.
    #[serde(default = "default_games")]
    #[validate(range(min = 1))]
    pub games: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            name: default_game_name(),
            seed: None,
            round_limit: default_round_limit(),
            max_movement_sub_steps: default_max_movement_sub_steps(),
            discussion_turns: default_discussion_turns(),
            games: default_games(),
        }
    }
}

/// Seating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct RosterConfig {
    /// Total agents.
    #[serde(default = "default_agent_count")]
    #[validate(range(min = 3, max = 64))]
    pub agent_count: u32,

    /// Byzantine agents.
    #[serde(default = "default_byzantine_count")]
    #[validate(range(min = 1))]
    pub byzantine_count: u32,

    /// Model tags, cycled over seats.
    #[serde(default = "default_models")]
    #[validate(length(min = 1))]
    pub models: Vec<String>,

    /// Display tags, cycled over seats.
    #[serde(default = "default_display_tags")]
    pub display_tags: Vec<String>,

    /// Shuffle model assignment.
    #[serde(default = "default_true")]
    pub shuffle_models: bool,

    /// Give every seat this model.
    #[serde(default)]
    pub single_model: Option<String>,

    /// Model prefixes never given the Byzantine role.
    #[serde(default = "default_byzantine_excluded_prefixes")]
    pub byzantine_excluded_prefixes: Vec<String>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            agent_count: default_agent_count(),
            byzantine_count: default_byzantine_count(),
            models: default_models(),
            display_tags: default_display_tags(),
            shuffle_models: true,
            single_model: None,
            byzantine_excluded_prefixes: default_byzantine_excluded_prefixes(),
        }
    }
}

/// Rule parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct RulesConfig {
    /// Sub-steps a Byzantine agent must wait after eliminating before it
    /// may eliminate again. Zero allows one elimination every sub-step.
    #[serde(default = "default_elimination_cooldown")]
    #[validate(range(max = 1000))]
    pub elimination_cooldown_sub_steps: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            elimination_cooldown_sub_steps: default_elimination_cooldown(),
        }
    }
}

/// Which decision source the binary plays with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleKind {
    /// LLM backends chosen by model tag.
    #[default]
    Llm,
    /// Seeded random bots; no network.
    Random,
}

/// Decision oracle parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct OracleConfig {
    /// Decision source.
    #[serde(default)]
    pub kind: OracleKind,

    /// Per-call deadline in milliseconds.
    #[serde(default = "default_decision_timeout_ms")]
    #[validate(range(min = 1))]
    pub decision_timeout_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            kind: OracleKind::Llm,
            decision_timeout_ms: default_decision_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Entries kept in the observer's recent-event feed.
    #[serde(default = "default_feed_capacity")]
    #[validate(range(min = 1, max = 10_000))]
    pub feed_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            feed_capacity: default_feed_capacity(),
        }
    }
}

/// Infrastructure endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// `PostgreSQL` connection string; logs stay in memory when unset.
    #[serde(default)]
    pub postgres_url: Option<String>,

    /// Whether to serve the observer API.
    #[serde(default = "default_true")]
    pub observer_enabled: bool,

    /// Observer API port.
    #[serde(default = "default_observer_port")]
    pub observer_port: u16,
}

impl InfrastructureConfig {
    /// Override infrastructure settings with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.postgres_url = Some(val);
        }
        if let Some(port) = std::env::var("OBSERVER_PORT")
            .ok()
            .and_then(|val| val.parse().ok())
        {
            self.observer_port = port;
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            postgres_url: None,
            observer_enabled: true,
            observer_port: default_observer_port(),
        }
    }
}

fn default_game_name() -> String {
    "airlock".to_owned()
}

const fn default_round_limit() -> u32 {
    10
}

const fn default_max_movement_sub_steps() -> u32 {
    4
}

const fn default_discussion_turns() -> u32 {
    2
}

const fn default_games() -> u32 {
    1
}

const fn default_agent_count() -> u32 {
    8
}

const fn default_byzantine_count() -> u32 {
    2
}

fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| (*m).to_owned()).collect()
}

fn default_display_tags() -> Vec<String> {
    DEFAULT_DISPLAY_TAGS.iter().map(|t| (*t).to_owned()).collect()
}

fn default_byzantine_excluded_prefixes() -> Vec<String> {
    DEFAULT_BYZANTINE_EXCLUDED_PREFIXES
        .iter()
        .map(|p| (*p).to_owned())
        .collect()
}

const fn default_elimination_cooldown() -> u64 {
    1
}

const fn default_decision_timeout_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_feed_capacity() -> usize {
    50
}

const fn default_observer_port() -> u16 {
    8080
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AirlockConfig::default();
        assert!(config.check().is_ok());
        assert_eq!(config.game.round_limit, 10);
        assert_eq!(config.game.max_movement_sub_steps, 4);
        assert_eq!(config.game.discussion_turns, 2);
        assert_eq!(config.roster.agent_count, 8);
        assert_eq!(config.roster.byzantine_count, 2);
        assert_eq!(config.rules.elimination_cooldown_sub_steps, 1);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
game:
  name: "bench"
  seed: 123
  round_limit: 6
  max_movement_sub_steps: 3
  discussion_turns: 1
  games: 5

roster:
  agent_count: 6
  byzantine_count: 1
  models: ["gpt-4o", "claude-3-haiku-20240307"]
  display_tags: ["A", "B"]
  shuffle_models: false
  byzantine_excluded_prefixes: ["claude"]

rules:
  elimination_cooldown_sub_steps: 3

oracle:
  kind: random
  decision_timeout_ms: 2500

map:
  rooms: ["Bridge", "Galley", "Hold"]
  connections: [["Bridge", "Galley"], ["Galley", "Hold"]]
  meeting_room: "Galley"

logging:
  level: "debug"
  feed_capacity: 20

infrastructure:
  observer_enabled: false
  observer_port: 9090
"#;

        let config = AirlockConfig::parse(yaml).unwrap();
        assert_eq!(config.game.name, "bench");
        assert_eq!(config.game.seed, Some(123));
        assert_eq!(config.game.games, 5);
        assert_eq!(config.roster.agent_count, 6);
        assert!(!config.roster.shuffle_models);
        assert_eq!(config.rules.elimination_cooldown_sub_steps, 3);
        assert_eq!(config.oracle.kind, OracleKind::Random);
        assert!(!config.infrastructure.observer_enabled);

        let rules = config.rules();
        assert_eq!(rules.round_limit, 6);
        assert_eq!(rules.max_sub_steps, 3);
        assert_eq!(rules.decision_timeout, Duration::from_millis(2500));
        assert_eq!(rules.feed_capacity, 20);

        let graph = config.room_graph().unwrap();
        assert_eq!(graph.room_count(), 3);
        assert_eq!(graph.meeting_room().as_str(), "Galley");
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = AirlockConfig::parse("game:\n  round_limit: 3\n").unwrap();
        assert_eq!(config.game.round_limit, 3);
        assert_eq!(config.game.max_movement_sub_steps, 4);
        assert_eq!(config.roster.agent_count, 8);
        assert_eq!(config.roster.byzantine_excluded_prefixes, vec!["claude".to_owned()]);
        assert_eq!(config.room_graph().unwrap().room_count(), 14);
    }

    #[test]
    fn empty_exclusion_list_is_kept() {
        let config = AirlockConfig::parse("roster:\n  byzantine_excluded_prefixes: []\n").unwrap();
        assert!(config.roster_plan().byzantine_excluded_prefixes.is_empty());
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(AirlockConfig::parse("").is_ok());
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let result = AirlockConfig::parse("game:\n  max_movement_sub_steps: 0\n");
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn rejects_byzantine_majority() {
        let result = AirlockConfig::parse("roster:\n  agent_count: 6\n  byzantine_count: 3\n");
        assert!(matches!(result, Err(ConfigError::Inconsistent { .. })));
    }

    #[test]
    fn rejects_disconnected_map() {
        let yaml = r#"
map:
  rooms: ["A", "B"]
  connections: []
  meeting_room: "A"
"#;
        assert!(matches!(
            AirlockConfig::parse(yaml),
            Err(ConfigError::Map { .. })
        ));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("airlock-config.yaml");
        if path.exists() {
            let config = AirlockConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
