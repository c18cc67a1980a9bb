//! Environment configuration
//!
//! Everything the bridge needs is passed in an [`EnvConfig`] at construction.
//! Files are JSON; every section has defaults so a minimal file only names
//! what differs.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::agent::Agent;
use crate::error::{ArenaError, Result};
use crate::reward::RewardWeights;

/// Arena maps known to the simulator
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MapName {
    #[default]
    #[serde(rename = "Old Summoners Rift")]
    OldSummonersRift,
    #[serde(rename = "New Summoners Rift")]
    NewSummonersRift,
    #[serde(rename = "Howling Abyss")]
    HowlingAbyss,
}

impl MapName {
    /// Simulator map id
    pub fn id(self) -> u32 {
        match self {
            MapName::OldSummonersRift => 1,
            MapName::NewSummonersRift => 11,
            MapName::HowlingAbyss => 12,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MapName::OldSummonersRift => "Old Summoners Rift",
            MapName::NewSummonersRift => "New Summoners Rift",
            MapName::HowlingAbyss => "Howling Abyss",
        }
    }
}

impl fmt::Display for MapName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapName {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self> {
        [
            MapName::OldSummonersRift,
            MapName::NewSummonersRift,
            MapName::HowlingAbyss,
        ]
        .into_iter()
        .find(|map| map.as_str() == s)
        .ok_or_else(|| ArenaError::Config(format!("unknown map {:?}", s)))
    }
}

/// Width/height pair; JSON accepts either `8` or `[8, 8]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "DimensionsRepr", into = "DimensionsRepr")]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn sizes(&self) -> Vec<u32> {
        vec![self.width, self.height]
    }

    fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum DimensionsRepr {
    Square(u32),
    Rect([u32; 2]),
}

impl From<DimensionsRepr> for Dimensions {
    fn from(repr: DimensionsRepr) -> Self {
        match repr {
            DimensionsRepr::Square(size) => Dimensions::square(size),
            DimensionsRepr::Rect([width, height]) => Dimensions::new(width, height),
        }
    }
}

impl From<Dimensions> for DimensionsRepr {
    fn from(dims: Dimensions) -> Self {
        if dims.width == dims.height {
            DimensionsRepr::Square(dims.width)
        } else {
            DimensionsRepr::Rect([dims.width, dims.height])
        }
    }
}

/// Value spaces of the dynamically-sized action arguments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InterfaceFormat {
    /// Bounds of `position` arguments, in map units
    pub map_size: Dimensions,
    /// Bounds of `move_range` arguments, in agent move units
    pub move_range: Dimensions,
}

impl Default for InterfaceFormat {
    fn default() -> Self {
        Self {
            map_size: Dimensions::square(16000),
            move_range: Dimensions::square(8),
        }
    }
}

/// Game rule toggles forwarded verbatim into session setup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameToggles {
    pub cooldowns_enabled: bool,
    pub manacosts_enabled: bool,
    pub minion_spawns_enabled: bool,
    pub cheats_enabled: bool,
    pub damage_text_global: bool,
}

impl Default for GameToggles {
    fn default() -> Self {
        Self {
            cooldowns_enabled: false,
            manacosts_enabled: false,
            minion_spawns_enabled: false,
            cheats_enabled: true,
            damage_text_global: true,
        }
    }
}

/// Queue broker endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_secs: u64,
}

impl BrokerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6379,
            connect_timeout_secs: 10,
        }
    }
}

/// Broker list names for each logical channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChannelKeys {
    pub action: String,
    pub observation: String,
    pub command: String,
    pub replay: String,
}

impl Default for ChannelKeys {
    fn default() -> Self {
        Self {
            action: "action".into(),
            observation: "observation".into(),
            command: "command".into(),
            replay: "replay".into(),
        }
    }
}

/// Longest accepted wait, one day
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Bounded waits on the simulator, in seconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timeouts {
    pub clients_join_secs: u64,
    pub game_started_secs: u64,
    pub observation_secs: u64,
    pub replay_secs: u64,
}

impl Timeouts {
    pub fn clients_join(&self) -> Duration {
        Duration::from_secs(self.clients_join_secs)
    }

    pub fn game_started(&self) -> Duration {
        Duration::from_secs(self.game_started_secs)
    }

    pub fn observation(&self) -> Duration {
        Duration::from_secs(self.observation_secs)
    }

    pub fn replay(&self) -> Duration {
        Duration::from_secs(self.replay_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            clients_join_secs: 20,
            game_started_secs: 60,
            observation_secs: 60,
            replay_secs: 60,
        }
    }
}

/// Limits applied by the run loop; `0` means unlimited
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunLimits {
    pub max_episodes: u64,
    pub max_steps: u64,
    /// Ask the simulator for a replay before closing
    pub save_replay: bool,
}

/// Complete environment configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvConfig {
    pub map: MapName,
    #[serde(deserialize_with = "deserialize_players")]
    pub players: Vec<Agent>,
    pub interface: InterfaceFormat,
    pub game: GameToggles,
    pub broker: BrokerConfig,
    pub channels: ChannelKeys,
    pub timeouts: Timeouts,
    /// Simulation speed multiplier recorded in replays
    pub multiplier: f64,
    pub run: RunLimits,
    pub reward: RewardWeights,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            map: MapName::default(),
            players: vec![
                Agent::new("Ezreal", crate::agent::Team::Blue),
                Agent::new("Lucian", crate::agent::Team::Purple),
            ],
            interface: InterfaceFormat::default(),
            game: GameToggles::default(),
            broker: BrokerConfig::default(),
            channels: ChannelKeys::default(),
            timeouts: Timeouts::default(),
            multiplier: 1.0,
            run: RunLimits::default(),
            reward: RewardWeights::default(),
        }
    }
}

impl EnvConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EnvConfig = serde_json::from_str(json)
            .map_err(|e| ArenaError::Config(format!("malformed configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ArenaError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Reject configurations the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.players.len() < 2 {
            return Err(ArenaError::Config(format!(
                "at least two players are required, got {}",
                self.players.len()
            )));
        }
        if self.interface.map_size.is_empty() {
            return Err(ArenaError::Config("map_size must be positive".into()));
        }
        if self.interface.move_range.is_empty() {
            return Err(ArenaError::Config("move_range must be positive".into()));
        }
        if self.broker.host.is_empty() || self.broker.port == 0 {
            return Err(ArenaError::Config(format!(
                "invalid broker address {:?}",
                self.broker.address()
            )));
        }
        let timeouts = [
            ("broker.connect_timeout_secs", self.broker.connect_timeout_secs),
            ("timeouts.clients_join_secs", self.timeouts.clients_join_secs),
            ("timeouts.game_started_secs", self.timeouts.game_started_secs),
            ("timeouts.observation_secs", self.timeouts.observation_secs),
            ("timeouts.replay_secs", self.timeouts.replay_secs),
        ];
        for (name, secs) in timeouts {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                return Err(ArenaError::Config(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_TIMEOUT_SECS, secs
                )));
            }
        }

        let keys = [
            &self.channels.action,
            &self.channels.observation,
            &self.channels.command,
            &self.channels.replay,
        ];
        if keys.iter().any(|key| key.is_empty()) {
            return Err(ArenaError::Config("channel keys must not be empty".into()));
        }
        if keys.iter().collect::<HashSet<_>>().len() != keys.len() {
            return Err(ArenaError::Config("channel keys must be distinct".into()));
        }

        if !(self.multiplier.is_finite() && self.multiplier > 0.0) {
            return Err(ArenaError::Config(format!(
                "multiplier must be positive, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }
}

fn deserialize_players<'de, D>(deserializer: D) -> std::result::Result<Vec<Agent>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PlayersRepr {
        Roster(String),
        List(Vec<Agent>),
    }

    match PlayersRepr::deserialize(deserializer)? {
        PlayersRepr::Roster(roster) => {
            Agent::parse_roster(&roster).map_err(serde::de::Error::custom)
        }
        PlayersRepr::List(list) => Ok(list),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Team;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = EnvConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EnvConfig::default());
        assert_eq!(config.map.id(), 1);
        assert_eq!(config.timeouts.clients_join(), Duration::from_secs(20));
        assert_eq!(config.timeouts.game_started(), Duration::from_secs(60));
    }

    #[test]
    fn test_roster_string_and_dimension_forms() {
        let json = r#"{
            "map": "Howling Abyss",
            "players": "Ashe.BLUE,Annie.PURPLE,Garen.BLUE",
            "interface": { "map_size": [14000, 15000], "move_range": 10 },
            "game": { "cooldowns_enabled": true }
        }"#;
        let config = EnvConfig::from_json_str(json).unwrap();
        assert_eq!(config.map, MapName::HowlingAbyss);
        assert_eq!(config.map.id(), 12);
        assert_eq!(config.players.len(), 3);
        assert_eq!(config.players[2], Agent::new("Garen", Team::Blue));
        assert_eq!(config.interface.map_size, Dimensions::new(14000, 15000));
        assert_eq!(config.interface.move_range, Dimensions::square(10));
        assert!(config.game.cooldowns_enabled);
        assert!(config.game.cheats_enabled);
    }

    #[test]
    fn test_player_list_form() {
        let json = r#"{"players": [{"champion": "Ezreal", "team": "BLUE"}, {"champion": "Ahri", "team": "PURPLE"}]}"#;
        let config = EnvConfig::from_json_str(json).unwrap();
        assert_eq!(config.players[1].champion, "Ahri");
    }

    #[test]
    fn test_rejects_bad_configs() {
        let cases = [
            r#"{"players": "Ezreal.BLUE"}"#,
            r#"{"interface": {"map_size": 0}}"#,
            r#"{"interface": {"move_range": [8, 0]}}"#,
            r#"{"map": "Twisted Treeline"}"#,
            r#"{"channels": {"action": "observation"}}"#,
            r#"{"timeouts": {"observation_secs": 0}}"#,
            r#"{"timeouts": {"observation_secs": 18446744073709551615}}"#,
            r#"{"timeouts": {"replay_secs": 86401}}"#,
            r#"{"broker": {"connect_timeout_secs": 18446744073709551615}}"#,
            r#"{"multiplier": -2.0}"#,
            r#"{"interface": {"map_size": -5}}"#,
        ];
        for json in cases {
            let err = EnvConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, ArenaError::Config(_)), "{} gave {:?}", json, err);
        }
    }

    #[test]
    fn test_day_long_timeout_is_accepted() {
        let config =
            EnvConfig::from_json_str(r#"{"timeouts": {"observation_secs": 86400}}"#).unwrap();
        assert_eq!(config.timeouts.observation(), Duration::from_secs(MAX_TIMEOUT_SECS));
    }

    #[test]
    fn test_map_name_parse() {
        assert_eq!(
            "New Summoners Rift".parse::<MapName>().unwrap(),
            MapName::NewSummonersRift
        );
        assert!("Nowhere".parse::<MapName>().is_err());
    }
}
