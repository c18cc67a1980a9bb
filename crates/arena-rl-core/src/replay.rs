//! Recorded games
//!
//! The simulator produces replays as JSON:
//! `{"info": {"map", "players", "multiplier"}, "actions": [{"game_time", "action_type", "action_data"}]}`.
//! Action data is kept verbatim and never re-validated.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::path::Path;

use crate::agent::Agent;
use crate::config::MapName;
use crate::error::{ArenaError, Result};

/// Header of a replay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayInfo {
    pub map: MapName,
    /// Compact roster, `"Ezreal.BLUE,Lucian.PURPLE"`
    pub players: String,
    pub multiplier: f64,
}

impl ReplayInfo {
    pub fn new(map: MapName, players: &[Agent], multiplier: f64) -> Self {
        Self {
            map,
            players: Agent::format_roster(players),
            multiplier,
        }
    }

    pub fn agents(&self) -> Result<Vec<Agent>> {
        Agent::parse_roster(&self.players)
    }
}

/// One recorded wire action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayAction {
    pub game_time: f64,
    pub action_type: String,
    /// Recorded text of the body, missing or null for bodiless actions
    #[serde(default)]
    pub action_data: Option<Box<RawValue>>,
}

impl ReplayAction {
    /// Wire body for this action: strings are unquoted, anything else is
    /// sent as recorded, missing data becomes an empty body
    pub fn body(&self) -> Result<String> {
        match &self.action_data {
            None => Ok(String::new()),
            Some(raw) if raw.get().starts_with('"') => Ok(serde_json::from_str(raw.get())?),
            Some(raw) => Ok(raw.get().to_string()),
        }
    }
}

/// A parsed replay file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    pub info: ReplayInfo,
    pub actions: Vec<ReplayAction>,
}

impl Replay {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ArenaError::Protocol(format!("malformed replay: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Consecutive actions sharing a `game_time`, in recorded order
    pub fn action_groups(&self) -> Vec<&[ReplayAction]> {
        self.actions
            .chunk_by(|a, b| a.game_time == b.game_time)
            .collect()
    }

    /// Number of distinct ticks in the replay
    pub fn tick_count(&self) -> usize {
        self.action_groups().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Team;

    const REPLAY: &str = r#"{
        "info": {"map": "Old Summoners Rift", "players": "Ezreal.BLUE,Lucian.PURPLE", "multiplier": 2.0},
        "actions": [
            {"game_time": 0.5, "action_type": "move", "action_data": {"player_id": "1", "x": 100.0, "y": -200.0}},
            {"game_time": 0.5, "action_type": "noop", "action_data": ""},
            {"game_time": 1.0, "action_type": "attack", "action_data": "{\"player_id\":\"2\",\"target_player_id\":\"1\"}"},
            {"game_time": 1.5, "action_type": "reset"}
        ]
    }"#;

    #[test]
    fn test_parse_replay() {
        let replay = Replay::from_json_str(REPLAY).unwrap();
        assert_eq!(replay.info.map, MapName::OldSummonersRift);
        assert_eq!(replay.info.multiplier, 2.0);
        assert_eq!(
            replay.info.agents().unwrap(),
            vec![Agent::new("Ezreal", Team::Blue), Agent::new("Lucian", Team::Purple)]
        );
    }

    #[test]
    fn test_groups_keep_order_and_every_tick() {
        let replay = Replay::from_json_str(REPLAY).unwrap();
        let groups = replay.action_groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(replay.tick_count(), 3);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][0].action_type, "move");
        assert_eq!(groups[0][1].action_type, "noop");
        assert_eq!(groups[2][0].action_type, "reset");
    }

    #[test]
    fn test_bodies_are_verbatim() {
        let replay = Replay::from_json_str(REPLAY).unwrap();
        assert_eq!(
            replay.actions[0].body().unwrap(),
            r#"{"player_id": "1", "x": 100.0, "y": -200.0}"#
        );
        assert_eq!(replay.actions[1].body().unwrap(), "");
        assert_eq!(
            replay.actions[2].body().unwrap(),
            r#"{"player_id":"2","target_player_id":"1"}"#
        );
        assert_eq!(replay.actions[3].body().unwrap(), "");
    }

    #[test]
    fn test_object_bodies_keep_recorded_text() {
        let json = r#"{
            "info": {"map": "Howling Abyss", "players": "Ezreal.BLUE,Lucian.PURPLE", "multiplier": 1.0},
            "actions": [
                {"game_time": 2.0, "action_type": "spell", "action_data": {"player_id":"1","target_player_id":"2","spell_slot":3,"x":1e2,"y":7000}},
                {"game_time": 2.0, "action_type": "noop", "action_data": null}
            ]
        }"#;
        let replay = Replay::from_json_str(json).unwrap();
        assert_eq!(
            replay.actions[0].body().unwrap(),
            r#"{"player_id":"1","target_player_id":"2","spell_slot":3,"x":1e2,"y":7000}"#
        );
        assert_eq!(replay.actions[1].body().unwrap(), "");
    }

    #[test]
    fn test_info_roster_round_trip() {
        let agents = vec![Agent::new("Ashe", Team::Blue), Agent::new("Annie", Team::Purple)];
        let info = ReplayInfo::new(MapName::HowlingAbyss, &agents, 1.0);
        assert_eq!(info.players, "Ashe.BLUE,Annie.PURPLE");
        assert_eq!(info.agents().unwrap(), agents);
    }
}
