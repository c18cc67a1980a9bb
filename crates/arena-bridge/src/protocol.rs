//! Wire protocol for bridge <-> simulator communication
//!
//! Actions and commands travel as (header, body) payload pairs: a type
//! literal such as `move` followed by a JSON body (or an empty body). Player
//! ids are sent as strings and coordinates as floats. Control messages from
//! the simulator are JSON-encoded strings.

use arena_rl_core::{ArenaError, PlayerId, ReplayInfo, Result};
use serde::{Deserialize, Serialize};

/// Simulator-consumable action
#[derive(Debug, Clone, PartialEq)]
pub enum WireAction {
    NoOp {
        player_id: PlayerId,
    },
    /// Relative movement, already in wire units
    Move {
        player_id: PlayerId,
        x: f64,
        y: f64,
    },
    Spell {
        player_id: PlayerId,
        target_player_id: PlayerId,
        spell_slot: u8,
        x: f64,
        y: f64,
    },
    Attack {
        player_id: PlayerId,
        target_player_id: PlayerId,
    },
    Teleport {
        player_id: PlayerId,
        x: f64,
        y: f64,
    },
    MoveTo {
        player_id: PlayerId,
        x: f64,
        y: f64,
    },
    /// Revive and restore every champion
    Reset,
    Message {
        player_id: PlayerId,
        text: String,
    },
}

#[derive(Serialize)]
struct PointBody {
    player_id: String,
    x: f64,
    y: f64,
}

#[derive(Serialize)]
struct SpellBody {
    player_id: String,
    target_player_id: String,
    spell_slot: u8,
    x: f64,
    y: f64,
}

#[derive(Serialize)]
struct AttackBody {
    player_id: String,
    target_player_id: String,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    player_id: String,
    text: &'a str,
}

impl WireAction {
    /// Type literal sent ahead of the body
    pub fn header(&self) -> &'static str {
        match self {
            WireAction::NoOp { .. } => "noop",
            WireAction::Move { .. } => "move",
            WireAction::Spell { .. } => "spell",
            WireAction::Attack { .. } => "attack",
            WireAction::Teleport { .. } => "teleport",
            WireAction::MoveTo { .. } => "move_to",
            WireAction::Reset => "reset",
            WireAction::Message { .. } => "message",
        }
    }

    /// Acting player, if the action has one
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            WireAction::NoOp { player_id }
            | WireAction::Move { player_id, .. }
            | WireAction::Spell { player_id, .. }
            | WireAction::Attack { player_id, .. }
            | WireAction::Teleport { player_id, .. }
            | WireAction::MoveTo { player_id, .. }
            | WireAction::Message { player_id, .. } => Some(*player_id),
            WireAction::Reset => None,
        }
    }

    /// JSON body; `noop` and `reset` have an empty body
    pub fn body(&self) -> Result<String> {
        let point = |player_id: &PlayerId, x: &f64, y: &f64| PointBody {
            player_id: player_id.to_string(),
            x: *x,
            y: *y,
        };
        let body = match self {
            WireAction::NoOp { .. } | WireAction::Reset => return Ok(String::new()),
            WireAction::Move { player_id, x, y }
            | WireAction::Teleport { player_id, x, y }
            | WireAction::MoveTo { player_id, x, y } => {
                serde_json::to_string(&point(player_id, x, y))?
            }
            WireAction::Spell {
                player_id,
                target_player_id,
                spell_slot,
                x,
                y,
            } => serde_json::to_string(&SpellBody {
                player_id: player_id.to_string(),
                target_player_id: target_player_id.to_string(),
                spell_slot: *spell_slot,
                x: *x,
                y: *y,
            })?,
            WireAction::Attack {
                player_id,
                target_player_id,
            } => serde_json::to_string(&AttackBody {
                player_id: player_id.to_string(),
                target_player_id: target_player_id.to_string(),
            })?,
            WireAction::Message { player_id, text } => serde_json::to_string(&MessageBody {
                player_id: player_id.to_string(),
                text,
            })?,
        };
        Ok(body)
    }

    /// Header and body, in push order
    pub fn encode(&self) -> Result<Vec<Vec<u8>>> {
        Ok(vec![self.header().as_bytes().to_vec(), self.body()?.into_bytes()])
    }
}

/// Body of a `change_champion` command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeChampion {
    pub player_id: PlayerId,
    pub champion_name: String,
}

/// Control requests sent on the command channel
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask the simulator to start producing ticks
    StartObserving,
    /// Ask for a replay of the session so far; the reply arrives on the replay channel
    SaveReplay(ReplayInfo),
    ChangeChampion(ChangeChampion),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartObserving => "start_observing",
            Command::SaveReplay(_) => "save_replay",
            Command::ChangeChampion(_) => "change_champion",
        }
    }

    /// Payloads in push order; `start_observing` is a bare literal
    pub fn encode(&self) -> Result<Vec<Vec<u8>>> {
        let body = match self {
            Command::StartObserving => return Ok(vec![self.name().as_bytes().to_vec()]),
            Command::SaveReplay(info) => serde_json::to_vec(info)?,
            Command::ChangeChampion(change) => serde_json::to_vec(change)?,
        };
        Ok(vec![self.name().as_bytes().to_vec(), body])
    }
}

/// Handshake milestones announced by the simulator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlMessage {
    ClientsJoin,
    GameStarted,
}

impl ControlMessage {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlMessage::ClientsJoin => "clients_join",
            ControlMessage::GameStarted => "game_started",
        }
    }

    /// Decode a control payload: a JSON string, or the bare literal
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if let Ok(message) = serde_json::from_slice::<ControlMessage>(payload) {
            return Ok(message);
        }
        let text = String::from_utf8_lossy(payload);
        match text.trim() {
            "clients_join" => Ok(ControlMessage::ClientsJoin),
            "game_started" => Ok(ControlMessage::GameStarted),
            other => Err(ArenaError::Protocol(format!(
                "unexpected control message {:?}",
                preview(other.as_bytes())
            ))),
        }
    }
}

/// First 200 characters of a payload, for logs and errors
pub fn preview(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).chars().take(200).collect()
}
