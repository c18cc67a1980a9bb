//! Player and team descriptions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ArenaError;

/// Simulator-side player identity (`user_id` in observations)
pub type PlayerId = i64;

/// Team a champion plays for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Team {
    Blue,
    Purple,
    Neutral,
}

impl Team {
    pub fn as_str(self) -> &'static str {
        match self {
            Team::Blue => "BLUE",
            Team::Purple => "PURPLE",
            Team::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BLUE" => Ok(Team::Blue),
            "PURPLE" => Ok(Team::Purple),
            "NEUTRAL" => Ok(Team::Neutral),
            other => Err(ArenaError::Config(format!("unknown team {:?}", other))),
        }
    }
}

/// A champion controlled by one agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    pub champion: String,
    pub team: Team,
}

impl Agent {
    pub fn new(champion: impl Into<String>, team: Team) -> Self {
        Self {
            champion: champion.into(),
            team,
        }
    }

    /// Parse the compact `"Ezreal.BLUE,Lucian.PURPLE"` roster form
    pub fn parse_roster(roster: &str) -> Result<Vec<Agent>, ArenaError> {
        roster
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(str::parse)
            .collect()
    }

    /// Render agents back into the compact roster form
    pub fn format_roster(agents: &[Agent]) -> String {
        agents
            .iter()
            .map(Agent::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.champion, self.team)
    }
}

impl FromStr for Agent {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (champion, team) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| ArenaError::Config(format!("expected Champion.TEAM, got {:?}", s)))?;
        if champion.is_empty() {
            return Err(ArenaError::Config(format!("missing champion in {:?}", s)));
        }
        Ok(Agent::new(champion, team.parse()?))
    }
}

/// One controlled player in a running session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentSlot {
    /// Position in the agent list; timesteps and actions use this order
    pub index: usize,
    pub player_id: PlayerId,
    pub agent: Agent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roster() {
        let agents = Agent::parse_roster("Ezreal.BLUE,Lucian.PURPLE").unwrap();
        assert_eq!(
            agents,
            vec![
                Agent::new("Ezreal", Team::Blue),
                Agent::new("Lucian", Team::Purple)
            ]
        );
        assert_eq!(Agent::format_roster(&agents), "Ezreal.BLUE,Lucian.PURPLE");
    }

    #[test]
    fn test_parse_roster_rejects_garbage() {
        assert!(Agent::parse_roster("Ezreal").is_err());
        assert!(Agent::parse_roster("Ezreal.GREEN").is_err());
        assert!(Agent::parse_roster(".BLUE").is_err());
    }

    #[test]
    fn test_team_serde_uppercase() {
        let json = serde_json::to_string(&Team::Purple).unwrap();
        assert_eq!(json, "\"PURPLE\"");
    }
}
