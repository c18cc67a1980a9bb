//! Controlled player registry

use arena_rl_core::{Agent, AgentSlot, ArenaError, PlayerId};
use std::collections::HashMap;

/// Ordered registry of the players this session controls.
///
/// Player ids follow the simulator's numbering: slot `i` is player `i + 1`.
pub struct SlotRegistry {
    slots: Vec<AgentSlot>,
    by_player: HashMap<PlayerId, usize>,
}

impl SlotRegistry {
    /// Build the registry from the configured roster
    pub fn from_agents(agents: &[Agent]) -> Result<Self, RegistryError> {
        if agents.is_empty() {
            return Err(RegistryError::Empty);
        }

        let slots: Vec<AgentSlot> = agents
            .iter()
            .enumerate()
            .map(|(index, agent)| AgentSlot {
                index,
                player_id: index as PlayerId + 1,
                agent: agent.clone(),
            })
            .collect();
        let by_player = slots
            .iter()
            .map(|slot| (slot.player_id, slot.index))
            .collect();

        Ok(Self { slots, by_player })
    }

    /// Get a slot by player id
    pub fn get(&self, player_id: PlayerId) -> Option<&AgentSlot> {
        self.by_player
            .get(&player_id)
            .and_then(|&index| self.slots.get(index))
    }

    /// Slot index of a player
    pub fn index_of(&self, player_id: PlayerId) -> Result<usize, RegistryError> {
        self.by_player
            .get(&player_id)
            .copied()
            .ok_or(RegistryError::NotFound(player_id))
    }

    /// Swap the champion a player controls
    pub fn set_champion(&mut self, player_id: PlayerId, champion: &str) -> Result<(), RegistryError> {
        let index = self.index_of(player_id)?;
        self.slots[index].agent.champion = champion.to_string();
        Ok(())
    }

    /// All slots in agent order
    pub fn slots(&self) -> &[AgentSlot] {
        &self.slots
    }

    /// Current roster, e.g. for replay headers
    pub fn agents(&self) -> Vec<Agent> {
        self.slots.iter().map(|slot| slot.agent.clone()).collect()
    }

    /// Number of controlled players
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Player not controlled by this session: {0}")]
    NotFound(PlayerId),
    #[error("No players configured")]
    Empty,
}

impl From<RegistryError> for ArenaError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => ArenaError::Protocol(err.to_string()),
            RegistryError::Empty => ArenaError::Config(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_rl_core::Team;

    fn roster() -> Vec<Agent> {
        vec![
            Agent::new("Ezreal", Team::Blue),
            Agent::new("Lucian", Team::Purple),
        ]
    }

    #[test]
    fn test_player_ids_start_at_one() {
        let registry = SlotRegistry::from_agents(&roster()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.index_of(1).unwrap(), 0);
        assert_eq!(registry.index_of(2).unwrap(), 1);
        assert_eq!(registry.get(2).unwrap().agent.champion, "Lucian");
        assert!(matches!(registry.index_of(3), Err(RegistryError::NotFound(3))));
    }

    #[test]
    fn test_set_champion() {
        let mut registry = SlotRegistry::from_agents(&roster()).unwrap();
        registry.set_champion(1, "Ahri").unwrap();
        assert_eq!(registry.agents()[0], Agent::new("Ahri", Team::Blue));
        assert!(registry.set_champion(9, "Ahri").is_err());
    }

    #[test]
    fn test_empty_roster_rejected() {
        let err = SlotRegistry::from_agents(&[]).err().unwrap();
        assert!(matches!(ArenaError::from(err), ArenaError::Config(_)));
    }
}
