//! Episode and step controller
//!
//! [`ArenaEnv`] owns the transport and drives the per-tick cycle: push every
//! agent's action, pop one observation per agent, decode, score and emit
//! timesteps. Episodes run `FIRST MID* LAST`; a death ends the episode.

use crate::codec;
use crate::features::{self, ObservationSpec};
use crate::handshake::{self, HandshakeState};
use crate::registry::SlotRegistry;
use arena_bridge::protocol::ChangeChampion;
use arena_bridge::{Command, Pop, QueueBroker, RespBroker, Transport, WireAction};
use arena_rl_core::{
    Action, ActionSchema, AgentObservation, AgentSlot, ArenaError, EnvConfig, PlayerId,
    RawObservation, ReplayInfo, Result, Reward, RewardFunction, ShapedReward, StepType, Timestep,
    ValidationError,
};
use tracing::{debug, info};

/// Controller bookkeeping, mutated only by [`ArenaEnv`]
#[derive(Debug, Clone)]
pub struct EpisodeState {
    pub total_steps: u64,
    pub episode_steps: u64,
    pub episode_count: u64,
    pub step_type: StepType,
    /// Previous observation per agent slot
    last_agent_observations: Vec<Option<AgentObservation>>,
    /// First observation of the current episode per agent slot
    baselines: Vec<Option<AgentObservation>>,
}

impl EpisodeState {
    fn new(agents: usize) -> Self {
        Self {
            total_steps: 0,
            episode_steps: 0,
            episode_count: 0,
            step_type: StepType::Last,
            last_agent_observations: vec![None; agents],
            baselines: vec![None; agents],
        }
    }

    /// No episode is running; the next step starts one
    pub fn is_terminal(&self) -> bool {
        self.step_type == StepType::Last
    }

    pub fn last_observation(&self, index: usize) -> Option<&AgentObservation> {
        self.last_agent_observations.get(index)?.as_ref()
    }

    pub fn baseline(&self, index: usize) -> Option<&AgentObservation> {
        self.baselines.get(index)?.as_ref()
    }

    fn forget_observations(&mut self) {
        self.last_agent_observations.fill(None);
        self.baselines.fill(None);
    }
}

/// Reinforcement-learning environment over a running simulator
pub struct ArenaEnv {
    config: EnvConfig,
    transport: Transport,
    schema: ActionSchema,
    registry: SlotRegistry,
    reward: Box<dyn RewardFunction<State = AgentObservation>>,
    handshake: HandshakeState,
    state: EpisodeState,
    /// `start_observing` has been sent this session
    observing: bool,
}

impl ArenaEnv {
    /// Connect to the configured broker
    pub async fn connect(config: EnvConfig) -> Result<Self> {
        config.validate()?;
        let broker = RespBroker::connect(config.broker.address(), config.broker.connect_timeout())
            .await?;
        Self::with_broker(config, Box::new(broker))
    }

    /// Build an environment over an already-connected broker
    pub fn with_broker(config: EnvConfig, broker: Box<dyn QueueBroker>) -> Result<Self> {
        config.validate()?;
        let registry = SlotRegistry::from_agents(&config.players)?;
        let transport = Transport::new(broker, config.channels.clone());
        let schema = ActionSchema::new(config.interface);
        let reward = Box::new(ShapedReward::new(config.reward.clone()));

        info!(
            "Environment for {} players on {}",
            registry.len(),
            config.map
        );

        Ok(Self {
            state: EpisodeState::new(registry.len()),
            config,
            transport,
            schema,
            registry,
            reward,
            handshake: HandshakeState::AwaitingClients,
            observing: false,
        })
    }

    /// Replace the shaped reward
    pub fn with_reward(mut self, reward: Box<dyn RewardFunction<State = AgentObservation>>) -> Self {
        self.reward = reward;
        self
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn action_schema(&self) -> &ActionSchema {
        &self.schema
    }

    pub fn observation_spec(&self) -> ObservationSpec {
        features::observation_spec(self.registry.len())
    }

    pub fn state(&self) -> &EpisodeState {
        &self.state
    }

    pub fn slots(&self) -> &[AgentSlot] {
        self.registry.slots()
    }

    pub fn handshake_state(&self) -> HandshakeState {
        self.handshake
    }

    /// Wait until the simulator has started the game
    pub async fn handshake(&mut self) -> Result<()> {
        self.handshake = handshake::perform(&mut self.transport, &self.config.timeouts).await?;
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.handshake.expected() {
            None => Ok(()),
            Some(expected) => Err(ArenaError::Handshake {
                expected: expected.as_str().to_string(),
                reason: "handshake has not completed".into(),
            }),
        }
    }

    /// Start a new episode and return its first timesteps
    pub async fn reset(&mut self) -> Result<Vec<Timestep>> {
        self.ensure_ready()?;
        if self.state.episode_count > 0 {
            self.transport.send_action(&WireAction::Reset).await?;
        }
        self.state.episode_count += 1;
        self.state.episode_steps = 0;
        self.state.step_type = StepType::First;
        info!("Starting episode {}", self.state.episode_count);
        self.observe().await
    }

    /// Apply one action per agent and advance one tick.
    ///
    /// After the last step of an episode this starts the next episode
    /// instead, ignoring `actions`.
    pub async fn step(&mut self, actions: &[Action]) -> Result<Vec<Timestep>> {
        if self.state.is_terminal() {
            debug!("Episode finished, resetting instead of stepping");
            return self.reset().await;
        }

        if actions.len() != self.registry.len() {
            return Err(ValidationError::AgentCountMismatch {
                expected: self.registry.len(),
                got: actions.len(),
            }
            .into());
        }

        // Encode everything before pushing so a bad action sends nothing
        let mut wire = Vec::with_capacity(actions.len());
        for (index, action) in actions.iter().enumerate() {
            let previous = self.state.last_observation(index).ok_or_else(|| {
                ArenaError::Protocol(format!("no previous observation for agent {}", index))
            })?;
            wire.push(codec::validate_and_encode(previous, action, &self.schema)?);
        }
        for action in &wire {
            self.transport.send_action(action).await?;
        }

        self.state.step_type = StepType::Mid;
        self.observe().await
    }

    async fn observe(&mut self) -> Result<Vec<Timestep>> {
        let observations = self.collect_observations().await?;
        let someone_died = observations.iter().any(AgentObservation::someone_died);

        // The first tick of an episode stays FIRST even if a revive is still pending
        let step_type = match self.state.step_type {
            StepType::First => {
                self.state.forget_observations();
                StepType::First
            }
            _ if someone_died => StepType::Last,
            _ => StepType::Mid,
        };
        self.state.step_type = step_type;

        let mut timesteps = Vec::with_capacity(observations.len());
        for (index, observation) in observations.into_iter().enumerate() {
            if step_type == StepType::First {
                self.state.baselines[index] = Some(observation.clone());
            }
            let reward = match (
                &self.state.last_agent_observations[index],
                &self.state.baselines[index],
            ) {
                (Some(prev), Some(baseline)) => {
                    self.reward.compute(prev, &observation, step_type, baseline)
                }
                _ => Reward::zero(),
            };
            self.state.last_agent_observations[index] = Some(observation.clone());

            timesteps.push(Timestep {
                step_type,
                reward: reward.value,
                reward_components: reward.components,
                discount: if step_type == StepType::Last { 0.0 } else { 1.0 },
                observation,
            });
        }

        self.state.total_steps += 1;
        self.state.episode_steps += 1;
        if step_type == StepType::Last {
            info!(
                "Episode {} finished after {} steps",
                self.state.episode_count, self.state.episode_steps
            );
        }
        Ok(timesteps)
    }

    /// Pop one observation per agent and order them by slot
    async fn collect_observations(&mut self) -> Result<Vec<AgentObservation>> {
        if !self.observing {
            self.transport.clear_actions().await?;
            self.transport.clear_observations().await?;
            self.transport.send_command(&Command::StartObserving).await?;
            self.observing = true;
        }

        let limit = self.config.timeouts.observation();
        let mut routed: Vec<Option<AgentObservation>> = vec![None; self.registry.len()];
        for _ in 0..self.registry.len() {
            let payload = match self.transport.recv_observation(limit).await? {
                Pop::Message(payload) => payload,
                Pop::Timeout => return Err(ArenaError::ObservationTimeout(limit)),
            };
            let observation = features::decode(RawObservation::from_slice(&payload)?)?;
            let index = self.registry.index_of(observation.self_id)?;
            if routed[index].replace(observation).is_some() {
                return Err(ArenaError::Protocol(format!(
                    "two observations for player {} in one tick",
                    self.registry.slots()[index].player_id
                )));
            }
        }

        routed
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ArenaError::Protocol("missing observation for an agent".into()))
    }

    /// Ask the simulator for a replay of the session so far.
    ///
    /// The reply is returned verbatim.
    pub async fn save_replay(&mut self) -> Result<Vec<u8>> {
        let info = ReplayInfo::new(
            self.config.map,
            &self.registry.agents(),
            self.config.multiplier,
        );
        self.transport.send_command(&Command::SaveReplay(info)).await?;

        let limit = self.config.timeouts.replay();
        match self.transport.recv_replay(limit).await? {
            Pop::Message(replay) => {
                info!("Received replay ({} bytes)", replay.len());
                Ok(replay)
            }
            Pop::Timeout => Err(ArenaError::Protocol(format!(
                "no replay received within {:?}",
                limit
            ))),
        }
    }

    /// Swap the champion a controlled player uses
    pub async fn change_champion(&mut self, player_id: PlayerId, champion: &str) -> Result<()> {
        self.registry.set_champion(player_id, champion)?;
        let command = Command::ChangeChampion(ChangeChampion {
            player_id,
            champion_name: champion.to_string(),
        });
        self.transport.send_command(&command).await
    }

    /// Release the broker connection; idempotent
    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }
}
