//! Agent run loop

use crate::environment::ArenaEnv;
use arena_rl_core::config::RunLimits;
use arena_rl_core::{
    Action, ActionSchema, AgentSlot, FunctionId, PlayerId, Result, Timestep, ValidationError,
};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Policy controlling one agent slot
pub trait Agent: Send {
    /// Called once before the first episode
    fn setup(&mut self, schema: &ActionSchema, slot: &AgentSlot);

    /// Called at the start of every episode
    fn reset(&mut self) {}

    /// Choose the action for the next tick
    fn step(&mut self, timestep: &Timestep) -> Action;
}

/// Agent that never acts
#[derive(Debug, Default)]
pub struct NoOpAgent {
    player_id: Option<PlayerId>,
    steps: u64,
    reward: f64,
}

impl NoOpAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Player assigned by `setup`
    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Sum of rewards seen so far
    pub fn total_reward(&self) -> f64 {
        self.reward
    }
}

impl Agent for NoOpAgent {
    fn setup(&mut self, _schema: &ActionSchema, slot: &AgentSlot) {
        self.player_id = Some(slot.player_id);
    }

    fn step(&mut self, timestep: &Timestep) -> Action {
        self.steps += 1;
        self.reward += timestep.reward;
        Action::no_op()
    }
}

/// Totals reported when the loop ends
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub episodes: u64,
    pub steps: u64,
    pub elapsed: Duration,
    /// Cumulative reward per agent slot
    pub rewards: Vec<f64>,
    pub interrupted: bool,
}

impl RunStats {
    /// Steps per second
    pub fn fps(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.steps as f64 / seconds
        } else {
            0.0
        }
    }
}

/// Run agents against the environment until a limit is hit or Ctrl-C.
///
/// `0` limits are unlimited. An interrupt ends the loop cleanly; the caller
/// still owns and closes the environment.
pub async fn run_loop(
    env: &mut ArenaEnv,
    agents: &mut [Box<dyn Agent>],
    limits: &RunLimits,
) -> Result<RunStats> {
    let mut stats = RunStats {
        rewards: vec![0.0; agents.len()],
        ..RunStats::default()
    };
    let start = Instant::now();

    let outcome = tokio::select! {
        result = drive(env, agents, limits, &mut stats) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    if outcome.is_none() {
        warn!("Interrupted, stopping run loop");
        stats.interrupted = true;
    }

    stats.elapsed = start.elapsed();
    info!(
        "Took {:.3} seconds for {} steps: {:.3} fps",
        stats.elapsed.as_secs_f64(),
        stats.steps,
        stats.fps()
    );
    outcome.unwrap_or(Ok(())).map(|()| stats)
}

async fn drive(
    env: &mut ArenaEnv,
    agents: &mut [Box<dyn Agent>],
    limits: &RunLimits,
    stats: &mut RunStats,
) -> Result<()> {
    if agents.len() != env.slots().len() {
        return Err(ValidationError::AgentCountMismatch {
            expected: env.slots().len(),
            got: agents.len(),
        }
        .into());
    }
    for (agent, slot) in agents.iter_mut().zip(env.slots()) {
        agent.setup(env.action_schema(), slot);
    }

    let mut seen = LegalActionLog::default();
    while limits.max_episodes == 0 || stats.episodes < limits.max_episodes {
        stats.episodes += 1;
        for agent in agents.iter_mut() {
            agent.reset();
        }
        let mut timesteps = env.reset().await?;

        loop {
            stats.steps += 1;
            for (total, timestep) in stats.rewards.iter_mut().zip(&timesteps) {
                *total += timestep.reward;
                seen.observe(timestep);
            }
            if limits.max_steps > 0 && stats.steps >= limits.max_steps {
                return Ok(());
            }
            if timesteps[0].last() {
                break;
            }

            let actions: Vec<Action> = agents
                .iter_mut()
                .zip(&timesteps)
                .map(|(agent, timestep)| agent.step(timestep))
                .collect();
            timesteps = env.step(&actions).await?;
        }
    }
    Ok(())
}

/// Logs each function the first time the simulator allows it
#[derive(Debug, Default)]
struct LegalActionLog {
    seen: BTreeSet<FunctionId>,
}

impl LegalActionLog {
    fn observe(&mut self, timestep: &Timestep) {
        for &function in &timestep.observation.legal_action_mask {
            if self.seen.insert(function) {
                info!("New legal action: {}/{}", function.id(), function);
            }
        }
    }
}
