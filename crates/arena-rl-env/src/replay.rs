//! Replay player
//!
//! Feeds a recorded game back into a running simulator. Actions are pushed
//! verbatim, one game-time group per tick, after the tick's observations
//! have arrived.

use arena_bridge::{Command, Pop, Transport};
use arena_rl_core::{ArenaError, Replay, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Totals for one replay run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayStats {
    pub ticks: usize,
    pub actions: usize,
    pub elapsed: Duration,
}

/// Play `replay` against a simulator that has completed the handshake
pub async fn play(
    transport: &mut Transport,
    replay: &Replay,
    observation_timeout: Duration,
) -> Result<ReplayStats> {
    let players = replay.info.agents()?.len();
    info!(
        "Replaying {} actions over {} ticks for {} players on {}",
        replay.actions.len(),
        replay.tick_count(),
        players,
        replay.info.map
    );

    transport.clear_actions().await?;
    transport.clear_observations().await?;
    transport.send_command(&Command::StartObserving).await?;

    let start = Instant::now();
    let mut stats = ReplayStats::default();
    for group in replay.action_groups() {
        for _ in 0..players {
            if let Pop::Timeout = transport.recv_observation(observation_timeout).await? {
                return Err(ArenaError::ObservationTimeout(observation_timeout));
            }
        }

        debug!("Replaying tick at game time {}", group[0].game_time);
        for action in group {
            transport
                .send_raw_action(&action.action_type, &action.body()?)
                .await?;
            stats.actions += 1;
        }
        stats.ticks += 1;
    }

    stats.elapsed = start.elapsed();
    info!(
        "Took {:.3} seconds for {} steps: {:.3} fps",
        stats.elapsed.as_secs_f64(),
        stats.ticks,
        stats.ticks as f64 / stats.elapsed.as_secs_f64().max(f64::EPSILON)
    );
    Ok(stats)
}
