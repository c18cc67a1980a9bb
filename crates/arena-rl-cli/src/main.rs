//! arena-rl command-line driver
//!
//! Usage:
//!   arena-rl run <config.json> [replay-out.json]
//!   arena-rl replay <config.json> <replay.json>
//!   arena-rl actions [config.json]
//!   arena-rl settings <config.json> <out.json>

use anyhow::{Context, Result, bail};
use arena_bridge::{RespBroker, Transport};
use arena_rl_core::{ActionSchema, EnvConfig, Replay};
use arena_rl_env::{Agent, ArenaEnv, NoOpAgent, handshake, replay, run_loop, write_session_settings};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const USAGE: &str = "usage:
  arena-rl run <config.json> [replay-out.json]
  arena-rl replay <config.json> <replay.json>
  arena-rl actions [config.json]
  arena-rl settings <config.json> <out.json>";

const DEFAULT_REPLAY_OUT: &str = "replay.json";

fn load_config(path: &str) -> Result<EnvConfig> {
    EnvConfig::load(path).with_context(|| format!("loading configuration from {}", path))
}

/// Run no-op agents through the episode loop
async fn run(config: EnvConfig, replay_out: &str) -> Result<()> {
    let mut env = ArenaEnv::connect(config).await?;
    let outcome = drive(&mut env, replay_out).await;
    // Close even when the run failed
    if let Err(e) = env.close().await {
        warn!("Closing the environment failed: {}", e);
    }
    outcome
}

/// Race `work` against `interrupt`; `None` when interrupted first
async fn interruptible<T>(work: impl Future<Output = T>, interrupt: impl Future) -> Option<T> {
    tokio::select! {
        result = work => Some(result),
        _ = interrupt => None,
    }
}

async fn drive(env: &mut ArenaEnv, replay_out: &str) -> Result<()> {
    match interruptible(env.handshake(), tokio::signal::ctrl_c()).await {
        Some(result) => result?,
        None => {
            warn!("Handshake interrupted");
            return Ok(());
        }
    }

    let mut agents: Vec<Box<dyn Agent>> = env
        .slots()
        .iter()
        .map(|_| Box::new(NoOpAgent::new()) as Box<dyn Agent>)
        .collect();
    let limits = env.config().run.clone();
    let stats = run_loop(env, &mut agents, &limits).await?;
    info!(
        "Finished {} episodes, {} steps, rewards {:?}",
        stats.episodes, stats.steps, stats.rewards
    );

    if limits.save_replay && !stats.interrupted {
        let replay = env.save_replay().await?;
        std::fs::write(replay_out, replay)
            .with_context(|| format!("writing replay to {}", replay_out))?;
        info!("Saved replay to {}", replay_out);
    }
    Ok(())
}

/// Feed a recorded game back into the simulator
async fn replay_file(config: EnvConfig, path: &str) -> Result<()> {
    let recorded = Replay::load(path).with_context(|| format!("loading replay {}", path))?;
    let broker =
        RespBroker::connect(config.broker.address(), config.broker.connect_timeout()).await?;
    let mut transport = Transport::new(Box::new(broker), config.channels.clone());

    let outcome = interruptible(
        async {
            handshake::perform(&mut transport, &config.timeouts).await?;
            replay::play(&mut transport, &recorded, config.timeouts.observation()).await
        },
        tokio::signal::ctrl_c(),
    )
    .await;
    if let Err(e) = transport.close().await {
        warn!("Closing the transport failed: {}", e);
    }

    match outcome {
        Some(result) => {
            let stats = result?;
            info!("Replayed {} ticks, {} actions", stats.ticks, stats.actions);
        }
        None => warn!("Replay interrupted"),
    }
    Ok(())
}

fn print_actions(config: &EnvConfig) {
    let schema = ActionSchema::new(config.interface);
    println!("Action schema {}", schema.version());
    for function in schema.functions() {
        println!("  {}", function);
    }
    println!("Flattened action space: {}", schema.flattened_size());
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["run", config] => run(load_config(config)?, DEFAULT_REPLAY_OUT).await,
        ["run", config, out] => run(load_config(config)?, out).await,
        ["replay", config, path] => replay_file(load_config(config)?, path).await,
        ["actions"] => {
            print_actions(&EnvConfig::default());
            Ok(())
        }
        ["actions", config] => {
            print_actions(&load_config(config)?);
            Ok(())
        }
        ["settings", config, out] => {
            write_session_settings(&load_config(config)?, out)?;
            Ok(())
        }
        _ => bail!("{}", USAGE),
    }
}
