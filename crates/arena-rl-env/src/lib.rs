//! # arena-rl-env
//!
//! Reinforcement-learning environment over an external arena simulator.
//!
//! This crate provides:
//! - The session handshake with the simulator
//! - Action validation and wire encoding
//! - The observation transform and legal-action mask
//! - [`ArenaEnv`], the reset/step episode controller
//! - A run loop for agents, a replay player and session settings

pub mod codec;
pub mod environment;
pub mod features;
pub mod handshake;
pub mod registry;
pub mod replay;
pub mod run_loop;
pub mod settings;

pub use codec::{ValidatedAction, validate_and_encode};
pub use environment::{ArenaEnv, EpisodeState};
pub use features::{ObservationSpec, observation_spec};
pub use handshake::HandshakeState;
pub use registry::{RegistryError, SlotRegistry};
pub use replay::ReplayStats;
pub use run_loop::{Agent, NoOpAgent, RunStats, run_loop};
pub use settings::{session_settings, write_session_settings};
