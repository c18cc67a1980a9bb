//! # arena-rl-core
//!
//! Core types for the arena-rl episode bridge.
//!
//! This crate provides the game-agnostic vocabulary shared by the bridge and
//! the environment:
//! - Players, teams and agent slots
//! - The action schema and agent-issued actions
//! - Raw and agent-facing observations, timesteps
//! - The shaped reward model
//! - Environment configuration and replay files

pub mod action;
pub mod agent;
pub mod config;
pub mod error;
pub mod observation;
pub mod replay;
pub mod reward;

pub use action::{Action, ActionSchema, ArgValue, ArgumentKind, ArgumentSpec, FunctionId, FunctionRef};
pub use agent::{Agent, AgentSlot, PlayerId, Team};
pub use config::{Dimensions, EnvConfig, InterfaceFormat, MapName};
pub use error::{ArenaError, Result, ValidationError};
pub use observation::{AgentObservation, RawObservation, StepType, Timestep, UnitRecord};
pub use replay::{Replay, ReplayAction, ReplayInfo};
pub use reward::{Reward, RewardComponents, RewardFunction, RewardWeights, ShapedReward};
