//! Session handshake
//!
//! The simulator announces `clients_join` once its server accepts players and
//! `game_started` once every client has loaded. Both arrive on the
//! observation channel before any tick does.

use arena_bridge::{ControlMessage, Transport};
use arena_rl_core::config::Timeouts;
use arena_rl_core::{ArenaError, Result};
use std::time::Duration;
use tracing::info;

/// Progress through the two-phase wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    AwaitingClients,
    AwaitingStart,
    Ready,
}

impl HandshakeState {
    /// Control message that advances this state
    pub fn expected(self) -> Option<ControlMessage> {
        match self {
            HandshakeState::AwaitingClients => Some(ControlMessage::ClientsJoin),
            HandshakeState::AwaitingStart => Some(ControlMessage::GameStarted),
            HandshakeState::Ready => None,
        }
    }

    fn timeout(self, timeouts: &Timeouts) -> Duration {
        match self {
            HandshakeState::AwaitingClients => timeouts.clients_join(),
            _ => timeouts.game_started(),
        }
    }

    fn next(self) -> Self {
        match self {
            HandshakeState::AwaitingClients => HandshakeState::AwaitingStart,
            HandshakeState::AwaitingStart | HandshakeState::Ready => HandshakeState::Ready,
        }
    }
}

/// Wait for both control messages, then discard stale actions.
///
/// Any timeout or unexpected payload is fatal; there is no retry.
pub async fn perform(transport: &mut Transport, timeouts: &Timeouts) -> Result<HandshakeState> {
    let mut state = HandshakeState::AwaitingClients;

    while let Some(expected) = state.expected() {
        let limit = state.timeout(timeouts);
        info!("Waiting for {} (up to {:?})", expected.as_str(), limit);

        let failed = |reason: String| ArenaError::Handshake {
            expected: expected.as_str().to_string(),
            reason,
        };
        let received = transport.recv_control(limit).await.map_err(|e| match e {
            ArenaError::Protocol(reason) => failed(reason),
            other => other,
        })?;

        match received {
            Some(message) if message == expected => state = state.next(),
            Some(other) => return Err(failed(format!("received {}", other.as_str()))),
            None => return Err(failed(format!("nothing received within {:?}", limit))),
        }
    }

    transport.clear_actions().await?;
    info!("Simulator ready");
    Ok(state)
}
