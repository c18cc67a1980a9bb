//! Transport abstractions for the simulator bridge
//!
//! The simulator is reached through a broker of named FIFO lists. The
//! [`QueueBroker`] trait captures the four operations the bridge needs;
//! [`Transport`] binds a broker to the configured channel keys and speaks the
//! wire protocol on top of it.

use crate::protocol::{Command, ControlMessage, WireAction, preview};
use arena_rl_core::config::ChannelKeys;
use arena_rl_core::{ArenaError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Outcome of a bounded pop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pop {
    Message(Vec<u8>),
    /// Nothing arrived before the deadline
    Timeout,
}

/// Named blocking FIFO lists
///
/// Every operation is remote; a failure is reported as
/// [`ArenaError::Connectivity`] and is not retried.
#[async_trait]
pub trait QueueBroker: Send {
    /// Append payloads to `key` in one atomic operation, preserving order
    async fn push(&mut self, key: &str, payloads: &[Vec<u8>]) -> Result<()>;

    /// Take the oldest payload of `key`, waiting up to `timeout`
    async fn pop(&mut self, key: &str, timeout: Duration) -> Result<Pop>;

    /// Discard everything queued under `key`
    async fn clear(&mut self, key: &str) -> Result<()>;

    /// Release the connection; calling it again is a no-op
    async fn close(&mut self) -> Result<()>;
}

/// Typed channels over a queue broker
pub struct Transport {
    broker: Box<dyn QueueBroker>,
    keys: ChannelKeys,
    closed: bool,
}

impl Transport {
    pub fn new(broker: Box<dyn QueueBroker>, keys: ChannelKeys) -> Self {
        Self {
            broker,
            keys,
            closed: false,
        }
    }

    pub fn keys(&self) -> &ChannelKeys {
        &self.keys
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ArenaError::Connectivity("transport is closed".into()));
        }
        Ok(())
    }

    /// Push an encoded action onto the action channel
    pub async fn send_action(&mut self, action: &WireAction) -> Result<()> {
        self.ensure_open()?;
        let payloads = action.encode()?;
        debug!(
            "[bridge→sim] {} {}",
            action.header(),
            preview(&payloads[1])
        );
        self.broker.push(&self.keys.action, &payloads).await
    }

    /// Push a pre-encoded action pair verbatim, e.g. from a replay
    pub async fn send_raw_action(&mut self, header: &str, body: &str) -> Result<()> {
        self.ensure_open()?;
        debug!("[bridge→sim] {} {} (raw)", header, preview(body.as_bytes()));
        let payloads = [header.as_bytes().to_vec(), body.as_bytes().to_vec()];
        self.broker.push(&self.keys.action, &payloads).await
    }

    pub async fn send_command(&mut self, command: &Command) -> Result<()> {
        self.ensure_open()?;
        debug!("[bridge→sim] command {}", command.name());
        let payloads = command.encode()?;
        self.broker.push(&self.keys.command, &payloads).await
    }

    /// Next payload on the observation channel (ticks and control messages)
    pub async fn recv_observation(&mut self, timeout: Duration) -> Result<Pop> {
        self.ensure_open()?;
        let popped = self.broker.pop(&self.keys.observation, timeout).await?;
        if let Pop::Message(payload) = &popped {
            debug!("[sim→bridge] len={} json={}", payload.len(), preview(payload));
        }
        Ok(popped)
    }

    /// Next control message on the observation channel; `None` on timeout
    pub async fn recv_control(&mut self, timeout: Duration) -> Result<Option<ControlMessage>> {
        match self.recv_observation(timeout).await? {
            Pop::Message(payload) => ControlMessage::parse(&payload).map(Some),
            Pop::Timeout => Ok(None),
        }
    }

    /// Next payload on the replay reply channel
    pub async fn recv_replay(&mut self, timeout: Duration) -> Result<Pop> {
        self.ensure_open()?;
        self.broker.pop(&self.keys.replay, timeout).await
    }

    pub async fn clear_actions(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.broker.clear(&self.keys.action).await
    }

    pub async fn clear_observations(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.broker.clear(&self.keys.observation).await
    }

    /// Release the broker connection; idempotent
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        info!("Closing transport");
        self.broker.close().await
    }
}
