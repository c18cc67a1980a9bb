//! In-process queue broker
//!
//! Clones share the same lists, so one handle can be given to the bridge
//! while another plays the simulator side. Closing a handle only closes that
//! handle.

use crate::transport::{Pop, QueueBroker};
use arena_rl_core::{ArenaError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Default)]
struct Shared {
    queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    pushed: Notify,
}

/// Broker whose lists live in this process
#[derive(Clone, Default)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
    closed: bool,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn queues(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Vec<u8>>>> {
        // A panic while holding the lock cannot leave a list half-updated
        self.shared
            .queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append without going through the trait (simulator side)
    pub fn push_now(&self, key: &str, payload: Vec<u8>) {
        self.queues()
            .entry(key.to_string())
            .or_default()
            .push_back(payload);
        self.shared.pushed.notify_waiters();
    }

    /// Take the oldest payload if one is queued
    pub fn pop_now(&self, key: &str) -> Option<Vec<u8>> {
        self.queues().get_mut(key)?.pop_front()
    }

    /// Take everything queued under `key`, oldest first
    pub fn drain(&self, key: &str) -> Vec<Vec<u8>> {
        self.queues()
            .get_mut(key)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, key: &str) -> usize {
        self.queues().get(key).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ArenaError::Connectivity("memory broker handle is closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl QueueBroker for MemoryBroker {
    async fn push(&mut self, key: &str, payloads: &[Vec<u8>]) -> Result<()> {
        self.ensure_open()?;
        self.queues()
            .entry(key.to_string())
            .or_default()
            .extend(payloads.iter().cloned());
        self.shared.pushed.notify_waiters();
        Ok(())
    }

    async fn pop(&mut self, key: &str, timeout: Duration) -> Result<Pop> {
        self.ensure_open()?;
        // `None` when the deadline is past what an Instant can hold
        let deadline = Instant::now().checked_add(timeout);
        loop {
            // Register interest before checking so a concurrent push is not missed
            let pushed = self.shared.pushed.notified();
            tokio::pin!(pushed);
            pushed.as_mut().enable();

            if let Some(payload) = self.pop_now(key) {
                return Ok(Pop::Message(payload));
            }
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, pushed).await.is_err() {
                        return Ok(Pop::Timeout);
                    }
                }
                None => pushed.await,
            }
        }
    }

    async fn clear(&mut self, key: &str) -> Result<()> {
        self.ensure_open()?;
        self.queues().remove(key);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let mut broker = MemoryBroker::new();
        broker
            .push("q", &[b"a".to_vec(), b"b".to_vec()])
            .await
            .unwrap();
        broker.push("q", &[b"c".to_vec()]).await.unwrap();

        let timeout = Duration::from_millis(10);
        for expected in [b"a", b"b", b"c"] {
            assert_eq!(
                broker.pop("q", timeout).await.unwrap(),
                Pop::Message(expected.to_vec())
            );
        }
        assert_eq!(broker.pop("q", timeout).await.unwrap(), Pop::Timeout);
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let mut broker = MemoryBroker::new();
        let sim = broker.clone();
        let pusher = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            sim.push_now("observation", b"tick".to_vec());
        });

        let popped = broker
            .pop("observation", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(popped, Pop::Message(b"tick".to_vec()));
        pusher.await.unwrap();
    }

    #[tokio::test]
    async fn test_pop_with_unbounded_timeout() {
        let mut broker = MemoryBroker::new();
        let sim = broker.clone();
        let pusher = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            sim.push_now("observation", b"tick".to_vec());
        });

        let popped = broker.pop("observation", Duration::MAX).await.unwrap();
        assert_eq!(popped, Pop::Message(b"tick".to_vec()));
        pusher.await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let mut broker = MemoryBroker::new();
        broker.push("a", &[b"1".to_vec()]).await.unwrap();
        assert_eq!(
            broker.pop("b", Duration::from_millis(5)).await.unwrap(),
            Pop::Timeout
        );
        broker.clear("a").await.unwrap();
        assert!(broker.is_empty("a"));
    }

    #[tokio::test]
    async fn test_closed_handle_does_not_close_clones() {
        let mut bridge = MemoryBroker::new();
        let mut sim = bridge.clone();
        bridge.close().await.unwrap();
        assert!(bridge.push("a", &[]).await.is_err());
        assert!(sim.push("a", &[b"x".to_vec()]).await.is_ok());
        assert_eq!(sim.len("a"), 1);
    }
}
