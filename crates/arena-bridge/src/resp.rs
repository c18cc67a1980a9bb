//! RESP broker client
//!
//! Implements the subset of the Redis serialization protocol (RESP2) the
//! bridge needs: `PING`, `LPUSH`, `BRPOP`, `DEL` and `QUIT`. Lists are pushed
//! at the head and popped from the tail, so a multi-value `LPUSH` followed by
//! `BRPOP` delivers payloads in push order.
//! Protocol spec: https://redis.io/docs/latest/develop/reference/protocol-spec/

use crate::transport::{Pop, QueueBroker};
use arena_rl_core::{ArenaError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Extra time granted to the broker beyond a blocking pop's own timeout
const REPLY_GRACE: Duration = Duration::from_secs(5);

/// Replies larger than this are treated as a protocol violation
const MAX_BULK_LEN: usize = 64 * 1024 * 1024;

/// A decoded RESP2 reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    Simple(String),
    Error(String),
    Integer(i64),
    /// `None` is the null bulk string
    Bulk(Option<Vec<u8>>),
    /// `None` is the null array
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    /// Parse one reply from the front of `buf`.
    ///
    /// Returns `Ok(None)` when `buf` does not yet hold a complete reply, or the
    /// reply together with the number of bytes it occupied.
    pub fn parse(buf: &[u8]) -> Result<Option<(RespValue, usize)>> {
        let Some(line_end) = find_crlf(buf) else {
            return Ok(None);
        };
        if line_end == 0 {
            return Err(ArenaError::Protocol("empty RESP line".into()));
        }
        let line = std::str::from_utf8(&buf[1..line_end])
            .map_err(|_| ArenaError::Protocol("RESP header is not UTF-8".into()))?;
        let after = line_end + 2;

        match buf[0] {
            b'+' => Ok(Some((RespValue::Simple(line.to_string()), after))),
            b'-' => Ok(Some((RespValue::Error(line.to_string()), after))),
            b':' => Ok(Some((RespValue::Integer(parse_int(line)?), after))),
            b'$' => {
                let len = parse_int(line)?;
                if len < 0 {
                    return Ok(Some((RespValue::Bulk(None), after)));
                }
                let len = len as usize;
                if len > MAX_BULK_LEN {
                    return Err(ArenaError::Protocol(format!(
                        "RESP bulk string too large: {} bytes",
                        len
                    )));
                }
                if buf.len() < after + len + 2 {
                    return Ok(None);
                }
                if &buf[after + len..after + len + 2] != b"\r\n" {
                    return Err(ArenaError::Protocol("RESP bulk string not terminated".into()));
                }
                let data = buf[after..after + len].to_vec();
                Ok(Some((RespValue::Bulk(Some(data)), after + len + 2)))
            }
            b'*' => {
                let count = parse_int(line)?;
                if count < 0 {
                    return Ok(Some((RespValue::Array(None), after)));
                }
                let mut items = Vec::with_capacity(count.min(64) as usize);
                let mut offset = after;
                for _ in 0..count {
                    match RespValue::parse(&buf[offset..])? {
                        Some((item, used)) => {
                            items.push(item);
                            offset += used;
                        }
                        None => return Ok(None),
                    }
                }
                Ok(Some((RespValue::Array(Some(items)), offset)))
            }
            other => Err(ArenaError::Protocol(format!(
                "unknown RESP type byte {:?}",
                other as char
            ))),
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

fn parse_int(line: &str) -> Result<i64> {
    line.parse()
        .map_err(|_| ArenaError::Protocol(format!("bad RESP integer {:?}", line)))
}

/// Encode a command as an array of bulk strings
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    buf.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buf.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.extend_from_slice(arg);
        buf.extend_from_slice(b"\r\n");
    }
    buf
}

/// `BRPOP` timeout argument in seconds; zero would block forever
fn brpop_timeout(timeout: Duration) -> String {
    format!("{:.3}", timeout.max(Duration::from_millis(1)).as_secs_f64())
}

/// Broker client speaking RESP over TCP
pub struct RespBroker {
    /// TCP stream to the broker, `None` once closed
    stream: Option<TcpStream>,
    /// Broker address
    address: String,
    /// Bytes read but not yet parsed
    buffer: Vec<u8>,
}

impl RespBroker {
    /// Connect to the broker and check it answers
    pub async fn connect(address: impl Into<String>, connect_timeout: Duration) -> Result<Self> {
        let address = address.into();
        info!("Connecting to queue broker at {}", address);

        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| ArenaError::Connectivity(format!("connection timeout to {}", address)))?
            .map_err(|e| ArenaError::Connectivity(format!("failed to connect to {}: {}", address, e)))?;

        stream
            .set_nodelay(true)
            .map_err(|e| ArenaError::Connectivity(format!("failed to set TCP_NODELAY: {}", e)))?;

        let mut broker = Self {
            stream: Some(stream),
            address,
            buffer: Vec::new(),
        };

        match broker.command(&[b"PING"], Some(connect_timeout)).await? {
            RespValue::Simple(pong) if pong == "PONG" => {
                info!("Queue broker at {} is ready", broker.address);
                Ok(broker)
            }
            other => Err(ArenaError::Protocol(format!(
                "unexpected PING reply: {:?}",
                other
            ))),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Send a command and read its reply; `None` waits indefinitely
    async fn command(&mut self, args: &[&[u8]], reply_timeout: Option<Duration>) -> Result<RespValue> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ArenaError::Connectivity("broker connection is closed".into()))?;

        stream
            .write_all(&encode_command(args))
            .await
            .map_err(|e| ArenaError::Connectivity(format!("broker send failed: {}", e)))?;

        let reply = match reply_timeout {
            Some(limit) => tokio::time::timeout(limit, self.read_reply())
                .await
                .map_err(|_| {
                    ArenaError::Connectivity(format!("broker did not reply within {:?}", limit))
                })??,
            None => self.read_reply().await?,
        };

        if let RespValue::Error(message) = &reply {
            return Err(ArenaError::Protocol(format!("broker error: {}", message)));
        }
        Ok(reply)
    }

    async fn read_reply(&mut self) -> Result<RespValue> {
        loop {
            if let Some((value, used)) = RespValue::parse(&self.buffer)? {
                self.buffer.drain(..used);
                return Ok(value);
            }

            let stream = self
                .stream
                .as_mut()
                .ok_or_else(|| ArenaError::Connectivity("broker connection is closed".into()))?;
            let mut chunk = [0u8; 4096];
            let read = stream
                .read(&mut chunk)
                .await
                .map_err(|e| ArenaError::Connectivity(format!("broker recv failed: {}", e)))?;
            if read == 0 {
                return Err(ArenaError::Connectivity(format!(
                    "broker at {} closed the connection",
                    self.address
                )));
            }
            self.buffer.extend_from_slice(&chunk[..read]);
        }
    }
}

#[async_trait]
impl QueueBroker for RespBroker {
    async fn push(&mut self, key: &str, payloads: &[Vec<u8>]) -> Result<()> {
        if payloads.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&[u8]> = vec![b"LPUSH".as_slice(), key.as_bytes()];
        args.extend(payloads.iter().map(Vec::as_slice));
        match self.command(&args, Some(REPLY_GRACE)).await? {
            RespValue::Integer(_) => Ok(()),
            other => Err(ArenaError::Protocol(format!("unexpected LPUSH reply: {:?}", other))),
        }
    }

    async fn pop(&mut self, key: &str, timeout: Duration) -> Result<Pop> {
        let seconds = brpop_timeout(timeout);
        let reply = self
            .command(
                &[b"BRPOP", key.as_bytes(), seconds.as_bytes()],
                Some(timeout.saturating_add(REPLY_GRACE)),
            )
            .await?;

        match reply {
            RespValue::Array(None) | RespValue::Bulk(None) => Ok(Pop::Timeout),
            RespValue::Array(Some(mut items)) if items.len() == 2 => match items.pop() {
                Some(RespValue::Bulk(Some(payload))) => Ok(Pop::Message(payload)),
                other => Err(ArenaError::Protocol(format!(
                    "unexpected BRPOP value: {:?}",
                    other
                ))),
            },
            other => Err(ArenaError::Protocol(format!("unexpected BRPOP reply: {:?}", other))),
        }
    }

    async fn clear(&mut self, key: &str) -> Result<()> {
        debug!("Clearing broker list {}", key);
        match self.command(&[b"DEL", key.as_bytes()], Some(REPLY_GRACE)).await? {
            RespValue::Integer(_) => Ok(()),
            other => Err(ArenaError::Protocol(format!("unexpected DEL reply: {:?}", other))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }
        if let Err(e) = self.command(&[b"QUIT"], Some(REPLY_GRACE)).await {
            warn!("QUIT failed, dropping connection anyway: {}", e);
        }
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.buffer.clear();
        info!("Disconnected from queue broker at {}", self.address);
        Ok(())
    }
}
