//! Wire protocol and transports between arena-rl and the game simulator
//!
//! This crate provides:
//! - Wire encodings for actions, commands and control messages
//! - The `QueueBroker` abstraction over named blocking FIFO lists
//! - A RESP (Redis protocol) broker client over TCP
//! - An in-process broker for tests and loopback runs
//! - `Transport`, the typed channel wrapper used by the environment

pub mod memory;
pub mod protocol;
pub mod resp;
pub mod transport;

pub use memory::MemoryBroker;
pub use protocol::{Command, ControlMessage, WireAction};
pub use resp::RespBroker;
pub use transport::{Pop, QueueBroker, Transport};
