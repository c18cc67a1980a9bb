//! Error types for arena-rl

use std::time::Duration;
use thiserror::Error;

/// Result type for arena-rl operations
pub type Result<T> = std::result::Result<T, ArenaError>;

/// arena-rl error types
///
/// Nothing in the bridge recovers from these. Validation and configuration
/// errors are caller bugs; connectivity, handshake and observation errors end
/// the current run.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Broker unreachable or connection dropped
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Expected control message not received in time, or a different one arrived
    #[error("Handshake failed waiting for {expected}: {reason}")]
    Handshake { expected: String, reason: String },

    /// Simulator produced no observation within the per-tick timeout
    #[error("No observation received within {0:?}")]
    ObservationTimeout(Duration),

    /// Agent submitted an illegal action
    #[error("Invalid action: {0}")]
    Validation(#[from] ValidationError),

    /// Malformed or missing configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Simulator sent something the bridge cannot interpret
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Local file I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ArenaError {
    fn from(err: serde_json::Error) -> Self {
        ArenaError::Serialization(err.to_string())
    }
}

/// Reasons an agent-issued action is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown function {0}")]
    UnknownFunction(String),

    #[error("{function} takes {expected} arguments, got {got}")]
    ArityMismatch {
        function: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{argument} has {expected} dimensions, got {got}")]
    ArgumentShape {
        argument: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{argument}[{dimension}] = {value} is outside [0, {size})")]
    ArgumentOutOfRange {
        argument: &'static str,
        dimension: usize,
        value: i64,
        size: u32,
    },

    #[error("unknown value {value:?} for {argument}, valid values: {valid:?}")]
    UnknownEnumValue {
        argument: &'static str,
        value: String,
        valid: Vec<&'static str>,
    },

    #[error("expected one action per agent ({expected}), got {got}")]
    AgentCountMismatch { expected: usize, got: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_converts_into_arena_error() {
        let err: ArenaError = ValidationError::UnknownFunction("fly".into()).into();
        assert!(matches!(err, ArenaError::Validation(_)));
        assert_eq!(err.to_string(), "Invalid action: unknown function fly");
    }

    #[test]
    fn test_out_of_range_message() {
        let err = ValidationError::ArgumentOutOfRange {
            argument: "move_range",
            dimension: 1,
            value: 8,
            size: 8,
        };
        assert_eq!(err.to_string(), "move_range[1] = 8 is outside [0, 8)");
    }
}
