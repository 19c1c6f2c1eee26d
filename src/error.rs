//! Custom error types for sonda
//!
//! Split per subsystem so the dispatch loop can tell recoverable
//! failures (timeouts, dropped connections) from fatal ones.

use thiserror::Error;

/// Main error type for probe operations
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// History persistence errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// A run is already active on this engine
    #[error("A probe run is already in progress")]
    AlreadyRunning,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors. Every one of these fails `start()` before the
/// first dispatch.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid signature pattern '{pattern}': {source}")]
    InvalidSignature {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Empty candidate range: end ({end}) must be greater than start ({start})")]
    EmptyRange { start: u32, end: u32 },

    #[error("Request delay unit is not specified")]
    MissingDelayUnit,

    #[error("Unknown delay unit: {0}")]
    UnknownDelayUnit(String),

    #[error("Target parameter is not specified")]
    MissingTargetParam,

    #[error("Rejection signature is not specified")]
    MissingSignature,

    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    #[error("Failed to read configuration file: {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Transport errors, split by how the dispatch loop reacts to them.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Recoverable: the attempt is retried and not counted.
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Non-fatal: the candidate is skipped and the run continues.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Fatal: the template cannot produce a sendable request.
    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl TransportError {
    /// Whether the dispatch loop should retry the same candidate.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }

    /// Whether the failure invalidates the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::Malformed(_))
    }
}

/// History persistence errors. Logged by the engine, never propagated
/// into a run.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to open history file: {path}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write history file: {0}")]
    Write(String),

    #[error("Failed to parse history file: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_recoverable_but_not_fatal() {
        let err = TransportError::Timeout(30_000);
        assert!(err.is_timeout());
        assert!(!err.is_fatal());
    }

    #[test]
    fn malformed_is_fatal() {
        let err = TransportError::Malformed("bad header".to_string());
        assert!(err.is_fatal());
        assert!(!err.is_timeout());
    }

    #[test]
    fn config_errors_convert_into_probe_errors() {
        let err: ProbeError = ConfigError::MissingDelayUnit.into();
        assert!(matches!(err, ProbeError::Config(ConfigError::MissingDelayUnit)));
    }
}
