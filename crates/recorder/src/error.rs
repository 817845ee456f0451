//! Recorder error types

use std::io;
use std::path::{Path, PathBuf};

use actor_factory::ActorFactoryError;
use contracts::ContractError;
use thiserror::Error;

use crate::state::SessionState;

/// A callback payload that cannot be encoded for its sensor.
///
/// Per-frame: the callback is dropped, nothing is written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{sensor_type} sensor delivered a {payload} payload")]
    PayloadMismatch {
        sensor_type: &'static str,
        payload: &'static str,
    },

    #[error("image buffer is {actual} bytes, expected {expected} for {width}x{height} {format}")]
    ImageSize {
        width: u32,
        height: u32,
        format: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{kind} buffer of {len} bytes is not a whole number of {stride}-byte records")]
    Stride {
        kind: &'static str,
        len: usize,
        stride: usize,
    },
}

/// Recorder error
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Simulator unreachable or too slow to answer
    #[error("connection failed: {0}")]
    Connect(#[source] ActorFactoryError),

    /// Vehicle or sensor could not be spawned
    #[error("spawn failed: {0}")]
    Spawn(#[source] ActorFactoryError),

    /// Configuration cannot be recorded
    #[error(transparent)]
    Config(#[from] ContractError),

    /// Filesystem failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Append after the log was closed
    #[error("metadata log is closed")]
    LogClosed,

    /// Lifecycle step out of order
    #[error("invalid session transition {from} -> {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },

    /// Record or manifest could not be serialized
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl RecorderError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<ActorFactoryError> for RecorderError {
    fn from(err: ActorFactoryError) -> Self {
        if err.is_connection_error() {
            Self::Connect(err)
        } else {
            Self::Spawn(err)
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, RecorderError>;
