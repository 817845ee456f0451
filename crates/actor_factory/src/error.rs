//! Actor Factory error types

use contracts::ActorId;
use thiserror::Error;

/// Actor Factory specific error
#[derive(Debug, Error)]
pub enum ActorFactoryError {
    /// CARLA connection error
    #[error("failed to connect to CARLA: {message}")]
    ConnectionFailed { message: String },

    /// CARLA did not answer within the connect timeout
    #[error("timed out after {timeout_sec:.1}s connecting to CARLA at {host}:{port}")]
    ConnectionTimeout {
        host: String,
        port: u16,
        timeout_sec: f64,
    },

    /// Vehicle spawn error
    #[error("failed to spawn vehicle '{vehicle_id}': {message}")]
    VehicleSpawnFailed { vehicle_id: String, message: String },

    /// Sensor spawn error
    #[error("failed to spawn sensor '{sensor_id}' on vehicle '{vehicle_id}': {message}")]
    SensorSpawnFailed {
        sensor_id: String,
        vehicle_id: String,
        message: String,
    },

    /// Spawned actor cannot deliver data
    #[error("sensor '{sensor_id}' (actor {actor_id}) has no data source")]
    SensorSourceUnavailable { sensor_id: String, actor_id: ActorId },

    /// Destroy error
    #[error("failed to destroy actor {actor_id}: {message}")]
    DestroyFailed { actor_id: ActorId, message: String },
}

impl ActorFactoryError {
    /// Create vehicle spawn error
    pub fn vehicle_spawn(vehicle_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VehicleSpawnFailed {
            vehicle_id: vehicle_id.into(),
            message: message.into(),
        }
    }

    /// Create sensor spawn error
    pub fn sensor_spawn(
        sensor_id: impl Into<String>,
        vehicle_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::SensorSpawnFailed {
            sensor_id: sensor_id.into(),
            vehicle_id: vehicle_id.into(),
            message: message.into(),
        }
    }

    /// Connection-phase failure (as opposed to a spawn failure)
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::ConnectionTimeout { .. }
        )
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ActorFactoryError>;
