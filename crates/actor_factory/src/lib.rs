//! # Actor Factory
//!
//! Simulator-facing side of the recorder.
//!
//! Responsibilities:
//! - Connect to CARLA within a timeout
//! - Spawn the ego vehicle and its sensors
//! - Hand out `SensorSource`s for callback registration
//! - Tear actors down, sensors before vehicle
//! - Provide a mock simulator for tests and offline runs
//!
//! ## Feature Flags
//!
//! - `real-carla`: Enable real CARLA client (requires carla crate)

pub mod client;
pub mod error;
pub mod factory;
pub mod mock_client;
pub mod mock_sensor;

#[cfg(feature = "real-carla")]
pub mod carla_client;
#[cfg(feature = "real-carla")]
pub mod carla_sensor_source;
#[cfg(feature = "real-carla")]
pub mod sensor_data_converter;

pub use client::CarlaClient;
pub use contracts::{ActorId, RuntimeGraph, SensorSource, WorldBlueprint};
pub use error::{ActorFactoryError, Result};
pub use factory::ActorFactory;
pub use mock_client::{MockCarlaClient, MockConfig};
pub use mock_sensor::{MockSensor, MockSensorConfig, MockSensorMode};

#[cfg(feature = "real-carla")]
pub use carla_client::RealCarlaClient;
#[cfg(feature = "real-carla")]
pub use carla_sensor_source::CarlaSensorSource;
