//! # Contracts
//!
//! Shared interface types for the recorder workspace. Business crates depend
//! on this crate only, never on each other's internals.
//!
//! ## Time Model
//! - Every packet carries the CARLA simulation timestamp (seconds, f64)
//! - The recorder assigns its own per-sensor `frame_id` (1, 2, 3, ...);
//!   the simulator frame number travels in `SensorPacket::sim_frame`

mod blueprint;
mod error;
mod runtime;
mod sensor;
mod sensor_id;
mod sensor_source;

pub use blueprint::*;
pub use error::*;
pub use runtime::*;
pub use sensor::*;
pub use sensor_id::{output_dir_problem, SensorId, RESERVED_OUTPUT_NAMES};
pub use sensor_source::{SensorDataCallback, SensorSource};
