//! CARLA client abstraction
//!
//! Everything the recorder needs from the simulator, behind one trait so the
//! real client and the mock are interchangeable.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use contracts::{ActorId, SensorId, SensorSource, SensorType, Transform};

use crate::error::Result;

/// CARLA client trait
pub trait CarlaClient: Send + Sync {
    /// Connect to CARLA server
    ///
    /// `timeout` is also handed to the simulator client as its RPC timeout.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Server version string, `None` when the server did not report one
    fn server_version(&self) -> Option<String>;

    /// Name of the currently loaded map
    fn map_name(&self) -> Result<String>;

    /// Spawn vehicle
    ///
    /// # Arguments
    /// * `blueprint` - Blueprint name, e.g., "vehicle.tesla.model3"
    /// * `transform` - Initial pose, the first recommended spawn point when `None`
    /// * `autopilot` - Hand the vehicle to the traffic manager
    fn spawn_vehicle(
        &self,
        blueprint: &str,
        transform: Option<Transform>,
        autopilot: bool,
    ) -> impl Future<Output = Result<ActorId>> + Send;

    /// Spawn sensor and attach to parent actor
    ///
    /// # Arguments
    /// * `blueprint` - Blueprint name, e.g., "sensor.camera.rgb"
    /// * `transform` - Pose relative to parent actor
    /// * `parent_id` - Parent actor ID
    /// * `attributes` - Blueprint attributes
    fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> impl Future<Output = Result<ActorId>> + Send;

    /// Destroy actor
    ///
    /// Idempotent: returns Ok if the actor doesn't exist
    fn destroy_actor(&self, actor_id: ActorId) -> impl Future<Output = Result<()>> + Send;

    /// Check if actor exists
    fn actor_exists(&self, actor_id: ActorId) -> impl Future<Output = Result<bool>> + Send;

    /// Data source for a spawned sensor actor, `None` if the actor is not a sensor
    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: SensorId,
        sensor_type: SensorType,
    ) -> Option<Box<dyn SensorSource>>;
}
