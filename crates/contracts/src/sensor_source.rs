//! SensorSource trait - sensor data source abstraction
//!
//! Real CARLA sensors and mock sensors deliver data through the same
//! callback-based interface, mirroring CARLA's native `listen`.

use std::sync::Arc;

use crate::{SensorPacket, SensorType};

/// Sensor data callback type
///
/// Invoked on the simulator's own threads, possibly concurrently for
/// different sensors.
pub type SensorDataCallback = Arc<dyn Fn(SensorPacket) + Send + Sync>;

/// Sensor data source trait
///
/// # Example
///
/// ```ignore
/// let sensor: Box<dyn SensorSource> = client.get_sensor_source(actor_id, id, kind)?;
/// sensor.listen(Arc::new(|packet| {
///     println!("received packet from {}", packet.sensor_id);
/// }));
/// // ... record ...
/// sensor.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Get sensor ID
    fn sensor_id(&self) -> &str;

    /// Get sensor type
    fn sensor_type(&self) -> &SensorType;

    /// Register data callback
    ///
    /// Repeated calls while already listening are ignored.
    fn listen(&self, callback: SensorDataCallback);

    /// Stop delivering data. Safe to call more than once.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
