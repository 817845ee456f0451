//! Live CARLA sensor as a `SensorSource` (`real-carla` only)

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use carla::client::Sensor;
use contracts::{SensorDataCallback, SensorId, SensorSource, SensorType};
use tracing::{debug, trace, warn};

use crate::sensor_data_converter::convert_sensor_data;

/// Flags shared with the closure registered on the CARLA sensor
#[derive(Default)]
struct DeliveryState {
    active: AtomicBool,
    mismatched: AtomicU64,
}

/// Forwards measurements of one attached CARLA sensor to a recorder callback.
///
/// The CARLA thread may still be inside the closure when `stop` returns;
/// delivery after that point is cut by the `active` flag.
pub struct CarlaSensorSource {
    sensor_id: SensorId,
    sensor_type: SensorType,
    sensor: Sensor,
    delivery: Arc<DeliveryState>,
}

impl CarlaSensorSource {
    pub fn new(sensor_id: SensorId, sensor_type: SensorType, sensor: Sensor) -> Self {
        Self {
            sensor_id,
            sensor_type,
            sensor,
            delivery: Arc::default(),
        }
    }

    /// Measurements that could not be converted to the configured type
    pub fn mismatched(&self) -> u64 {
        self.delivery.mismatched.load(Ordering::Relaxed)
    }
}

impl SensorSource for CarlaSensorSource {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn sensor_type(&self) -> &SensorType {
        &self.sensor_type
    }

    fn listen(&self, callback: SensorDataCallback) {
        if self.delivery.active.swap(true, Ordering::AcqRel) {
            debug!(sensor_id = %self.sensor_id, "listen ignored, callback already registered");
            return;
        }

        let sensor_id = self.sensor_id.clone();
        let sensor_type = self.sensor_type.clone();
        let delivery = self.delivery.clone();
        debug!(sensor_id = %sensor_id, blueprint = sensor_type.blueprint(), "registering CARLA callback");

        self.sensor.listen(move |measurement| {
            if !delivery.active.load(Ordering::Acquire) {
                return;
            }
            let Some(packet) = convert_sensor_data(&sensor_id, &sensor_type, &measurement) else {
                // One warning per sensor, then count silently
                if delivery.mismatched.fetch_add(1, Ordering::Relaxed) == 0 {
                    warn!(
                        sensor_id = %sensor_id,
                        sensor_type = %sensor_type,
                        "measurement does not match configured sensor type"
                    );
                }
                return;
            };
            trace!(sensor_id = %sensor_id, sim_frame = packet.sim_frame, "measurement forwarded");
            callback(packet);
        });
    }

    fn stop(&self) {
        if !self.delivery.active.swap(false, Ordering::AcqRel) {
            return;
        }
        self.sensor.stop();
        debug!(
            sensor_id = %self.sensor_id,
            mismatched = self.mismatched(),
            "CARLA callback unregistered"
        );
    }

    fn is_listening(&self) -> bool {
        self.delivery.active.load(Ordering::Acquire)
    }
}
