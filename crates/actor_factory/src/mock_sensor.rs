//! Mock sensor implementation
//!
//! Implements `SensorSource` trait, generates simulated sensor data.
//! Used for testing and development without CARLA environment.
//!
//! Two modes:
//! - `Periodic`: a background thread produces synthetic packets at a fixed rate
//! - `Manual`: nothing is produced until the owner calls [`MockSensor::emit`]

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{
    GnssData, ImageData, ImageFormat, ImuData, PointCloudData, RadarData, SensorDataCallback,
    SensorId, SensorPacket, SensorPayload, SensorSource, SensorType, Vector3,
};
use tracing::{debug, trace};

/// Mock sensor configuration
#[derive(Debug, Clone)]
pub struct MockSensorConfig {
    /// Send frequency (Hz)
    pub frequency_hz: f64,
    /// Image width (Camera only)
    pub image_width: u32,
    /// Image height (Camera only)
    pub image_height: u32,
    /// LiDAR point count (Lidar only)
    pub lidar_points: u32,
    /// Detections per sweep (Radar only)
    pub radar_detections: u32,
}

impl Default for MockSensorConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 20.0,
            image_width: 800,
            image_height: 600,
            lidar_points: 10000,
            radar_detections: 5,
        }
    }
}

/// How a mock sensor produces data once listening
#[derive(Debug, Clone)]
pub enum MockSensorMode {
    /// Background thread at `frequency_hz`
    Periodic(MockSensorConfig),
    /// Test-driven, see [`MockSensor::emit`]
    Manual,
}

impl Default for MockSensorMode {
    fn default() -> Self {
        Self::Periodic(MockSensorConfig::default())
    }
}

/// Mock sensor
///
/// Cloning is cheap and every clone drives the same sensor, so a test can keep
/// a handle and emit packets after the recorder has registered its callback.
#[derive(Clone)]
pub struct MockSensor {
    inner: Arc<MockSensorInner>,
}

struct MockSensorInner {
    sensor_id: SensorId,
    sensor_type: SensorType,
    mode: MockSensorMode,
    listening: AtomicBool,
    callback: Mutex<Option<SensorDataCallback>>,
    sim_frame: AtomicU64,
}

impl MockSensor {
    /// Create new Mock sensor
    pub fn new(
        sensor_id: impl Into<SensorId>,
        sensor_type: SensorType,
        mode: MockSensorMode,
    ) -> Self {
        Self {
            inner: Arc::new(MockSensorInner {
                sensor_id: sensor_id.into(),
                sensor_type,
                mode,
                listening: AtomicBool::new(false),
                callback: Mutex::new(None),
                sim_frame: AtomicU64::new(0),
            }),
        }
    }

    /// Create a periodic Mock sensor with default configuration
    pub fn with_defaults(sensor_id: impl Into<SensorId>, sensor_type: SensorType) -> Self {
        Self::new(sensor_id, sensor_type, MockSensorMode::default())
    }

    /// Deliver one packet to the registered callback.
    ///
    /// Returns false when nobody is listening. Safe to call from several
    /// threads at once; the callback runs on the calling thread.
    pub fn emit(&self, timestamp: f64, payload: SensorPayload) -> bool {
        if !self.inner.listening.load(Ordering::Acquire) {
            return false;
        }
        let callback = match self.inner.callback.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        let Some(callback) = callback else {
            return false;
        };

        let sim_frame = self.inner.sim_frame.fetch_add(1, Ordering::Relaxed) + 1;
        callback(SensorPacket {
            sensor_id: self.inner.sensor_id.clone(),
            sensor_type: self.inner.sensor_type.clone(),
            timestamp,
            sim_frame: Some(sim_frame),
            payload,
        });
        trace!(sensor_id = %self.inner.sensor_id, sim_frame, timestamp, "mock packet sent");
        true
    }

    /// Emit a synthetic payload matching this sensor's type
    pub fn emit_synthetic(&self, timestamp: f64) -> bool {
        let config = match &self.inner.mode {
            MockSensorMode::Periodic(config) => config.clone(),
            MockSensorMode::Manual => MockSensorConfig::default(),
        };
        let frame = self.inner.sim_frame.load(Ordering::Relaxed) + 1;
        let payload = generate_payload(&config, &self.inner.sensor_type, frame);
        self.emit(timestamp, payload)
    }

    fn spawn_generator(&self, config: MockSensorConfig) {
        let sensor = self.clone();
        let interval = Duration::from_secs_f64(1.0 / config.frequency_hz.max(0.1));

        thread::spawn(move || {
            debug!(
                sensor_id = %sensor.inner.sensor_id,
                sensor_type = %sensor.inner.sensor_type,
                frequency_hz = config.frequency_hz,
                "mock sensor started"
            );

            let mut tick: u64 = 0;
            while sensor.inner.listening.load(Ordering::Acquire) {
                tick += 1;
                // Simulation clock, not wall clock
                let timestamp = tick as f64 * interval.as_secs_f64();
                let payload = generate_payload(&config, &sensor.inner.sensor_type, tick);
                sensor.emit(timestamp, payload);
                thread::sleep(interval);
            }

            debug!(sensor_id = %sensor.inner.sensor_id, "mock sensor stopped");
        });
    }
}

impl SensorSource for MockSensor {
    fn sensor_id(&self) -> &str {
        &self.inner.sensor_id
    }

    fn sensor_type(&self) -> &SensorType {
        &self.inner.sensor_type
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, don't start again
        if self.inner.listening.load(Ordering::Acquire) {
            return;
        }
        if let Ok(mut slot) = self.inner.callback.lock() {
            *slot = Some(callback);
        }
        if self.inner.listening.swap(true, Ordering::AcqRel) {
            return;
        }

        if let MockSensorMode::Periodic(config) = &self.inner.mode {
            self.spawn_generator(config.clone());
        }
    }

    fn stop(&self) {
        self.inner.listening.store(false, Ordering::Release);
        if let Ok(mut slot) = self.inner.callback.lock() {
            slot.take();
        }
    }

    fn is_listening(&self) -> bool {
        self.inner.listening.load(Ordering::Acquire)
    }
}

/// Generate simulated data payload
pub fn generate_payload(
    config: &MockSensorConfig,
    sensor_type: &SensorType,
    frame: u64,
) -> SensorPayload {
    match sensor_type {
        SensorType::Camera => {
            let size = (config.image_width * config.image_height * 4) as usize;
            SensorPayload::Image(ImageData {
                width: config.image_width,
                height: config.image_height,
                format: ImageFormat::Bgra8,
                data: Bytes::from(vec![(frame % 256) as u8; size]),
            })
        }
        SensorType::Lidar => {
            let n = config.lidar_points.max(1);
            let mut buf = BytesMut::with_capacity(n as usize * 16);
            for i in 0..n {
                let angle = TAU * f64::from(i) / f64::from(n);
                buf.put_f32_le((10.0 * angle.cos()) as f32);
                buf.put_f32_le((10.0 * angle.sin()) as f32);
                buf.put_f32_le(-1.5);
                buf.put_f32_le(0.5);
            }
            SensorPayload::PointCloud(PointCloudData { data: buf.freeze() })
        }
        SensorType::Imu => SensorPayload::Imu(ImuData {
            accelerometer: Vector3 {
                x: 0.0,
                y: 0.0,
                z: 9.81,
            },
            gyroscope: Vector3::default(),
            compass: 0.0,
        }),
        SensorType::Gnss => SensorPayload::Gnss(GnssData {
            latitude: 40.0 + (frame as f64 * 0.0001),
            longitude: -74.0 + (frame as f64 * 0.0001),
            altitude: 100.0,
        }),
        SensorType::Radar => {
            let n = config.radar_detections;
            let mut buf = BytesMut::with_capacity(n as usize * 16);
            for i in 0..n {
                buf.put_f32_le(1.0);
                buf.put_f32_le(0.1 * i as f32);
                buf.put_f32_le(0.0);
                buf.put_f32_le(20.0 + i as f32);
            }
            SensorPayload::Radar(RadarData {
                num_detections: n,
                data: buf.freeze(),
            })
        }
        SensorType::Other(_) => SensorPayload::Raw(Bytes::new()),
    }
}
