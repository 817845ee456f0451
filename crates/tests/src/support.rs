//! Shared fixtures

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use actor_factory::{MockCarlaClient, MockConfig, MockSensor};
use bytes::Bytes;
use contracts::{
    GnssData, ImageData, ImageFormat, ImuData, PointCloudData, SensorConfig, SensorPayload,
    SensorType, Transform, Vector3, VehicleConfig,
};
use recorder::{RecorderOptions, RecordingSession, LOG_FILE_NAME};
use serde_json::Value;

pub const EGO_BLUEPRINT: &str = "vehicle.tesla.model3";

pub fn sensor(id: &str, sensor_type: &str) -> SensorConfig {
    SensorConfig {
        id: id.to_string(),
        sensor_type: SensorType::parse(sensor_type),
        transform: Transform::default(),
        frequency_hz: None,
        attributes: HashMap::new(),
    }
}

pub fn vehicle(sensors: Vec<SensorConfig>) -> VehicleConfig {
    VehicleConfig {
        id: "ego".to_string(),
        blueprint: EGO_BLUEPRINT.to_string(),
        spawn_point: None,
        autopilot: true,
        sensors,
    }
}

pub fn options(sync_writes: bool) -> RecorderOptions {
    RecorderOptions {
        sync_writes,
        ..Default::default()
    }
}

/// BGRA buffer whose bytes depend on `seed`
pub fn bgra(width: u32, height: u32, seed: u8) -> Bytes {
    let len = (width * height * 4) as usize;
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect::<Vec<u8>>()
        .into()
}

pub fn image(width: u32, height: u32, data: Bytes) -> SensorPayload {
    SensorPayload::Image(ImageData {
        width,
        height,
        format: ImageFormat::Bgra8,
        data,
    })
}

pub fn gnss(step: f64) -> SensorPayload {
    SensorPayload::Gnss(GnssData {
        latitude: 48.0 + step * 1e-4,
        longitude: 11.0 + step * 1e-4,
        altitude: 520.0,
    })
}

pub fn imu(step: f64) -> SensorPayload {
    SensorPayload::Imu(ImuData {
        accelerometer: Vector3 {
            x: step,
            y: 0.0,
            z: 9.81,
        },
        gyroscope: Vector3::default(),
        compass: 1.57,
    })
}

pub fn point_cloud(points: usize) -> SensorPayload {
    SensorPayload::PointCloud(PointCloudData {
        data: Bytes::from(vec![0u8; points * 16]),
    })
}

/// A session in `SensorsArmed` on a manual-mode mock
pub async fn armed(
    root: &Path,
    sensors: Vec<SensorConfig>,
    sync_writes: bool,
) -> (RecordingSession<MockCarlaClient>, MockCarlaClient) {
    armed_with(MockConfig::manual(), root, sensors, sync_writes).await
}

pub async fn armed_with(
    config: MockConfig,
    root: &Path,
    sensors: Vec<SensorConfig>,
    sync_writes: bool,
) -> (RecordingSession<MockCarlaClient>, MockCarlaClient) {
    let client = MockCarlaClient::with_config(config);
    let mut session = RecordingSession::new(client.clone(), root, options(sync_writes));
    let vehicle = vehicle(sensors);

    session
        .connect("localhost", 2000, Duration::from_secs(1))
        .await
        .unwrap();
    session.prepare_output().unwrap();
    session.spawn_vehicle(&vehicle).await.unwrap();
    session.arm_sensors(&vehicle.sensors).await.unwrap();
    (session, client)
}

pub fn mock(client: &MockCarlaClient, sensor_id: &str) -> MockSensor {
    client
        .mock_sensor(sensor_id)
        .unwrap_or_else(|| panic!("sensor {sensor_id} was not armed"))
}

/// Every line of `sensors.jsonl`, parsed; panics on a partial line
pub fn read_log(root: &Path) -> Vec<Value> {
    let content = std::fs::read_to_string(root.join(LOG_FILE_NAME)).unwrap();
    assert!(content.is_empty() || content.ends_with('\n'));
    content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

pub fn frame_ids(records: &[Value], sensor_id: &str) -> Vec<u64> {
    records
        .iter()
        .filter(|r| r["sensor_id"] == sensor_id)
        .map(|r| r["frame_id"].as_u64().unwrap())
        .collect()
}

pub fn dir_entries(path: &Path) -> usize {
    std::fs::read_dir(path).unwrap().count()
}
