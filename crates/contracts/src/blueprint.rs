//! WorldBlueprint - Config Loader output
//!
//! Describes what to record: simulator endpoint, the ego vehicle and the
//! sensors mounted on it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete recording blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Simulator connection settings
    pub world: WorldConfig,

    /// Vehicle definitions. Only the first one is recorded.
    pub vehicles: Vec<VehicleConfig>,
}

/// Simulator connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Expected map name (e.g., "Town01"), checked but never loaded
    #[serde(default)]
    pub map: Option<String>,

    /// CARLA server host
    #[serde(default = "default_carla_host")]
    pub carla_host: String,

    /// CARLA server port
    #[serde(default = "default_carla_port")]
    pub carla_port: u16,

    /// Connect timeout in seconds
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: f64,
}

fn default_carla_host() -> String {
    "localhost".to_string()
}

fn default_carla_port() -> u16 {
    2000
}

fn default_timeout_sec() -> f64 {
    10.0
}

fn default_vehicle_id() -> String {
    "ego".to_string()
}

fn default_autopilot() -> bool {
    true
}

/// Vehicle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Unique identifier
    #[serde(default = "default_vehicle_id")]
    pub id: String,

    /// Blueprint name (e.g., "vehicle.tesla.model3")
    pub blueprint: String,

    /// Initial pose; the first recommended spawn point when absent
    #[serde(default)]
    pub spawn_point: Option<Transform>,

    /// Hand the vehicle to the traffic manager after spawning
    #[serde(default = "default_autopilot")]
    pub autopilot: bool,

    /// Mounted sensors
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

/// 3D transform: location + rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Location (x, y, z) in meters
    pub location: Location,

    /// Rotation (pitch, yaw, roll) in degrees
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Sensor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Unique identifier, also the name of the sensor's output directory
    pub id: String,

    /// Sensor type
    pub sensor_type: SensorType,

    /// Mount pose relative to the vehicle
    pub transform: Transform,

    /// Sampling frequency (Hz). Sets `sensor_tick` when that attribute is absent.
    #[serde(default)]
    pub frequency_hz: Option<f64>,

    /// Blueprint attributes. Numbers and booleans are accepted and stringified.
    #[serde(default, deserialize_with = "deserialize_attributes")]
    pub attributes: HashMap<String, String>,
}

impl SensorConfig {
    /// Attributes as they are handed to the blueprint, `sensor_tick` included
    pub fn blueprint_attributes(&self) -> HashMap<String, String> {
        let mut attributes = self.attributes.clone();
        if let Some(hz) = self.frequency_hz.filter(|hz| *hz > 0.0) {
            attributes
                .entry("sensor_tick".to_string())
                .or_insert_with(|| format!("{}", 1.0 / hz));
        }
        attributes
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

fn deserialize_attributes<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = HashMap::<String, AttributeValue>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| (key, value.to_string()))
        .collect())
}

/// Sensor type
///
/// The five known kinds have a fixed blueprint and encoding. Any other string
/// is carried through verbatim and used as the blueprint name itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SensorType {
    Camera,
    Lidar,
    Imu,
    Gnss,
    Radar,
    Other(Arc<str>),
}

impl SensorType {
    /// Parse a configuration string. Never fails: unknown names become `Other`.
    pub fn parse(name: &str) -> Self {
        match name {
            "camera" => Self::Camera,
            "lidar" => Self::Lidar,
            "imu" => Self::Imu,
            "gnss" => Self::Gnss,
            "radar" => Self::Radar,
            other => Self::Other(Arc::from(other)),
        }
    }

    /// Name as written to configuration, records and manifest
    pub fn as_str(&self) -> &str {
        match self {
            Self::Camera => "camera",
            Self::Lidar => "lidar",
            Self::Imu => "imu",
            Self::Gnss => "gnss",
            Self::Radar => "radar",
            Self::Other(name) => name,
        }
    }

    /// CARLA blueprint spawned for this type
    pub fn blueprint(&self) -> &str {
        match self {
            Self::Camera => "sensor.camera.rgb",
            Self::Lidar => "sensor.lidar.ray_cast",
            Self::Imu => "sensor.other.imu",
            Self::Gnss => "sensor.other.gnss",
            Self::Radar => "sensor.other.radar",
            Self::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SensorType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SensorType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

impl WorldBlueprint {
    /// The vehicle that gets recorded
    pub fn ego_vehicle(&self) -> Option<&VehicleConfig> {
        self.vehicles.first()
    }

    /// All sensors across all vehicles
    pub fn all_sensors(&self) -> impl Iterator<Item = &SensorConfig> {
        self.vehicles
            .iter()
            .flat_map(|vehicle| vehicle.sensors.iter())
    }
}
