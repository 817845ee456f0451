//! SensorPacket - raw data delivered by a sensor callback

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{SensorId, SensorType};

/// Sensor data packet
///
/// One packet per simulator callback, before any encoding.
#[derive(Debug, Clone)]
pub struct SensorPacket {
    /// Sensor ID
    pub sensor_id: SensorId,

    /// Sensor type
    pub sensor_type: SensorType,

    /// CARLA simulation timestamp (seconds)
    pub timestamp: f64,

    /// Simulator frame number, diagnostics only
    pub sim_frame: Option<u64>,

    /// Data payload
    pub payload: SensorPayload,
}

/// Sensor data payload
#[derive(Debug, Clone)]
pub enum SensorPayload {
    /// Camera image
    Image(ImageData),

    /// LiDAR sweep
    PointCloud(PointCloudData),

    /// IMU sample
    Imu(ImuData),

    /// GNSS fix
    Gnss(GnssData),

    /// Radar detections
    Radar(RadarData),

    /// Anything the converter does not understand
    Raw(Bytes),
}

impl SensorPayload {
    /// Short variant name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::PointCloud(_) => "point_cloud",
            Self::Imu(_) => "imu",
            Self::Gnss(_) => "gnss",
            Self::Radar(_) => "radar",
            Self::Raw(_) => "raw",
        }
    }
}

/// Image data
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Image width
    pub width: u32,

    /// Image height
    pub height: u32,

    /// Pixel format
    pub format: ImageFormat,

    /// Row-major pixels, no padding
    pub data: Bytes,
}

/// Pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Bgra8,
    Rgba8,
    Rgb8,
}

impl ImageFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra8 | Self::Rgba8 => 4,
            Self::Rgb8 => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bgra8 => "bgra8",
            Self::Rgba8 => "rgba8",
            Self::Rgb8 => "rgb8",
        }
    }
}

/// LiDAR point cloud
#[derive(Debug, Clone)]
pub struct PointCloudData {
    /// Flat f32 buffer: x, y, z, intensity per point
    pub data: Bytes,
}

/// IMU sample
#[derive(Debug, Clone, Copy)]
pub struct ImuData {
    /// Accelerometer (m/s²)
    pub accelerometer: Vector3,

    /// Gyroscope (rad/s)
    pub gyroscope: Vector3,

    /// Compass heading (rad)
    pub compass: f64,
}

/// GNSS fix
#[derive(Debug, Clone, Copy)]
pub struct GnssData {
    /// Latitude (degrees)
    pub latitude: f64,

    /// Longitude (degrees)
    pub longitude: f64,

    /// Altitude (meters)
    pub altitude: f64,
}

/// Radar detections
#[derive(Debug, Clone)]
pub struct RadarData {
    /// Number of detection structs reported by the simulator
    pub num_detections: u32,

    /// Flat f32 buffer: velocity, azimuth, altitude, depth per detection
    pub data: Bytes,
}

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}
