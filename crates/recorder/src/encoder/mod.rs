//! Per-sensor-type encoding
//!
//! Each kind turns one callback payload into a metadata fragment (flattened
//! into the log record) and, for bulk data, the bytes that go to a frame file.
//!
//! | type    | fragment                                   | frame file |
//! |---------|--------------------------------------------|------------|
//! | camera  | width, height, format                      | yes        |
//! | lidar   | num_points, point_stride                   | yes        |
//! | imu     | accelerometer, gyroscope, compass          | no         |
//! | gnss    | latitude, longitude, altitude              | no         |
//! | radar   | num_detections                             | yes        |
//! | other   | (none)                                     | no         |

mod camera;
mod gnss;
mod imu;
mod lidar;
mod radar;

use bytes::Bytes;
use contracts::{SensorPayload, SensorType};
use serde::Serialize;

use crate::error::EncodeError;

/// Bytes per lidar point and per radar detection: four f32
pub const RECORD_STRIDE: usize = 16;

/// Sensor-specific record fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Fragment {
    Camera {
        width: u32,
        height: u32,
        format: &'static str,
    },
    Lidar {
        num_points: u64,
        point_stride: u32,
    },
    Imu {
        accelerometer: [f64; 3],
        gyroscope: [f64; 3],
        compass: f64,
    },
    Gnss {
        latitude: f64,
        longitude: f64,
        altitude: f64,
    },
    Radar {
        num_detections: u32,
    },
    /// Unrecognised sensor type: common fields only
    Empty {},
}

/// Encoder output for one callback
#[derive(Debug, Clone)]
pub struct Encoded {
    pub fragment: Fragment,
    /// Written verbatim to `frame_NNNNNN.bin` when present
    pub payload: Option<Bytes>,
}

impl Encoded {
    fn inline(fragment: Fragment) -> Self {
        Self {
            fragment,
            payload: None,
        }
    }

    fn with_file(fragment: Fragment, payload: Bytes) -> Self {
        Self {
            fragment,
            payload: Some(payload),
        }
    }
}

/// Encoder selected once per sensor from its declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorEncoder {
    Camera,
    Lidar,
    Imu,
    Gnss,
    Radar,
    Passthrough,
}

impl SensorEncoder {
    pub fn for_type(sensor_type: &SensorType) -> Self {
        match sensor_type {
            SensorType::Camera => Self::Camera,
            SensorType::Lidar => Self::Lidar,
            SensorType::Imu => Self::Imu,
            SensorType::Gnss => Self::Gnss,
            SensorType::Radar => Self::Radar,
            SensorType::Other(_) => Self::Passthrough,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Lidar => "lidar",
            Self::Imu => "imu",
            Self::Gnss => "gnss",
            Self::Radar => "radar",
            Self::Passthrough => "passthrough",
        }
    }

    /// Whether this kind produces a frame file per callback
    pub fn writes_frames(self) -> bool {
        matches!(self, Self::Camera | Self::Lidar | Self::Radar)
    }

    pub fn encode(self, payload: &SensorPayload) -> Result<Encoded, EncodeError> {
        match (self, payload) {
            (Self::Camera, SensorPayload::Image(image)) => camera::encode(image),
            (Self::Lidar, SensorPayload::PointCloud(cloud)) => lidar::encode(cloud),
            (Self::Imu, SensorPayload::Imu(imu)) => Ok(imu::encode(imu)),
            (Self::Gnss, SensorPayload::Gnss(gnss)) => Ok(gnss::encode(gnss)),
            (Self::Radar, SensorPayload::Radar(radar)) => radar::encode(radar),
            (Self::Passthrough, _) => Ok(Encoded::inline(Fragment::Empty {})),
            (kind, payload) => Err(EncodeError::PayloadMismatch {
                sensor_type: kind.name(),
                payload: payload.kind(),
            }),
        }
    }
}

fn check_stride(kind: &'static str, len: usize) -> Result<(), EncodeError> {
    if len % RECORD_STRIDE == 0 {
        Ok(())
    } else {
        Err(EncodeError::Stride {
            kind,
            len,
            stride: RECORD_STRIDE,
        })
    }
}
