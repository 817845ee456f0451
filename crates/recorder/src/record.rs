//! One line of `sensors.jsonl`

use serde::Serialize;

use crate::encoder::Fragment;

/// Common fields, then the sensor-specific fragment, then the frame file
#[derive(Debug, Clone, Serialize)]
pub struct MetadataRecord<'a> {
    pub sensor_id: &'a str,
    pub sensor_type: &'a str,
    /// Simulation time (seconds)
    pub timestamp: f64,
    /// Per-sensor sequence number, 1-based
    pub frame_id: u64,
    #[serde(flatten)]
    pub fragment: Fragment,
    /// Relative to the session root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<String>,
}
