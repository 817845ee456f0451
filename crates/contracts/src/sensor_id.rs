//! SensorId - shared sensor identifier
//!
//! Callbacks clone the id once per packet, so it is backed by `Arc<str>`.

use serde::{Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Sensor identifier, O(1) to clone.
///
/// ```
/// use contracts::SensorId;
///
/// let id: SensorId = "front_camera".into();
/// assert_eq!(id, "front_camera");
/// assert_eq!(id.clone().as_str(), "front_camera");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorId(Arc<str>);

/// File names owned by the recording layout itself
pub const RESERVED_OUTPUT_NAMES: [&str; 2] = ["manifest.json", "sensors.jsonl"];

/// Why `id` cannot name the sensor's `<output_root>/<sensor_id>/` directory,
/// or `None` if it can.
pub fn output_dir_problem(id: &str) -> Option<&'static str> {
    if id.is_empty() {
        Some("sensor_id cannot be empty")
    } else if id == "." || id == ".." {
        Some("sensor_id cannot be '.' or '..'")
    } else if id.contains(['/', '\\']) {
        Some("sensor_id cannot contain path separators")
    } else if RESERVED_OUTPUT_NAMES.contains(&id) {
        Some("sensor_id collides with a recording file name")
    } else {
        None
    }
}

impl SensorId {
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SensorId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SensorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SensorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SensorId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensorId({:?})", &*self.0)
    }
}

impl PartialEq<str> for SensorId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for SensorId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Serialize for SensorId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}
