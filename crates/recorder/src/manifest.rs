//! `manifest.json`: written once per session, at finalize

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, Result};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Schema tag
pub const MANIFEST_VERSION: &str = "1.0";

/// Placeholder when the server did not report a version
pub const UNKNOWN_VERSION: &str = "unknown";

/// Session summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    /// ISO-8601 UTC, e.g. `2025-03-01T09:30:00.123456Z`
    pub created_at: String,
    pub carla_version: String,
    pub duration_sec: f64,
    pub sensors: BTreeMap<String, ManifestSensor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSensor {
    pub sensor_type: String,
    pub frame_count: u64,
}

impl Manifest {
    /// Stamp a manifest with the current time
    pub fn new(
        carla_version: Option<&str>,
        duration: Duration,
        sensors: BTreeMap<String, ManifestSensor>,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            carla_version: carla_version
                .filter(|v| !v.is_empty())
                .unwrap_or(UNKNOWN_VERSION)
                .to_string(),
            duration_sec: duration.as_secs_f64(),
            sensors,
        }
    }

    /// Write `<root>/manifest.json`, replacing any previous one
    pub fn write(&self, root: &Path) -> Result<PathBuf> {
        let path = root.join(MANIFEST_FILE_NAME);
        let json = serde_json::to_vec_pretty(self).map_err(|source| RecorderError::Serialize {
            what: "manifest",
            source,
        })?;

        let mut file = File::create(&path).map_err(|e| RecorderError::io(&path, e))?;
        file.write_all(&json)
            .and_then(|()| file.write_all(b"\n"))
            .and_then(|()| file.sync_all())
            .map_err(|e| RecorderError::io(&path, e))?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| RecorderError::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|source| RecorderError::Serialize {
            what: "manifest",
            source,
        })
    }

    pub fn total_frames(&self) -> u64 {
        self.sensors.values().map(|s| s.frame_count).sum()
    }
}
