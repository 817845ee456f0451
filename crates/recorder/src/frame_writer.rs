//! Frame files: `<root>/<sensor_id>/frame_NNNNNN.bin`

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use contracts::{output_dir_problem, ContractError};

use crate::error::{RecorderError, Result};

/// File name for a frame id, zero-padded to six digits
pub fn frame_file_name(frame_id: u64) -> String {
    format!("frame_{frame_id:06}.bin")
}

/// Writes one binary payload per frame under the session root
#[derive(Debug, Clone)]
pub struct FrameWriter {
    root: PathBuf,
    sync: bool,
}

impl FrameWriter {
    /// `sync` forces each file to stable storage before `write` returns
    pub fn new(root: impl Into<PathBuf>, sync: bool) -> Self {
        Self {
            root: root.into(),
            sync,
        }
    }

    /// Create `<root>/<sensor_id>/` if missing.
    ///
    /// Ids that would resolve outside the root are rejected.
    pub fn ensure_sensor_dir(&self, sensor_id: &str) -> Result<PathBuf> {
        if let Some(reason) = output_dir_problem(sensor_id) {
            let field = format!("sensor_id '{sensor_id}'");
            return Err(ContractError::config_validation(field, reason).into());
        }
        let dir = self.root.join(sensor_id);
        fs::create_dir_all(&dir).map_err(|e| RecorderError::io(&dir, e))?;
        Ok(dir)
    }

    /// Write `bytes` as frame `frame_id` of `sensor_id`.
    ///
    /// Returns the path relative to the root, `"<sensor_id>/frame_NNNNNN.bin"`.
    /// An existing file is never overwritten.
    pub fn write(&self, sensor_id: &str, frame_id: u64, bytes: &[u8]) -> Result<String> {
        let dir = self.ensure_sensor_dir(sensor_id)?;
        let name = frame_file_name(frame_id);
        let path = dir.join(&name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| RecorderError::io(&path, e))?;
        file.write_all(bytes)
            .map_err(|e| RecorderError::io(&path, e))?;
        if self.sync {
            file.sync_data().map_err(|e| RecorderError::io(&path, e))?;
        }

        Ok(format!("{sensor_id}/{name}"))
    }
}
