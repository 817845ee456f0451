//! `sensors.jsonl`: one JSON record per line, shared by every sensor

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::error::{RecorderError, Result};

pub const LOG_FILE_NAME: &str = "sensors.jsonl";

/// Append-only JSON-lines log.
///
/// Each `append` writes exactly one line under the lock and flushes it (and
/// with `sync`, fsyncs it) before returning.
#[derive(Debug)]
pub struct MetadataLog {
    path: PathBuf,
    sync: bool,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl MetadataLog {
    /// Create (truncating) the log at `path`
    pub fn create(path: impl Into<PathBuf>, sync: bool) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| RecorderError::io(&path, e))?;
        debug!(path = %path.display(), "metadata log opened");
        Ok(Self {
            path,
            sync,
            writer: Mutex::new(Some(BufWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `record` and append it as one line
    pub fn append<T: Serialize>(&self, record: &T) -> Result<()> {
        // Serialize outside the lock
        let mut line = serde_json::to_vec(record).map_err(|source| RecorderError::Serialize {
            what: "metadata record",
            source,
        })?;
        line.push(b'\n');

        let mut guard = self.lock();
        let writer = guard.as_mut().ok_or(RecorderError::LogClosed)?;
        writer
            .write_all(&line)
            .and_then(|()| writer.flush())
            .map_err(|e| RecorderError::io(&self.path, e))?;
        if self.sync {
            writer
                .get_ref()
                .sync_data()
                .map_err(|e| RecorderError::io(&self.path, e))?;
        }
        Ok(())
    }

    /// Flush and close. Later appends fail with `LogClosed`; closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let Some(mut writer) = self.lock().take() else {
            return Ok(());
        };
        writer.flush().map_err(|e| RecorderError::io(&self.path, e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| RecorderError::io(&self.path, e))?;
        debug!(path = %self.path.display(), "metadata log closed");
        Ok(())
    }

    // A panic mid-append leaves at most one partial line; keep logging.
    fn lock(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
