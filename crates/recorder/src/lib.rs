//! Recorder
//!
//! Turns sensor callbacks into an on-disk session:
//!
//! ```text
//! <root>/
//!   manifest.json            written once, at finalize
//!   sensors.jsonl            one metadata record per line, all sensors
//!   <sensor_id>/frame_000001.bin
//! ```
//!
//! Image, point-cloud and radar frames get a binary file; IMU and GNSS
//! readings live entirely in their metadata record.

pub mod encoder;
pub mod error;
pub mod frame_writer;
pub mod manifest;
pub mod metadata_log;
pub mod record;
mod sensor;
pub mod session;
pub mod state;

pub use encoder::{Encoded, Fragment, SensorEncoder, RECORD_STRIDE};
pub use error::{EncodeError, RecorderError, Result};
pub use frame_writer::{frame_file_name, FrameWriter};
pub use manifest::{Manifest, ManifestSensor, MANIFEST_FILE_NAME, MANIFEST_VERSION};
pub use metadata_log::{MetadataLog, LOG_FILE_NAME};
pub use record::MetadataRecord;
pub use sensor::SensorSummary;
pub use session::{RecorderOptions, RecordingEnd, RecordingSession, SessionReport};
pub use state::SessionState;
