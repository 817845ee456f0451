//! Per-sensor recording channel
//!
//! The callback registered with a sensor source ends up in
//! [`SensorChannel::on_packet`], on whatever thread the simulator uses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use contracts::{SensorId, SensorPacket, SensorType};
use observability::{DropReason, RunningStats, StatsSummary};
use tokio::sync::Notify;
use tracing::{debug, error, trace, warn};

use crate::encoder::SensorEncoder;
use crate::error::{EncodeError, RecorderError};
use crate::frame_writer::FrameWriter;
use crate::metadata_log::MetadataLog;
use crate::record::MetadataRecord;
use crate::state::{SessionState, StateCell};

/// State shared between the session and every callback
#[derive(Debug)]
pub(crate) struct SessionShared {
    pub state: StateCell,
    pub fault: FaultSlot,
    pub recorded: AtomicU64,
    pub dropped: AtomicU64,
}

impl SessionShared {
    pub fn new() -> Self {
        Self {
            state: StateCell::new(SessionState::Disconnected),
            fault: FaultSlot::default(),
            recorded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }
}

/// First error raised from a callback; wakes the recording loop
#[derive(Debug, Default)]
pub(crate) struct FaultSlot {
    error: Mutex<Option<RecorderError>>,
    notify: Notify,
}

impl FaultSlot {
    /// Keep `err` unless an earlier fault is already stored
    pub fn raise(&self, err: RecorderError) {
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
            self.notify.notify_one();
        } else {
            debug!(error = %err, "additional recording fault ignored");
        }
    }

    pub fn is_raised(&self) -> bool {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn take(&self) -> Option<RecorderError> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub async fn wait(&self) {
        self.notify.notified().await
    }
}

/// Per-sensor totals for the session report
#[derive(Debug, Clone)]
pub struct SensorSummary {
    pub sensor_id: String,
    pub sensor_type: String,
    pub frame_count: u64,
    /// Callback entry to durable log line
    pub latency_ms: StatsSummary,
}

#[derive(Debug, Default)]
struct ChannelState {
    frame_count: u64,
    faulted: bool,
    warned_unknown: bool,
    latency: RunningStats,
}

enum RecordFailure {
    Encode(EncodeError),
    Write(RecorderError),
}

impl From<EncodeError> for RecordFailure {
    fn from(err: EncodeError) -> Self {
        Self::Encode(err)
    }
}

impl From<RecorderError> for RecordFailure {
    fn from(err: RecorderError) -> Self {
        Self::Write(err)
    }
}

/// One armed sensor.
///
/// The channel lock is held from the gate check to the log append, so
/// `frame_id`s for a sensor hit the log in order and the count read at
/// finalize matches the lines written.
pub(crate) struct SensorChannel {
    sensor_id: SensorId,
    sensor_type: SensorType,
    encoder: SensorEncoder,
    frames: FrameWriter,
    log: Arc<MetadataLog>,
    shared: Arc<SessionShared>,
    inner: Mutex<ChannelState>,
}

impl SensorChannel {
    pub fn new(
        sensor_id: SensorId,
        sensor_type: SensorType,
        frames: FrameWriter,
        log: Arc<MetadataLog>,
        shared: Arc<SessionShared>,
    ) -> Self {
        Self {
            encoder: SensorEncoder::for_type(&sensor_type),
            sensor_id,
            sensor_type,
            frames,
            log,
            shared,
            inner: Mutex::new(ChannelState::default()),
        }
    }

    #[cfg(test)]
    pub fn frame_count(&self) -> u64 {
        self.lock().frame_count
    }

    pub fn summary(&self) -> SensorSummary {
        let inner = self.lock();
        SensorSummary {
            sensor_id: self.sensor_id.to_string(),
            sensor_type: self.sensor_type.to_string(),
            frame_count: inner.frame_count,
            latency_ms: StatsSummary::from(&inner.latency),
        }
    }

    /// Sensor callback body
    pub fn on_packet(&self, packet: SensorPacket) {
        let received = Instant::now();
        let mut inner = self.lock();

        if !self.shared.state.get().accepts_callbacks() {
            trace!(sensor_id = %self.sensor_id, timestamp = packet.timestamp, "callback outside recording window dropped");
            self.drop_callback(DropReason::NotRecording);
            return;
        }
        if inner.faulted {
            self.drop_callback(DropReason::WriteError);
            return;
        }

        match self.record(&mut inner, &packet) {
            Ok(bytes) => {
                let latency_ms = received.elapsed().as_secs_f64() * 1000.0;
                inner.latency.push(latency_ms);
                self.shared.recorded.fetch_add(1, Ordering::Relaxed);
                observability::record_frame_recorded(
                    &self.sensor_id,
                    self.sensor_type.as_str(),
                    bytes,
                );
                observability::record_latency_ms(latency_ms);
                trace!(sensor_id = %self.sensor_id, frame_id = inner.frame_count, "frame recorded");
            }
            Err(RecordFailure::Encode(e)) => {
                warn!(
                    sensor_id = %self.sensor_id,
                    timestamp = packet.timestamp,
                    error = %e,
                    "callback payload rejected"
                );
                self.drop_callback(DropReason::EncodeError);
            }
            Err(RecordFailure::Write(e)) => {
                error!(
                    sensor_id = %self.sensor_id,
                    frame_id = inner.frame_count + 1,
                    error = %e,
                    "failed to record frame, stopping sensor"
                );
                inner.faulted = true;
                self.drop_callback(DropReason::WriteError);
                self.shared.fault.raise(e);
            }
        }
    }

    /// Encode, write the frame file, append the record. Returns bytes written
    /// to the frame file.
    fn record(
        &self,
        inner: &mut ChannelState,
        packet: &SensorPacket,
    ) -> Result<usize, RecordFailure> {
        let encoded = self.encoder.encode(&packet.payload)?;

        if !self.sensor_type.is_known() && !inner.warned_unknown {
            inner.warned_unknown = true;
            warn!(
                sensor_id = %self.sensor_id,
                sensor_type = %self.sensor_type,
                "unrecognized sensor type, recording common fields only"
            );
        }

        let frame_id = inner.frame_count + 1;
        let (data_file, bytes) = match &encoded.payload {
            Some(payload) => (
                Some(self.frames.write(&self.sensor_id, frame_id, payload)?),
                payload.len(),
            ),
            None => (None, 0),
        };

        self.log.append(&MetadataRecord {
            sensor_id: &self.sensor_id,
            sensor_type: self.sensor_type.as_str(),
            timestamp: packet.timestamp,
            frame_id,
            fragment: encoded.fragment,
            data_file,
        })?;

        inner.frame_count = frame_id;
        Ok(bytes)
    }

    fn drop_callback(&self, reason: DropReason) {
        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        observability::record_callback_dropped(&self.sensor_id, reason);
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
