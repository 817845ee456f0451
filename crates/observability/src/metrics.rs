//! Recording metrics
//!
//! Thin wrappers over the `metrics` macros so metric names and label sets
//! live in one place.

use metrics::{counter, gauge, histogram};

/// Why a sensor callback produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Arrived outside the `Recording` state
    NotRecording,
    /// Payload did not fit the declared sensor type
    EncodeError,
    /// Frame file or log line could not be written
    WriteError,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotRecording => "not_recording",
            Self::EncodeError => "encode_error",
            Self::WriteError => "write_error",
        }
    }
}

/// One callback fully recorded: frame file (if any) and log line written
pub fn record_frame_recorded(sensor_id: &str, sensor_type: &str, bytes: usize) {
    counter!(
        "carla_recorder_frames_recorded_total",
        "sensor_id" => sensor_id.to_string(),
        "sensor_type" => sensor_type.to_string()
    )
    .increment(1);

    if bytes > 0 {
        counter!(
            "carla_recorder_bytes_written_total",
            "sensor_id" => sensor_id.to_string()
        )
        .increment(bytes as u64);
    }
}

/// Callback dropped without a record
pub fn record_callback_dropped(sensor_id: &str, reason: DropReason) {
    counter!(
        "carla_recorder_callbacks_dropped_total",
        "sensor_id" => sensor_id.to_string(),
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Time from callback entry to durable log line
pub fn record_latency_ms(latency_ms: f64) {
    histogram!("carla_recorder_record_latency_ms").record(latency_ms);
}

/// Sensors currently delivering into the recorder
pub fn record_active_sensors(count: usize) {
    gauge!("carla_recorder_active_sensors").set(count as f64);
}

/// Length of the recording window, set once at finalize
pub fn record_session_duration(seconds: f64) {
    gauge!("carla_recorder_session_duration_seconds").set(seconds);
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
