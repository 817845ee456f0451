//! Recording session lifecycle
//!
//! `Disconnected -> Connected -> OutputReady -> VehicleSpawned -> SensorsArmed
//! -> Recording -> Finalized`, one step per method. [`RecordingSession::run`]
//! walks the whole chain; the step methods are public for callers (and tests)
//! that need to act between phases.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actor_factory::{ActorFactory, CarlaClient};
use contracts::{
    output_dir_problem, ActorId, ContractError, RuntimeGraph, SensorConfig, SensorSource,
    VehicleConfig, WorldBlueprint,
};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use crate::error::{RecorderError, Result};
use crate::frame_writer::FrameWriter;
use crate::manifest::{Manifest, ManifestSensor};
use crate::metadata_log::{MetadataLog, LOG_FILE_NAME};
use crate::sensor::{SensorChannel, SensorSummary, SessionShared};
use crate::state::SessionState;

/// Recording windows at least this long only end by interrupt or fault
const UNBOUNDED_WINDOW: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Recorder options
#[derive(Debug, Clone)]
pub struct RecorderOptions {
    /// fsync every frame file and log line before acknowledging it
    pub sync_writes: bool,
    /// Period of the progress log event while recording
    pub progress_interval: Duration,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            sync_writes: true,
            progress_interval: Duration::from_secs(1),
        }
    }
}

/// How the recording window ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingEnd {
    /// Duration elapsed
    Completed,
    /// Interrupt future resolved first
    Interrupted,
    /// A callback hit an I/O error
    Faulted,
}

impl RecordingEnd {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Faulted => "faulted",
        }
    }
}

/// Outcome of a finalized session
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// `None` if the session never reached `Recording`
    pub end: Option<RecordingEnd>,
    /// Wall-clock length of the recording window
    pub duration: Duration,
    /// `None` if no manifest was written
    pub manifest_path: Option<PathBuf>,
    pub sensors: Vec<SensorSummary>,
    /// Callbacks that produced no record, for any reason
    pub dropped_callbacks: u64,
}

impl SessionReport {
    pub fn total_frames(&self) -> u64 {
        self.sensors.iter().map(|s| s.frame_count).sum()
    }
}

struct ArmedSensor {
    actor_id: ActorId,
    channel: Arc<SensorChannel>,
    source: Box<dyn SensorSource>,
}

/// One recording run against one simulator connection
pub struct RecordingSession<C: CarlaClient> {
    factory: ActorFactory<C>,
    root: PathBuf,
    options: RecorderOptions,
    shared: Arc<SessionShared>,
    graph: RuntimeGraph,
    vehicle_id: Option<String>,
    log: Option<Arc<MetadataLog>>,
    sensors: Vec<ArmedSensor>,
    server_version: Option<String>,
    started_at: Option<Instant>,
    end: Option<RecordingEnd>,
    report: Option<SessionReport>,
}

impl<C: CarlaClient> RecordingSession<C> {
    pub fn new(client: C, output_root: impl Into<PathBuf>, options: RecorderOptions) -> Self {
        Self {
            factory: ActorFactory::new(client),
            root: output_root.into(),
            options,
            shared: Arc::new(SessionShared::new()),
            graph: RuntimeGraph::new(),
            vehicle_id: None,
            log: None,
            sensors: Vec::new(),
            server_version: None,
            started_at: None,
            end: None,
            report: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.get()
    }

    pub fn output_root(&self) -> &Path {
        &self.root
    }

    /// Simulator version, once connected
    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    /// Total records written so far, across sensors
    pub fn recorded_frames(&self) -> u64 {
        self.shared.recorded.load(Ordering::Relaxed)
    }

    /// `Disconnected -> Connected`
    pub async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        self.shared.state.check(SessionState::Connected)?;
        self.factory
            .connect(host, port, timeout)
            .await
            .map_err(RecorderError::Connect)?;
        self.server_version = self.factory.client().server_version();
        self.shared.state.advance(SessionState::Connected)
    }

    /// Warn if the simulator runs a different map than configured
    pub fn check_map(&self, expected: Option<&str>) {
        self.factory.check_map(expected);
    }

    /// `Connected -> OutputReady`: create the root and open `sensors.jsonl`
    pub fn prepare_output(&mut self) -> Result<()> {
        self.shared.state.check(SessionState::OutputReady)?;
        std::fs::create_dir_all(&self.root).map_err(|e| RecorderError::io(&self.root, e))?;
        let log = MetadataLog::create(self.root.join(LOG_FILE_NAME), self.options.sync_writes)?;
        info!(
            root = %self.root.display(),
            log = %log.path().display(),
            "output directory ready"
        );
        self.log = Some(Arc::new(log));
        self.shared.state.advance(SessionState::OutputReady)
    }

    /// `OutputReady -> VehicleSpawned`
    pub async fn spawn_vehicle(&mut self, config: &VehicleConfig) -> Result<()> {
        self.shared.state.check(SessionState::VehicleSpawned)?;
        let actor_id = self
            .factory
            .spawn_ego_vehicle(config)
            .await
            .map_err(RecorderError::Spawn)?;
        self.graph.register_vehicle(&config.id, actor_id);
        self.vehicle_id = Some(config.id.clone());
        self.shared.state.advance(SessionState::VehicleSpawned)
    }

    /// `VehicleSpawned -> SensorsArmed`: spawn, create the output directory
    /// and register the callback for each sensor.
    ///
    /// On failure the sensors spawned so far stay registered for teardown.
    pub async fn arm_sensors(&mut self, configs: &[SensorConfig]) -> Result<()> {
        self.shared.state.check(SessionState::SensorsArmed)?;
        let (Some(vehicle), Some(log)) = (self.graph.vehicle.clone(), self.log.clone()) else {
            return Err(RecorderError::InvalidTransition {
                from: self.state(),
                to: SessionState::SensorsArmed,
            });
        };

        // Checked up front so a bad id spawns nothing
        if let Some((config, reason)) = configs
            .iter()
            .find_map(|c| output_dir_problem(&c.id).map(|reason| (c, reason)))
        {
            let field = format!("sensor_id '{}'", config.id);
            return Err(ContractError::config_validation(field, reason).into());
        }

        let frames = FrameWriter::new(&self.root, self.options.sync_writes);
        for config in configs {
            let actor_id = self
                .factory
                .spawn_sensor(vehicle.actor_id, &vehicle.config_id, config)
                .await
                .map_err(RecorderError::Spawn)?;
            self.graph.register_sensor(&config.id, actor_id);

            frames.ensure_sensor_dir(&config.id)?;
            let source = self
                .factory
                .sensor_source(actor_id, config)
                .map_err(RecorderError::Spawn)?;

            let channel = Arc::new(SensorChannel::new(
                config.id.as_str().into(),
                config.sensor_type.clone(),
                frames.clone(),
                log.clone(),
                self.shared.clone(),
            ));
            let callback_channel = channel.clone();
            source.listen(Arc::new(move |packet| callback_channel.on_packet(packet)));

            self.sensors.push(ArmedSensor {
                actor_id,
                channel,
                source,
            });
        }

        observability::record_active_sensors(self.sensors.len());
        info!(sensors = self.sensors.len(), "sensors armed");
        self.shared.state.advance(SessionState::SensorsArmed)
    }

    /// `SensorsArmed -> Recording`: open the gate
    pub fn begin_recording(&mut self) -> Result<()> {
        self.shared.state.check(SessionState::Recording)?;
        self.started_at = Some(Instant::now());
        self.shared.state.advance(SessionState::Recording)?;
        info!(sensors = self.sensors.len(), "recording started");
        Ok(())
    }

    /// Wait until `duration` has passed since `begin_recording`, `interrupt`
    /// resolves, or a callback faults.
    pub async fn await_end<F>(&mut self, duration: Duration, interrupt: F) -> Result<RecordingEnd>
    where
        F: Future<Output = ()>,
    {
        let state = self.state();
        if state != SessionState::Recording {
            return Err(RecorderError::InvalidTransition {
                from: state,
                to: SessionState::Finalized,
            });
        }

        let started = self.started_at.unwrap_or_else(Instant::now);
        let deadline = (duration < UNBOUNDED_WINDOW)
            .then(|| started.checked_add(duration))
            .flatten()
            .map(tokio::time::Instant::from_std);
        let expiry = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(expiry);
        let shared = self.shared.clone();
        let interval = self.options.progress_interval.max(Duration::from_millis(10));
        let mut progress = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        progress.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(interrupt);

        let end = loop {
            if shared.fault.is_raised() {
                break RecordingEnd::Faulted;
            }
            tokio::select! {
                _ = &mut expiry => break RecordingEnd::Completed,
                _ = &mut interrupt => {
                    info!("interrupt received, ending recording early");
                    break RecordingEnd::Interrupted;
                }
                _ = shared.fault.wait() => break RecordingEnd::Faulted,
                _ = progress.tick() => {
                    info!(
                        elapsed_sec = format_args!("{:.1}", started.elapsed().as_secs_f64()),
                        duration_sec = duration.as_secs_f64(),
                        frames = shared.recorded.load(Ordering::Relaxed),
                        "recording"
                    );
                }
            }
        };

        self.end = Some(end);
        info!(end = end.as_str(), "recording window closed");
        Ok(end)
    }

    /// `begin_recording` + `await_end`
    pub async fn record<F>(&mut self, duration: Duration, interrupt: F) -> Result<RecordingEnd>
    where
        F: Future<Output = ()>,
    {
        self.begin_recording()?;
        self.await_end(duration, interrupt).await
    }

    /// Close the gate, write the manifest (if recording started), stop and
    /// destroy every actor, close the log.
    ///
    /// Safe from any state. The first call does the work; later calls return
    /// the same report. An error here means the manifest or log could not be
    /// written; teardown has still run.
    #[instrument(name = "recording_session_finalize", skip(self), fields(root = %self.root.display()))]
    pub async fn finalize(&mut self) -> Result<SessionReport> {
        if let Some(report) = &self.report {
            return Ok(report.clone());
        }

        let previous = self.shared.state.finalize();
        let duration = self
            .started_at
            .map(|started| started.elapsed())
            .unwrap_or_default();

        // Each summary takes the sensor's lock, so in-flight records land first
        let sensors: Vec<SensorSummary> =
            self.sensors.iter().map(|s| s.channel.summary()).collect();

        let mut first_error = None;
        let mut manifest_path = None;
        if self.started_at.is_some() {
            let entries: BTreeMap<String, ManifestSensor> = sensors
                .iter()
                .map(|s| {
                    (
                        s.sensor_id.clone(),
                        ManifestSensor {
                            sensor_type: s.sensor_type.clone(),
                            frame_count: s.frame_count,
                        },
                    )
                })
                .collect();
            let manifest = Manifest::new(self.server_version.as_deref(), duration, entries);
            match manifest.write(&self.root) {
                Ok(path) => manifest_path = Some(path),
                Err(e) => {
                    error!(error = %e, "failed to write manifest");
                    first_error = Some(e);
                }
            }
        }

        for sensor in &self.sensors {
            sensor.source.stop();
        }
        let failures = self.factory.teardown(&self.graph).await;
        if failures > 0 {
            warn!(failures, "some actors could not be destroyed");
        }
        self.graph.clear();

        if let Some(log) = self.log.take() {
            if let Err(e) = log.close() {
                error!(error = %e, "failed to close metadata log");
                first_error.get_or_insert(e);
            }
        }

        observability::record_active_sensors(0);
        observability::record_session_duration(duration.as_secs_f64());

        let end = self.end.or_else(|| {
            (previous == SessionState::Recording).then(|| {
                if self.shared.fault.is_raised() {
                    RecordingEnd::Faulted
                } else {
                    RecordingEnd::Interrupted
                }
            })
        });
        let report = SessionReport {
            end,
            duration,
            manifest_path,
            sensors,
            dropped_callbacks: self.shared.dropped.load(Ordering::Relaxed),
        };
        info!(
            previous_state = %previous,
            frames = report.total_frames(),
            dropped = report.dropped_callbacks,
            duration_sec = duration.as_secs_f64(),
            "session finalized"
        );
        self.report = Some(report.clone());

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// The whole lifecycle for the blueprint's first vehicle.
    ///
    /// `finalize` runs whichever phase fails. `interrupt` is watched from the
    /// first setup step on; if it resolves before `Recording`, setup stops and
    /// the report has no `end`. A callback fault is returned as the error once
    /// teardown is done.
    pub async fn run<F>(
        &mut self,
        blueprint: &WorldBlueprint,
        duration: Duration,
        interrupt: F,
    ) -> Result<SessionReport>
    where
        F: Future<Output = ()>,
    {
        let outcome = self.run_phases(blueprint, duration, interrupt).await;
        let finalized = self.finalize().await;

        match outcome {
            Err(e) => {
                if let Err(fin) = finalized {
                    error!(error = %fin, "finalize after failed setup also failed");
                }
                Err(e)
            }
            Ok(end) => {
                let report = finalized?;
                if end == Some(RecordingEnd::Faulted) {
                    if let Some(fault) = self.shared.fault.take() {
                        return Err(fault);
                    }
                }
                Ok(report)
            }
        }
    }

    async fn run_phases<F>(
        &mut self,
        blueprint: &WorldBlueprint,
        duration: Duration,
        interrupt: F,
    ) -> Result<Option<RecordingEnd>>
    where
        F: Future<Output = ()>,
    {
        let vehicle = blueprint.ego_vehicle().ok_or_else(|| {
            ContractError::config_validation("vehicles", "at least one vehicle is required")
        })?;
        if blueprint.vehicles.len() > 1 {
            warn!(
                vehicles = blueprint.vehicles.len(),
                recorded = %vehicle.id,
                "only the first vehicle is recorded"
            );
        }

        let world = &blueprint.world;
        let timeout = Duration::try_from_secs_f64(world.timeout_sec).map_err(|e| {
            ContractError::config_validation(
                "world.timeout_sec",
                format!("{} is not a usable timeout: {e}", world.timeout_sec),
            )
        })?;

        tokio::pin!(interrupt);
        let connected = unless_interrupted(
            self.connect(&world.carla_host, world.carla_port, timeout),
            &mut interrupt,
        );
        if connected.await?.is_none() {
            return Ok(None);
        }
        self.check_map(world.map.as_deref());
        self.prepare_output()?;
        if unless_interrupted(self.spawn_vehicle(vehicle), &mut interrupt)
            .await?
            .is_none()
        {
            return Ok(None);
        }
        if unless_interrupted(self.arm_sensors(&vehicle.sensors), &mut interrupt)
            .await?
            .is_none()
        {
            return Ok(None);
        }
        self.record(duration, interrupt).await.map(Some)
    }
}

/// Run one setup step, giving up on it if `interrupt` resolves first
async fn unless_interrupted<T, F>(
    step: impl Future<Output = Result<T>>,
    interrupt: &mut Pin<&mut F>,
) -> Result<Option<T>>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = interrupt.as_mut() => {
            info!("interrupt received during setup, skipping remaining steps");
            Ok(None)
        }
        out = step => out.map(Some),
    }
}

impl<C: CarlaClient> Drop for RecordingSession<C> {
    fn drop(&mut self) {
        if self.report.is_some() {
            return;
        }
        self.shared.state.finalize();
        for sensor in &self.sensors {
            sensor.source.stop();
        }
        if !self.graph.is_empty() {
            let sensor_actors: Vec<ActorId> = self.sensors.iter().map(|s| s.actor_id).collect();
            warn!(
                vehicle = ?self.vehicle_id,
                sensor_actors = ?sensor_actors,
                "recording session dropped without finalize, simulator actors left alive"
            );
        }
    }
}
