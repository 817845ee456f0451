//! `record` command implementation.

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

use contracts::WorldBlueprint;
use recorder::{RecorderOptions, RecordingEnd, RecordingSession, SessionReport};

use crate::cli::RecordArgs;

/// Execute the `record` command
pub async fn run_record(args: &RecordArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let duration = recording_duration(args.duration)?;

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    apply_overrides(&mut blueprint, args)?;

    for warning in config_loader::ConfigLoader::warnings(&blueprint) {
        warn!("{warning}");
    }

    info!(
        host = %blueprint.world.carla_host,
        port = blueprint.world.carla_port,
        sensors = blueprint.ego_vehicle().map_or(0, |v| v.sensors.len()),
        output = %args.output.display(),
        duration_sec = duration.as_secs_f64(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_plan(&blueprint, args, duration);
        return Ok(());
    }

    // Registered before the first simulator call
    let interrupt = install_shutdown_signal()?;

    let options = RecorderOptions {
        sync_writes: !args.no_sync,
        ..Default::default()
    };
    let mut session = RecordingSession::new(new_client(), &args.output, options);

    let report = session
        .run(&blueprint, duration, interrupt)
        .await
        .context("Recording failed")?;

    match report.end {
        Some(RecordingEnd::Interrupted) => {
            warn!("Recording interrupted before the configured duration")
        }
        None => warn!("Interrupted during setup, nothing was recorded"),
        _ => {}
    }
    print_report(&report);

    info!("CARLA Recorder finished");
    Ok(())
}

/// Longest accepted `--duration`, 30 days
const MAX_DURATION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

fn recording_duration(secs: f64) -> Result<Duration> {
    let duration = Duration::try_from_secs_f64(secs)
        .with_context(|| format!("Invalid duration: {secs}"))?;
    if duration > MAX_DURATION {
        anyhow::bail!(
            "--duration {secs} exceeds the maximum of {}s",
            MAX_DURATION.as_secs()
        );
    }
    Ok(duration)
}

fn apply_overrides(blueprint: &mut WorldBlueprint, args: &RecordArgs) -> Result<()> {
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding CARLA host from CLI");
        blueprint.world.carla_host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port, "Overriding CARLA port from CLI");
        blueprint.world.carla_port = port;
    }
    if let Some(timeout) = args.timeout {
        info!(timeout, "Overriding connection timeout from CLI");
        blueprint.world.timeout_sec = timeout;
    }
    config_loader::ConfigLoader::validate(blueprint).context("Invalid CLI override")?;
    Ok(())
}

#[cfg(feature = "real-carla")]
fn new_client() -> actor_factory::RealCarlaClient {
    actor_factory::RealCarlaClient::new()
}

#[cfg(not(feature = "real-carla"))]
fn new_client() -> actor_factory::MockCarlaClient {
    warn!("Built without `real-carla`: recording synthetic data from mock sensors");
    actor_factory::MockCarlaClient::new()
}

/// Start listening for Ctrl+C and SIGTERM now; the returned future resolves
/// once either arrives.
#[cfg(unix)]
fn install_shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    // Registration happens here, not on first poll
    let mut interrupt =
        signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    let notify = Arc::new(Notify::new());
    let trigger = notify.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Ctrl+C received, shutting down"),
            _ = terminate.recv() => info!("SIGTERM received, shutting down"),
        }
        trigger.notify_one();
    });

    Ok(async move { notify.notified().await })
}

#[cfg(not(unix))]
fn install_shutdown_signal() -> Result<impl Future<Output = ()>> {
    let notify = Arc::new(Notify::new());
    let trigger = notify.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received, shutting down");
                trigger.notify_one();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });

    Ok(async move { notify.notified().await })
}

fn print_plan(blueprint: &WorldBlueprint, args: &RecordArgs, duration: Duration) {
    println!("\n=== Recording Plan ===\n");
    println!(
        "CARLA:    {}:{} (timeout {}s)",
        blueprint.world.carla_host, blueprint.world.carla_port, blueprint.world.timeout_sec
    );
    if let Some(ref map) = blueprint.world.map {
        println!("Map:      {map}");
    }
    println!("Output:   {}", args.output.display());
    println!("Duration: {:.1}s", duration.as_secs_f64());

    if let Some(vehicle) = blueprint.ego_vehicle() {
        println!("\nVehicle {} ({}):", vehicle.id, vehicle.blueprint);
        for sensor in &vehicle.sensors {
            println!(
                "  - {:<20} {:<10} {}",
                sensor.id,
                sensor.sensor_type.as_str(),
                sensor.sensor_type.blueprint()
            );
        }
    }
    println!();
}

fn print_report(report: &SessionReport) {
    println!("\n=== Recording Summary ===\n");
    println!(
        "Ended:    {}",
        report.end.map_or("before recording", RecordingEnd::as_str)
    );
    println!("Duration: {:.2}s", report.duration.as_secs_f64());
    if let Some(ref path) = report.manifest_path {
        println!("Manifest: {}", path.display());
    }

    println!(
        "\n  {:<20} {:<12} {:>8}  latency",
        "sensor", "type", "frames"
    );
    for sensor in &report.sensors {
        println!(
            "  {:<20} {:<12} {:>8}  {}",
            sensor.sensor_id, sensor.sensor_type, sensor.frame_count, sensor.latency_ms
        );
    }
    println!(
        "\n  total frames: {}, dropped callbacks: {}",
        report.total_frames(),
        report.dropped_callbacks
    );
    println!();
}
