//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use contracts::{SensorConfig, WorldBlueprint};

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    world: WorldInfo,
    vehicles: Vec<VehicleInfo>,
}

#[derive(Serialize)]
struct WorldInfo {
    carla_host: String,
    carla_port: u16,
    timeout_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    map: Option<String>,
}

#[derive(Serialize)]
struct VehicleInfo {
    id: String,
    blueprint: String,
    autopilot: bool,
    recorded: bool,
    sensors: Vec<SensorInfo>,
}

#[derive(Serialize)]
struct SensorInfo {
    id: String,
    sensor_type: String,
    blueprint: String,
    writes_frames: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    attributes: HashMap<String, String>,
}

impl From<&SensorConfig> for SensorInfo {
    fn from(sensor: &SensorConfig) -> Self {
        Self {
            id: sensor.id.clone(),
            sensor_type: sensor.sensor_type.as_str().to_string(),
            blueprint: sensor.sensor_type.blueprint().to_string(),
            writes_frames: recorder::SensorEncoder::for_type(&sensor.sensor_type).writes_frames(),
            attributes: sensor.blueprint_attributes(),
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &WorldBlueprint) -> ConfigInfo {
    let vehicles = blueprint
        .vehicles
        .iter()
        .enumerate()
        .map(|(index, v)| VehicleInfo {
            id: v.id.clone(),
            blueprint: v.blueprint.clone(),
            autopilot: v.autopilot,
            recorded: index == 0,
            sensors: v.sensors.iter().map(SensorInfo::from).collect(),
        })
        .collect();

    ConfigInfo {
        world: WorldInfo {
            carla_host: blueprint.world.carla_host.clone(),
            carla_port: blueprint.world.carla_port,
            timeout_sec: blueprint.world.timeout_sec,
            map: blueprint.world.map.clone(),
        },
        vehicles,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("\n=== World ===");
    println!(
        "  CARLA: {}:{} (timeout {}s)",
        info.world.carla_host, info.world.carla_port, info.world.timeout_sec
    );
    match info.world.map {
        Some(ref map) => println!("  Map: {}", map),
        None => println!("  Map: (any)"),
    }

    for vehicle in &info.vehicles {
        println!(
            "\n=== Vehicle {} ({}){} ===",
            vehicle.id,
            vehicle.blueprint,
            if vehicle.recorded { "" } else { " [not recorded]" }
        );
        println!("  Autopilot: {}", vehicle.autopilot);
        for sensor in &vehicle.sensors {
            println!(
                "  - {:<20} {:<10} -> {}{}",
                sensor.id,
                sensor.sensor_type,
                sensor.blueprint,
                if sensor.writes_frames { "  [frames]" } else { "" }
            );
            let mut attributes: Vec<_> = sensor.attributes.iter().collect();
            attributes.sort();
            for (key, value) in attributes {
                println!("      {} = {}", key, value);
            }
        }
    }
    println!();
}
