//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    carla: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    map: Option<String>,
    vehicle_count: usize,
    sensor_count: usize,
}

impl ValidationResult {
    fn invalid(config_path: String, error: String) -> Self {
        Self {
            valid: false,
            config_path,
            error: Some(error),
            warnings: Vec::new(),
            summary: None,
        }
    }
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        let error = format!("File not found: {}", args.config.display());
        return ValidationResult::invalid(config_path, error);
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: config_loader::ConfigLoader::warnings(&blueprint),
            summary: Some(ConfigSummary {
                carla: format!(
                    "{}:{}",
                    blueprint.world.carla_host, blueprint.world.carla_port
                ),
                map: blueprint.world.map.clone(),
                vehicle_count: blueprint.vehicles.len(),
                sensor_count: blueprint.all_sensors().count(),
            }),
        },
        Err(e) => ValidationResult::invalid(config_path, e.to_string()),
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  CARLA: {}", summary.carla);
            if let Some(ref map) = summary.map {
                println!("  Map: {}", map);
            }
            println!("  Vehicles: {}", summary.vehicle_count);
            println!("  Sensors: {}", summary.sensor_count);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
