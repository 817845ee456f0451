//! Configuration validation
//!
//! Rules:
//! - at least one vehicle
//! - vehicle_id unique
//! - sensor_id unique (globally) and usable as a single directory name
//! - frequency_hz > 0 when given
//! - 0 < world.timeout_sec <= MAX_TIMEOUT_SEC

use std::collections::HashSet;

use contracts::{output_dir_problem, ContractError, WorldBlueprint};

/// Upper bound for `world.timeout_sec`, one hour
pub const MAX_TIMEOUT_SEC: f64 = 3600.0;

/// Validate a WorldBlueprint
///
/// Returns the first error encountered.
pub fn validate(blueprint: &WorldBlueprint) -> Result<(), ContractError> {
    validate_world(blueprint)?;
    validate_vehicles(blueprint)?;
    validate_sensor_ids(blueprint)?;
    validate_sensor_frequencies(blueprint)?;
    Ok(())
}

/// Non-fatal findings worth reporting before a recording starts
pub fn warnings(blueprint: &WorldBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.vehicles.len() > 1 {
        warnings.push(format!(
            "{} vehicles configured - only '{}' will be recorded",
            blueprint.vehicles.len(),
            blueprint.vehicles[0].id
        ));
    }

    for vehicle in &blueprint.vehicles {
        if vehicle.sensors.is_empty() {
            warnings.push(format!("Vehicle '{}' has no sensors configured", vehicle.id));
        }
    }

    for sensor in blueprint.all_sensors() {
        if !sensor.sensor_type.is_known() {
            warnings.push(format!(
                "Sensor '{}' has unrecognized type '{}' - records will carry common fields only",
                sensor.id, sensor.sensor_type
            ));
        }
    }

    warnings
}

fn validate_world(blueprint: &WorldBlueprint) -> Result<(), ContractError> {
    let timeout = blueprint.world.timeout_sec;
    if !(timeout > 0.0 && timeout <= MAX_TIMEOUT_SEC) {
        return Err(ContractError::config_validation(
            "world.timeout_sec",
            format!("timeout_sec must be in (0, {MAX_TIMEOUT_SEC}], got {timeout}"),
        ));
    }
    Ok(())
}

fn validate_vehicles(blueprint: &WorldBlueprint) -> Result<(), ContractError> {
    if blueprint.vehicles.is_empty() {
        return Err(ContractError::config_validation(
            "vehicles",
            "at least one vehicle is required",
        ));
    }

    let mut seen = HashSet::new();
    for vehicle in &blueprint.vehicles {
        if !seen.insert(&vehicle.id) {
            return Err(ContractError::config_validation(
                format!("vehicles[id={}]", vehicle.id),
                "duplicate vehicle_id",
            ));
        }
        if vehicle.blueprint.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("vehicles[{}].blueprint", vehicle.id),
                "blueprint cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_sensor_ids(blueprint: &WorldBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for vehicle in &blueprint.vehicles {
        for sensor in &vehicle.sensors {
            let field = format!("vehicles[{}].sensors[id={}]", vehicle.id, sensor.id);
            if let Some(reason) = output_dir_problem(&sensor.id) {
                return Err(ContractError::config_validation(field, reason));
            }
            if !seen.insert(&sensor.id) {
                return Err(ContractError::config_validation(field, "duplicate sensor_id"));
            }
        }
    }
    Ok(())
}

fn validate_sensor_frequencies(blueprint: &WorldBlueprint) -> Result<(), ContractError> {
    for vehicle in &blueprint.vehicles {
        for sensor in &vehicle.sensors {
            if let Some(hz) = sensor.frequency_hz {
                if hz <= 0.0 || !hz.is_finite() {
                    return Err(ContractError::config_validation(
                        format!(
                            "vehicles[{}].sensors[{}].frequency_hz",
                            vehicle.id, sensor.id
                        ),
                        format!("frequency_hz must be > 0, got {hz}"),
                    ));
                }
            }
        }
    }
    Ok(())
}
