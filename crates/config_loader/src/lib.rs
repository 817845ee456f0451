//! # Config Loader
//!
//! Loads the recording configuration: simulator endpoint, ego vehicle and the
//! sensors to record.
//!
//! Responsibilities:
//! - Parse JSON/TOML configuration files
//! - Validate ids, frequencies and timeouts
//! - Generate `WorldBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("config/recorder.example.json")).unwrap();
//! println!("CARLA at {}:{}", blueprint.world.carla_host, blueprint.world.carla_port);
//! ```

mod parser;
mod validator;

pub use contracts::WorldBlueprint;
pub use parser::ConfigFormat;
pub use validator::MAX_TIMEOUT_SEC;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Format is chosen by extension (.json / .toml).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<WorldBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<WorldBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Re-check a blueprint changed after loading (e.g. by CLI overrides)
    pub fn validate(blueprint: &WorldBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Non-fatal configuration findings
    pub fn warnings(blueprint: &WorldBlueprint) -> Vec<String> {
        validator::warnings(blueprint)
    }

    /// Serialize WorldBlueprint to JSON string
    pub fn to_json(blueprint: &WorldBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RECORDER_JSON: &str = r#"{
        "world": { "carla_host": "localhost", "carla_port": 2000 },
        "vehicles": [{
            "id": "ego",
            "blueprint": "vehicle.tesla.model3",
            "sensors": [
                {
                    "id": "rgb_camera",
                    "sensor_type": "camera",
                    "transform": {
                        "location": { "x": 1.5, "y": 0.0, "z": 2.4 },
                        "rotation": { "pitch": 0.0, "yaw": 0.0, "roll": 0.0 }
                    }
                },
                {
                    "id": "gnss",
                    "sensor_type": "gnss",
                    "transform": {
                        "location": { "x": 0.0, "y": 0.0, "z": 0.0 },
                        "rotation": { "pitch": 0.0, "yaw": 0.0, "roll": 0.0 }
                    }
                }
            ]
        }]
    }"#;

    #[test]
    fn test_load_from_str_json() {
        let bp = ConfigLoader::load_from_str(RECORDER_JSON, ConfigFormat::Json).unwrap();
        assert_eq!(bp.vehicles[0].sensors.len(), 2);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(RECORDER_JSON, ConfigFormat::Json).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.vehicles[0].sensors[1].id, bp2.vehicles[0].sensors[1].id);
        assert_eq!(
            bp.vehicles[0].sensors[0].sensor_type,
            bp2.vehicles[0].sensors[0].sensor_type
        );
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(RECORDER_JSON.as_bytes())
            .unwrap();

        let bp = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(bp.world.carla_port, 2000);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ConfigLoader::load_from_path(Path::new("config.yaml")).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_huge_timeout_rejected() {
        let content = RECORDER_JSON.replace(
            r#""carla_port": 2000 }"#,
            r#""carla_port": 2000, "timeout_sec": 1e30 }"#,
        );
        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Json).unwrap_err();
        assert!(matches!(
            err,
            ContractError::ConfigValidation { ref field, .. } if field == "world.timeout_sec"
        ));

        let mut bp = ConfigLoader::load_from_str(RECORDER_JSON, ConfigFormat::Json).unwrap();
        bp.world.timeout_sec = MAX_TIMEOUT_SEC * 2.0;
        assert!(ConfigLoader::validate(&bp).is_err());
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"{ "world": {}, "vehicles": [] }"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Json);
        assert!(matches!(
            result,
            Err(ContractError::ConfigValidation { .. })
        ));
    }
}
