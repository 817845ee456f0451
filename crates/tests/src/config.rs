use config_loader::{ConfigFormat, ConfigLoader};
use contracts::SensorType;

const EXAMPLE_CONFIG: &str = include_str!("../../../config/recorder.example.json");

#[test]
fn example_config_loads_cleanly() {
    let blueprint = ConfigLoader::load_from_str(EXAMPLE_CONFIG, ConfigFormat::Json).unwrap();
    assert!(ConfigLoader::warnings(&blueprint).is_empty());

    let ego = blueprint.ego_vehicle().unwrap();
    assert_eq!(ego.id, "ego");
    let types: Vec<&SensorType> = ego.sensors.iter().map(|s| &s.sensor_type).collect();
    assert_eq!(
        types,
        vec![
            &SensorType::Camera,
            &SensorType::Lidar,
            &SensorType::Imu,
            &SensorType::Gnss,
            &SensorType::Radar
        ]
    );

    let camera = &ego.sensors[0].blueprint_attributes();
    assert_eq!(camera["image_size_x"], "800");
    assert_eq!(camera["sensor_tick"], "0.05");
}

#[test]
fn json_round_trip_preserves_blueprint() {
    let blueprint = ConfigLoader::load_from_str(EXAMPLE_CONFIG, ConfigFormat::Json).unwrap();
    let json = ConfigLoader::to_json(&blueprint).unwrap();
    let reloaded = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();

    assert_eq!(reloaded.world.map.as_deref(), Some("Town01"));
    assert_eq!(reloaded.all_sensors().count(), 5);
    assert_eq!(
        reloaded.ego_vehicle().unwrap().sensors[1].attributes["channels"],
        "32"
    );
}
