use std::time::Duration;

use actor_factory::{ActorFactoryError, MockCarlaClient, MockConfig};
use contracts::{ContractError, SensorSource, WorldBlueprint, WorldConfig};
use recorder::{RecorderError, RecordingEnd, RecordingSession, SessionState, MANIFEST_FILE_NAME};

use crate::support::*;

fn blueprint(timeout_sec: f64, sensors: Vec<contracts::SensorConfig>) -> WorldBlueprint {
    WorldBlueprint {
        version: Default::default(),
        world: WorldConfig {
            map: None,
            carla_host: "localhost".into(),
            carla_port: 2000,
            timeout_sec,
        },
        vehicles: vec![vehicle(sensors)],
    }
}

#[tokio::test]
async fn connection_failure_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("never");
    let client = MockCarlaClient::with_config(MockConfig {
        fail_connect: true,
        ..MockConfig::manual()
    });
    let mut session = RecordingSession::new(client.clone(), &root, options(true));

    let err = session
        .run(
            &blueprint(1.0, vec![sensor("cam", "camera")]),
            Duration::from_secs(1),
            std::future::pending(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RecorderError::Connect(_)));
    assert!(!root.exists());
    assert_eq!(session.state(), SessionState::Finalized);
    assert_eq!(client.actor_count(), 0);
}

#[tokio::test]
async fn connection_timeout_is_a_connect_error() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("never");
    let client = MockCarlaClient::with_config(MockConfig {
        connect_delay: Some(Duration::from_secs(5)),
        ..MockConfig::manual()
    });
    let mut session = RecordingSession::new(client, &root, options(true));

    let err = session
        .run(
            &blueprint(0.05, vec![sensor("imu", "imu")]),
            Duration::from_secs(1),
            std::future::pending(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RecorderError::Connect(ActorFactoryError::ConnectionTimeout { port: 2000, .. })
    ));
    assert!(!root.exists());
}

#[tokio::test]
async fn interrupt_during_connect_skips_setup() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("never");
    let client = MockCarlaClient::with_config(MockConfig {
        connect_delay: Some(Duration::from_secs(30)),
        ..MockConfig::manual()
    });
    let mut session = RecordingSession::new(client.clone(), &root, options(true));

    let started = std::time::Instant::now();
    let report = session
        .run(
            &blueprint(60.0, vec![sensor("imu", "imu")]),
            Duration::from_secs(60),
            tokio::time::sleep(Duration::from_millis(20)),
        )
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.end, None);
    assert!(report.manifest_path.is_none());
    assert_eq!(session.state(), SessionState::Finalized);
    assert!(!client.is_connected());
    assert_eq!(client.actor_count(), 0);
    assert!(!root.exists());
}

#[tokio::test]
async fn unusable_timeout_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("never");
    let client = MockCarlaClient::with_config(MockConfig::manual());
    let mut session = RecordingSession::new(client.clone(), &root, options(true));

    // Built directly, so no loader validation ran
    let err = session
        .run(
            &blueprint(1e30, vec![sensor("imu", "imu")]),
            Duration::from_secs(1),
            std::future::pending(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RecorderError::Config(ContractError::ConfigValidation { ref field, .. })
            if field == "world.timeout_sec"
    ));
    assert_eq!(session.state(), SessionState::Finalized);
    assert!(!client.is_connected());
    assert!(!root.exists());
}

#[tokio::test]
async fn sensor_spawn_failure_tears_down_spawned_actors() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let client = MockCarlaClient::with_config(MockConfig {
        fail_blueprints: vec!["sensor.other.radar".into()],
        ..MockConfig::manual()
    });
    let mut session = RecordingSession::new(client.clone(), &root, options(true));

    let err = session
        .run(
            &blueprint(
                1.0,
                vec![
                    sensor("front_camera", "camera"),
                    sensor("front_radar", "radar"),
                    sensor("imu", "imu"),
                ],
            ),
            Duration::from_secs(1),
            std::future::pending(),
        )
        .await
        .unwrap_err();

    match err {
        RecorderError::Spawn(ActorFactoryError::SensorSpawnFailed {
            sensor_id,
            vehicle_id,
            ..
        }) => {
            assert_eq!(sensor_id, "front_radar");
            assert_eq!(vehicle_id, "ego");
        }
        other => panic!("unexpected error: {other}"),
    }

    // Vehicle 1000, camera 1001; the radar never existed
    assert_eq!(client.actor_count(), 0);
    assert_eq!(client.destroyed_actors(), vec![1001, 1000]);
    assert!(!mock(&client, "front_camera").is_listening());
    assert!(client.mock_sensor("imu").is_none());

    assert!(!root.join(MANIFEST_FILE_NAME).exists());
    assert!(read_log(&root).is_empty());
}

#[tokio::test]
async fn vehicle_spawn_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let client = MockCarlaClient::with_config(MockConfig {
        fail_blueprints: vec![EGO_BLUEPRINT.into()],
        ..MockConfig::manual()
    });
    let mut session = RecordingSession::new(client.clone(), dir.path(), options(true));

    let err = session
        .run(
            &blueprint(1.0, vec![sensor("imu", "imu")]),
            Duration::from_secs(1),
            std::future::pending(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RecorderError::Spawn(ActorFactoryError::VehicleSpawnFailed { ref vehicle_id, .. })
            if vehicle_id == "ego"
    ));
    assert_eq!(client.actor_count(), 0);
    assert!(client.destroyed_actors().is_empty());
}

#[tokio::test]
async fn existing_frame_file_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let stale = root.join("cam/frame_000001.bin");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, b"stale").unwrap();

    let (mut session, client) =
        armed(&root, vec![sensor("cam", "camera"), sensor("gnss", "gnss")], true).await;
    session.begin_recording().unwrap();

    assert!(mock(&client, "cam").emit(0.1, image(2, 2, bgra(2, 2, 9))));
    let end = session
        .await_end(Duration::from_secs(10), std::future::pending())
        .await
        .unwrap();
    assert_eq!(end, RecordingEnd::Faulted);

    // The gate is closed for every sensor once finalized
    let report = session.finalize().await.unwrap();
    assert!(!mock(&client, "gnss").emit(0.2, gnss(1.0)));

    assert_eq!(std::fs::read(&stale).unwrap(), b"stale");
    assert_eq!(report.end, Some(RecordingEnd::Faulted));
    assert_eq!(report.total_frames(), 0);
    assert!(read_log(&root).is_empty());
    assert!(root.join(MANIFEST_FILE_NAME).exists());
}

#[tokio::test]
async fn run_returns_the_write_fault_after_teardown() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    std::fs::create_dir_all(root.join("lidar")).unwrap();
    std::fs::write(root.join("lidar/frame_000001.bin"), b"x").unwrap();

    let client = MockCarlaClient::with_config(MockConfig {
        sensor_mode: actor_factory::MockSensorMode::Periodic(actor_factory::MockSensorConfig {
            frequency_hz: 100.0,
            lidar_points: 4,
            ..Default::default()
        }),
        ..MockConfig::default()
    });
    let mut session = RecordingSession::new(client.clone(), &root, options(false));

    let err = session
        .run(
            &blueprint(1.0, vec![sensor("lidar", "lidar")]),
            Duration::from_secs(10),
            std::future::pending(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RecorderError::Io { .. }), "{err}");
    assert_eq!(session.state(), SessionState::Finalized);
    assert_eq!(client.actor_count(), 0);
    assert!(root.join(MANIFEST_FILE_NAME).exists());
}

#[tokio::test]
async fn teardown_continues_past_destroy_failure() {
    let dir = tempfile::tempdir().unwrap();
    // 1000 is the vehicle, 1001 the first sensor
    let config = MockConfig {
        fail_destroy: vec![1001],
        ..MockConfig::manual()
    };
    let (mut session, client) = armed_with(
        config,
        dir.path(),
        vec![sensor("imu", "imu"), sensor("gnss", "gnss")],
        true,
    )
    .await;

    let report = session.finalize().await.unwrap();
    assert_eq!(report.end, None);
    assert_eq!(client.all_actor_ids(), vec![1001]);
    assert_eq!(client.destroyed_actors(), vec![1002, 1000]);

    // Second call is a no-op
    session.finalize().await.unwrap();
    assert_eq!(client.destroyed_actors(), vec![1002, 1000]);
}

#[tokio::test]
async fn dropping_an_unfinalized_session_stops_sources() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, client) = armed(dir.path(), vec![sensor("imu", "imu")], false).await;
    session.begin_recording().unwrap();
    let imu_sensor = mock(&client, "imu");
    assert!(imu_sensor.emit(0.0, imu(0.0)));

    drop(session);
    assert!(!imu_sensor.is_listening());
    assert!(!imu_sensor.emit(1.0, imu(1.0)));
    assert_eq!(read_log(dir.path()).len(), 1);
}
