use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use actor_factory::{MockCarlaClient, MockConfig, MockSensorConfig, MockSensorMode};
use config_loader::{ConfigFormat, ConfigLoader};
use contracts::{SensorPayload, SensorSource};
use recorder::{Manifest, RecordingEnd, RecordingSession, SessionState, MANIFEST_FILE_NAME};

use crate::support::*;

#[tokio::test]
async fn camera_and_gnss_interleaved() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("session");
    let (mut session, client) = armed(
        &root,
        vec![sensor("front_camera", "camera"), sensor("gnss", "gnss")],
        true,
    )
    .await;
    session.begin_recording().unwrap();

    let camera = mock(&client, "front_camera");
    let gnss_sensor = mock(&client, "gnss");
    let mut images = Vec::new();
    for (step, kind) in "cgcgcgcc".chars().enumerate() {
        let timestamp = step as f64 * 0.05;
        if kind == 'c' {
            let data = bgra(64, 48, step as u8);
            images.push(data.clone());
            assert!(camera.emit(timestamp, image(64, 48, data)));
        } else {
            assert!(gnss_sensor.emit(timestamp, gnss(step as f64)));
        }
    }

    let end = session
        .await_end(Duration::ZERO, std::future::pending())
        .await
        .unwrap();
    assert_eq!(end, RecordingEnd::Completed);
    let report = session.finalize().await.unwrap();
    assert_eq!(report.total_frames(), 8);
    assert_eq!(report.dropped_callbacks, 0);

    // Five frame files, byte-identical to the callback buffers
    for (index, expected) in images.iter().enumerate() {
        let path = root.join(format!("front_camera/frame_{:06}.bin", index + 1));
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written.len(), 12288);
        assert_eq!(&written[..], &expected[..]);
    }
    assert!(!root.join("front_camera/frame_000006.bin").exists());
    assert_eq!(dir_entries(&root.join("front_camera")), 5);
    assert_eq!(dir_entries(&root.join("gnss")), 0);

    let records = read_log(&root);
    assert_eq!(records.len(), 8);
    assert_eq!(frame_ids(&records, "front_camera"), vec![1, 2, 3, 4, 5]);
    assert_eq!(frame_ids(&records, "gnss"), vec![1, 2, 3]);

    for record in &records {
        match record["sensor_type"].as_str().unwrap() {
            "camera" => {
                assert_eq!(record["width"], 64);
                assert_eq!(record["height"], 48);
                assert_eq!(record["format"], "bgra8");
                let data_file = record["data_file"].as_str().unwrap();
                let meta = std::fs::metadata(root.join(data_file)).unwrap();
                assert!(meta.len() > 0);
            }
            "gnss" => {
                assert!(record["latitude"].is_f64());
                assert!(record["altitude"].is_f64());
                assert!(record.get("data_file").is_none());
            }
            other => panic!("unexpected sensor type {other}"),
        }
    }

    let manifest = Manifest::load(&root.join(MANIFEST_FILE_NAME)).unwrap();
    assert_eq!(manifest.version, "1.0");
    assert_eq!(manifest.carla_version, "0.9.15");
    assert_eq!(manifest.sensors["front_camera"].frame_count, 5);
    assert_eq!(manifest.sensors["front_camera"].sensor_type, "camera");
    assert_eq!(manifest.sensors["gnss"].frame_count, 3);
    assert_eq!(report.manifest_path.as_deref(), Some(root.join(MANIFEST_FILE_NAME).as_path()));
}

#[tokio::test]
async fn interrupt_after_two_of_ten_callbacks() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let (mut session, client) = armed(&root, vec![sensor("imu", "imu")], true).await;
    session.begin_recording().unwrap();

    let imu_sensor = mock(&client, "imu");
    let (interrupt_tx, interrupt_rx) = tokio::sync::oneshot::channel::<()>();
    let (resume_tx, resume_rx) = mpsc::channel::<()>();

    let emitter = thread::spawn(move || {
        let mut interrupt_tx = Some(interrupt_tx);
        let mut delivered = 0;
        for step in 0..10 {
            if step == 2 {
                interrupt_tx.take().unwrap().send(()).unwrap();
                resume_rx.recv().unwrap();
            }
            if imu_sensor.emit(step as f64 * 0.01, imu(step as f64)) {
                delivered += 1;
            }
        }
        delivered
    });

    let end = session
        .await_end(Duration::from_secs(10), async {
            interrupt_rx.await.ok();
        })
        .await
        .unwrap();
    assert_eq!(end, RecordingEnd::Interrupted);

    let report = session.finalize().await.unwrap();
    resume_tx.send(()).unwrap();
    // The source was stopped during finalize
    assert_eq!(emitter.join().unwrap(), 2);

    assert_eq!(report.end, Some(RecordingEnd::Interrupted));
    assert!(report.duration < Duration::from_secs(10));

    let records = read_log(&root);
    assert_eq!(records.len(), 2);
    assert_eq!(frame_ids(&records, "imu"), vec![1, 2]);
    assert_eq!(records[1]["accelerometer"], serde_json::json!([1.0, 0.0, 9.81]));
    assert_eq!(records[1]["compass"], 1.57);

    let manifest = Manifest::load(&root.join(MANIFEST_FILE_NAME)).unwrap();
    assert_eq!(manifest.sensors["imu"].frame_count, 2);
    assert!(manifest.duration_sec < 10.0);
}

#[tokio::test]
async fn callbacks_before_start_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let (mut session, client) = armed(&root, vec![sensor("cam", "camera")], false).await;
    assert_eq!(session.state(), SessionState::SensorsArmed);

    let camera = mock(&client, "cam");
    for step in 0..3 {
        // Delivered to the callback, refused by the gate
        assert!(camera.emit(step as f64, image(4, 4, bgra(4, 4, step))));
    }
    assert!(read_log(&root).is_empty());
    assert_eq!(dir_entries(&root.join("cam")), 0);

    session.begin_recording().unwrap();
    assert!(camera.emit(3.0, image(4, 4, bgra(4, 4, 3))));
    session
        .await_end(Duration::ZERO, std::future::pending())
        .await
        .unwrap();
    let report = session.finalize().await.unwrap();

    assert_eq!(report.dropped_callbacks, 3);
    let records = read_log(&root);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["frame_id"], 1);
    assert_eq!(records[0]["timestamp"], 3.0);
    assert_eq!(dir_entries(&root.join("cam")), 1);
}

#[tokio::test]
async fn concurrent_callbacks_keep_per_sensor_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let (mut session, client) = armed(
        &root,
        vec![
            sensor("lidar_a", "lidar"),
            sensor("lidar_b", "lidar"),
            sensor("imu", "imu"),
            sensor("gnss", "gnss"),
        ],
        false,
    )
    .await;
    session.begin_recording().unwrap();

    // Two threads share lidar_a
    let plan = [
        ("lidar_a", 100),
        ("lidar_a", 100),
        ("lidar_b", 100),
        ("imu", 100),
        ("gnss", 100),
    ];
    thread::scope(|scope| {
        for (sensor_id, count) in plan {
            let source = mock(&client, sensor_id);
            scope.spawn(move || {
                for step in 0..count {
                    let payload = match source.sensor_type().as_str() {
                        "lidar" => point_cloud(8 + step % 5),
                        "imu" => imu(step as f64),
                        _ => gnss(step as f64),
                    };
                    assert!(source.emit(step as f64 * 0.01, payload));
                }
            });
        }
    });

    session
        .await_end(Duration::ZERO, std::future::pending())
        .await
        .unwrap();
    let report = session.finalize().await.unwrap();
    assert_eq!(report.total_frames(), 500);

    let records = read_log(&root);
    assert_eq!(records.len(), 500);

    let manifest = Manifest::load(&root.join(MANIFEST_FILE_NAME)).unwrap();
    for (sensor_id, expected) in [("lidar_a", 200), ("lidar_b", 100), ("imu", 100), ("gnss", 100)] {
        let ids = frame_ids(&records, sensor_id);
        assert_eq!(ids, (1..=expected).collect::<Vec<u64>>(), "{sensor_id}");
        assert_eq!(manifest.sensors[sensor_id].frame_count, expected);
    }

    for record in records.iter().filter(|r| r["sensor_type"] == "lidar") {
        let data_file = record["data_file"].as_str().unwrap();
        let len = std::fs::metadata(root.join(data_file)).unwrap().len();
        assert_eq!(len, record["num_points"].as_u64().unwrap() * 16);
        assert_eq!(record["point_stride"], 16);
    }
}

#[tokio::test]
async fn unrecognized_type_records_common_fields_only() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let (mut session, client) =
        armed(&root, vec![sensor("depth", "sensor.camera.depth")], false).await;

    let sensor_actor = client
        .all_actor_ids()
        .into_iter()
        .find(|&id| client.actor_blueprint(id).as_deref() == Some("sensor.camera.depth"));
    assert!(sensor_actor.is_some());

    session.begin_recording().unwrap();
    let depth = mock(&client, "depth");
    for step in 0..2 {
        let raw = SensorPayload::Raw(bytes::Bytes::from(vec![7u8; 32]));
        assert!(depth.emit(step as f64, raw));
    }
    session
        .await_end(Duration::ZERO, std::future::pending())
        .await
        .unwrap();
    session.finalize().await.unwrap();

    let records = read_log(&root);
    assert_eq!(records.len(), 2);
    for (index, record) in records.iter().enumerate() {
        let fields = record.as_object().unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(record["sensor_type"], "sensor.camera.depth");
        assert_eq!(record["frame_id"], index as u64 + 1);
    }
    assert_eq!(dir_entries(&root.join("depth")), 0);

    let manifest = Manifest::load(&root.join(MANIFEST_FILE_NAME)).unwrap();
    assert_eq!(manifest.sensors["depth"].sensor_type, "sensor.camera.depth");
    assert_eq!(manifest.sensors["depth"].frame_count, 2);
}

#[tokio::test]
async fn run_with_periodic_sensors() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("run");
    let client = MockCarlaClient::with_config(MockConfig {
        sensor_mode: MockSensorMode::Periodic(MockSensorConfig {
            frequency_hz: 50.0,
            image_width: 8,
            image_height: 6,
            lidar_points: 32,
            radar_detections: 3,
        }),
        ..MockConfig::default()
    });
    let transform = r#""transform": {"location": {"x": 0, "y": 0, "z": 2}, "rotation": {"pitch": 0, "yaw": 0, "roll": 0}}"#;
    let blueprint = ConfigLoader::load_from_str(
        &format!(
            r#"{{
                "world": {{"map": "Town01", "timeout_sec": 1.0}},
                "vehicles": [{{
                    "id": "ego",
                    "blueprint": "{EGO_BLUEPRINT}",
                    "sensors": [
                        {{"id": "cam", "sensor_type": "camera", {transform}}},
                        {{"id": "lidar", "sensor_type": "lidar", {transform}}},
                        {{"id": "radar", "sensor_type": "radar", {transform}}},
                        {{"id": "imu", "sensor_type": "imu", {transform}}}
                    ]
                }}]
            }}"#
        ),
        ConfigFormat::Json,
    )
    .unwrap();

    let mut session = RecordingSession::new(client.clone(), &root, options(false));
    let report = session
        .run(&blueprint, Duration::from_millis(300), std::future::pending())
        .await
        .unwrap();

    assert_eq!(report.end, Some(RecordingEnd::Completed));
    assert_eq!(session.state(), SessionState::Finalized);
    assert_eq!(client.actor_count(), 0);
    // Sensors first, vehicle last
    let destroyed = client.destroyed_actors();
    assert_eq!(destroyed.len(), 5);
    assert_eq!(destroyed.last(), Some(&1000));
    for id in ["cam", "lidar", "radar", "imu"] {
        assert!(!mock(&client, id).is_listening());
    }

    let records = read_log(&root);
    let manifest = Manifest::load(&root.join(MANIFEST_FILE_NAME)).unwrap();
    assert_eq!(manifest.total_frames(), records.len() as u64);
    assert!(manifest.total_frames() > 0);
    for (sensor_id, entry) in &manifest.sensors {
        let ids = frame_ids(&records, sensor_id);
        assert_eq!(ids, (1..=entry.frame_count).collect::<Vec<u64>>());
    }
    for record in &records {
        if let Some(data_file) = record.get("data_file").and_then(|v| v.as_str()) {
            assert!(std::fs::metadata(root.join(data_file)).unwrap().len() > 0);
        }
    }
    let radar = records.iter().find(|r| r["sensor_id"] == "radar").unwrap();
    assert_eq!(radar["num_detections"], 3);
}
