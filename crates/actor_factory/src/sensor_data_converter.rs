//! CARLA sensor data conversion
//!
//! Turns CARLA native measurements into `SensorPacket`s.
//! Only compiled when `real-carla` feature is enabled.

use bytes::Bytes;
use carla::sensor::data::{
    GnssMeasurement, Image, ImuMeasurement, LidarMeasurement, RadarMeasurement,
};
use carla::sensor::{SensorData, SensorDataBase};
use contracts::{
    GnssData, ImageData, ImageFormat, ImuData, PointCloudData, RadarData, SensorId, SensorPacket,
    SensorPayload, SensorType, Vector3,
};

/// Copy a POD slice into `Bytes`
///
/// # Safety
/// `T` must be plain old data with no padding
#[inline]
unsafe fn pod_slice_to_bytes_unchecked<T>(slice: &[T]) -> Bytes {
    let ptr = slice.as_ptr() as *const u8;
    let len = std::mem::size_of_val(slice);
    Bytes::copy_from_slice(std::slice::from_raw_parts(ptr, len))
}

fn image_to_payload(image: &Image) -> SensorPayload {
    SensorPayload::Image(ImageData {
        width: image.width() as u32,
        height: image.height() as u32,
        format: ImageFormat::Bgra8,
        data: Bytes::copy_from_slice(image.as_raw_bytes()),
    })
}

fn lidar_to_payload(lidar: &LidarMeasurement) -> SensorPayload {
    // x, y, z, intensity: f32 each
    let data = unsafe { pod_slice_to_bytes_unchecked(lidar.as_slice()) };
    SensorPayload::PointCloud(PointCloudData { data })
}

fn imu_to_payload(imu: &ImuMeasurement) -> SensorPayload {
    let accel = imu.accelerometer();
    let gyro = imu.gyroscope();
    SensorPayload::Imu(ImuData {
        accelerometer: Vector3 {
            x: accel.x as f64,
            y: accel.y as f64,
            z: accel.z as f64,
        },
        gyroscope: Vector3 {
            x: gyro.x as f64,
            y: gyro.y as f64,
            z: gyro.z as f64,
        },
        compass: imu.compass() as f64,
    })
}

fn gnss_to_payload(gnss: &GnssMeasurement) -> SensorPayload {
    SensorPayload::Gnss(GnssData {
        latitude: gnss.latitude(),
        longitude: gnss.longitude(),
        altitude: gnss.attitude(), // carla-rust names the altitude getter attitude()
    })
}

fn radar_to_payload(radar: &RadarMeasurement) -> SensorPayload {
    let detections = radar.as_slice();
    let data = unsafe { pod_slice_to_bytes_unchecked(detections) };
    SensorPayload::Radar(RadarData {
        num_detections: detections.len() as u32,
        data,
    })
}

/// Convert CARLA sensor data to a SensorPacket
///
/// Returns None when the measurement does not match the configured type.
/// Types outside the known five carry no payload.
pub fn convert_sensor_data(
    sensor_id: &SensorId,
    sensor_type: &SensorType,
    data: &SensorData,
) -> Option<SensorPacket> {
    let timestamp = data.timestamp();
    let sim_frame = data.frame() as u64;

    let payload = match sensor_type {
        SensorType::Camera => image_to_payload(&Image::try_from(data.clone()).ok()?),
        SensorType::Lidar => lidar_to_payload(&LidarMeasurement::try_from(data.clone()).ok()?),
        SensorType::Imu => imu_to_payload(&ImuMeasurement::try_from(data.clone()).ok()?),
        SensorType::Gnss => gnss_to_payload(&GnssMeasurement::try_from(data.clone()).ok()?),
        SensorType::Radar => radar_to_payload(&RadarMeasurement::try_from(data.clone()).ok()?),
        SensorType::Other(_) => SensorPayload::Raw(Bytes::new()),
    };

    Some(SensorPacket {
        sensor_id: sensor_id.clone(),
        sensor_type: sensor_type.clone(),
        timestamp,
        sim_frame: Some(sim_frame),
        payload,
    })
}
