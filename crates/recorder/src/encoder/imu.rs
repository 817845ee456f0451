use contracts::ImuData;

use super::{Encoded, Fragment};

pub(super) fn encode(imu: &ImuData) -> Encoded {
    Encoded::inline(Fragment::Imu {
        accelerometer: imu.accelerometer.to_array(),
        gyroscope: imu.gyroscope.to_array(),
        compass: imu.compass,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Vector3;

    #[test]
    fn seven_scalars_inline() {
        let encoded = encode(&ImuData {
            accelerometer: Vector3 {
                x: 0.1,
                y: -0.2,
                z: 9.81,
            },
            gyroscope: Vector3 {
                x: 0.0,
                y: 0.0,
                z: 0.5,
            },
            compass: 1.57,
        });

        assert!(encoded.payload.is_none());
        let json = serde_json::to_value(&encoded.fragment).unwrap();
        assert_eq!(json["accelerometer"], serde_json::json!([0.1, -0.2, 9.81]));
        assert_eq!(json["gyroscope"], serde_json::json!([0.0, 0.0, 0.5]));
        assert_eq!(json["compass"], 1.57);
    }
}
