use contracts::PointCloudData;

use super::{check_stride, Encoded, Fragment, RECORD_STRIDE};
use crate::error::EncodeError;

/// x, y, z, intensity as f32 per point, no header
pub(super) fn encode(cloud: &PointCloudData) -> Result<Encoded, EncodeError> {
    check_stride("lidar", cloud.data.len())?;

    Ok(Encoded::with_file(
        Fragment::Lidar {
            num_points: (cloud.data.len() / RECORD_STRIDE) as u64,
            point_stride: RECORD_STRIDE as u32,
        },
        cloud.data.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    #[test]
    fn point_count_is_float_count_over_four() {
        let mut buf = BytesMut::new();
        for i in 0..12 {
            buf.put_f32_le(i as f32);
        }
        let encoded = encode(&PointCloudData { data: buf.freeze() }).unwrap();

        assert_eq!(
            encoded.fragment,
            Fragment::Lidar {
                num_points: 3,
                point_stride: 16
            }
        );
        assert_eq!(encoded.payload.unwrap().len(), 48);
    }

    #[test]
    fn empty_sweep_is_zero_points() {
        let encoded = encode(&PointCloudData {
            data: Default::default(),
        })
        .unwrap();
        assert_eq!(
            serde_json::to_value(&encoded.fragment).unwrap()["num_points"],
            0
        );
    }

    #[test]
    fn partial_point_is_rejected() {
        let data = bytes::Bytes::from(vec![0u8; 20]);
        assert!(matches!(
            encode(&PointCloudData { data }),
            Err(EncodeError::Stride { len: 20, .. })
        ));
    }
}
