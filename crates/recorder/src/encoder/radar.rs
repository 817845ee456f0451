use contracts::RadarData;

use super::{check_stride, Encoded, Fragment};
use crate::error::EncodeError;

/// velocity, azimuth, altitude, depth as f32 per detection.
///
/// `num_detections` is the count the simulator reported, not derived from
/// the buffer length.
pub(super) fn encode(radar: &RadarData) -> Result<Encoded, EncodeError> {
    check_stride("radar", radar.data.len())?;

    Ok(Encoded::with_file(
        Fragment::Radar {
            num_detections: radar.num_detections,
        },
        radar.data.clone(),
    ))
}
