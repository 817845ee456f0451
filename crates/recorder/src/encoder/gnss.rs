use contracts::GnssData;

use super::{Encoded, Fragment};

pub(super) fn encode(gnss: &GnssData) -> Encoded {
    Encoded::inline(Fragment::Gnss {
        latitude: gnss.latitude,
        longitude: gnss.longitude,
        altitude: gnss.altitude,
    })
}
