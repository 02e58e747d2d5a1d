use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo_point::GeoPoint;

/// One location fix as captured by the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSample {
    pub point: GeoPoint,
    pub timestamp: DateTime<Utc>,
}

impl PathSample {
    pub fn new(point: GeoPoint, timestamp: DateTime<Utc>) -> Self {
        Self {
            point,
            timestamp,
        }
    }
}
