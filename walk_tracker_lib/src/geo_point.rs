use geo_types::{coord, Point};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeoPointError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// A WGS84 position in degrees. Always within range once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoPointError> {
        // NaN fails both range checks
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoPointError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoPointError::Longitude(longitude));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

#[derive(Deserialize)]
struct RawGeoPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = GeoPointError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.latitude, raw.longitude)
    }
}

impl From<GeoPoint> for Point {
    fn from(point: GeoPoint) -> Self {
        Point::from(coord! { x: point.longitude, y: point.latitude })
    }
}

impl TryFrom<Point> for GeoPoint {
    type Error = GeoPointError;

    fn try_from(point: Point) -> Result<Self, Self::Error> {
        GeoPoint::new(point.y(), point.x())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(GeoPoint::new(90.5, 0.0), Err(GeoPointError::Latitude(90.5)));
        assert_eq!(GeoPoint::new(0.0, -180.1), Err(GeoPointError::Longitude(-180.1)));
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn geo_types_axis_order() {
        let point = GeoPoint::new(56.158405, 10.206034).unwrap();
        let geo: Point = point.into();
        assert_eq!(geo.x(), 10.206034);
        assert_eq!(geo.y(), 56.158405);
        assert_eq!(GeoPoint::try_from(geo).unwrap(), point);
    }

    #[test]
    fn deserialize_validates() {
        let bytes = bincode::serialize(&(91.0f64, 0.0f64)).unwrap();
        assert!(bincode::deserialize::<GeoPoint>(&bytes).is_err());
    }
}
