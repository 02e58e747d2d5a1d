use crate::{geo_point::GeoPoint, path_sample::PathSample};

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points (haversine).
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    if a == b {
        return 0.0;
    }

    let d_lat = (b.latitude() - a.latitude()).to_radians();
    let d_lng = (b.longitude() - a.longitude()).to_radians();
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();

    let h = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lng / 2.).powi(2);
    // Rounding can push h a hair outside [0, 1] for near-identical or antipodal points
    let h = h.clamp(0., 1.);
    let c = 2. * f64::atan2(h.sqrt(), (1. - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance contributed by `next` given the sample before it.
/// The first sample of a session has no predecessor and contributes nothing.
pub fn add_point(previous: Option<GeoPoint>, next: GeoPoint) -> f64 {
    match previous {
        Some(previous) => haversine_distance(previous, next),
        None => 0.,
    }
}

/// Sum of pairwise distances over an ordered path.
pub fn path_distance(path: &[PathSample]) -> f64 {
    path.windows(2)
        .map(|pair| haversine_distance(pair[0].point, pair[1].point))
        .sum()
}

/// Rounds meters to one decimal, as stored on a record.
pub fn round_to_decimeter(meters: f64) -> f64 {
    (meters * 10.).round() / 10.
}
