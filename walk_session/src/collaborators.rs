use walk_tracker_lib::geo_point::GeoPoint;

/// Renders the live walk. Calls are fire-and-forget.
pub trait MapView: Send + Sync {
    fn update_path(&self, path: &[GeoPoint]);

    fn update_marker(&self, point: GeoPoint);
}

/// Read-only view of who is currently walking which pet.
pub trait ProfileProvider: Send + Sync {
    fn current_subject_id(&self) -> Option<String>;

    fn current_pet_id(&self) -> Option<String>;
}

/// For hosts without a map.
pub struct NoMapView;

impl MapView for NoMapView {
    fn update_path(&self, _path: &[GeoPoint]) {}

    fn update_marker(&self, _point: GeoPoint) {}
}
