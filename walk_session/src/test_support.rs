use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use walk_tracker_lib::{
    geo_point::GeoPoint,
    path_sample::PathSample,
    store::{PersistError, StoredId, WalkRecordsStore},
    walk_record::WalkRecord,
};

use crate::{
    clock::TimeSource,
    collaborators::{MapView, ProfileProvider},
    sampler::{FixSink, LocationSource, Permission, SamplerError, SubscriptionHandle},
};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

pub fn sample(lat: f64, lng: f64, secs: i64) -> PathSample {
    PathSample::new(GeoPoint::new(lat, lng).unwrap(), base_time() + Duration::seconds(secs))
}

#[derive(Clone)]
pub struct ManualTime(Arc<Mutex<DateTime<Utc>>>);

impl ManualTime {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(base_time())))
    }

    pub fn advance_secs(&self, secs: i64) {
        *self.0.lock().unwrap() += Duration::seconds(secs);
    }

    pub fn advance_millis(&self, millis: i64) {
        *self.0.lock().unwrap() += Duration::milliseconds(millis);
    }

    pub fn rewind_secs(&self, secs: i64) {
        *self.0.lock().unwrap() -= Duration::seconds(secs);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
struct SourceState {
    permission: Option<Permission>,
    sink: Option<FixSink>,
    active_watches: usize,
    unwatch_calls: usize,
    fail_next_watch: Option<String>,
}

/// Location source driven by hand from tests.
#[derive(Clone)]
pub struct ManualSource(Arc<Mutex<SourceState>>);

impl ManualSource {
    pub fn new(permission: Permission) -> Self {
        Self(Arc::new(Mutex::new(SourceState {
            permission: Some(permission),
            ..Default::default()
        })))
    }

    pub fn set_permission(&self, permission: Permission) {
        self.0.lock().unwrap().permission = Some(permission);
    }

    pub fn fail_next_watch(&self, reason: &str) {
        self.0.lock().unwrap().fail_next_watch = Some(reason.to_string());
    }

    pub fn emit(&self, sample: PathSample) {
        let state = self.0.lock().unwrap();
        state.sink.as_ref().expect("no active watch").fix(sample);
    }

    pub fn emit_error(&self, error: SamplerError) {
        let state = self.0.lock().unwrap();
        state.sink.as_ref().expect("no active watch").error(error);
    }

    /// The sink of the latest watch, kept even after unwatch to simulate late callbacks.
    pub fn last_sink(&self) -> Option<FixSink> {
        self.0.lock().unwrap().sink.clone()
    }

    pub fn active_watches(&self) -> usize {
        self.0.lock().unwrap().active_watches
    }

    pub fn unwatch_calls(&self) -> usize {
        self.0.lock().unwrap().unwatch_calls
    }
}

impl LocationSource for ManualSource {
    fn permission(&self) -> Permission {
        self.0.lock().unwrap().permission.unwrap_or(Permission::Prompt)
    }

    fn watch(&mut self, sink: FixSink) -> Result<(), SamplerError> {
        let mut state = self.0.lock().unwrap();
        if let Some(reason) = state.fail_next_watch.take() {
            return Err(SamplerError::HardwareUnavailable(reason));
        }
        state.sink = Some(sink);
        state.active_watches += 1;
        Ok(())
    }

    fn unwatch(&mut self, _subscription: SubscriptionHandle) {
        let mut state = self.0.lock().unwrap();
        state.active_watches = state.active_watches.saturating_sub(1);
        state.unwatch_calls += 1;
    }
}

#[derive(Default)]
struct StoreState {
    failures_remaining: usize,
    calls: usize,
    created: Vec<WalkRecord>,
}

#[derive(Clone, Default)]
pub struct FakeStore(Arc<Mutex<StoreState>>);

impl FakeStore {
    pub fn failing(times: usize) -> Self {
        let store = Self::default();
        store.0.lock().unwrap().failures_remaining = times;
        store
    }

    pub fn calls(&self) -> usize {
        self.0.lock().unwrap().calls
    }

    pub fn created(&self) -> Vec<WalkRecord> {
        self.0.lock().unwrap().created.clone()
    }
}

#[async_trait]
impl WalkRecordsStore for FakeStore {
    async fn create(&self, record: &WalkRecord) -> Result<StoredId, PersistError> {
        let mut state = self.0.lock().unwrap();
        state.calls += 1;
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(PersistError::Backend("connection reset".into()));
        }
        state.created.push(record.clone());
        Ok(state.created.len() as StoredId)
    }
}

#[derive(Default)]
pub struct FixedProfile {
    subject_id: Mutex<Option<String>>,
    pet_id: Mutex<Option<String>>,
}

impl FixedProfile {
    pub fn new(subject_id: &str, pet_id: &str) -> Self {
        Self {
            subject_id: Mutex::new(Some(subject_id.into())),
            pet_id: Mutex::new(Some(pet_id.into())),
        }
    }

    pub fn select(&self, subject_id: &str, pet_id: &str) {
        *self.subject_id.lock().unwrap() = Some(subject_id.into());
        *self.pet_id.lock().unwrap() = Some(pet_id.into());
    }
}

impl ProfileProvider for FixedProfile {
    fn current_subject_id(&self) -> Option<String> {
        self.subject_id.lock().unwrap().clone()
    }

    fn current_pet_id(&self) -> Option<String> {
        self.pet_id.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct MapState {
    path_updates: usize,
    last_path: Vec<GeoPoint>,
    markers: Vec<GeoPoint>,
}

#[derive(Clone, Default)]
pub struct RecordingMapView(Arc<Mutex<MapState>>);

impl RecordingMapView {
    pub fn path_updates(&self) -> usize {
        self.0.lock().unwrap().path_updates
    }

    pub fn last_path(&self) -> Vec<GeoPoint> {
        self.0.lock().unwrap().last_path.clone()
    }

    pub fn markers(&self) -> Vec<GeoPoint> {
        self.0.lock().unwrap().markers.clone()
    }
}

impl MapView for RecordingMapView {
    fn update_path(&self, path: &[GeoPoint]) {
        let mut state = self.0.lock().unwrap();
        state.path_updates += 1;
        state.last_path = path.to_vec();
    }

    fn update_marker(&self, point: GeoPoint) {
        self.0.lock().unwrap().markers.push(point);
    }
}
