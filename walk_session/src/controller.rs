use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, trace, warn};
use walk_tracker_lib::{
    distance::{add_point, round_to_decimeter},
    geo_point::GeoPoint,
    path_sample::PathSample,
    store::{StoredId, WalkRecordsStore},
    walk_record::{WalkRecord, WalkSubject},
};

use crate::{
    clock::SessionClock,
    collaborators::{MapView, ProfileProvider},
    error::SessionError,
    sampler::{GeoSampler, SamplerEvent, SubscriptionHandle},
    summary::SessionSummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    /// Waiting for the user to confirm the stop. Sampling and the clock keep running.
    ConfirmingStop,
    /// Record handed to storage.
    Summary,
    /// Confirmed, but the record is not stored yet. Holds the walk until a retry succeeds.
    SummaryPendingRetry,
}

/// Everything that can happen to a session, fed through [`WalkSessionController::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Start,
    Sampler(SamplerEvent),
    Tick,
    RequestStop,
    CancelStop,
    ConfirmStop,
    RetryPersist,
    DismissSummary,
    Restart,
    AttachPhoto(String),
    SetNote(Option<String>),
}

/// The in-memory walk. Only the controller mutates it.
#[derive(Debug, Default, Clone)]
pub struct WalkSession {
    path: Vec<PathSample>,
    distance_m: f64,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    photos: Vec<String>,
    note: Option<String>,
}

impl WalkSession {
    pub fn path(&self) -> &[PathSample] {
        &self.path
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn photos(&self) -> &[String] {
        &self.photos
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    fn push(&mut self, sample: PathSample) -> f64 {
        let increment = add_point(self.path.last().map(|previous| previous.point), sample.point);
        debug_assert!(increment >= 0.);
        self.distance_m += increment;
        self.path.push(sample);
        increment
    }
}

/// What confirmation produced. Lives until the summary is dismissed.
#[derive(Debug)]
struct Finalized {
    duration_sec: u64,
    record: Option<WalkRecord>,
    stored_id: Option<StoredId>,
    last_error: Option<SessionError>,
}

pub struct WalkSessionController {
    state: SessionState,
    session: WalkSession,
    sampler: GeoSampler,
    clock: SessionClock,
    subscription: Option<SubscriptionHandle>,
    finalized: Option<Finalized>,

    store: Arc<dyn WalkRecordsStore>,
    profile: Arc<dyn ProfileProvider>,
    map_view: Arc<dyn MapView>,
}

impl WalkSessionController {
    pub fn new(
        sampler: GeoSampler,
        clock: SessionClock,
        store: Arc<dyn WalkRecordsStore>,
        profile: Arc<dyn ProfileProvider>,
        map_view: Arc<dyn MapView>,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            session: WalkSession::default(),
            sampler,
            clock,
            subscription: None,
            finalized: None,
            store,
            profile,
            map_view,
        }
    }

    /// Single entry point for every event. Returns the state after the event was applied.
    pub async fn dispatch(&mut self, event: SessionEvent) -> Result<SessionState, SessionError> {
        match event {
            SessionEvent::Start => self.start()?,
            SessionEvent::Sampler(event) => self.on_sampler_event(event)?,
            SessionEvent::Tick => self.on_tick(),
            SessionEvent::RequestStop => self.request_stop()?,
            SessionEvent::CancelStop => self.cancel_stop()?,
            SessionEvent::ConfirmStop => {
                self.confirm_stop().await?;
            }
            SessionEvent::RetryPersist => {
                self.retry_persist().await?;
            }
            SessionEvent::DismissSummary => self.dismiss_summary()?,
            SessionEvent::Restart => self.restart()?,
            SessionEvent::AttachPhoto(reference) => self.attach_photo(reference)?,
            SessionEvent::SetNote(note) => self.set_note(note)?,
        }

        Ok(self.state)
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active | SessionState::ConfirmingStop => return Err(SessionError::AlreadyActive),
            SessionState::SummaryPendingRetry => return Err(self.invalid("start")),
            SessionState::Idle | SessionState::Summary => {}
        }

        // Subscribe first so a refused permission leaves everything as it was
        let subscription = self.sampler.start()?;

        self.clear();
        self.subscription = Some(subscription);
        self.session.started_at = Some(self.clock.start());
        self.state = SessionState::Active;

        info!("Walk session started with subscription {:?}", subscription);
        Ok(())
    }

    fn on_sampler_event(&mut self, event: SamplerEvent) -> Result<(), SessionError> {
        if self.subscription != Some(event.subscription) {
            debug!("Dropping event from stale subscription {:?}", event.subscription);
            return Ok(());
        }

        match event.fix {
            Ok(sample) => {
                self.on_sample(sample);
                Ok(())
            }
            Err(error) if !error.is_fatal() => {
                warn!("Location fix failed, continuing: {}", error);
                Ok(())
            }
            Err(error) => {
                error!("Location sampling failed, abandoning walk: {}", error);
                self.abandon();
                Err(error.into())
            }
        }
    }

    fn on_sample(&mut self, sample: PathSample) {
        // Samples keep counting while the stop is being confirmed
        if !matches!(self.state, SessionState::Active | SessionState::ConfirmingStop) {
            debug!("Dropping sample received while {:?}", self.state);
            return;
        }

        let increment = self.session.push(sample);
        debug!(
            "Sample {} at ({}, {}), +{:.1} m, total {:.1} m",
            self.session.path.len(),
            sample.point.latitude(),
            sample.point.longitude(),
            increment,
            self.session.distance_m
        );

        let points: Vec<GeoPoint> = self.session.path.iter().map(|sample| sample.point).collect();
        self.map_view.update_path(&points);
        self.map_view.update_marker(sample.point);
    }

    fn on_tick(&self) {
        trace!("Tick: {}s elapsed, {:.1} m", self.clock.elapsed_seconds(), self.session.distance_m);
    }

    pub fn request_stop(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::Active, SessionState::ConfirmingStop, "request stop")
    }

    pub fn cancel_stop(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::ConfirmingStop, SessionState::Active, "cancel stop")
    }

    /// Ends sampling, builds the record and hands it to storage.
    ///
    /// The subscription is torn down before storage is called, so no sample can race the
    /// write. On failure the walk stays in [`SessionState::SummaryPendingRetry`].
    pub async fn confirm_stop(&mut self) -> Result<StoredId, SessionError> {
        if self.state != SessionState::ConfirmingStop {
            return Err(self.invalid("confirm stop"));
        }

        self.release_subscription();
        let duration_sec = self.clock.stop();
        self.session.ended_at = Some(self.clock.stopped_at().unwrap_or_else(|| self.clock.now()));

        self.finalized = Some(Finalized {
            duration_sec,
            record: None,
            stored_id: None,
            last_error: None,
        });
        self.state = SessionState::SummaryPendingRetry;

        info!(
            "Walk confirmed: {} samples, {:.1} m, {}s",
            self.session.path.len(),
            self.session.distance_m,
            duration_sec
        );

        self.persist().await
    }

    /// One more explicit attempt at storing a confirmed walk.
    pub async fn retry_persist(&mut self) -> Result<StoredId, SessionError> {
        if self.state != SessionState::SummaryPendingRetry {
            return Err(self.invalid("retry persist"));
        }

        self.persist().await
    }

    pub fn dismiss_summary(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Summary {
            return Err(self.invalid("dismiss summary"));
        }

        self.clear();
        self.state = SessionState::Idle;
        info!("Summary dismissed");
        Ok(())
    }

    pub fn restart(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Summary {
            return Err(self.invalid("restart"));
        }

        self.dismiss_summary()?;
        self.start()
    }

    /// Gives up on storing a confirmed walk and hands the record to the caller instead.
    /// `None` when the record could not even be assembled.
    pub fn take_unsaved_record(&mut self) -> Result<Option<WalkRecord>, SessionError> {
        if self.state != SessionState::SummaryPendingRetry {
            return Err(self.invalid("take unsaved record"));
        }

        let record = self.finalized.take().and_then(|finalized| finalized.record);
        self.clear();
        self.state = SessionState::Idle;
        warn!("Unsaved walk handed back to caller");
        Ok(record)
    }

    pub fn attach_photo(&mut self, reference: String) -> Result<(), SessionError> {
        self.require_sampling("attach photo")?;
        self.session.photos.push(reference);
        Ok(())
    }

    pub fn set_note(&mut self, note: Option<String>) -> Result<(), SessionError> {
        self.require_sampling("set note")?;
        self.session.note = note;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> &WalkSession {
        &self.session
    }

    pub fn subscription(&self) -> Option<SubscriptionHandle> {
        self.subscription
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.clock.elapsed_seconds()
    }

    /// The record built at confirmation, if it could be assembled.
    pub fn record(&self) -> Option<&WalkRecord> {
        self.finalized.as_ref().and_then(|finalized| finalized.record.as_ref())
    }

    pub fn stored_id(&self) -> Option<StoredId> {
        self.finalized.as_ref().and_then(|finalized| finalized.stored_id)
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.finalized.as_ref().and_then(|finalized| finalized.last_error.as_ref())
    }

    /// Live numbers for display in any state.
    pub fn snapshot(&self) -> SessionSummary {
        match &self.finalized {
            Some(finalized) => SessionSummary {
                state: self.state,
                duration_sec: finalized.duration_sec,
                distance_m: finalized
                    .record
                    .as_ref()
                    .map(|record| record.distance_m())
                    .unwrap_or_else(|| round_to_decimeter(self.session.distance_m)),
                point_count: self.session.path.len(),
                stored_id: finalized.stored_id,
                error: finalized.last_error.clone(),
            },
            None => SessionSummary {
                state: self.state,
                duration_sec: self.clock.elapsed_seconds(),
                distance_m: self.session.distance_m,
                point_count: self.session.path.len(),
                stored_id: None,
                error: None,
            },
        }
    }

    /// The terminal projection, only once the walk has been confirmed.
    pub fn summary(&self) -> Option<SessionSummary> {
        matches!(self.state, SessionState::Summary | SessionState::SummaryPendingRetry).then(|| self.snapshot())
    }

    async fn persist(&mut self) -> Result<StoredId, SessionError> {
        let existing = self.record().cloned();
        let record = match existing {
            Some(record) => record,
            None => match self.assemble_record() {
                Ok(record) => {
                    if let Some(finalized) = self.finalized.as_mut() {
                        finalized.record = Some(record.clone());
                    }
                    record
                }
                Err(error) => {
                    warn!("Cannot assemble walk record: {}", error);
                    return Err(self.record_failure(error));
                }
            },
        };

        match self.store.create(&record).await {
            Ok(stored_id) => {
                if let Some(finalized) = self.finalized.as_mut() {
                    finalized.stored_id = Some(stored_id);
                    finalized.last_error = None;
                }
                self.state = SessionState::Summary;
                info!("Walk stored with id {}", stored_id);
                Ok(stored_id)
            }
            Err(error) => {
                error!("Failed to store walk: {}", error);
                Err(self.record_failure(error.into()))
            }
        }
    }

    fn assemble_record(&self) -> Result<WalkRecord, SessionError> {
        let (Some(subject_id), Some(pet_id)) = (self.profile.current_subject_id(), self.profile.current_pet_id()) else {
            return Err(SessionError::ProfileUnavailable);
        };

        let started_at = self.session.started_at.unwrap_or_else(|| self.clock.now());
        let ended_at = self.session.ended_at.unwrap_or(started_at);
        let duration_sec = self.finalized.as_ref().map(|finalized| finalized.duration_sec).unwrap_or_default();

        let record = WalkRecord::new(
            WalkSubject { subject_id, pet_id },
            started_at,
            ended_at,
            duration_sec,
            self.session.distance_m,
            self.session.path.clone(),
        )
        .with_photos(self.session.photos.clone())
        .with_note(self.session.note.clone());

        Ok(record)
    }

    fn record_failure(&mut self, error: SessionError) -> SessionError {
        if let Some(finalized) = self.finalized.as_mut() {
            finalized.last_error = Some(error.clone());
        }
        self.state = SessionState::SummaryPendingRetry;
        error
    }

    /// Fatal sampler failure: nothing was confirmed, so nothing is saved.
    fn abandon(&mut self) {
        self.release_subscription();
        self.clock.stop();
        self.clear();
        self.state = SessionState::Idle;
    }

    fn release_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.sampler.stop(subscription);
        }
    }

    fn clear(&mut self) {
        self.session = WalkSession::default();
        self.finalized = None;
        self.clock.reset();
    }

    fn transition(&mut self, from: SessionState, to: SessionState, operation: &'static str) -> Result<(), SessionError> {
        if self.state != from {
            return Err(self.invalid(operation));
        }

        self.state = to;
        info!("Walk session {:?} -> {:?}", from, to);
        Ok(())
    }

    fn require_sampling(&self, operation: &'static str) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active | SessionState::ConfirmingStop => Ok(()),
            _ => Err(self.invalid(operation)),
        }
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            state: self.state,
            operation,
        }
    }
}

impl Drop for WalkSessionController {
    fn drop(&mut self) {
        self.release_subscription();
    }
}
