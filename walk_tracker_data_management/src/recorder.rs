use std::sync::Arc;

use walk_session::{
    clock::{ticker, SessionClock},
    collaborators::MapView,
    sampler::GeoSampler,
    summary::SessionSummary,
    SessionError, SessionEvent, SessionState, WalkSessionController,
};
use walk_tracker_lib::{
    path_sample::PathSample,
    store::{StoredId, WalkRecordsStore},
    walk_record::WalkRecord,
};

use crate::{profile::StaticProfile, replay::GpxReplaySource, Configuration, DataManagerError};

/// Who is walking, and what to attach to the walk.
#[derive(Debug, Clone, Default)]
pub struct RecordRequest {
    pub subject_id: String,
    pub pet_id: String,
    pub note: Option<String>,
    pub photos: Vec<String>,
}

#[derive(Debug)]
pub enum RecordOutcome {
    Saved {
        walk_id: StoredId,
        summary: SessionSummary,
    },
    /// Storing failed on the first attempt and on the one retry. `record` is `None` when it
    /// could not even be assembled.
    Unsaved {
        summary: SessionSummary,
        record: Option<WalkRecord>,
        error: SessionError,
    },
}

/// Replays `samples` as a live walk through a [`WalkSessionController`], then stops, confirms
/// and saves it, retrying a failed save once. `on_tick` sees the live numbers on every
/// display tick.
pub async fn record_walk(
    config: &Configuration,
    samples: &[PathSample],
    request: RecordRequest,
    store: Arc<dyn WalkRecordsStore>,
    map_view: Arc<dyn MapView>,
    mut on_tick: impl FnMut(&SessionSummary),
) -> Result<RecordOutcome, DataManagerError> {
    let source = GpxReplaySource::new(samples, config.replay_interval);
    let expected = source.len();

    let (sampler, mut events) = GeoSampler::new(Box::new(source));
    let mut controller = WalkSessionController::new(
        sampler,
        SessionClock::system(),
        store,
        Arc::new(StaticProfile::new(Some(request.subject_id), Some(request.pet_id))),
        map_view,
    );

    controller.dispatch(SessionEvent::Start).await?;
    for photo in request.photos {
        controller.dispatch(SessionEvent::AttachPhoto(photo)).await?;
    }
    controller.dispatch(SessionEvent::SetNote(request.note)).await?;

    let mut ticks = ticker(config.tick_interval);
    let mut delivered = 0;
    while delivered < expected {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    return Err(DataManagerError::Replay(format!(
                        "Location stream closed after {} of {} points", delivered, expected
                    )));
                };
                delivered += 1;
                controller.dispatch(SessionEvent::Sampler(event)).await?;
            }
            _ = ticks.tick() => {
                controller.dispatch(SessionEvent::Tick).await?;
                on_tick(&controller.snapshot());
            }
        }
    }

    controller.dispatch(SessionEvent::RequestStop).await?;

    let mut outcome = controller.dispatch(SessionEvent::ConfirmStop).await;
    if let Err(error @ (SessionError::Persist(_) | SessionError::ProfileUnavailable)) = &outcome {
        tracing::warn!("Saving the walk failed, retrying once: {}", error);
        outcome = controller.dispatch(SessionEvent::RetryPersist).await;
    }

    let summary = controller
        .summary()
        .ok_or_else(|| DataManagerError::Replay("Walk ended without a summary".into()))?;

    match outcome {
        Ok(SessionState::Summary) => {
            let walk_id = summary
                .stored_id
                .ok_or_else(|| DataManagerError::Replay("Saved walk has no id".into()))?;
            controller.dispatch(SessionEvent::DismissSummary).await?;
            Ok(RecordOutcome::Saved { walk_id, summary })
        }
        Ok(state) => Err(DataManagerError::Replay(format!("Walk ended in unexpected state {:?}", state))),
        Err(error) => {
            let record = controller.take_unsaved_record()?;
            Ok(RecordOutcome::Unsaved { summary, record, error })
        }
    }
}
