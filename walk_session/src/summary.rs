use walk_tracker_lib::store::StoredId;

use crate::{controller::SessionState, error::SessionError};

/// Read-only numbers for the walk panel and the post-walk summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub state: SessionState,
    pub duration_sec: u64,
    pub distance_m: f64,
    pub point_count: usize,
    pub stored_id: Option<StoredId>,
    pub error: Option<SessionError>,
}

impl SessionSummary {
    pub fn duration_label(&self) -> String {
        format_duration(self.duration_sec)
    }

    pub fn distance_label(&self) -> String {
        format_distance_km(self.distance_m)
    }

    pub fn is_saved(&self) -> bool {
        self.stored_id.is_some()
    }

    pub fn can_retry(&self) -> bool {
        self.state == SessionState::SummaryPendingRetry
    }
}

/// `mm:ss`, minutes keep counting past the hour.
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub fn format_distance_km(meters: f64) -> String {
    format!("{:.2} km", meters / 1000.)
}
