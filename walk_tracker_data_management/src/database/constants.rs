pub const WALKS_TABLE_NAME: &str = "Walks";
pub const WALK_ID: &str = "walk_id";
pub const SUBJECT_ID: &str = "subject_id";
pub const PET_ID: &str = "pet_id";
pub const STARTED_AT: &str = "started_at";
pub const ENDED_AT: &str = "ended_at";
pub const DURATION_SEC: &str = "duration_sec";
pub const DISTANCE_M: &str = "distance_m";
pub const PATH: &str = "path";
pub const PHOTOS: &str = "photos";
pub const NOTE: &str = "note";

pub const WALKS_BY_SUBJECT_INDEX: &str = "WalksBySubject";
pub const WALKS_BY_START_INDEX: &str = "WalksByStart";
