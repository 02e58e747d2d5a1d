use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "sqlx")]
use sqlx::{prelude::*, sqlite::SqliteRow};

use crate::{distance::round_to_decimeter, geo_point::GeoPoint, path_sample::PathSample};

/// Who walked: the account holder and the pet the walk is logged for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkSubject {
    pub subject_id: String,
    pub pet_id: String,
}

/// The finalized, immutable summary of one confirmed walk.
///
/// There are no setters. A record is assembled once from a finished session and then
/// only read or handed to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkRecord {
    subject: WalkSubject,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    duration_sec: u64,
    distance_m: f64,
    path: Vec<PathSample>,
    photos: Vec<String>,
    note: Option<String>,
}

impl WalkRecord {
    /// `distance_m` is the raw accumulated distance and is rounded to one decimal here.
    pub fn new(
        subject: WalkSubject,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        duration_sec: u64,
        distance_m: f64,
        path: Vec<PathSample>,
    ) -> Self {
        Self {
            subject,
            started_at,
            ended_at,
            duration_sec,
            distance_m: round_to_decimeter(distance_m.max(0.)),
            path,
            photos: Vec::new(),
            note: None,
        }
    }

    pub fn with_photos(mut self, photos: Vec<String>) -> Self {
        self.photos = photos;
        self
    }

    /// Blank notes are dropped.
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|note| !note.trim().is_empty());
        self
    }

    pub fn subject(&self) -> &WalkSubject {
        &self.subject
    }

    pub fn subject_id(&self) -> &str {
        &self.subject.subject_id
    }

    pub fn pet_id(&self) -> &str {
        &self.subject.pet_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    pub fn duration_sec(&self) -> u64 {
        self.duration_sec
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub fn path(&self) -> &[PathSample] {
        &self.path
    }

    pub fn points(&self) -> impl Iterator<Item = GeoPoint> + '_ {
        self.path.iter().map(|sample| sample.point)
    }

    pub fn photos(&self) -> &[String] {
        &self.photos
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn path_blob(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(&self.path)
    }

    pub fn photos_blob(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(&self.photos)
    }
}

/// A record as read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredWalk {
    pub walk_id: i64,
    pub record: WalkRecord,
}

#[cfg(feature = "sqlx")]
impl FromRow<'_, SqliteRow> for StoredWalk {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let path: Vec<u8> = row.try_get(7)?;
        let path: Vec<PathSample> = bincode::deserialize(&path).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        let photos: Vec<u8> = row.try_get(8)?;
        let photos: Vec<String> = if photos.is_empty() {
            Vec::new()
        } else {
            bincode::deserialize(&photos).map_err(|e| sqlx::Error::Decode(Box::new(e)))?
        };

        let duration_sec: i64 = row.try_get(5)?;
        let duration_sec = u64::try_from(duration_sec).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        let record = WalkRecord {
            subject: WalkSubject {
                subject_id: row.try_get(1)?,
                pet_id: row.try_get(2)?,
            },
            started_at: row.try_get(3)?,
            ended_at: row.try_get(4)?,
            duration_sec,
            distance_m: row.try_get(6)?,
            path,
            photos,
            note: row.try_get(9)?,
        };

        Ok(Self {
            walk_id: row.try_get(0)?,
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn subject() -> WalkSubject {
        WalkSubject {
            subject_id: "user-1".into(),
            pet_id: "pet-7".into(),
        }
    }

    #[test]
    fn rounds_distance_and_keeps_path() {
        let start = Utc.with_ymd_and_hms(2025, 3, 14, 7, 30, 0).unwrap();
        let path = vec![
            PathSample::new(GeoPoint::new(37.5665, 126.9780).unwrap(), start),
            PathSample::new(GeoPoint::new(37.5675, 126.9790).unwrap(), start + Duration::seconds(60)),
        ];

        let record = WalkRecord::new(subject(), start, start + Duration::seconds(95), 95, 141.8892, path.clone());

        assert_eq!(record.distance_m(), 141.9);
        assert_eq!(record.duration_sec(), 95);
        assert_eq!(record.path(), path.as_slice());
        assert_eq!(record.points().count(), 2);
        assert!(record.photos().is_empty());
        assert_eq!(record.note(), None);
    }

    #[test]
    fn blank_note_is_dropped() {
        let now = Utc::now();
        let record = WalkRecord::new(subject(), now, now, 0, 0., Vec::new()).with_note(Some("   ".into()));
        assert_eq!(record.note(), None);

        let record = record.with_note(Some("Met a corgi".into())).with_photos(vec!["photos/1.jpg".into()]);
        assert_eq!(record.note(), Some("Met a corgi"));
        assert_eq!(record.photos(), ["photos/1.jpg".to_string()]);
    }

    #[test]
    fn path_blob_decodes() {
        let now = Utc::now();
        let path = vec![PathSample::new(GeoPoint::new(1., 2.).unwrap(), now)];
        let record = WalkRecord::new(subject(), now, now, 0, 0., path.clone());

        let decoded: Vec<PathSample> = bincode::deserialize(&record.path_blob().unwrap()).unwrap();
        assert_eq!(decoded, path);
    }
}
