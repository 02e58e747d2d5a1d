use std::{path::Path, time::Duration};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use const_format::concatcp;
use sqlx::{query_as, sqlite::SqliteConnectOptions, Executor, Pool, Sqlite, SqlitePool};
use walk_tracker_lib::walk_record::{StoredWalk, WalkRecord};

use crate::{Configuration, DataManagerError};

use super::constants::*;

/// Which stored walks to list. `month` is `(year, month)` with months counted from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkFilter {
    pub subject_id: String,
    pub pet_id: Option<String>,
    pub month: Option<(i32, u32)>,
}

impl WalkFilter {
    pub fn subject(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            pet_id: None,
            month: None,
        }
    }
}

#[derive(Clone)]
pub struct WalkDatabase {
    pool: Pool<Sqlite>,
    pub(crate) persist_timeout: Duration,
}

impl WalkDatabase {
    pub async fn connect(config: &Configuration) -> Result<Self, DataManagerError> {
        Self::connect_to(&config.database_path, config.persist_timeout).await
    }

    pub async fn connect_to(path: &Path, persist_timeout: Duration) -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await
            .map_err(|e| DataManagerError::Database(format!("Failed to connect to database {:?}: {}", path, e)))?;

        let db = Self {
            pool,
            persist_timeout,
        };

        db.init().await?;

        Ok(db)
    }

    async fn init(&self) -> Result<(), DataManagerError> {
        self.pool.execute(concatcp!("
            CREATE TABLE IF NOT EXISTS ", WALKS_TABLE_NAME, "(",
                WALK_ID,      " INTEGER PRIMARY KEY AUTOINCREMENT,",
                SUBJECT_ID,   " TEXT NOT NULL,",
                PET_ID,       " TEXT NOT NULL,",
                STARTED_AT,   " TIMESTAMP NOT NULL,",
                ENDED_AT,     " TIMESTAMP NOT NULL,",
                DURATION_SEC, " INTEGER NOT NULL,",
                DISTANCE_M,   " REAL NOT NULL,",
                PATH,         " BLOB NOT NULL,",
                PHOTOS,       " BLOB NOT NULL,",
                NOTE,         " TEXT);

            CREATE INDEX IF NOT EXISTS ", WALKS_BY_SUBJECT_INDEX, " ON ", WALKS_TABLE_NAME, "(", SUBJECT_ID, ", ", STARTED_AT, ");

            CREATE UNIQUE INDEX IF NOT EXISTS ", WALKS_BY_START_INDEX, " ON ", WALKS_TABLE_NAME, "(", SUBJECT_ID, ", ", PET_ID, ", ", STARTED_AT, ")"))
            .await
            .map_err(|e| DataManagerError::Database(format!("Failed to create tables: {}", e)))
            .map(|_| ())
    }

    /// A walk is identified by subject, pet and start. Inserting one that is already stored
    /// writes nothing and returns the existing id, so an attempt that timed out after its row
    /// was committed can be retried safely.
    pub async fn insert_walk(&self, record: &WalkRecord) -> Result<i64, DataManagerError> {
        let path = record.path_blob()
            .map_err(|e| DataManagerError::Encoding(format!("Failed to encode path: {}", e)))?;
        let photos = record.photos_blob()
            .map_err(|e| DataManagerError::Encoding(format!("Failed to encode photos: {}", e)))?;
        let duration_sec = i64::try_from(record.duration_sec())
            .map_err(|_| DataManagerError::Encoding(format!("Duration {} does not fit", record.duration_sec())))?;

        let inserted = query_as::<_, (i64,)>(concatcp!("
            INSERT INTO ", WALKS_TABLE_NAME, "(",
            WALK_ID, ", ", SUBJECT_ID, ", ", PET_ID, ", ", STARTED_AT, ", ", ENDED_AT, ", ",
            DURATION_SEC, ", ", DISTANCE_M, ", ", PATH, ", ", PHOTOS, ", ", NOTE, ")
            VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(", SUBJECT_ID, ", ", PET_ID, ", ", STARTED_AT, ") DO NOTHING
            RETURNING ", WALK_ID))
                .bind(record.subject_id())
                .bind(record.pet_id())
                .bind(record.started_at())
                .bind(record.ended_at())
                .bind(duration_sec)
                .bind(record.distance_m())
                .bind(path)
                .bind(photos)
                .bind(record.note())
                .fetch_optional(&self.pool).await
                .map_err(|e| DataManagerError::Database(format!("Failed to insert walk: {}", e)))?;

        if let Some((walk_id,)) = inserted {
            return Ok(walk_id);
        }

        let (walk_id,) = query_as::<_, (i64,)>(concatcp!(
            "SELECT ", WALK_ID, " FROM ", WALKS_TABLE_NAME,
            " WHERE ", SUBJECT_ID, " = ?1 AND ", PET_ID, " = ?2 AND ", STARTED_AT, " = ?3"))
            .bind(record.subject_id())
            .bind(record.pet_id())
            .bind(record.started_at())
            .fetch_one(&self.pool).await
            .map_err(|e| DataManagerError::Database(format!("Failed to find stored walk: {}", e)))?;

        tracing::debug!("Walk started at {} already stored as {}", record.started_at(), walk_id);
        Ok(walk_id)
    }

    pub async fn get_walk(&self, walk_id: i64) -> Result<StoredWalk, DataManagerError> {
        query_as::<_, StoredWalk>(concatcp!("SELECT * FROM ", WALKS_TABLE_NAME, " WHERE ", WALK_ID, " = ?1"))
            .bind(walk_id)
            .fetch_one(&self.pool).await
            .map_err(|e| DataManagerError::Database(format!("Failed to get walk {}: {}", walk_id, e)))
    }

    /// Newest first.
    pub async fn list_walks(&self, filter: &WalkFilter) -> Result<Vec<StoredWalk>, DataManagerError> {
        let (from, until) = match filter.month {
            Some((year, month)) => {
                let (from, until) = month_range(year, month)?;
                (Some(from), Some(until))
            }
            None => (None, None),
        };

        query_as::<_, StoredWalk>(concatcp!(
            "SELECT * FROM ", WALKS_TABLE_NAME,
            " WHERE ", SUBJECT_ID, " = ?1",
            " AND (?2 IS NULL OR ", PET_ID, " = ?2)",
            " AND (?3 IS NULL OR ", STARTED_AT, " >= ?3)",
            " AND (?4 IS NULL OR ", STARTED_AT, " < ?4)",
            " ORDER BY ", STARTED_AT, " DESC, ", WALK_ID, " DESC"))
            .bind(&filter.subject_id)
            .bind(&filter.pet_id)
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool).await
            .map_err(|e| DataManagerError::Database(format!("Failed to list walks: {}", e)))
    }
}

/// Half-open range covering one calendar month in UTC.
fn month_range(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), DataManagerError> {
    let invalid = || DataManagerError::Database(format!("Invalid month {}-{}", year, month));

    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;

    Ok((first.and_time(NaiveTime::MIN).and_utc(), next.and_time(NaiveTime::MIN).and_utc()))
}
