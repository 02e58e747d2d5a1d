use std::{future::Future, time::Duration};

use async_trait::async_trait;
use walk_tracker_lib::{
    store::{PersistError, StoredId, WalkRecordsStore},
    walk_record::WalkRecord,
};

use crate::DataManagerError;

use super::WalkDatabase;

#[async_trait]
impl WalkRecordsStore for WalkDatabase {
    async fn create(&self, record: &WalkRecord) -> Result<StoredId, PersistError> {
        let walk_id = bounded(self.persist_timeout, self.insert_walk(record)).await?;
        tracing::info!("Stored walk {} for {}/{}", walk_id, record.subject_id(), record.pet_id());
        Ok(walk_id)
    }
}

/// Runs `operation` for at most `limit`, folding the outcome into a [`PersistError`].
pub(crate) async fn bounded<T>(
    limit: Duration,
    operation: impl Future<Output = Result<T, DataManagerError>>,
) -> Result<T, PersistError> {
    match tokio::time::timeout(limit, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(DataManagerError::Encoding(reason))) => Err(PersistError::Encoding(reason)),
        Ok(Err(e)) => Err(PersistError::Backend(e.to_string())),
        Err(_) => {
            tracing::warn!("Persisting walk timed out after {:?}", limit);
            Err(PersistError::Timeout(limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use walk_tracker_lib::walk_record::WalkSubject;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn bounded_times_out() {
        let result = bounded::<i64>(Duration::from_secs(5), std::future::pending()).await;
        assert_eq!(result, Err(PersistError::Timeout(Duration::from_secs(5))));
    }

    #[tokio::test]
    async fn bounded_maps_errors() {
        let encoding = bounded::<i64>(Duration::from_secs(1), async { Err(DataManagerError::Encoding("bad".into())) }).await;
        assert_eq!(encoding, Err(PersistError::Encoding("bad".into())));

        let backend = bounded::<i64>(Duration::from_secs(1), async { Err(DataManagerError::Database("locked".into())) }).await;
        assert_matches!(backend, Err(PersistError::Backend(_)));

        assert_eq!(bounded(Duration::from_secs(1), async { Ok(7) }).await, Ok(7));
    }

    fn morning_walk() -> WalkRecord {
        let now = Utc.with_ymd_and_hms(2025, 5, 5, 7, 30, 0).unwrap();
        WalkRecord::new(
            WalkSubject { subject_id: "user-1".into(), pet_id: "pet-3".into() },
            now,
            now,
            0,
            0.,
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn creating_twice_returns_the_same_walk() {
        let dir = tempfile::tempdir().unwrap();
        let db = WalkDatabase::connect_to(&dir.path().join("walks.db"), Duration::from_secs(5)).await.unwrap();
        let store: &dyn WalkRecordsStore = &db;
        let record = morning_walk();

        let first = store.create(&record).await.unwrap();
        let second = store.create(&record).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(db.get_walk(second).await.unwrap().record, record);
    }

    #[tokio::test]
    async fn retry_after_timeouts_stores_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walks.db");
        let record = morning_walk();

        // Nearly every attempt times out, but some inserts still reach the database
        let impatient = WalkDatabase::connect_to(&path, Duration::from_nanos(1)).await.unwrap();
        for _ in 0..20 {
            let _ = impatient.create(&record).await;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;

        let db = WalkDatabase::connect_to(&path, Duration::from_secs(5)).await.unwrap();
        let walk_id = db.create(&record).await.unwrap();

        let stored = db.list_walks(&crate::database::WalkFilter::subject("user-1")).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].walk_id, walk_id);
    }
}
