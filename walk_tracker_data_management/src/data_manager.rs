use std::sync::Arc;

use walk_tracker_lib::{store::WalkRecordsStore, walk_record::StoredWalk};

use crate::{
    database::{WalkDatabase, WalkFilter},
    Configuration, DataManagerError,
};

#[derive(Clone)]
pub struct DataManager {
    pub(crate) database: WalkDatabase,
}

/// The public interface for stored walks.
impl DataManager {
    pub async fn start(config: &Configuration) -> Result<Self, DataManagerError> {
        // Create the database dir if it doesn't exist
        if let Some(data_dir) = config.database_path.parent() {
            if !data_dir.as_os_str().is_empty() && !data_dir.exists() {
                std::fs::create_dir_all(data_dir)
                    .map_err(|_| DataManagerError::Database(format!("Failed to create data directory: {:?}", data_dir)))?;
            }
        }

        let database = WalkDatabase::connect(config).await?;

        Ok(DataManager { database })
    }

    /// The store handed to a walk session controller.
    pub fn records_store(&self) -> Arc<dyn WalkRecordsStore> {
        Arc::new(self.database.clone())
    }

    pub async fn get_walk(&self, walk_id: i64) -> Result<StoredWalk, DataManagerError> {
        self.database.get_walk(walk_id).await
    }

    pub async fn list_walks(&self, filter: &WalkFilter) -> Result<Vec<StoredWalk>, DataManagerError> {
        self.database.list_walks(filter).await
    }

    pub async fn export_gpx(&self, walk_id: i64) -> Result<String, DataManagerError> {
        let walk = self.get_walk(walk_id).await?;
        crate::gpx_util::write_gpx(&walk)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use walk_tracker_lib::{
        geo_point::GeoPoint,
        path_sample::PathSample,
        walk_record::{WalkRecord, WalkSubject},
    };

    use super::*;

    #[tokio::test]
    async fn creates_missing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Configuration {
            database_path: dir.path().join("nested").join("walks.db"),
            persist_timeout: Duration::from_secs(2),
            ..Default::default()
        };

        let data_manager = DataManager::start(&config).await.unwrap();
        assert!(dir.path().join("nested").exists());

        let start = Utc.with_ymd_and_hms(2025, 6, 3, 6, 0, 0).unwrap();
        let record = WalkRecord::new(
            WalkSubject { subject_id: "user-1".into(), pet_id: "pet-1".into() },
            start,
            start + chrono::Duration::seconds(60),
            60,
            0.,
            vec![PathSample::new(GeoPoint::new(55.68, 12.57).unwrap(), start)],
        );

        let walk_id = data_manager.records_store().create(&record).await.unwrap();
        let listed = data_manager.list_walks(&WalkFilter::subject("user-1")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].walk_id, walk_id);

        let gpx = data_manager.export_gpx(walk_id).await.unwrap();
        assert!(gpx.contains("<trkpt"));
    }
}
