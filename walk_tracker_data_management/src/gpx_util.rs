use std::{io::Read, path::Path, str::FromStr, time::SystemTime};

use chrono::{DateTime, Utc};
use gpx::{Gpx, GpxVersion, Time, Track, TrackSegment, Waypoint};
use time::OffsetDateTime;
use walk_tracker_lib::{geo_point::GeoPoint, path_sample::PathSample, walk_record::StoredWalk};

use crate::DataManagerError;

pub fn read_gpx(path: &Path) -> Result<Vec<PathSample>, DataManagerError> {
    let file = std::fs::File::open(path)
        .map_err(|e| DataManagerError::Gpx(format!("Failed to open {:?}: {}", path, e)))?;
    read_gpx_from(std::io::BufReader::new(file))
}

/// Every track point of every segment, in file order. Points without a timestamp take the
/// metadata time, or the epoch when that is missing too.
pub fn read_gpx_from<R: Read>(reader: R) -> Result<Vec<PathSample>, DataManagerError> {
    let gpx = gpx::read(reader).map_err(|e| DataManagerError::Gpx(format!("Failed to parse gpx: {}", e)))?;

    let mut fallback_time = DateTime::UNIX_EPOCH;
    if let Some(t) = gpx.metadata.as_ref().and_then(|meta| meta.time.as_ref()) {
        fallback_time = parse_time(t)?;
    }

    let mut samples = Vec::new();
    for track in gpx.tracks {
        for segment in track.segments {
            for point in segment.points {
                let timestamp = match point.time.as_ref() {
                    Some(t) => parse_time(t)?,
                    None => fallback_time,
                };
                let geo_point = GeoPoint::try_from(point.point())
                    .map_err(|e| DataManagerError::Gpx(format!("Invalid track point: {}", e)))?;
                samples.push(PathSample::new(geo_point, timestamp));
            }
        }
    }

    Ok(samples)
}

pub fn write_gpx(walk: &StoredWalk) -> Result<String, DataManagerError> {
    let record = &walk.record;

    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("walk-cli".into()),
        ..Default::default()
    };

    gpx.metadata = Some(gpx::Metadata {
        name: Some(format!("Walk {}", walk.walk_id)),
        description: record.note().map(str::to_string),
        time: Some(to_gpx_time(record.started_at())),
        ..Default::default()
    });

    let mut track = Track::new();
    track.name = Some(record.pet_id().to_string());
    let mut segment = TrackSegment::new();

    for sample in record.path() {
        let mut wp = Waypoint::new(sample.point.into());
        wp.time = Some(to_gpx_time(sample.timestamp));
        segment.points.push(wp);
    }

    track.segments.push(segment);
    gpx.tracks.push(track);

    let mut buf = Vec::new();
    gpx::write(&gpx, &mut buf).map_err(|e| DataManagerError::Gpx(format!("Failed to write gpx: {}", e)))?;
    String::from_utf8(buf).map_err(|e| DataManagerError::Gpx(format!("Gpx output is not utf-8: {}", e)))
}

fn parse_time(t: &Time) -> Result<DateTime<Utc>, DataManagerError> {
    let formatted = t.format().map_err(|e| DataManagerError::Gpx(format!("Failed to format time: {}", e)))?;
    DateTime::from_str(&formatted).map_err(|e| DataManagerError::Gpx(format!("Invalid time {}: {}", formatted, e)))
}

fn to_gpx_time(timestamp: DateTime<Utc>) -> Time {
    let time: SystemTime = timestamp.into();
    let time: OffsetDateTime = time.into();
    Time::from(time)
}
