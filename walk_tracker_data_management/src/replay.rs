use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{runtime::Handle, task::JoinHandle, time::MissedTickBehavior};
use walk_session::sampler::{FixSink, LocationSource, Permission, SamplerError, SubscriptionHandle};
use walk_tracker_lib::{geo_point::GeoPoint, path_sample::PathSample};

/// Plays a recorded path back as live fixes, one point per `interval`, stamped with the
/// time they are delivered.
pub struct GpxReplaySource {
    points: Arc<Vec<GeoPoint>>,
    interval: Duration,
    tasks: HashMap<SubscriptionHandle, JoinHandle<()>>,
}

impl GpxReplaySource {
    pub fn new(samples: &[PathSample], interval: Duration) -> Self {
        Self {
            points: Arc::new(samples.iter().map(|sample| sample.point).collect()),
            interval,
            tasks: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl LocationSource for GpxReplaySource {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn watch(&mut self, sink: FixSink) -> Result<(), SamplerError> {
        let runtime = Handle::try_current()
            .map_err(|e| SamplerError::HardwareUnavailable(format!("No runtime to replay on: {}", e)))?;

        let points = self.points.clone();
        let period = self.interval;
        let subscription = sink.subscription();

        let task = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for point in points.iter() {
                interval.tick().await;
                if !sink.fix(PathSample::new(*point, Utc::now())) {
                    tracing::debug!("Replay for {:?} has no listener, stopping", sink.subscription());
                    return;
                }
            }

            tracing::debug!("Replay for {:?} delivered all {} points", sink.subscription(), points.len());
        });

        if let Some(previous) = self.tasks.insert(subscription, task) {
            previous.abort();
        }

        Ok(())
    }

    fn unwatch(&mut self, subscription: SubscriptionHandle) {
        if let Some(task) = self.tasks.remove(&subscription) {
            task.abort();
        }
    }
}

impl Drop for GpxReplaySource {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
