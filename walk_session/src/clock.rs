use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::time::{Interval, MissedTickBehavior};

pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct ClockRun {
    started_at: DateTime<Utc>,
    // Highest elapsed value handed out, so a wall clock stepping backwards never shows
    high_water: AtomicU64,
    stopped: Option<(DateTime<Utc>, u64)>,
}

/// Elapsed time of a session, always computed as `now - started_at`.
pub struct SessionClock {
    time: Arc<dyn TimeSource>,
    run: Option<ClockRun>,
}

impl SessionClock {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            time,
            run: None,
        }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemTimeSource))
    }

    /// Starts a fresh run, discarding any previous one. Returns the start time.
    pub fn start(&mut self) -> DateTime<Utc> {
        let started_at = self.time.now();
        self.run = Some(ClockRun {
            started_at,
            high_water: AtomicU64::new(0),
            stopped: None,
        });
        started_at
    }

    /// Whole seconds since start. Frozen after `stop`, zero when never started.
    pub fn elapsed_seconds(&self) -> u64 {
        let Some(run) = &self.run else {
            return 0;
        };

        if let Some((_, elapsed)) = run.stopped {
            return elapsed;
        }

        let elapsed = (self.time.now() - run.started_at).num_seconds().max(0) as u64;
        run.high_water.fetch_max(elapsed, Ordering::Relaxed).max(elapsed)
    }

    /// Freezes the clock and returns the final elapsed seconds. Idempotent.
    pub fn stop(&mut self) -> u64 {
        let elapsed = self.elapsed_seconds();
        let now = self.time.now();

        match &mut self.run {
            Some(run) => {
                if run.stopped.is_none() {
                    run.stopped = Some((now, elapsed));
                }
                elapsed
            }
            None => 0,
        }
    }

    pub fn reset(&mut self) {
        self.run = None;
    }

    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(|run| run.stopped.is_none())
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.run.as_ref().map(|run| run.started_at)
    }

    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.run.as_ref().and_then(|run| run.stopped.map(|(at, _)| at))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }
}

/// Display refresh ticks. Purely cosmetic, elapsed time never depends on them.
pub fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ManualTime;

    #[test]
    fn elapsed_follows_wall_clock() {
        let time = ManualTime::new();
        let mut clock = SessionClock::new(Arc::new(time.clone()));

        assert_eq!(clock.elapsed_seconds(), 0);
        let started_at = clock.start();
        assert_eq!(clock.started_at(), Some(started_at));

        time.advance_secs(1);
        time.advance_millis(999);
        assert_eq!(clock.elapsed_seconds(), 1);

        // A throttled host that did not tick for ten minutes still reads right
        time.advance_secs(600);
        assert_eq!(clock.elapsed_seconds(), 601);
    }

    #[test]
    fn stop_freezes_and_is_idempotent() {
        let time = ManualTime::new();
        let mut clock = SessionClock::new(Arc::new(time.clone()));
        clock.start();

        time.advance_secs(42);
        assert_eq!(clock.stop(), 42);
        let stopped_at = clock.stopped_at();

        time.advance_secs(100);
        assert_eq!(clock.stop(), 42);
        assert_eq!(clock.elapsed_seconds(), 42);
        assert_eq!(clock.stopped_at(), stopped_at);
        assert!(!clock.is_running());
    }

    #[test]
    fn never_goes_backwards() {
        let time = ManualTime::new();
        let mut clock = SessionClock::new(Arc::new(time.clone()));
        clock.start();

        time.advance_secs(30);
        assert_eq!(clock.elapsed_seconds(), 30);

        time.rewind_secs(20);
        assert_eq!(clock.elapsed_seconds(), 30);

        time.rewind_secs(60);
        assert_eq!(clock.elapsed_seconds(), 30);
    }

    #[test]
    fn reset_clears_run() {
        let time = ManualTime::new();
        let mut clock = SessionClock::new(Arc::new(time.clone()));
        clock.start();
        time.advance_secs(5);
        clock.reset();

        assert_eq!(clock.elapsed_seconds(), 0);
        assert_eq!(clock.stop(), 0);
        assert_eq!(clock.started_at(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_skips_missed_ticks() {
        let mut ticks = ticker(Duration::from_secs(1));
        ticks.tick().await;

        tokio::time::advance(Duration::from_millis(3500)).await;
        ticks.tick().await;
        let before = tokio::time::Instant::now();
        ticks.tick().await;
        assert!(tokio::time::Instant::now() > before);
    }
}
