use tokio::sync::mpsc;
use tracing::{debug, info};
use walk_tracker_lib::path_sample::PathSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// The user has not been asked yet
    Prompt,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SamplerError {
    #[error("location permission not granted")]
    PermissionDenied,
    #[error("location permission was revoked")]
    PermissionRevoked,
    #[error("location hardware unavailable: {0}")]
    HardwareUnavailable(String),
    #[error("location fix failed: {0}")]
    Fix(String),
    #[error("a location subscription is already active")]
    AlreadySubscribed,
}

impl SamplerError {
    /// A single failed fix is survivable, everything else ends the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SamplerError::Fix(_))
    }
}

/// Identifies one `start` of the sampler. Events from an earlier subscription carry an
/// older handle and can be told apart from live ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerEvent {
    pub subscription: SubscriptionHandle,
    pub fix: Result<PathSample, SamplerError>,
}

/// Write end handed to a [`LocationSource`] for one subscription.
#[derive(Debug, Clone)]
pub struct FixSink {
    subscription: SubscriptionHandle,
    events: mpsc::UnboundedSender<SamplerEvent>,
}

impl FixSink {
    pub fn subscription(&self) -> SubscriptionHandle {
        self.subscription
    }

    /// Returns false once nobody is listening anymore.
    pub fn fix(&self, sample: PathSample) -> bool {
        self.send(Ok(sample))
    }

    pub fn error(&self, error: SamplerError) -> bool {
        self.send(Err(error))
    }

    fn send(&self, fix: Result<PathSample, SamplerError>) -> bool {
        self.events
            .send(SamplerEvent {
                subscription: self.subscription,
                fix,
            })
            .is_ok()
    }
}

/// The platform's continuous location primitive.
pub trait LocationSource: Send {
    fn permission(&self) -> Permission;

    /// Start delivering fixes into `sink` until `unwatch` is called for its subscription.
    fn watch(&mut self, sink: FixSink) -> Result<(), SamplerError>;

    fn unwatch(&mut self, subscription: SubscriptionHandle);
}

/// Owns the one OS-level location subscription.
pub struct GeoSampler {
    source: Box<dyn LocationSource>,
    events: mpsc::UnboundedSender<SamplerEvent>,
    active: Option<SubscriptionHandle>,
    next_id: u64,
}

impl GeoSampler {
    /// Returns the sampler and the stream its fixes arrive on.
    pub fn new(source: Box<dyn LocationSource>) -> (Self, mpsc::UnboundedReceiver<SamplerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();

        let sampler = Self {
            source,
            events,
            active: None,
            next_id: 0,
        };

        (sampler, receiver)
    }

    pub fn start(&mut self) -> Result<SubscriptionHandle, SamplerError> {
        if self.active.is_some() {
            return Err(SamplerError::AlreadySubscribed);
        }

        if self.source.permission() != Permission::Granted {
            return Err(SamplerError::PermissionDenied);
        }

        self.next_id += 1;
        let subscription = SubscriptionHandle(self.next_id);

        self.source.watch(FixSink {
            subscription,
            events: self.events.clone(),
        })?;

        self.active = Some(subscription);
        info!("Location subscription {:?} started", subscription);

        Ok(subscription)
    }

    /// Safe to call any number of times, and with handles that are no longer current.
    pub fn stop(&mut self, subscription: SubscriptionHandle) {
        if self.active != Some(subscription) {
            debug!("Ignoring stop for inactive subscription {:?}", subscription);
            return;
        }

        self.source.unwatch(subscription);
        self.active = None;
        info!("Location subscription {:?} stopped", subscription);
    }

    pub fn active(&self) -> Option<SubscriptionHandle> {
        self.active
    }

    pub fn is_current(&self, subscription: SubscriptionHandle) -> bool {
        self.active == Some(subscription)
    }
}
