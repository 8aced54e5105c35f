//! Drift watcher — one background polling task per watched service.
//!
//! Every task shares the same bounded change channel. Sends never block:
//! when the pipeline is busy and the buffer is full the event is dropped
//! and retried on the next poll.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use bigswitch_core::config::MAX_DURATION;
use bigswitch_core::{ChangeEvent, Shutdown};

use crate::error::WatchError;
use crate::source::StatusSource;
use crate::tracker::{DriftTracker, Verdict};

/// Pending change events the channel holds before producers start dropping.
pub const DEFAULT_CHANGE_BUFFER: usize = 10;

/// What to watch and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSpec {
    pub service: String,
    pub namespace: Option<String>,
    pub polling_interval: Duration,
    /// How long a drift must persist before it is reported. Zero disables.
    pub warmup: Duration,
}

impl WatchSpec {
    pub fn new(service: &str, polling_interval: Duration) -> Self {
        Self {
            service: service.to_string(),
            namespace: None,
            polling_interval,
            warmup: Duration::ZERO,
        }
    }

    pub fn with_namespace(mut self, namespace: Option<&str>) -> Self {
        self.namespace = namespace.filter(|ns| !ns.is_empty()).map(str::to_string);
        self
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    fn validate(&self) -> Result<(), WatchError> {
        if self.service.trim().is_empty() {
            return Err(WatchError::EmptyService);
        }
        if self.polling_interval.is_zero() || self.polling_interval > MAX_DURATION {
            return Err(WatchError::InvalidInterval(self.polling_interval));
        }
        Ok(())
    }
}

struct WatchSlot {
    service: String,
    handle: JoinHandle<()>,
}

/// Watches services for prod falling behind dev.
pub struct DriftWatcher<S> {
    source: Arc<S>,
    /// Template sender cloned into each task. `None` once closed.
    changes: Option<mpsc::Sender<ChangeEvent>>,
    shutdown: Shutdown,
    watches: Vec<WatchSlot>,
}

impl<S: StatusSource> DriftWatcher<S> {
    /// Create a watcher and the receiving end of its change channel.
    pub fn new(source: S, shutdown: Shutdown) -> (Self, mpsc::Receiver<ChangeEvent>) {
        Self::with_capacity(source, shutdown, DEFAULT_CHANGE_BUFFER)
    }

    pub fn with_capacity(
        source: S,
        shutdown: Shutdown,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<ChangeEvent>) {
        debug!(capacity, "initializing drift watcher");
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let watcher = Self {
            source: Arc::new(source),
            changes: Some(tx),
            shutdown,
            watches: Vec::new(),
        };
        (watcher, rx)
    }

    /// Start watching `service` every `polling_interval`.
    pub fn add_watch(
        &mut self,
        service: &str,
        namespace: Option<&str>,
        polling_interval: Duration,
    ) -> Result<(), WatchError> {
        self.watch(WatchSpec::new(service, polling_interval).with_namespace(namespace))
    }

    /// Start a watch described by `spec`.
    pub fn watch(&mut self, spec: WatchSpec) -> Result<(), WatchError> {
        spec.validate()?;
        if self.shutdown.is_fired() {
            return Err(WatchError::Closed);
        }
        let changes = self.changes.clone().ok_or(WatchError::Closed)?;
        if self.is_watching(&spec.service) {
            return Err(WatchError::AlreadyWatched(spec.service));
        }

        let service = spec.service.clone();
        let source = Arc::clone(&self.source);
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            run_watch_loop(source, spec, changes, shutdown).await;
        });

        self.watches.push(WatchSlot { service, handle });
        Ok(())
    }

    /// Services with a watch task that has not exited yet.
    pub fn active_watches(&self) -> Vec<String> {
        self.watches
            .iter()
            .filter(|w| !w.handle.is_finished())
            .map(|w| w.service.clone())
            .collect()
    }

    pub fn is_watching(&self, service: &str) -> bool {
        self.watches
            .iter()
            .any(|w| w.service == service && !w.handle.is_finished())
    }

    /// Wait for every watch task to exit after the shutdown signal fired.
    pub async fn join(mut self) {
        self.changes = None;
        for slot in std::mem::take(&mut self.watches) {
            if let Err(e) = slot.handle.await {
                warn!(service = %slot.service, error = %e, "watch task ended abnormally");
            }
        }
    }
}

impl<S> DriftWatcher<S> {
    /// Stop every watch and release this handle's side of the channel.
    ///
    /// Safe to call repeatedly. The receiver sees the channel close once.
    pub fn close(&mut self) {
        if self.changes.take().is_some() {
            debug!("closing drift watcher");
        }
        for slot in self.watches.drain(..) {
            slot.handle.abort();
            debug!(service = %slot.service, "watch stopped");
        }
    }
}

impl<S> Drop for DriftWatcher<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// The polling loop for a single service.
async fn run_watch_loop<S: StatusSource>(
    source: Arc<S>,
    spec: WatchSpec,
    changes: mpsc::Sender<ChangeEvent>,
    mut shutdown: Shutdown,
) {
    let service = spec.service.as_str();
    let namespace = spec.namespace.as_deref();
    let mut tracker = DriftTracker::new(service, spec.warmup);

    // First poll one interval after start, like a ticker.
    let mut ticker = tokio::time::interval_at(
        Instant::now() + spec.polling_interval,
        spec.polling_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(%service, namespace = ?namespace, interval = ?spec.polling_interval, "starting watch");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.wait() => break,
        }

        let result = tokio::select! {
            result = source.artifacts(service, namespace) => result,
            _ = shutdown.wait() => break,
        };

        let artifacts = match result {
            Ok(a) => a,
            Err(e) => {
                warn!(%service, error = %e, "error when watching service");
                continue;
            }
        };

        match tracker.observe(&artifacts, Instant::now()) {
            Verdict::InSync => {
                debug!(%service, dev = %artifacts.dev, prod = %artifacts.prod, "prod not behind dev");
            }
            Verdict::AlreadyNotified => {
                debug!(%service, prod = %artifacts.prod, "drift already reported, skipping");
            }
            Verdict::WarmingUp { remaining } => {
                debug!(%service, remaining = ?remaining, "drift warming up");
            }
            Verdict::Notify(event) => match changes.try_send(event) {
                Ok(()) => {
                    tracker.mark_notified(&artifacts.prod);
                    info!(
                        %service,
                        prod = %artifacts.prod.name,
                        dev = %artifacts.dev.name,
                        "sending event for possible promotion"
                    );
                }
                Err(TrySendError::Full(_)) => {
                    warn!(%service, "change buffer full, retrying on next poll");
                }
                Err(TrySendError::Closed(_)) => {
                    info!(%service, "change listener gone");
                    break;
                }
            },
        }
    }

    info!(%service, "stopping watch");
}
