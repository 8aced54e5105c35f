//! Per-service drift bookkeeping.
//!
//! Decides, for each poll, whether the snapshot is a drift that should be
//! surfaced to the operator. Pure state: no I/O, no clock reads.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use bigswitch_core::{Artifact, Artifacts, ChangeEvent};

/// Outcome of feeding one snapshot to a [`DriftTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Prod is not behind dev.
    InSync,
    /// Prod is behind, but this prod artifact was already reported.
    AlreadyNotified,
    /// Prod is behind and the drift is waiting out the warmup window.
    WarmingUp { remaining: Duration },
    /// Prod is behind and the operator should be asked.
    Notify(ChangeEvent),
}

/// A drift seen but not yet reported because warmup has not elapsed.
#[derive(Debug, Clone)]
struct PendingDrift {
    prod: Artifact,
    dev: Artifact,
    since: Instant,
}

/// Tracks what has already been reported for a single service.
#[derive(Debug)]
pub struct DriftTracker {
    service: String,
    /// How long a drift must persist before it is reported.
    warmup: Duration,
    /// Prod artifact of the most recent drift that produced an event.
    last_notified: Artifact,
    pending: Option<PendingDrift>,
}

impl DriftTracker {
    pub fn new(service: &str, warmup: Duration) -> Self {
        Self {
            service: service.to_string(),
            warmup,
            last_notified: Artifact::default(),
            pending: None,
        }
    }

    /// Classify a snapshot. Does not record a notification; call
    /// [`DriftTracker::mark_notified`] once the event has been handed off.
    pub fn observe(&mut self, artifacts: &Artifacts, now: Instant) -> Verdict {
        if !artifacts.is_prod_behind() {
            self.pending = None;
            return Verdict::InSync;
        }

        // Keyed on prod: dev moving on under the same stale prod is the
        // same unresolved drift.
        if self.last_notified == artifacts.prod {
            return Verdict::AlreadyNotified;
        }

        if self.warmup.is_zero() {
            return self.notify(artifacts);
        }

        match &self.pending {
            Some(p) if p.prod == artifacts.prod && p.dev == artifacts.dev => {
                let elapsed = now.saturating_duration_since(p.since);
                if elapsed >= self.warmup {
                    self.notify(artifacts)
                } else {
                    Verdict::WarmingUp {
                        remaining: self.warmup - elapsed,
                    }
                }
            }
            _ => {
                debug!(
                    service = %self.service,
                    dev = %artifacts.dev,
                    prod = %artifacts.prod,
                    warmup = ?self.warmup,
                    "drift seen, warming up"
                );
                self.pending = Some(PendingDrift {
                    prod: artifacts.prod.clone(),
                    dev: artifacts.dev.clone(),
                    since: now,
                });
                Verdict::WarmingUp {
                    remaining: self.warmup,
                }
            }
        }
    }

    /// Record that a drift with this prod artifact has been reported.
    pub fn mark_notified(&mut self, prod: &Artifact) {
        self.last_notified = prod.clone();
        self.pending = None;
    }

    pub fn last_notified(&self) -> &Artifact {
        &self.last_notified
    }

    fn notify(&self, artifacts: &Artifacts) -> Verdict {
        Verdict::Notify(ChangeEvent::new(
            self.service.as_str(),
            artifacts.dev.name.as_str(),
        ))
    }
}
