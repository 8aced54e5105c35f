//! Confirmation pipeline — drives the alert/confirm/promote state machine.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use bigswitch_core::config::{DEFAULT_ALERT_DURATION, DEFAULT_FAILURE_COOLDOWN};
use bigswitch_core::{ChangeEvent, Shutdown};

use crate::notifier::Notifier;
use crate::promoter::Promoter;

/// Where the pipeline currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// Waiting for the next change event.
    Idle,
    /// Alert is showing; waiting for the button or the deadline.
    AwaitingConfirmation { service: String, artifact: String },
    /// Confirmed; the promotion call is in flight.
    Promoting { service: String, artifact: String },
    /// `run` has returned.
    Stopped,
}

/// Timing knobs for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// How long an alert waits for confirmation.
    pub alert_duration: Duration,
    /// Pause after a failed promotion before going idle again.
    pub failure_cooldown: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            alert_duration: DEFAULT_ALERT_DURATION,
            failure_cooldown: DEFAULT_FAILURE_COOLDOWN,
        }
    }
}

/// Counters reported when the pipeline stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub alerts: u64,
    pub promotions: u64,
    pub failures: u64,
    pub declined: u64,
    pub timeouts: u64,
}

/// How a single confirmation cycle ended.
enum Cycle {
    Done,
    Shutdown,
}

pub struct ConfirmationPipeline<N, P> {
    notifier: N,
    promoter: P,
    settings: PipelineSettings,
    shutdown: Shutdown,
    state: watch::Sender<PipelineState>,
    stats: PipelineStats,
}

impl<N: Notifier, P: Promoter> ConfirmationPipeline<N, P> {
    pub fn new(notifier: N, promoter: P, settings: PipelineSettings, shutdown: Shutdown) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            notifier,
            promoter,
            settings,
            shutdown,
            state,
            stats: PipelineStats::default(),
        }
    }

    /// Observe state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Process change events until shutdown or until the change channel closes.
    pub async fn run(
        mut self,
        mut changes: mpsc::Receiver<ChangeEvent>,
        mut confirmations: mpsc::Receiver<bool>,
    ) -> PipelineStats {
        let mut confirm_open = true;
        info!(
            alert_duration = ?self.settings.alert_duration,
            failure_cooldown = ?self.settings.failure_cooldown,
            "confirmation pipeline started"
        );

        loop {
            let event = tokio::select! {
                biased;
                _ = self.shutdown.wait() => break,
                event = changes.recv() => match event {
                    Some(event) => event,
                    None => {
                        info!("change channel closed");
                        break;
                    }
                },
                press = confirmations.recv(), if confirm_open => {
                    match press {
                        Some(value) => debug!(confirmed = value, "ignoring confirmation while idle"),
                        None => {
                            warn!("confirm source closed");
                            confirm_open = false;
                        }
                    }
                    continue;
                }
            };

            match self.confirm(event, &mut confirmations, &mut confirm_open).await {
                Cycle::Done => self.set_state(PipelineState::Idle),
                Cycle::Shutdown => break,
            }
        }

        self.set_state(PipelineState::Stopped);
        info!(
            alerts = self.stats.alerts,
            promotions = self.stats.promotions,
            failures = self.stats.failures,
            "confirmation pipeline stopped"
        );
        self.stats
    }

    /// One full cycle: alert, wait, maybe promote, reset.
    async fn confirm(
        &mut self,
        event: ChangeEvent,
        confirmations: &mut mpsc::Receiver<bool>,
        confirm_open: &mut bool,
    ) -> Cycle {
        let ChangeEvent { service, artifact } = event;

        // Presses buffered before the alert belong to no event.
        loop {
            match confirmations.try_recv() {
                Ok(value) => debug!(confirmed = value, "discarding stale confirmation"),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    *confirm_open = false;
                    break;
                }
            }
        }

        info!(%service, %artifact, "service changed, waiting for confirmation");
        self.set_state(PipelineState::AwaitingConfirmation {
            service: service.clone(),
            artifact: artifact.clone(),
        });
        self.notifier.alert(&service);
        self.stats.alerts += 1;

        // `sleep` saturates oversized windows.
        let deadline = tokio::time::sleep(self.settings.alert_duration);

        // The deadline is polled before the button so a press landing on
        // the deadline counts as late.
        let confirmed = tokio::select! {
            biased;
            _ = self.shutdown.wait() => {
                debug!(%service, "shutdown while awaiting confirmation");
                self.notifier.reset();
                return Cycle::Shutdown;
            }
            _ = deadline => {
                info!(%service, "confirmation timed out");
                self.stats.timeouts += 1;
                false
            }
            press = confirmations.recv(), if *confirm_open => match press {
                Some(true) => true,
                Some(false) => {
                    info!(%service, "promotion declined");
                    self.stats.declined += 1;
                    false
                }
                None => {
                    warn!(%service, "confirm source closed while awaiting confirmation");
                    *confirm_open = false;
                    false
                }
            },
        };

        if !confirmed {
            self.notifier.reset();
            return Cycle::Done;
        }

        info!(%service, %artifact, "promoting to production");
        self.set_state(PipelineState::Promoting {
            service: service.clone(),
            artifact: artifact.clone(),
        });

        let result = tokio::select! {
            biased;
            _ = self.shutdown.wait() => {
                warn!(%service, %artifact, "shutdown while promoting, outcome unknown");
                self.notifier.reset();
                return Cycle::Shutdown;
            }
            result = self.promoter.promote(&service, &artifact) => result,
        };

        match result {
            Ok(()) => {
                info!(%service, %artifact, "promotion triggered");
                self.stats.promotions += 1;
                self.notifier.success();
            }
            Err(e) => {
                warn!(%service, %artifact, error = %e, "unable to trigger promotion");
                self.stats.failures += 1;
                self.notifier.failure();

                tokio::select! {
                    biased;
                    _ = self.shutdown.wait() => {
                        self.notifier.reset();
                        return Cycle::Shutdown;
                    }
                    _ = tokio::time::sleep(self.settings.failure_cooldown) => {}
                }
            }
        }

        self.notifier.reset();
        Cycle::Done
    }

    fn set_state(&self, next: PipelineState) {
        let prev = self.state.send_replace(next.clone());
        if prev != next {
            debug!(from = ?prev, to = ?next, "pipeline transition");
        }
    }
}
