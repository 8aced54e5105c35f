//! The deploy button.
//!
//! Without GPIO hardware the button is simulated with SIGHUP: every signal
//! the process receives counts as one press.

use std::fmt;
use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bigswitch_core::Shutdown;

const BUTTON_BUFFER: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub pressed: bool,
}

impl ButtonEvent {
    pub fn press() -> Self {
        Self { pressed: true }
    }
}

impl fmt::Display for ButtonEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.pressed { "pressed" } else { "released" };
        write!(f, "button {action}")
    }
}

/// Start the SIGHUP-driven button. The event stream ends on shutdown.
pub fn sighup_button(mut shutdown: Shutdown) -> io::Result<mpsc::Receiver<ButtonEvent>> {
    let mut hangup = signal(SignalKind::hangup())?;
    let (tx, rx) = mpsc::channel(BUTTON_BUFFER);
    info!("button handler initialized (SIGHUP)");

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                sig = hangup.recv() => {
                    if sig.is_none() {
                        break;
                    }
                    if tx.try_send(ButtonEvent::press()).is_err() {
                        debug!("button events backed up, dropping press");
                    }
                }
            }
        }
    });

    Ok(rx)
}

/// Turn button presses into confirmations without ever blocking on the
/// pipeline. A press nobody is waiting for is dropped.
///
/// Returns the number of presses handed to the pipeline.
pub async fn forward_presses(
    mut events: mpsc::Receiver<ButtonEvent>,
    confirm: mpsc::Sender<bool>,
    mut shutdown: Shutdown,
) -> usize {
    let mut forwarded = 0;
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        debug!(%event, "button event");
        if !event.pressed {
            continue;
        }

        match confirm.try_send(true) {
            Ok(()) => forwarded += 1,
            Err(TrySendError::Full(_)) => debug!("press already pending, dropping"),
            Err(TrySendError::Closed(_)) => break,
        }
    }
    forwarded
}

/// Wait for the forwarder spawned by `start`, logging a crashed task.
pub async fn join_forwarder(handle: JoinHandle<usize>) -> Option<usize> {
    match handle.await {
        Ok(forwarded) => {
            debug!(forwarded, "button forwarder stopped");
            Some(forwarded)
        }
        Err(e) => {
            warn!(error = %e, "button forwarder task failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigswitch_core::shutdown_channel;

    #[test]
    fn display_names_action() {
        assert_eq!(ButtonEvent::press().to_string(), "button pressed");
        let released = ButtonEvent { pressed: false };
        assert_eq!(released.to_string(), "button released");
    }

    #[tokio::test]
    async fn only_presses_are_forwarded() {
        let (_trigger, shutdown) = shutdown_channel();
        let (events_tx, events_rx) = mpsc::channel(8);
        let (confirm_tx, mut confirm_rx) = mpsc::channel(8);

        events_tx.send(ButtonEvent::press()).await.unwrap();
        events_tx.send(ButtonEvent { pressed: false }).await.unwrap();
        events_tx.send(ButtonEvent::press()).await.unwrap();
        drop(events_tx);

        let forwarded = forward_presses(events_rx, confirm_tx, shutdown).await;
        assert_eq!(forwarded, 2);
        assert_eq!(confirm_rx.recv().await, Some(true));
        assert_eq!(confirm_rx.recv().await, Some(true));
        assert_eq!(confirm_rx.recv().await, None);
    }

    #[tokio::test]
    async fn full_confirm_buffer_drops_press() {
        let (_trigger, shutdown) = shutdown_channel();
        let (events_tx, events_rx) = mpsc::channel(8);
        let (confirm_tx, mut confirm_rx) = mpsc::channel(1);

        for _ in 0..3 {
            events_tx.send(ButtonEvent::press()).await.unwrap();
        }
        drop(events_tx);

        let forwarded = forward_presses(events_rx, confirm_tx, shutdown).await;
        assert_eq!(forwarded, 1);
        assert_eq!(confirm_rx.recv().await, Some(true));
        assert_eq!(confirm_rx.recv().await, None);
    }

    #[tokio::test]
    async fn shutdown_stops_forwarding() {
        let (trigger, shutdown) = shutdown_channel();
        let (_events_tx, events_rx) = mpsc::channel::<ButtonEvent>(8);
        let (confirm_tx, _confirm_rx) = mpsc::channel(1);

        let task = tokio::spawn(forward_presses(events_rx, confirm_tx, shutdown));
        trigger.fire();
        assert_eq!(task.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn closed_pipeline_stops_forwarding() {
        let (_trigger, shutdown) = shutdown_channel();
        let (events_tx, events_rx) = mpsc::channel(8);
        let (confirm_tx, confirm_rx) = mpsc::channel(1);
        drop(confirm_rx);

        events_tx.send(ButtonEvent::press()).await.unwrap();
        assert_eq!(forward_presses(events_rx, confirm_tx, shutdown).await, 0);
    }

    #[tokio::test]
    async fn join_reports_forwarded_count() {
        let (trigger, shutdown) = shutdown_channel();
        let (_events_tx, events_rx) = mpsc::channel::<ButtonEvent>(8);
        let (confirm_tx, _confirm_rx) = mpsc::channel(1);

        let handle = tokio::spawn(forward_presses(events_rx, confirm_tx, shutdown));
        trigger.fire();
        assert_eq!(join_forwarder(handle).await, Some(0));
    }

    #[tokio::test]
    async fn join_survives_crashed_forwarder() {
        let handle: JoinHandle<usize> = tokio::spawn(async { panic!("forwarder crashed") });
        assert_eq!(join_forwarder(handle).await, None);

        let handle = tokio::spawn(std::future::pending::<usize>());
        handle.abort();
        assert_eq!(join_forwarder(handle).await, None);
    }
}
