//! `bigswitchd start` — watch every configured service and promote on
//! button press.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::info;

use bigswitch_confirm::{ConfirmationPipeline, PipelineSettings};
use bigswitch_core::shutdown_channel;
use bigswitch_release::ReleaseClient;
use bigswitch_watch::{DriftWatcher, WatchSpec};

use crate::button;
use crate::notifier::LogNotifier;
use crate::restart;

/// Presses are forwarded with `try_send`; one slot is enough for a human.
const CONFIRM_BUFFER: usize = 1;

pub async fn run(path: &Path) -> Result<()> {
    let config = super::load_config(path)?;
    info!(config = %path.display(), services = config.services.len(), "big-switch starting");

    let client = ReleaseClient::from_config(
        &config.release_manager,
        config.release_manager.request_timeout()?,
    )
    .context("building release manager client")?;

    let restart_schedule = config.restart_schedule()?;
    match &config.restart_cron {
        Some(expr) if restart_schedule.is_some() => info!(cron = %expr, "scheduling kill switch"),
        _ => info!("restart cron is not set, kill switch inactive"),
    }

    let (trigger, shutdown) = shutdown_channel();

    // ── Drift watcher ──────────────────────────────────────────

    let (mut watcher, changes) = DriftWatcher::new(client.clone(), shutdown.clone());
    for service in &config.services {
        let spec = WatchSpec::new(&service.name, service.polling_interval()?)
            .with_namespace(service.namespace())
            .with_warmup(service.warmup()?);
        watcher
            .watch(spec)
            .with_context(|| format!("watching {}", service.name))?;
    }

    // ── Button ─────────────────────────────────────────────────

    let (confirm_tx, confirm_rx) = mpsc::channel(CONFIRM_BUFFER);
    let presses = button::sighup_button(shutdown.clone()).context("installing SIGHUP handler")?;
    let forwarder = tokio::spawn(button::forward_presses(presses, confirm_tx, shutdown.clone()));
    info!(pid = std::process::id(), "send SIGHUP to press the button");

    // ── Confirmation pipeline ──────────────────────────────────

    let settings = PipelineSettings {
        alert_duration: config.pipeline.alert_duration()?,
        failure_cooldown: config.pipeline.failure_cooldown()?,
    };
    let notifier = LogNotifier::from_config(&config);
    let pipeline = ConfirmationPipeline::new(notifier, client, settings, shutdown);
    let mut pipeline = tokio::spawn(pipeline.run(changes, confirm_rx));

    // ── Wait for a stop signal ─────────────────────────────────

    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let finished = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("listening for Ctrl-C")?;
            info!("interrupt received");
            None
        }
        _ = terminate.recv() => {
            info!("terminate received");
            None
        }
        _ = restart::wait_for_restart(restart_schedule.as_ref()) => {
            info!("executing scheduled restart");
            None
        }
        res = &mut pipeline => Some(res),
    };

    trigger.fire();
    watcher.join().await;
    let stats = match finished {
        Some(res) => res?,
        None => pipeline.await?,
    };
    button::join_forwarder(forwarder).await;

    info!(
        alerts = stats.alerts,
        promotions = stats.promotions,
        failures = stats.failures,
        declined = stats.declined,
        timeouts = stats.timeouts,
        "big-switch stopped"
    );
    Ok(())
}
