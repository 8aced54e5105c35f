//! Scheduled kill switch: stop the daemon at the configured cron time and
//! let the supervisor bring it back.

use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use cron::Schedule;
use tracing::{info, warn};

/// Time from `now` until the next scheduled restart.
pub fn next_delay<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> Option<Duration> {
    let next = schedule.after(now).next()?;
    next.signed_duration_since(now.clone()).to_std().ok()
}

/// Resolve when the next restart is due. Never resolves without a schedule.
pub async fn wait_for_restart(schedule: Option<&Schedule>) {
    let Some(schedule) = schedule else {
        return std::future::pending().await;
    };

    match next_delay(schedule, &Local::now()) {
        Some(delay) => {
            info!(in_secs = delay.as_secs(), "next scheduled restart");
            tokio::time::sleep(delay).await;
        }
        None => {
            warn!("restart schedule has no upcoming time, kill switch inactive");
            std::future::pending::<()>().await;
        }
    }
}
