//! Errors returned when registering a watch.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatchError {
    #[error("service name must not be empty")]
    EmptyService,

    #[error("polling interval must be positive and at most a week, got {0:?}")]
    InvalidInterval(Duration),

    #[error("service {0} is already watched")]
    AlreadyWatched(String),

    #[error("watcher is closed")]
    Closed,
}
