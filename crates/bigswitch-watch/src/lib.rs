//! bigswitch-watch — drift detection between the `dev` and `prod` artifacts
//! of watched services.
//!
//! # Architecture
//!
//! ```text
//! DriftWatcher
//!   ├── Per-service background task
//!   │   ├── StatusSource::artifacts() every polling interval
//!   │   ├── DriftTracker (dedup on prod artifact, optional warmup)
//!   │   └── try_send(ChangeEvent) → shared bounded channel
//!   └── Shutdown signal stops every task; the channel closes once the
//!       last task and the watcher handle have let go of it
//! ```
//!
//! A drift is reported once per stale prod artifact. Fetch errors are
//! logged and retried on the next tick; they never reset the dedup state.

pub mod error;
pub mod source;
pub mod tracker;
pub mod watcher;

pub use error::WatchError;
pub use source::StatusSource;
pub use tracker::{DriftTracker, Verdict};
pub use watcher::{DriftWatcher, WatchSpec, DEFAULT_CHANGE_BUFFER};
