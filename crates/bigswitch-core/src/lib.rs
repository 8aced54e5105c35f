//! bigswitch-core — shared data model for the big-switch deployer.
//!
//! Holds the artifact snapshot types exchanged between the drift watcher
//! and the confirmation pipeline, the `big-switch.toml` config parser, the
//! error types shared by the release-manager adapters, and the single-fire
//! shutdown signal every long-running task listens on.

pub mod config;
pub mod error;
pub mod shutdown;
pub mod types;

pub use config::{Config, PipelineConfig, ReleaseManagerConfig, ServiceConfig};
pub use error::{ConfigError, ConfigResult, ReleaseError, ReleaseResult};
pub use shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};
pub use types::*;
