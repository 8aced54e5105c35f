//! bigswitch-confirm — the human-in-the-loop half of big-switch.
//!
//! The [`ConfirmationPipeline`] takes one [`ChangeEvent`] at a time off the
//! watcher's channel, alerts the operator, and waits for the button:
//!
//! ```text
//! Idle ──event──▶ AwaitingConfirmation ──true──▶ Promoting ──▶ Idle
//!                        │                            │
//!                        └─ false / deadline / stop ──┴──▶ reset ──▶ Idle
//! ```
//!
//! Only one decision is in flight at a time; other services' events wait
//! in the channel buffer. A press that arrives while idle or after the
//! deadline is dropped and never confirms a later event.
//!
//! [`ChangeEvent`]: bigswitch_core::ChangeEvent

pub mod notifier;
pub mod pipeline;
pub mod promoter;

pub use notifier::Notifier;
pub use pipeline::{ConfirmationPipeline, PipelineSettings, PipelineState, PipelineStats};
pub use promoter::Promoter;
