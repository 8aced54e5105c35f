//! bigswitch-release — HTTP adapter for the release manager.
//!
//! A single [`ReleaseClient`] serves both sides of the appliance:
//!
//! ```text
//! ReleaseClient
//!   ├── GET  {base}/status?service=..&namespace=..  → Artifacts   (StatusSource)
//!   └── POST {base}/release                          → promotion   (Promoter)
//! ```
//!
//! Every request opens a fresh HTTP/1.1 connection and carries the bearer
//! token and caller e-mail the release manager uses for auditing. Only
//! plain `http` base URLs are supported.

pub mod client;
pub mod promote;
pub mod status;

pub use client::ReleaseClient;
