//! Where the watcher gets its artifact snapshots from.

use std::future::Future;

use bigswitch_core::{Artifacts, ReleaseResult};

/// Reports the current `dev` and `prod` artifacts of a service.
///
/// Implemented over HTTP by `bigswitch-release`; tests script it directly.
pub trait StatusSource: Send + Sync + 'static {
    fn artifacts(
        &self,
        service: &str,
        namespace: Option<&str>,
    ) -> impl Future<Output = ReleaseResult<Artifacts>> + Send;
}
