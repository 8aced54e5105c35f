//! The call that actually deploys dev to prod.

use std::future::Future;

use bigswitch_core::ReleaseResult;

/// Requests promotion of a dev artifact to prod.
///
/// Called at most once per confirmed event; the pipeline never retries.
pub trait Promoter: Send + Sync {
    fn promote(
        &self,
        service: &str,
        artifact: &str,
    ) -> impl Future<Output = ReleaseResult<()>> + Send;
}
