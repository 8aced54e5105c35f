//! Operator feedback sink.

/// Visual feedback for the operator (lamp, display, log).
///
/// Calls must not block: implementations queue their own animations and
/// own whatever device lock they need.
pub trait Notifier: Send + Sync {
    /// A promotion for `service` is waiting for confirmation.
    fn alert(&self, service: &str);
    /// The promotion request was accepted.
    fn success(&self);
    /// The promotion request failed.
    fn failure(&self);
    /// Back to idle.
    fn reset(&self);
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn alert(&self, service: &str) {
        (**self).alert(service)
    }

    fn success(&self) {
        (**self).success()
    }

    fn failure(&self) {
        (**self).failure()
    }

    fn reset(&self) {
        (**self).reset()
    }
}
