//! Domain types shared by the watcher and the confirmation pipeline.

use std::fmt;

/// One deployed build and the time it was deployed.
///
/// `timestamp` is epoch milliseconds as reported by the release manager.
/// Zero means the release manager did not report a deployment time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub name: String,
    pub timestamp: i64,
}

impl Artifact {
    pub fn new(name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            timestamp,
        }
    }

    /// True when nothing has been deployed to this environment yet.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.timestamp)
    }
}

/// A single poll's snapshot of the `dev` and `prod` environments of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub service: String,
    pub dev: Artifact,
    pub prod: Artifact,
}

impl Artifacts {
    /// Whether prod runs an older, different artifact than dev.
    ///
    /// This is the only place that decides whether a promotion is offered.
    pub fn is_prod_behind(&self) -> bool {
        if self.prod.name.is_empty() {
            return false;
        }
        if self.prod.name == self.dev.name {
            return false;
        }
        if self.prod.timestamp == 0 {
            return false;
        }
        if self.prod.timestamp >= self.dev.timestamp {
            return false;
        }
        true
    }
}

/// A request to offer promotion of `artifact` (the dev build) for `service`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub service: String,
    pub artifact: String,
}

impl ChangeEvent {
    pub fn new(service: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            artifact: artifact.into(),
        }
    }
}
