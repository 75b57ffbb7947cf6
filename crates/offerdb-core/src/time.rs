use chrono::{DateTime, Utc};

/// The instant a batch runs at. Passed explicitly into normalization,
/// matching and persistence so results never depend on the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeContext {
    pub now: DateTime<Utc>,
}

impl TimeContext {
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Captures the current wall-clock time. Only binaries should call this.
    #[must_use]
    pub fn wall_clock() -> Self {
        Self { now: Utc::now() }
    }
}
