use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Source of "time left before the host terminates this invocation"
pub trait TimeBudget: Send + Sync {
    /// Remaining time, zero once the deadline has passed
    fn remaining(&self) -> Duration;
}

/// Deadline on the wall clock, as reported by the Lambda runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallClockDeadline {
    deadline: SystemTime,
}

impl WallClockDeadline {
    /// Deadline at an absolute point in time
    pub fn at(deadline: SystemTime) -> Self {
        Self { deadline }
    }

    /// Deadline given in milliseconds since the Unix epoch
    pub fn from_epoch_millis(millis: u64) -> Self {
        Self::at(UNIX_EPOCH + Duration::from_millis(millis))
    }
}

impl TimeBudget for WallClockDeadline {
    fn remaining(&self) -> Duration {
        self.deadline
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO)
    }
}

/// Deadline on the tokio clock, for in-process callers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstantDeadline {
    deadline: Instant,
}

impl InstantDeadline {
    /// Deadline `budget` from now
    pub fn after(budget: Duration) -> Self {
        Self {
            deadline: Instant::now() + budget,
        }
    }
}

impl TimeBudget for InstantDeadline {
    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Budget that never runs out
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Unbounded;

impl TimeBudget for Unbounded {
    fn remaining(&self) -> Duration {
        Duration::MAX
    }
}
