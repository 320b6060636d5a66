use std::time::{Duration, Instant};

/// Soft deadline over a monotonic clock.
///
/// Search loops poll [`TimeBudget::is_expired`] once per outer iteration and
/// always let in-flight work finish, so the limit is an upper bound on when
/// a loop stops checking for more work, not a hard deadline.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    started: Instant,
    limit: Option<Duration>,
}

impl TimeBudget {
    /// Starts the clock immediately.
    pub fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn from_duration(limit: Duration) -> Self {
        Self::start(Some(limit))
    }

    pub fn unlimited() -> Self {
        Self::start(None)
    }

    pub fn is_limited(&self) -> bool {
        self.limit.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Remaining time, or `None` for an unlimited budget.
    pub fn remaining(&self) -> Option<Duration> {
        self.limit.map(|limit| limit.saturating_sub(self.elapsed()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().map_or(false, |rest| rest.is_zero())
    }

    /// Fraction of the budget still available in `[0, 1]`; `1.0` for an
    /// unlimited budget. Drives the linear cooling schedule in simulated
    /// annealing.
    pub fn fraction_remaining(&self) -> f64 {
        match (self.limit, self.remaining()) {
            (Some(limit), Some(rest)) if !limit.is_zero() => {
                (rest.as_secs_f64() / limit.as_secs_f64()).clamp(0.0, 1.0)
            }
            (Some(_), _) => 0.0,
            (None, _) => 1.0,
        }
    }
}
