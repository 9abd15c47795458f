use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::Instant;

use super::Reason;

/// A Sliding Log of admission instants.
///
/// Holds at most `limit` instants, oldest first. An instant stays in the log
/// while it is younger than `window`; once `now - t >= window` it no longer
/// counts against the limit.
///
/// The log does no locking and reads no clock: callers pass `now` in and
/// provide their own exclusion.
#[derive(Debug)]
pub struct SlidingLog {
    limit: usize,
    window: Duration,
    admissions: VecDeque<Instant>,
}

impl SlidingLog {
    pub fn new(limit: NonZeroUsize, window: Duration) -> Self {
        Self {
            limit: limit.get(),
            window,
            admissions: VecDeque::new(),
        }
    }

    /// Admits `now` if fewer than `limit` admissions remain inside the window.
    ///
    /// `now` must not be earlier than the most recent admission.
    ///
    /// # Errors
    ///
    /// Returns `Reason::Overloaded` with the time until the oldest admission
    /// ages out when the window is saturated. Nothing is recorded.
    pub fn try_admit(&mut self, now: Instant) -> ControlFlow<Reason> {
        self.evict(now);

        if self.admissions.len() < self.limit {
            self.admissions.push_back(now);
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(Reason::Overloaded {
                retry_after: self.retry_after(now),
            })
        }
    }

    /// Time until a slot frees up, or zero if one is free at `now`.
    pub fn retry_after(&self, now: Instant) -> Duration {
        if self.admissions.len() < self.limit {
            return Duration::ZERO;
        }
        self.admissions
            .front()
            .map(|oldest| {
                self.window
                    .saturating_sub(now.saturating_duration_since(*oldest))
            })
            .unwrap_or(Duration::ZERO)
    }

    /// Number of admissions that could be granted at `now`.
    pub fn available(&mut self, now: Instant) -> usize {
        self.evict(now);
        self.limit - self.admissions.len()
    }

    /// Admission instants still inside the window as of the last update, oldest first.
    pub fn admissions(&self) -> impl Iterator<Item = Instant> + '_ {
        self.admissions.iter().copied()
    }

    // Drops every instant that has aged out, not just the oldest one.
    fn evict(&mut self, now: Instant) {
        while let Some(oldest) = self.admissions.front()
            && now.saturating_duration_since(*oldest) >= self.window
        {
            self.admissions.pop_front();
        }
    }
}
