//! Quiet-period debouncing of relevance signals.
//!
//! The debouncer owns at most one pending deadline. Scheduling again
//! replaces it (last write wins), so a burst of signals collapses into a
//! single evaluation one quiet period after the last signal.

use std::time::Duration;

use tokio::time::Instant;

/// A cancellable, re-armable quiet-period timer.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet_period: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            deadline: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Cancel any pending deadline and arm a new one from now.
    pub fn schedule(&mut self) {
        self.schedule_at(Instant::now());
    }

    /// Cancel any pending deadline and arm a new one from `now`.
    pub fn schedule_at(&mut self, now: Instant) {
        if self.deadline.is_some() {
            tracing::trace!("Re-arming pending check");
        }
        self.deadline = Some(now + self.quiet_period);
    }

    /// Drop the pending deadline, if any.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has passed at `now`.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Sleep until `deadline`, or forever when there is none.
///
/// Takes the deadline by value so callers can race it in `tokio::select!`
/// without borrowing the debouncer.
pub async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
