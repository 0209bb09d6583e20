use embassy_time::{Duration, Instant};

/// A one-shot interval timer that must be explicitly re-armed.
///
/// The debounce state machine holds at most one of these running at a time. Implementations only need to count
/// down and report expiry; they never call back.
pub trait IntervalTimer {
    /// Arms the timer to expire `interval` from now. Callers stop a running timer before re-arming it.
    fn start(&mut self, interval: Duration);

    /// Disarms the timer. A stopped timer neither runs nor reports expiry.
    fn stop(&mut self);

    /// Whether the timer is armed and has not yet expired.
    fn is_running(&self) -> bool;

    /// Whether the armed interval has elapsed. Stays true until the timer is stopped or re-armed.
    fn has_expired(&self) -> bool;
}

/// An [`IntervalTimer`] driven by Embassy's time driver.
///
/// Rather than waiting on an alarm it records a deadline, so it can be polled from a loop without an executor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeadlineTimer {
    deadline: Option<Instant>,
}

impl DeadlineTimer {
    /// Construct a disarmed timer.
    pub const fn new() -> Self {
        Self { deadline: None }
    }
}

impl IntervalTimer for DeadlineTimer {
    fn start(&mut self, interval: Duration) {
        self.deadline = Some(Instant::now().saturating_add(interval));
    }

    fn stop(&mut self) {
        self.deadline = None;
    }

    fn is_running(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() < deadline)
    }

    fn has_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}
