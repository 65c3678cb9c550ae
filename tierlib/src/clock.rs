use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// The single source of time used by the backends and the engine
///
/// Readings are relative to an arbitrary origin and must never go backwards. Only differences
/// between two readings are meaningful
pub trait Clock {
    fn now(&self) -> Duration;

    /// Time elapsed since an earlier reading of this clock
    fn since(&self, earlier: Duration) -> Duration {
        self.now().saturating_sub(earlier)
    }
}

/// Wall clock backed by [`Instant`], used outside of tests
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic clock for tests
///
/// Time only moves when [`ManualClock::advance`] is called, or by a fixed step on every reading
/// when created with [`ManualClock::with_step`]. Stepping on every reading means each timed
/// section (one reading at the start, one at the end) takes exactly one step
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
    step_nanos: u64,
}

impl ManualClock {
    /// A clock that stands still until advanced
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(step: Duration) -> Self {
        Self {
            nanos: AtomicU64::new(0),
            step_nanos: step.as_nanos() as u64,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let reading = self.nanos.fetch_add(self.step_nanos, Ordering::Relaxed);
        Duration::from_nanos(reading)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}
