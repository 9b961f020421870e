//! Time source abstraction
//!
//! The engine never calls `Instant::now()` directly. Timestamps are plain
//! `Duration`s since an arbitrary epoch, read through [`Clock`], so the test
//! harness can drive throttle, fail-safe, and watchdog timing
//! deterministically.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time since construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            origin: Instant::now(),
        })
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock for tests and scripted harness runs.
///
/// `auto_step` is added on every `now()` read, which lets a test make a
/// single batch pass appear to take longer than the watchdog threshold
/// without instrumenting the batch loop itself.
pub struct ManualClock {
    now: Cell<Duration>,
    auto_step: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            now: Cell::new(Duration::ZERO),
            auto_step: Cell::new(Duration::ZERO),
        })
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set_auto_step(&self, step: Duration) {
        self.auto_step.set(step);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let at = self.now.get();
        self.now.set(at + self.auto_step.get());
        at
    }
}
