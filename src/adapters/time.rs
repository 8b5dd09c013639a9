//! Clock adapters.
//!
//! - [`MonotonicClock`] wraps `std::time::Instant` for real-time hosts.
//! - [`SimClock`] is a manually advanced clock for simulation and tests;
//!   clones share the same time.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::app::ports::ClockPort;

/// Milliseconds since construction, from the OS monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl ClockPort for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Shared, manually advanced clock.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Rc<Cell<u64>>,
}

impl SimClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.set(self.now.get().saturating_add(delta_ms));
    }
}

impl ClockPort for SimClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}
