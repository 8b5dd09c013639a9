//! Safety monitor.
//!
//! Protects the motor from rapid reversals and runaway travel.  The
//! controller calls [`SafetyMonitor::check`] every tick **before** the
//! motion FSM while the cover is moving, and [`SafetyMonitor::idle_tick`]
//! while it is idle.
//!
//! ## Fault lifecycle
//!
//! 1. Every direction start adds to the cycle count (2 for a double pulse).
//! 2. While moving, a cycle count at the limit yields
//!    [`SafetyVerdict::CycleLimit`]; the controller stops the motor and
//!    latches [`SafetyFault::CycleLimit`].
//! 3. A motion outlasting the safety timeout yields
//!    [`SafetyVerdict::Timeout`]; the controller forces idle.  Timeouts
//!    only latch a fault when `timeout_trip_after` consecutive ones occur.
//! 4. After `cycle_reset_ms` of idleness the cycle count returns to 0.
//! 5. A latched fault stays set until [`SafetyMonitor::reset`].

use crate::config::CoverConfig;
use crate::drivers::pulse::PulsePattern;
use crate::error::SafetyFault;
use log::{error, info, warn};

/// Result of a [`SafetyMonitor::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyVerdict {
    Ok,
    /// Too many direction starts: stop with a pulse and latch.
    CycleLimit,
    /// Motion ran longer than the safety timeout: force idle, no pulse.
    Timeout,
}

/// Safety monitor.
#[derive(Debug, Clone)]
pub struct SafetyMonitor {
    max_cycles: u8,
    timeout_ms: u64,
    cycle_reset_ms: u64,
    timeout_trip_after: u8,

    /// Latched fault bitmask.
    faults: u8,
    cycle_count: u8,
    consecutive_timeouts: u8,
    last_direction_change_ms: Option<u64>,
    motion_start_ms: Option<u64>,
    idle_since_ms: Option<u64>,
}

impl SafetyMonitor {
    pub fn new(config: &CoverConfig) -> Self {
        Self {
            max_cycles: config.safety_max_cycles,
            timeout_ms: u64::from(config.safety_timeout_ms),
            cycle_reset_ms: u64::from(config.cycle_reset_ms),
            timeout_trip_after: config.timeout_trip_after,
            faults: 0,
            cycle_count: 0,
            consecutive_timeouts: 0,
            last_direction_change_ms: None,
            motion_start_ms: None,
            idle_since_ms: None,
        }
    }

    /// A direction start was pulsed.
    pub fn record_start(&mut self, pattern: PulsePattern, now_ms: u64) {
        self.cycle_count = self.cycle_count.saturating_add(pattern.pulse_count());
        self.motion_start_ms = Some(now_ms);
        self.last_direction_change_ms = Some(now_ms);
        self.idle_since_ms = None;
        info!(
            "SAFETY: cycle {}/{} ({pattern:?})",
            self.cycle_count, self.max_cycles
        );
    }

    /// Motion ended, for whatever reason.
    pub fn record_stop(&mut self, now_ms: u64) {
        self.motion_start_ms = None;
        self.idle_since_ms = Some(now_ms);
    }

    /// Motion ended normally (target or endstop), breaking a timeout streak.
    pub fn record_completion(&mut self) {
        self.consecutive_timeouts = 0;
    }

    /// Evaluate the limits for an active motion.
    pub fn check(&self, now_ms: u64) -> SafetyVerdict {
        if self.cycle_count >= self.max_cycles {
            return SafetyVerdict::CycleLimit;
        }
        match self.motion_start_ms {
            Some(start) if now_ms.saturating_sub(start) > self.timeout_ms => SafetyVerdict::Timeout,
            _ => SafetyVerdict::Ok,
        }
    }

    /// Count a timeout.  Returns `true` when it escalates into a latched
    /// [`SafetyFault::RepeatedTimeout`].
    pub fn record_timeout(&mut self) -> bool {
        self.consecutive_timeouts = self.consecutive_timeouts.saturating_add(1);
        warn!(
            "SAFETY: travel timeout after {}ms ({} in a row)",
            self.timeout_ms, self.consecutive_timeouts
        );
        if self.timeout_trip_after > 0 && self.consecutive_timeouts >= self.timeout_trip_after {
            self.trip(SafetyFault::RepeatedTimeout);
            return true;
        }
        false
    }

    /// Idle housekeeping: reset the cycle count after the cooldown.
    pub fn idle_tick(&mut self, now_ms: u64) {
        let Some(since) = self.idle_since_ms else {
            return;
        };
        if self.cycle_count > 0 && now_ms.saturating_sub(since) >= self.cycle_reset_ms {
            info!(
                "SAFETY: idle for {}ms, cycle count {} reset",
                self.cycle_reset_ms, self.cycle_count
            );
            self.cycle_count = 0;
        }
    }

    /// Latch a fault.
    pub fn trip(&mut self, fault: SafetyFault) {
        if self.faults & fault.mask() == 0 {
            error!("SAFETY FAULT SET: {fault}");
        }
        self.faults |= fault.mask();
    }

    /// Clear every latched fault and the counters.
    pub fn reset(&mut self) {
        if self.faults != 0 {
            info!("SAFETY FAULTS CLEARED (was {:#04x})", self.faults);
        }
        self.faults = 0;
        self.cycle_count = 0;
        self.consecutive_timeouts = 0;
    }

    /// True while any fault is latched.
    pub fn is_tripped(&self) -> bool {
        self.faults != 0
    }

    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    pub fn cycle_count(&self) -> u8 {
        self.cycle_count
    }

    pub fn motion_start_ms(&self) -> Option<u64> {
        self.motion_start_ms
    }

    pub fn last_direction_change_ms(&self) -> Option<u64> {
        self.last_direction_change_ms
    }
}
