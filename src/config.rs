//! Cover configuration parameters
//!
//! Travel timings, pulse shaping and safety limits for one impulse cover.
//! Immutable once a controller has been built from it.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound accepted for `safety_max_cycles`.
pub const MAX_SAFETY_CYCLES: u8 = 20;

/// Core cover configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    // --- Travel ---
    /// Full travel time from closed to open (milliseconds)
    pub open_duration_ms: u32,
    /// Full travel time from open to closed (milliseconds)
    pub close_duration_ms: u32,

    // --- Pulses ---
    /// Minimum spacing between pulse rising edges (milliseconds)
    pub pulse_delay_ms: u32,
    /// Relay on-time of a single pulse (milliseconds)
    pub pulse_width_ms: u32,

    // --- Safety ---
    /// Longest allowed single motion before it is forced idle (milliseconds)
    pub safety_timeout_ms: u32,
    /// Direction starts allowed before the cover trips
    pub safety_max_cycles: u8,
    /// Idle time after which the cycle counter resets (milliseconds)
    pub cycle_reset_ms: u32,
    /// Consecutive timeouts that latch a trip (0 = never)
    pub timeout_trip_after: u8,

    // --- Endstops ---
    /// Open endstop reads active-low
    pub open_sensor_inverted: bool,
    /// Close endstop reads active-low
    pub close_sensor_inverted: bool,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            // Travel
            open_duration_ms: 15_000,
            close_duration_ms: 15_000,

            // Pulses
            pulse_delay_ms: 500,
            pulse_width_ms: 100,

            // Safety
            safety_timeout_ms: 60_000,
            safety_max_cycles: 5,
            cycle_reset_ms: 30_000,
            timeout_trip_after: 0,

            // Endstops
            open_sensor_inverted: false,
            close_sensor_inverted: false,
        }
    }
}

impl CoverConfig {
    /// Reject values the controller cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.open_duration_ms == 0 {
            return Err(ConfigError::ValidationFailed("open_duration_ms must be > 0"));
        }
        if self.close_duration_ms == 0 {
            return Err(ConfigError::ValidationFailed("close_duration_ms must be > 0"));
        }
        if self.pulse_delay_ms == 0 {
            return Err(ConfigError::ValidationFailed("pulse_delay_ms must be > 0"));
        }
        if self.pulse_width_ms == 0 {
            return Err(ConfigError::ValidationFailed("pulse_width_ms must be > 0"));
        }
        if self.pulse_width_ms >= self.pulse_delay_ms {
            return Err(ConfigError::ValidationFailed(
                "pulse_width_ms must be shorter than pulse_delay_ms",
            ));
        }
        if self.safety_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("safety_timeout_ms must be > 0"));
        }
        if self.safety_max_cycles == 0 || self.safety_max_cycles > MAX_SAFETY_CYCLES {
            return Err(ConfigError::ValidationFailed(
                "safety_max_cycles must be within 1..=20",
            ));
        }
        if self.cycle_reset_ms == 0 {
            return Err(ConfigError::ValidationFailed("cycle_reset_ms must be > 0"));
        }
        Ok(())
    }

    /// Period of the idle endstop drift poll.
    pub fn endstop_poll_interval_ms(&self) -> u64 {
        u64::from(self.safety_timeout_ms)
    }
}
