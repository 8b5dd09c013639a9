//! Open-loop motion control: dead-reckoning position estimate and the
//! pulse decision policy.

pub mod estimator;
pub mod policy;

/// Position reported when nothing better is known.
pub const UNKNOWN_POSITION: f32 = 0.5;

/// Fully closed.
pub const CLOSED_POSITION: f32 = 0.0;

/// Fully open.
pub const OPEN_POSITION: f32 = 1.0;

/// Distance under which two positions are considered the same.
pub const POSITION_TOLERANCE: f32 = 0.01;
