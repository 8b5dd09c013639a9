//! Shared mutable context threaded through every FSM handler.
//!
//! `CoverContext` is the single struct that state handlers read from and
//! write to: position and target, the latest endstop snapshot, the
//! estimator, configuration, and requests back to the controller.  Think
//! of it as the "blackboard" in a blackboard architecture.

use crate::config::CoverConfig;
use crate::control::estimator::PositionEstimator;
use crate::sensors::endstop::EndstopSnapshot;

use super::{MotionOperation, TriggerOperation};

/// The blackboard shared by the controller and the state handlers.
#[derive(Debug, Clone)]
pub struct CoverContext {
    // --- Timing ---
    /// Clock time of the current call (set by the controller).
    pub now_ms: u64,

    // --- Position ---
    /// Estimated position, 0.0 closed to 1.0 open.
    pub position: f32,
    /// Position the current request wants to reach.
    pub target_position: f32,
    pub estimator: PositionEstimator,

    // --- Intent ---
    pub trigger: TriggerOperation,
    /// Last non-idle travel direction.
    pub last_direction: MotionOperation,

    // --- Inputs ---
    /// Endstop levels after inversion, refreshed before each moving tick.
    pub endstops: EndstopSnapshot,

    // --- Requests to the controller ---
    stop_pulse_requested: bool,

    pub config: CoverConfig,
}

impl CoverContext {
    pub fn new(config: CoverConfig, position: f32) -> Self {
        let position = position.clamp(0.0, 1.0);
        Self {
            now_ms: 0,
            position,
            target_position: position,
            estimator: PositionEstimator::new(),
            trigger: TriggerOperation::Idle,
            last_direction: MotionOperation::Idle,
            endstops: EndstopSnapshot::default(),
            stop_pulse_requested: false,
            config,
        }
    }

    /// Ask the controller for a stop pulse after this tick.
    pub fn request_stop_pulse(&mut self) {
        self.stop_pulse_requested = true;
    }

    /// Consume a pending stop-pulse request.
    pub fn take_stop_pulse_request(&mut self) -> bool {
        core::mem::take(&mut self.stop_pulse_requested)
    }
}
