//! Time-based position estimator
//!
//! Integrates elapsed motion time into a normalized position, assuming a
//! constant travel speed.  Integration is incremental from the previous
//! recompute, so clamping at a bound never accumulates error.

use crate::config::CoverConfig;
use crate::fsm::MotionOperation;

use super::{CLOSED_POSITION, OPEN_POSITION};

/// Dead-reckoning position estimator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionEstimator {
    last_recompute_ms: Option<u64>,
}

impl PositionEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin integrating from `start_ms`.  A start in the future (travel
    /// begins with a deferred pulse) holds the position until then.
    pub fn start(&mut self, start_ms: u64) {
        self.last_recompute_ms = Some(start_ms);
    }

    /// Stop integrating; the next `advance` without `start` is a no-op.
    pub fn stop(&mut self) {
        self.last_recompute_ms = None;
    }

    pub fn is_running(&self) -> bool {
        self.last_recompute_ms.is_some()
    }

    /// Advance `position` by the travel covered since the last call.
    pub fn advance(
        &mut self,
        now_ms: u64,
        position: f32,
        operation: MotionOperation,
        config: &CoverConfig,
    ) -> f32 {
        let Some(last) = self.last_recompute_ms else {
            return position;
        };
        if now_ms <= last {
            return position;
        }
        let elapsed = now_ms - last;
        self.last_recompute_ms = Some(now_ms);

        let next = match operation {
            MotionOperation::Opening => position + progress(elapsed, config.open_duration_ms),
            MotionOperation::Closing => position - progress(elapsed, config.close_duration_ms),
            MotionOperation::Idle => position,
        };
        next.clamp(CLOSED_POSITION, OPEN_POSITION)
    }
}

/// Fraction of full travel covered in `elapsed_ms`.
pub fn progress(elapsed_ms: u64, duration_ms: u32) -> f32 {
    if duration_ms == 0 {
        return OPEN_POSITION;
    }
    elapsed_ms as f32 / duration_ms as f32
}
