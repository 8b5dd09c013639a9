//! Pulse decision policy
//!
//! Impulse motor controllers cycle OPEN → STOP → CLOSE → STOP on every
//! pulse, so the number of pulses needed to head in a direction depends on
//! where the cover is and which way it last travelled:
//!
//! | requested | situation                              | pulses |
//! |-----------|----------------------------------------|--------|
//! | Idle      | moving                                 | 1      |
//! | Idle      | idle                                   | 0      |
//! | Opening   | already opening                        | 0      |
//! | Opening   | at the open bound                      | 0      |
//! | Opening   | at the closed bound                    | 1      |
//! | Opening   | partial, last travel was not opening   | 1      |
//! | Opening   | partial, last travel was opening       | 2      |
//!
//! Closing mirrors Opening.

use crate::drivers::pulse::PulsePattern;
use crate::fsm::MotionOperation;

use super::{CLOSED_POSITION, OPEN_POSITION};

/// Outcome of [`decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseDecision {
    Pulse(PulsePattern),
    NoPulse(NoPulseReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoPulseReason {
    /// Stop requested while nothing moves.
    AlreadyIdle,
    /// Already travelling in the requested direction.
    AlreadyMoving,
    /// The cover already sits at the requested bound.
    AtBound,
}

/// Decide how to pulse the relay to reach `requested`.
///
/// * `current` - motion the relay was last commanded into.
/// * `last_direction` - last non-idle travel direction.
pub fn decide(
    position: f32,
    current: MotionOperation,
    last_direction: MotionOperation,
    requested: MotionOperation,
) -> PulseDecision {
    let (at_target_bound, at_far_bound) = match requested {
        MotionOperation::Idle => {
            return if current.is_moving() {
                PulseDecision::Pulse(PulsePattern::Single)
            } else {
                PulseDecision::NoPulse(NoPulseReason::AlreadyIdle)
            };
        }
        MotionOperation::Opening => (position >= OPEN_POSITION, position <= CLOSED_POSITION),
        MotionOperation::Closing => (position <= CLOSED_POSITION, position >= OPEN_POSITION),
    };

    if current == requested {
        return PulseDecision::NoPulse(NoPulseReason::AlreadyMoving);
    }
    if at_target_bound {
        return PulseDecision::NoPulse(NoPulseReason::AtBound);
    }
    if at_far_bound || last_direction != requested {
        return PulseDecision::Pulse(PulsePattern::Single);
    }
    PulseDecision::Pulse(PulsePattern::Double)
}
