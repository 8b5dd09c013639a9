//! Outbound cover events.
//!
//! The [`CoverController`](super::service::CoverController) queues these
//! and the host drains them into an [`EventSink`](super::ports::EventSink).
//! Adapters on the other side decide what to do with them: fire
//! automation triggers, log, publish to a UI, etc.

use crate::error::SafetyFault;
use crate::fsm::MotionOperation;

/// Structured events emitted by the cover controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoverEvent {
    /// The controller has started (carries the initial state).
    Started(CoverState),

    /// Motion towards open began.
    Opening,

    /// Motion towards closed began.
    Closing,

    /// Motion ended, for whatever reason.
    Idle,

    /// Motion ended at the open bound.
    Opened,

    /// Motion ended at the closed bound.
    Closed,

    /// A safety limit latched; motion is blocked until reset.
    SafetyTripped(SafetyFault),

    /// The safety latch and cycle counter were cleared.
    SafetyReset,

    /// Position or operation changed enough to be worth republishing.
    StatePublished(CoverState),
}

/// A point-in-time cover state suitable for publishing to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverState {
    pub position: f32,
    pub operation: MotionOperation,
}
