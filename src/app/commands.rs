//! Inbound commands to the cover controller.
//!
//! These represent actions requested by the host automation layer (UI,
//! MQTT, button bindings) that the
//! [`CoverController`](super::service::CoverController) interprets.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoverCommand {
    /// Halt any motion in progress.
    Stop,

    /// Travel to fully open.
    Open,

    /// Travel to fully closed.
    Close,

    /// Travel to a normalized position (0.0 closed, 1.0 open).
    SetPosition(f32),

    /// Stop when moving, otherwise head for the farther bound.
    Toggle,

    /// Clear a latched safety trip and the cycle counter.
    ResetSafety,
}
