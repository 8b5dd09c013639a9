//! Sensor subsystem: endstop interpretation.
//!
//! Produces the [`EndstopSnapshot`](endstop::EndstopSnapshot) that gets
//! written into `CoverContext.endstops` before every moving tick.

pub mod endstop;
