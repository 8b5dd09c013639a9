//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the cover controller: command handling, motion
//! orchestration, safety enforcement and state publication.  All
//! interaction with hardware and time happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable with a fake
//! clock and recording mocks.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
