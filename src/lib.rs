//! Impulse cover controller library.
//!
//! Tracks the position of a cover (gate, shutter, garage door) driven by a
//! momentary impulse relay, using travel time and optional endstops, and
//! decides how to pulse the relay to reach a requested position.  Pure
//! logic behind port traits; hosts plug in their own adapters.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod events;
pub mod fsm;
pub mod persistence;
pub mod safety;
pub mod scheduler;
pub mod sensors;

pub use app::commands::CoverCommand;
pub use app::events::{CoverEvent, CoverState};
pub use app::service::{CoverBuilder, CoverController};
pub use config::CoverConfig;
pub use error::{Error, Result};
pub use fsm::{MotionOperation, TriggerOperation};
