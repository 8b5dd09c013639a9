//! Unified error types for the impulse cover controller.
//!
//! A single `Error` enum that every fallible entry point converts into.
//! Routine conditions (deferred pulses, rejected commands, sensor noise)
//! are logged by the controller and never surface here.

use core::fmt;

pub use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The controller could not be constructed (e.g. no relay output).
    Init(&'static str),
    /// Configuration failed validation.
    Config(ConfigError),
    /// The storage backend failed.
    Storage(StorageError),
    /// A persisted snapshot could not be encoded or decoded.
    Snapshot(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Snapshot(msg) => write!(f, "snapshot: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field is outside its allowed range.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Latched safety conditions.  Accumulated in a bitfield by the
/// [`SafetyMonitor`](crate::safety::SafetyMonitor); any set bit blocks
/// new motion until an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyFault {
    /// Too many direction starts without an idle cooldown.
    CycleLimit = 0b0000_0001,
    /// Consecutive travel timeouts reached the escalation limit.
    RepeatedTimeout = 0b0000_0010,
}

impl SafetyFault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycleLimit => write!(f, "cycle limit reached"),
            Self::RepeatedTimeout => write!(f, "repeated travel timeout"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;
