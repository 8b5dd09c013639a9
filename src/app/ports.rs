//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CoverController (domain)
//! ```
//!
//! Driven adapters (clock, relay, endstops, event sinks, storage) implement
//! these traits.  The [`CoverController`](super::service::CoverController)
//! consumes them via generics, so the domain core never touches hardware or
//! global time directly.

use crate::sensors::endstop::Endstop;

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: time → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond time source.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

impl<C: ClockPort + ?Sized> ClockPort for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → relay)
// ───────────────────────────────────────────────────────────────

/// The single binary output that is pulsed to command the motor.
///
/// Both calls are assumed to succeed.  Adapters over fallible pins log
/// the failure themselves.
pub trait OutputPort {
    fn turn_on(&mut self);
    fn turn_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Endstop port (driven adapter: limit switches → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the optional limit switches.
pub trait EndstopPort {
    /// Raw level of `endstop` before inversion, or `None` when that
    /// switch is not wired.
    fn raw_state(&mut self, endstop: Endstop) -> Option<bool>;
}

/// Endstop port for covers without limit switches.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEndstops;

impl EndstopPort for NoEndstops {
    fn raw_state(&mut self, _endstop: Endstop) -> Option<bool> {
        None
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → automation / logging)
// ───────────────────────────────────────────────────────────────

/// The controller queues [`CoverEvent`](super::events::CoverEvent)s; the
/// host flushes them into a sink.  Adapters decide where they go (log,
/// automation triggers, MQTT, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::CoverEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for the last known cover state.
///
/// Keys are namespaced to prevent collisions between subsystems.
/// Write operations MUST be atomic: no partial writes on power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full (or the read buffer is too small).
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
