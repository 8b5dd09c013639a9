//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing cover events to the `log` facade.
//! An automation-trigger or MQTT adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::CoverEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`CoverEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events logged so far.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &CoverEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            CoverEvent::Started(s) => {
                info!("START | position={:.2} op={:?}", s.position, s.operation);
            }
            CoverEvent::Opening => info!("EVENT | opening"),
            CoverEvent::Closing => info!("EVENT | closing"),
            CoverEvent::Idle => info!("EVENT | idle"),
            CoverEvent::Opened => info!("EVENT | opened"),
            CoverEvent::Closed => info!("EVENT | closed"),
            CoverEvent::SafetyTripped(fault) => warn!("SAFETY | tripped: {fault}"),
            CoverEvent::SafetyReset => info!("SAFETY | reset"),
            CoverEvent::StatePublished(s) => {
                info!("STATE | position={:.2} op={:?}", s.position, s.operation);
            }
        }
    }
}
