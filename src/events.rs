//! Owned outbound event queue.
//!
//! Events are produced by the controller inside `control()`, `tick()` and
//! endstop notifications, and consumed by the host, which drains them in
//! FIFO order after each call.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ control()   │────▶│              │     │              │
//! │ tick()      │────▶│  EventQueue  │────▶│  Host sink   │
//! │ endstops    │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use heapless::Deque;
use log::warn;

use crate::app::events::CoverEvent;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 16;

/// Bounded FIFO of [`CoverEvent`]s.  When full, the oldest event is
/// dropped so the latest state always gets through.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Deque<CoverEvent, EVENT_QUEUE_CAP>,
    dropped: u32,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event, evicting the oldest one if the queue is full.
    pub fn push(&mut self, event: CoverEvent) {
        if self.events.is_full() {
            if let Some(old) = self.events.pop_front() {
                self.dropped = self.dropped.saturating_add(1);
                warn!("COVER: event queue full, dropped {old:?}");
            }
        }
        // Cannot fail: a slot was freed above if needed.
        let _ = self.events.push_back(event);
    }

    /// Pop the next event in FIFO order.
    pub fn pop(&mut self) -> Option<CoverEvent> {
        self.events.pop_front()
    }

    /// Drain all pending events into a callback.
    pub fn drain(&mut self, mut handler: impl FnMut(CoverEvent)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Events evicted because nobody drained the queue in time.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
