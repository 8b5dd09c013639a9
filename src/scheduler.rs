//! Named deferred-callback table.
//!
//! Delayed actions (pulse release, second pulse leg, deferred pulse, idle
//! endstop poll) are expressed as named timers against the injected clock.
//! The controller drains due timers at the start of every tick and
//! dispatches them by name.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Timer Sources                            │
//! │                                                              │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌──────────┐   │
//! │  │ Pulse     │  │ Second    │  │ Pulse     │  │ Endstop  │   │
//! │  │ Release   │  │ Leg       │  │ Window    │  │ Poll     │   │
//! │  └─────┬─────┘  └─────┬─────┘  └─────┬─────┘  └─────┬────┘   │
//! │        │ one-shot     │ one-shot     │ one-shot     │ period │
//! │        ▼              ▼              ▼              ▼        │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            Scheduler::pop_due(now)                     │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │                  CoverController.tick()                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scheduling a name that is already pending replaces it: timers of the
//! same kind supersede, they never stack.

use log::debug;

// ═══════════════════════════════════════════════════════════════
//  Timer types
// ═══════════════════════════════════════════════════════════════

/// Identity of a deferred callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerName {
    /// Turn the relay off at the end of a pulse leg.
    PulseRelease,
    /// Fire the second leg of a double pulse.
    SecondLeg,
    /// Pulse spacing window elapsed; fire the deferred request.
    PulseWindow,
    /// Idle drift check against the endstops.
    EndstopPoll,
}

/// How a timer behaves once it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fire once, then free the slot.
    OneShot,
    /// Fire every `interval_ms` until cancelled.
    Periodic { interval_ms: u64 },
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrent timers (one per [`TimerName`]).
const MAX_TIMERS: usize = 4;

#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    name: TimerName,
    kind: TimerKind,
    due_ms: u64,
}

/// Fixed-capacity timer table.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: [Option<TimerEntry>; MAX_TIMERS],
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot timer `delay_ms` after `now_ms`.
    pub fn set_timeout(&mut self, name: TimerName, now_ms: u64, delay_ms: u64) {
        self.insert(name, TimerKind::OneShot, now_ms.saturating_add(delay_ms));
    }

    /// Arm a one-shot timer at an absolute time.
    pub fn schedule_at(&mut self, name: TimerName, due_ms: u64) {
        self.insert(name, TimerKind::OneShot, due_ms);
    }

    /// Arm a periodic timer whose first firing is one period from now.
    pub fn set_interval(&mut self, name: TimerName, now_ms: u64, interval_ms: u64) {
        let interval_ms = interval_ms.max(1);
        self.insert(
            name,
            TimerKind::Periodic { interval_ms },
            now_ms.saturating_add(interval_ms),
        );
    }

    /// Cancel a pending timer.  Returns whether one was pending.
    pub fn cancel(&mut self, name: TimerName) -> bool {
        match self.slot_of(name) {
            Some(i) => {
                self.timers[i] = None;
                debug!("Scheduler: cancelled {name:?}");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, name: TimerName) -> bool {
        self.slot_of(name).is_some()
    }

    /// Due time of a pending timer.
    pub fn due_at(&self, name: TimerName) -> Option<u64> {
        self.slot_of(name)
            .and_then(|i| self.timers[i].map(|entry| entry.due_ms))
    }

    /// Earliest due time across all pending timers.
    pub fn next_due(&self) -> Option<u64> {
        self.timers.iter().flatten().map(|entry| entry.due_ms).min()
    }

    pub fn active_count(&self) -> usize {
        self.timers.iter().flatten().count()
    }

    /// Take the earliest timer that is due at `now_ms`.
    ///
    /// One-shots are removed; periodic timers are re-armed one period
    /// later, skipping missed periods rather than bursting.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<TimerName> {
        let mut best: Option<usize> = None;
        for (i, slot) in self.timers.iter().enumerate() {
            let Some(entry) = slot else { continue };
            if entry.due_ms > now_ms {
                continue;
            }
            let earlier = match best.and_then(|b| self.timers[b]) {
                Some(current) => entry.due_ms < current.due_ms,
                None => true,
            };
            if earlier {
                best = Some(i);
            }
        }

        let i = best?;
        let entry = self.timers[i]?;
        match entry.kind {
            TimerKind::OneShot => self.timers[i] = None,
            TimerKind::Periodic { interval_ms } => {
                let mut due = entry.due_ms.saturating_add(interval_ms);
                if due <= now_ms {
                    due = now_ms.saturating_add(interval_ms);
                }
                self.timers[i] = Some(TimerEntry { due_ms: due, ..entry });
            }
        }
        Some(entry.name)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn slot_of(&self, name: TimerName) -> Option<usize> {
        self.timers
            .iter()
            .position(|slot| slot.is_some_and(|entry| entry.name == name))
    }

    fn insert(&mut self, name: TimerName, kind: TimerKind, due_ms: u64) {
        let entry = TimerEntry { name, kind, due_ms };
        if let Some(i) = self.slot_of(name) {
            debug!("Scheduler: {name:?} superseded, now due at {due_ms}");
            self.timers[i] = Some(entry);
            return;
        }
        // One slot per name, so a free slot always exists.
        if let Some(slot) = self.timers.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(entry);
        }
    }
}
