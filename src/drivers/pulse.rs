//! Impulse relay driver.
//!
//! Turns single and double pulse requests into timed on/off edges on the
//! relay output.  Each leg is `turn_on()` followed by `turn_off()` one pulse
//! width later; the two legs of a double pulse have rising edges exactly
//! one pulse delay apart.
//!
//! ```text
//!  Single   ▁▁▁█▁▁▁▁▁▁▁▁▁▁▁▁▁▁▁
//!  Double   ▁▁▁█▁▁▁▁▁█▁▁▁▁▁▁▁▁▁
//!              |<-delay->|
//! ```
//!
//! ## Sequencing contract
//!
//! At most one sequence is in flight.  A request that arrives while a leg
//! is on, while a second leg is still pending, within the pulse delay of
//! the last rising edge, or behind other queued requests joins a FIFO and
//! is fired by the `PulseWindow` timer once everything ahead of it is out.
//! Every accepted request reaches the relay, in order.  Only a full queue
//! rejects a request, and the caller is told.
//!
//! This driver is a dumb actuator: it never decides *whether* to pulse.

use heapless::Deque;
use log::{debug, warn};

use crate::app::ports::OutputPort;
use crate::config::CoverConfig;
use crate::scheduler::{Scheduler, TimerName};

/// Requests that may wait behind the sequence in flight.
pub const PULSE_QUEUE_CAP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulsePattern {
    /// Start from rest, or stop a running motor.
    Single,
    /// Two legs in quick succession: reverse in place.
    Double,
}

impl PulsePattern {
    /// Number of relay legs in the pattern.
    pub const fn pulse_count(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Double => 2,
        }
    }
}

/// What [`PulseSequencer::emit`] did with a request.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// The first leg went out immediately.
    Started,
    /// Queued; the first leg is expected at `starts_at_ms`.
    Deferred { starts_at_ms: u64 },
    /// The queue is full; nothing will reach the relay.
    Rejected,
}

impl EmitOutcome {
    /// Time of the first rising edge, `None` if rejected.
    pub fn starts_at(self, now_ms: u64) -> Option<u64> {
        match self {
            Self::Started => Some(now_ms),
            Self::Deferred { starts_at_ms } => Some(starts_at_ms),
            Self::Rejected => None,
        }
    }
}

/// Outstanding pulse bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PulseState {
    /// Rising edge of the most recent leg.
    pub last_pulse_ms: Option<u64>,
    /// Relay is currently on.
    pub in_flight: bool,
    /// Second leg of a double pulse has not fired yet.
    pub second_leg_pending: bool,
    /// Requests waiting in the queue.
    pub queued: usize,
}

pub struct PulseSequencer<O> {
    output: O,
    width_ms: u64,
    delay_ms: u64,
    state: PulseState,
    queue: Deque<PulsePattern, PULSE_QUEUE_CAP>,
    pulses_sent: u32,
}

impl<O: OutputPort> PulseSequencer<O> {
    /// `config` is expected to have passed [`CoverConfig::validate`], in
    /// particular pulse width < pulse delay.
    pub fn new(mut output: O, config: &CoverConfig) -> Self {
        output.turn_off();
        Self {
            output,
            width_ms: u64::from(config.pulse_width_ms),
            delay_ms: u64::from(config.pulse_delay_ms),
            state: PulseState::default(),
            queue: Deque::new(),
            pulses_sent: 0,
        }
    }

    /// Request a pulse pattern.  Fires now when the relay is free, queues
    /// behind earlier requests otherwise.
    pub fn emit(
        &mut self,
        pattern: PulsePattern,
        now_ms: u64,
        timers: &mut Scheduler,
    ) -> EmitOutcome {
        if self.queue.is_empty() && !self.is_busy(now_ms) {
            debug!("PULSE: {pattern:?} at {now_ms}");
            self.start(pattern, now_ms, timers);
            return EmitOutcome::Started;
        }

        let starts_at_ms = self.queue_drained_at().max(now_ms);
        if self.queue.push_back(pattern).is_err() {
            warn!("PULSE: queue full, {pattern:?} rejected");
            return EmitOutcome::Rejected;
        }
        self.state.queued = self.queue.len();
        timers.schedule_at(TimerName::PulseWindow, self.free_at());
        debug!(
            "PULSE: {pattern:?} queued ({} waiting), expected at {starts_at_ms}",
            self.queue.len()
        );
        EmitOutcome::Deferred { starts_at_ms }
    }

    /// Dispatch a due timer.  Names this driver does not own are ignored.
    pub fn on_timer(&mut self, name: TimerName, now_ms: u64, timers: &mut Scheduler) {
        match name {
            TimerName::PulseRelease => {
                // Always release, whatever happened to the cover meanwhile.
                self.output.turn_off();
                self.state.in_flight = false;
            }
            TimerName::SecondLeg => {
                if self.state.second_leg_pending {
                    self.state.second_leg_pending = false;
                    debug!("PULSE: second leg at {now_ms}");
                    self.fire_leg(now_ms, timers);
                }
            }
            TimerName::PulseWindow => self.drain_queue(now_ms, timers),
            TimerName::EndstopPoll => {}
        }
    }

    /// A leg is on, a second leg is owed, or the spacing window is open.
    pub fn is_busy(&self, now_ms: u64) -> bool {
        self.state.in_flight || self.state.second_leg_pending || now_ms < self.free_at()
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn state(&self) -> PulseState {
        self.state
    }

    /// Total relay legs fired since construction.
    pub fn pulses_sent(&self) -> u32 {
        self.pulses_sent
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn drain_queue(&mut self, now_ms: u64, timers: &mut Scheduler) {
        if self.queue.is_empty() {
            return;
        }
        if self.is_busy(now_ms) {
            timers.schedule_at(TimerName::PulseWindow, self.free_at().max(now_ms + 1));
            return;
        }
        if let Some(pattern) = self.queue.pop_front() {
            debug!("PULSE: queued {pattern:?} at {now_ms}");
            self.start(pattern, now_ms, timers);
        }
        self.state.queued = self.queue.len();
        if !self.queue.is_empty() {
            timers.schedule_at(TimerName::PulseWindow, self.free_at());
        }
    }

    fn start(&mut self, pattern: PulsePattern, now_ms: u64, timers: &mut Scheduler) {
        self.state.second_leg_pending = pattern == PulsePattern::Double;
        self.fire_leg(now_ms, timers);
        if self.state.second_leg_pending {
            timers.schedule_at(TimerName::SecondLeg, now_ms + self.delay_ms);
        }
    }

    fn fire_leg(&mut self, now_ms: u64, timers: &mut Scheduler) {
        self.output.turn_on();
        self.state.in_flight = true;
        self.state.last_pulse_ms = Some(now_ms);
        self.pulses_sent = self.pulses_sent.wrapping_add(1);
        timers.set_timeout(TimerName::PulseRelease, now_ms, self.width_ms);
    }

    /// Earliest time a new sequence may start.
    fn free_at(&self) -> u64 {
        let Some(last) = self.state.last_pulse_ms else {
            return 0;
        };
        if self.state.second_leg_pending {
            last + 2 * self.delay_ms
        } else {
            last + self.delay_ms
        }
    }

    /// Earliest time a request appended now could start.
    fn queue_drained_at(&self) -> u64 {
        self.queue.iter().fold(self.free_at(), |at, pattern| {
            at + u64::from(pattern.pulse_count()) * self.delay_ms
        })
    }
}
