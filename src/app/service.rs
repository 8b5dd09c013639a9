//! Cover controller: the hexagonal core.
//!
//! [`CoverController`] owns the motion FSM, safety monitor, pulse
//! sequencer, timer table and outbound event queue.  All I/O flows through
//! port traits injected at construction, making the whole controller
//! testable with a fake clock and recording mocks.
//!
//! ```text
//!    ClockPort ──▶ ┌──────────────────────────────┐
//!                  │       CoverController        │ ──▶ EventQueue ──▶ EventSink
//!  EndstopPort ──▶ │  FSM · Safety · Scheduler    │
//!                  │  PulseSequencer ─────────────│──▶ OutputPort
//!                  └──────────────────────────────┘
//! ```
//!
//! The host drives it with three synchronous entry points: [`control`]
//! for commands, [`tick`] at a short fixed interval, and
//! [`on_endstop_change`] for switch notifications.
//!
//! [`control`]: CoverController::control
//! [`tick`]: CoverController::tick
//! [`on_endstop_change`]: CoverController::on_endstop_change

use log::{debug, info, warn};

use crate::config::CoverConfig;
use crate::control::policy::{self, PulseDecision};
use crate::control::{CLOSED_POSITION, OPEN_POSITION, POSITION_TOLERANCE, UNKNOWN_POSITION};
use crate::drivers::pulse::{PulsePattern, PulseSequencer};
use crate::error::{Error, Result, SafetyFault};
use crate::events::EventQueue;
use crate::fsm::context::CoverContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, MotionOperation, TriggerOperation};
use crate::persistence::{CoverSnapshot, SnapshotStore};
use crate::safety::{SafetyMonitor, SafetyVerdict};
use crate::scheduler::{Scheduler, TimerName};
use crate::sensors::endstop::{Endstop, EndstopSnapshot, EndstopStatus, read_one};

use super::commands::CoverCommand;
use super::events::{CoverEvent, CoverState};
use super::ports::{ClockPort, EndstopPort, EventSink, NoEndstops, OutputPort, StoragePort};

/// Upper bound on timer callbacks dispatched in one tick.
const MAX_TIMER_DISPATCH: usize = 16;

// ───────────────────────────────────────────────────────────────
// Builder
// ───────────────────────────────────────────────────────────────

/// Assembles a [`CoverController`] from configuration and adapters.
pub struct CoverBuilder<O, E> {
    config: CoverConfig,
    output: Option<O>,
    endstops: E,
    restored: Option<CoverSnapshot>,
}

impl<O: OutputPort> CoverBuilder<O, NoEndstops> {
    pub fn new(config: CoverConfig) -> Self {
        Self {
            config,
            output: None,
            endstops: NoEndstops,
            restored: None,
        }
    }
}

impl<O: OutputPort, E: EndstopPort> CoverBuilder<O, E> {
    /// The relay output.  Required.
    pub fn output(mut self, output: O) -> Self {
        self.output = Some(output);
        self
    }

    /// Limit switches.  Defaults to [`NoEndstops`].
    pub fn endstops<E2: EndstopPort>(self, endstops: E2) -> CoverBuilder<O, E2> {
        CoverBuilder {
            config: self.config,
            output: self.output,
            endstops,
            restored: self.restored,
        }
    }

    /// Last known state, used when the endstops do not pin the position.
    pub fn restore(mut self, snapshot: Option<CoverSnapshot>) -> Self {
        self.restored = snapshot;
        self
    }

    /// Validate the configuration and assemble the controller.
    ///
    /// Fails with [`Error::Init`] when no output was supplied.
    pub fn build<C: ClockPort>(self, clock: C) -> Result<CoverController<C, O, E>> {
        self.config.validate()?;
        let Some(output) = self.output else {
            return Err(Error::Init("relay output is required"));
        };

        let restored = self.restored.map(|mut snap| {
            snap.position = snap.position.clamp(CLOSED_POSITION, OPEN_POSITION);
            snap
        });

        Ok(CoverController {
            pulses: PulseSequencer::new(output, &self.config),
            safety: SafetyMonitor::new(&self.config),
            fsm: Fsm::new(build_state_table(), MotionOperation::Idle),
            ctx: CoverContext::new(self.config, UNKNOWN_POSITION),
            clock,
            endstops: self.endstops,
            timers: Scheduler::new(),
            events: EventQueue::new(),
            restored,
            wiring: EndstopSnapshot::default(),
            started: false,
            last_published: None,
            snapshot_dirty: false,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// Impulse cover controller.
pub struct CoverController<C, O, E> {
    clock: C,
    fsm: Fsm,
    ctx: CoverContext,
    safety: SafetyMonitor,
    pulses: PulseSequencer<O>,
    endstops: E,
    timers: Scheduler,
    events: EventQueue,
    restored: Option<CoverSnapshot>,
    /// Endstop readings taken at startup; tells which switches exist.
    wiring: EndstopSnapshot,
    started: bool,
    last_published: Option<CoverState>,
    snapshot_dirty: bool,
}

impl<C: ClockPort, O: OutputPort, E: EndstopPort> CoverController<C, O, E> {
    // ── Lifecycle ─────────────────────────────────────────────

    /// Resolve the initial position and start the motion FSM.
    ///
    /// Called implicitly by the first `control`, `tick` or endstop
    /// notification when the host does not call it itself.
    pub fn start(&mut self) {
        if self.started {
            warn!("COVER: start() called twice, ignored");
            return;
        }
        self.started = true;
        let now = self.sync_time();

        let snap = EndstopSnapshot::read(&mut self.endstops, &self.ctx.config);
        self.wiring = snap;
        self.ctx.endstops = snap;

        let (position, source) = match snap.status() {
            EndstopStatus::Open => (OPEN_POSITION, "open endstop"),
            EndstopStatus::Closed => (CLOSED_POSITION, "close endstop"),
            EndstopStatus::Conflict => {
                warn!("ENDSTOP: both switches active at startup, check wiring");
                (UNKNOWN_POSITION, "unknown (endstop conflict)")
            }
            EndstopStatus::Travel | EndstopStatus::Unwired => match self.restored {
                Some(snapshot) => (snapshot.position, "restored snapshot"),
                None => (UNKNOWN_POSITION, "unknown"),
            },
        };
        if let Some(snapshot) = self.restored {
            self.ctx.last_direction = snapshot.last_operation;
        }
        self.ctx.position = position;
        self.fsm.start(&mut self.ctx);

        if snap.any_wired() {
            self.timers.set_interval(
                TimerName::EndstopPoll,
                now,
                self.ctx.config.endstop_poll_interval_ms(),
            );
        }

        let state = self.state();
        info!(
            "COVER: started at {:.2} from {source}, assumed_state={}",
            position,
            self.is_assumed_state()
        );
        self.events.push(CoverEvent::Started(state));
        self.last_published = Some(state);
    }

    // ── Commands ──────────────────────────────────────────────

    /// Handle a host command.  Rejected commands are logged, never returned
    /// as errors.
    pub fn control(&mut self, command: CoverCommand) {
        self.ensure_started();
        let now = self.sync_time();

        if self.safety.is_tripped() && command != CoverCommand::ResetSafety {
            warn!(
                "COVER: {command:?} rejected, safety tripped (faults {:#04x})",
                self.safety.faults()
            );
            return;
        }

        let prev = self.fsm.current_state();
        match command {
            CoverCommand::Stop => {
                self.start_direction(MotionOperation::Idle, now);
            }
            CoverCommand::Open => self.set_target(OPEN_POSITION, now),
            CoverCommand::Close => self.set_target(CLOSED_POSITION, now),
            CoverCommand::SetPosition(target) => {
                if !target.is_finite() {
                    warn!("COVER: non-finite target {target} rejected");
                    return;
                }
                self.set_target(target.clamp(CLOSED_POSITION, OPEN_POSITION), now);
            }
            CoverCommand::Toggle => {
                if prev.is_moving() {
                    self.start_direction(MotionOperation::Idle, now);
                } else if self.ctx.position < UNKNOWN_POSITION {
                    self.set_target(OPEN_POSITION, now);
                } else {
                    self.set_target(CLOSED_POSITION, now);
                }
            }
            CoverCommand::ResetSafety => self.reset_safety(),
        }

        self.after_change(prev, now);
        self.publish_state();
    }

    /// Clear a latched safety trip and the cycle counter.
    pub fn reset_safety(&mut self) {
        if self.safety.is_tripped() {
            info!("COVER: safety reset, motion allowed again");
        }
        self.safety.reset();
        self.events.push(CoverEvent::SafetyReset);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one cycle: timers → safety → motion FSM → publication.
    pub fn tick(&mut self) {
        self.ensure_started();
        let now = self.sync_time();
        self.run_timers(now);

        let prev = self.fsm.current_state();
        if prev.is_moving() {
            match self.safety.check(now) {
                SafetyVerdict::CycleLimit => self.trip(SafetyFault::CycleLimit, now),
                SafetyVerdict::Timeout => {
                    // Travel budget spent: the motor is at a limit or stalled.
                    self.fsm.force_transition(MotionOperation::Idle, &mut self.ctx);
                    if self.safety.record_timeout() {
                        self.events
                            .push(CoverEvent::SafetyTripped(SafetyFault::RepeatedTimeout));
                    }
                }
                SafetyVerdict::Ok => {
                    self.ctx.endstops = EndstopSnapshot::read(&mut self.endstops, &self.ctx.config);
                    self.fsm.tick(&mut self.ctx);
                    if self.ctx.take_stop_pulse_request() {
                        if let Some(stops_at) = self.pulse(PulsePattern::Single, now) {
                            self.coast_until(prev, stops_at);
                            self.ctx.target_position = self.ctx.position;
                        }
                    }
                    if !self.fsm.current_state().is_moving() {
                        self.safety.record_completion();
                    }
                }
            }
        } else {
            self.safety.idle_tick(now);
        }

        self.after_change(prev, now);
        self.publish_state();
    }

    /// A limit switch changed level.  Only an activation matching the
    /// current request ends motion; anything else is logged as noise.
    pub fn on_endstop_change(&mut self, endstop: Endstop) {
        self.ensure_started();
        let now = self.sync_time();

        let Some(active) = read_one(&mut self.endstops, endstop, &self.ctx.config) else {
            debug!("ENDSTOP: {endstop:?} changed but is not wired");
            return;
        };
        if !active {
            debug!("ENDSTOP: {endstop:?} released");
            return;
        }

        let prev = self.fsm.current_state();
        if prev.is_moving() && endstop.matches(self.ctx.trigger) {
            info!("ENDSTOP: {endstop:?} reached while {prev:?}");
            self.fsm.force_transition(MotionOperation::Idle, &mut self.ctx);
            self.ctx.position = endstop.bound();
            self.ctx.target_position = self.ctx.position;
            self.safety.record_completion();
        } else {
            info!(
                "ENDSTOP: {endstop:?} active while trigger is {:?}, ignored",
                self.ctx.trigger
            );
        }

        self.after_change(prev, now);
        self.publish_state();
    }

    // ── Event delivery ────────────────────────────────────────

    /// Drain queued events in FIFO order.
    pub fn drain_events(&mut self, handler: impl FnMut(CoverEvent)) {
        self.events.drain(handler);
    }

    /// Drain queued events into a sink.
    pub fn flush_events(&mut self, sink: &mut impl EventSink) {
        self.events.drain(|event| sink.emit(&event));
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    // ── Persistence ───────────────────────────────────────────

    /// Persist the snapshot if motion ended since the last save.
    /// Returns `true` if a write occurred.
    pub fn persist_if_needed(&mut self, storage: &mut dyn StoragePort) -> bool {
        if !self.snapshot_dirty || self.fsm.current_state().is_moving() {
            return false;
        }
        match SnapshotStore::new().save(storage, &self.snapshot()) {
            Ok(()) => {
                self.snapshot_dirty = false;
                debug!("COVER: snapshot saved at {:.2}", self.ctx.position);
                true
            }
            Err(e) => {
                warn!("COVER: snapshot save failed: {e}");
                false
            }
        }
    }

    pub fn snapshot(&self) -> CoverSnapshot {
        CoverSnapshot {
            position: self.ctx.position,
            last_operation: self.ctx.last_direction,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> CoverState {
        CoverState {
            position: self.ctx.position,
            operation: self.fsm.current_state(),
        }
    }

    pub fn position(&self) -> f32 {
        self.ctx.position
    }

    pub fn target_position(&self) -> f32 {
        self.ctx.target_position
    }

    pub fn operation(&self) -> MotionOperation {
        self.fsm.current_state()
    }

    pub fn trigger_operation(&self) -> TriggerOperation {
        self.ctx.trigger
    }

    pub fn last_direction(&self) -> MotionOperation {
        self.ctx.last_direction
    }

    pub fn is_safety_tripped(&self) -> bool {
        self.safety.is_tripped()
    }

    pub fn safety_faults(&self) -> u8 {
        self.safety.faults()
    }

    pub fn cycle_count(&self) -> u8 {
        self.safety.cycle_count()
    }

    /// Relay legs fired since construction.
    pub fn pulses_sent(&self) -> u32 {
        self.pulses.pulses_sent()
    }

    /// Position is inferred rather than observed unless both switches
    /// are wired.
    pub fn is_assumed_state(&self) -> bool {
        !self.wiring.fully_wired()
    }

    /// Earliest pending timer, for hosts that sleep between ticks.
    pub fn next_wakeup_ms(&self) -> Option<u64> {
        self.timers.next_due()
    }

    pub fn config(&self) -> &CoverConfig {
        &self.ctx.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn ensure_started(&mut self) {
        if !self.started {
            self.start();
        }
    }

    fn sync_time(&mut self) -> u64 {
        let now = self.clock.now_ms();
        self.ctx.now_ms = now;
        now
    }

    fn set_target(&mut self, target: f32, now: u64) {
        let current = self.fsm.current_state();
        if current.is_moving() {
            self.ctx.position =
                self.ctx
                    .estimator
                    .advance(now, self.ctx.position, current, &self.ctx.config);
        }

        let position = self.ctx.position;
        let direction = if target > position + POSITION_TOLERANCE {
            MotionOperation::Opening
        } else if target < position - POSITION_TOLERANCE {
            MotionOperation::Closing
        } else if current.is_moving() {
            info!("COVER: target {target:.2} is here, stopping");
            MotionOperation::Idle
        } else {
            debug!("COVER: already at {position:.2}, nothing to do");
            return;
        };

        if direction == current {
            info!("COVER: target moved to {target:.2} while {current:?}");
            self.ctx.target_position = target;
            return;
        }

        if direction.is_moving() {
            self.ctx.target_position = target;
        }
        if !self.start_direction(direction, now) && !self.fsm.current_state().is_moving() {
            self.ctx.target_position = self.ctx.position;
        }
    }

    /// Apply the pulse policy for `direction`.  Returns `true` if a pulse
    /// was requested and the motion state changed.
    fn start_direction(&mut self, direction: MotionOperation, now: u64) -> bool {
        let current = self.fsm.current_state();
        match policy::decide(self.ctx.position, current, self.ctx.last_direction, direction) {
            PulseDecision::NoPulse(reason) => {
                debug!("COVER: no pulse for {direction:?}: {reason:?}");
                false
            }
            PulseDecision::Pulse(pattern) => {
                let Some(starts_at) = self.pulse(pattern, now) else {
                    return false;
                };
                self.coast_until(current, starts_at);
                self.fsm.force_transition(direction, &mut self.ctx);
                if direction.is_moving() {
                    self.ctx.estimator.start(starts_at);
                    self.safety.record_start(pattern, starts_at);
                }
                true
            }
        }
    }

    /// Hand a pattern to the relay.  Returns the time of its first rising
    /// edge, which lies in the future when the sequencer is still busy.
    fn pulse(&mut self, pattern: PulsePattern, now: u64) -> Option<u64> {
        let starts_at = self.pulses.emit(pattern, now, &mut self.timers).starts_at(now);
        if starts_at.is_none() {
            warn!("COVER: relay queue full, {pattern:?} dropped");
        }
        starts_at
    }

    /// The motor keeps running in `direction` until a deferred pulse at
    /// `at` lands: move the estimate there.
    fn coast_until(&mut self, direction: MotionOperation, at: u64) {
        if !direction.is_moving() || at <= self.ctx.now_ms {
            return;
        }
        let was_running = self.ctx.estimator.is_running();
        if !was_running {
            self.ctx.estimator.start(self.ctx.now_ms);
        }
        self.ctx.position =
            self.ctx
                .estimator
                .advance(at, self.ctx.position, direction, &self.ctx.config);
        if !was_running {
            self.ctx.estimator.stop();
        }
    }

    fn trip(&mut self, fault: SafetyFault, now: u64) {
        warn!("COVER: {fault}, stopping");
        self.safety.trip(fault);
        self.events.push(CoverEvent::SafetyTripped(fault));
        let current = self.fsm.current_state();
        if current.is_moving() {
            if let Some(stops_at) = self.pulse(PulsePattern::Single, now) {
                self.coast_until(current, stops_at);
            }
            self.fsm.force_transition(MotionOperation::Idle, &mut self.ctx);
        }
    }

    fn run_timers(&mut self, now: u64) {
        let mut dispatched = 0;
        while let Some(name) = self.timers.pop_due(now) {
            match name {
                TimerName::EndstopPoll => self.poll_endstops(),
                other => self.pulses.on_timer(other, now, &mut self.timers),
            }
            dispatched += 1;
            if dispatched >= MAX_TIMER_DISPATCH {
                warn!("COVER: timer dispatch limit hit at {now}");
                break;
            }
        }
    }

    /// Idle drift check: a positive switch reading overrides the estimate.
    fn poll_endstops(&mut self) {
        if self.fsm.current_state().is_moving() {
            return;
        }
        let snap = EndstopSnapshot::read(&mut self.endstops, &self.ctx.config);
        self.ctx.endstops = snap;
        let observed = match snap.status() {
            EndstopStatus::Open => OPEN_POSITION,
            EndstopStatus::Closed => CLOSED_POSITION,
            EndstopStatus::Conflict => {
                warn!("ENDSTOP: both switches active, check wiring");
                return;
            }
            EndstopStatus::Travel | EndstopStatus::Unwired => return,
        };
        if (self.ctx.position - observed).abs() > POSITION_TOLERANCE {
            info!(
                "ENDSTOP: drift corrected {:.2} -> {:.2}",
                self.ctx.position, observed
            );
            self.ctx.position = observed;
            self.ctx.target_position = observed;
            self.snapshot_dirty = true;
        }
    }

    /// Lifecycle events and safety bookkeeping for a motion-state change.
    fn after_change(&mut self, prev: MotionOperation, now: u64) {
        let current = self.fsm.current_state();
        if current == prev {
            return;
        }
        match current {
            MotionOperation::Opening => self.events.push(CoverEvent::Opening),
            MotionOperation::Closing => self.events.push(CoverEvent::Closing),
            MotionOperation::Idle => {
                self.safety.record_stop(now);
                self.snapshot_dirty = true;
                self.events.push(CoverEvent::Idle);
                if self.ctx.position >= OPEN_POSITION {
                    self.events.push(CoverEvent::Opened);
                } else if self.ctx.position <= CLOSED_POSITION {
                    self.events.push(CoverEvent::Closed);
                }
            }
        }
    }

    /// Publish when the operation changed or the position moved by more
    /// than the tolerance since the last publication.
    fn publish_state(&mut self) {
        let state = self.state();
        let changed = match self.last_published {
            None => true,
            Some(last) => {
                last.operation != state.operation
                    || (last.position - state.position).abs() > POSITION_TOLERANCE
            }
        };
        if changed {
            self.events.push(CoverEvent::StatePublished(state));
            self.last_published = Some(state);
        }
    }
}
