//! Function-pointer finite state machine engine for cover motion.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌─────────┬───────────┬──────────┬───────────────────┐  │
//! │  │ Motion  │ on_enter  │ on_exit  │ on_update         │  │
//! │  ├─────────┼───────────┼──────────┼───────────────────┤  │
//! │  │ Idle    │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ Opening │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  │ Closing │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  └─────────┴───────────┴──────────┴───────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  All functions receive `&mut CoverContext` which
//! holds position, target, endstop readings, config and timing.
//!
//! The current state *is* the motion operation: the direction the relay
//! was last pulsed into.

pub mod context;
pub mod states;

use context::CoverContext;
use log::info;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Direction the motor was last commanded into.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MotionOperation {
    Idle = 0,
    Opening = 1,
    Closing = 2,
}

impl MotionOperation {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to `MotionOperation`.  Out-of-range values
    /// assert in debug builds and fall back to `Idle` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Opening,
            2 => Self::Closing,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }

    pub const fn is_moving(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Direction the current user request wants to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerOperation {
    Idle,
    Opening,
    Closing,
}

impl From<MotionOperation> for TriggerOperation {
    fn from(op: MotionOperation) -> Self {
        match op {
            MotionOperation::Idle => Self::Idle,
            MotionOperation::Opening => Self::Opening,
            MotionOperation::Closing => Self::Closing,
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut CoverContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut CoverContext) -> Option<MotionOperation>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single motion state.
pub struct StateDescriptor {
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `MotionOperation as usize`.
    table: [StateDescriptor; MotionOperation::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Clock time at which the current state was entered.
    state_entry_ms: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; MotionOperation::COUNT], initial: MotionOperation) -> Self {
        Self {
            table,
            current: initial as usize,
            state_entry_ms: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut CoverContext) {
        info!("COVER: motion FSM starting in {}", self.table[self.current].name);
        self.state_entry_ms = ctx.now_ms;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick at `ctx.now_ms`.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    pub fn tick(&mut self, ctx: &mut CoverContext) {
        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.force_transition(next_id, ctx);
        }
    }

    /// Transition immediately, regardless of what `on_update` would say.
    /// A transition to the current state is a no-op.
    pub fn force_transition(&mut self, next: MotionOperation, ctx: &mut CoverContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> MotionOperation {
        MotionOperation::from_index(self.current)
    }

    pub fn state_name(&self) -> &'static str {
        self.table[self.current].name
    }

    /// Clock time at which the current state was entered.
    pub fn state_entry_ms(&self) -> u64 {
        self.state_entry_ms
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: MotionOperation, ctx: &mut CoverContext) {
        let next_idx = next_id as usize;

        info!(
            "COVER: {} -> {} at {:.2}",
            self.table[self.current].name, self.table[next_idx].name, ctx.position
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_ms = ctx.now_ms;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
