//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!         ┌──[start pulse]──▶ OPENING ──[target / open endstop]──┐
//!         │                      │                               ▼
//!       IDLE ◀───────────────────┼────────[stop]──────────────  IDLE
//!         │                      ▼ [reversal pulse]              ▲
//!         └──[start pulse]──▶ CLOSING ──[target / close endstop]─┘
//! ```
//!
//! Starting motion is decided by the controller (it owns the pulse
//! policy); the moving states only decide when motion is over.

use super::context::CoverContext;
use super::{MotionOperation, StateDescriptor, TriggerOperation};
use crate::control::{CLOSED_POSITION, OPEN_POSITION, POSITION_TOLERANCE};
use crate::sensors::endstop::Endstop;
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once per controller.
pub fn build_state_table() -> [StateDescriptor; MotionOperation::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: Opening
        StateDescriptor {
            name: "Opening",
            on_enter: Some(opening_enter),
            on_exit: Some(opening_exit),
            on_update: opening_update,
        },
        // Index 2: Closing
        StateDescriptor {
            name: "Closing",
            on_enter: Some(closing_enter),
            on_exit: Some(closing_exit),
            on_update: closing_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut CoverContext) {
    ctx.estimator.stop();
    ctx.trigger = TriggerOperation::Idle;
    ctx.target_position = ctx.position;
}

fn idle_update(_ctx: &mut CoverContext) -> Option<MotionOperation> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  OPENING state
// ═══════════════════════════════════════════════════════════════════════════

fn opening_enter(ctx: &mut CoverContext) {
    travel_enter(ctx, MotionOperation::Opening);
}

fn opening_exit(ctx: &mut CoverContext) {
    travel_exit(ctx, MotionOperation::Opening);
}

fn opening_update(ctx: &mut CoverContext) -> Option<MotionOperation> {
    travel_update(ctx, MotionOperation::Opening, Endstop::Open)
}

// ═══════════════════════════════════════════════════════════════════════════
//  CLOSING state
// ═══════════════════════════════════════════════════════════════════════════

fn closing_enter(ctx: &mut CoverContext) {
    travel_enter(ctx, MotionOperation::Closing);
}

fn closing_exit(ctx: &mut CoverContext) {
    travel_exit(ctx, MotionOperation::Closing);
}

fn closing_update(ctx: &mut CoverContext) -> Option<MotionOperation> {
    travel_update(ctx, MotionOperation::Closing, Endstop::Close)
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared travel logic
// ═══════════════════════════════════════════════════════════════════════════

fn travel_enter(ctx: &mut CoverContext, direction: MotionOperation) {
    ctx.estimator.start(ctx.now_ms);
    ctx.trigger = direction.into();
    ctx.last_direction = direction;
    info!(
        "{}: from {:.2} towards {:.2}",
        label(direction),
        ctx.position,
        ctx.target_position
    );
}

/// Integrate up to the transition instant so the estimate is exact when
/// motion is stopped or reversed between ticks.
fn travel_exit(ctx: &mut CoverContext, direction: MotionOperation) {
    ctx.position = ctx
        .estimator
        .advance(ctx.now_ms, ctx.position, direction, &ctx.config);
}

fn travel_update(
    ctx: &mut CoverContext,
    direction: MotionOperation,
    endstop: Endstop,
) -> Option<MotionOperation> {
    ctx.position = ctx
        .estimator
        .advance(ctx.now_ms, ctx.position, direction, &ctx.config);

    // The motor halts itself at its limit: no stop pulse.
    if ctx.endstops.is_active(endstop) && endstop.matches(ctx.trigger) {
        ctx.position = endstop.bound();
        info!("{}: {:?} endstop reached", label(direction), endstop);
        return Some(MotionOperation::Idle);
    }

    if target_reached(ctx.position, ctx.target_position, direction) {
        ctx.position = ctx.target_position;
        if !is_bound(ctx.target_position) {
            ctx.request_stop_pulse();
        }
        info!("{}: target {:.2} reached", label(direction), ctx.target_position);
        return Some(MotionOperation::Idle);
    }

    None
}

/// Within tolerance of the target, or past it in the direction of travel.
pub fn target_reached(position: f32, target: f32, direction: MotionOperation) -> bool {
    if (position - target).abs() < POSITION_TOLERANCE {
        return true;
    }
    match direction {
        MotionOperation::Opening => position >= target,
        MotionOperation::Closing => position <= target,
        MotionOperation::Idle => true,
    }
}

fn is_bound(position: f32) -> bool {
    position <= CLOSED_POSITION || position >= OPEN_POSITION
}

fn label(direction: MotionOperation) -> &'static str {
    match direction {
        MotionOperation::Opening => "OPENING",
        MotionOperation::Closing => "CLOSING",
        MotionOperation::Idle => "IDLE",
    }
}
