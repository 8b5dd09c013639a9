//! Limit switches: startup position, end of travel and drift correction.

use super::mock_hw::{MockEndstops, Rig, test_config};

use impulse_cover::persistence::CoverSnapshot;
use impulse_cover::sensors::endstop::Endstop;
use impulse_cover::{CoverCommand, CoverConfig, CoverEvent, MotionOperation};

fn snapshot(position: f32) -> Option<CoverSnapshot> {
    Some(CoverSnapshot {
        position,
        last_operation: MotionOperation::Opening,
    })
}

#[test]
fn endstop_beats_snapshot_at_startup() {
    let mut rig = Rig::new(test_config(), MockEndstops::wired(false, true), snapshot(0.7));
    rig.cover.start();
    assert_eq!(rig.cover.position(), 0.0);
    assert!(!rig.cover.is_assumed_state());
}

#[test]
fn conflicting_endstops_mean_unknown() {
    let mut rig = Rig::new(test_config(), MockEndstops::wired(true, true), snapshot(0.7));
    rig.cover.start();
    assert_eq!(rig.cover.position(), 0.5);
}

#[test]
fn inactive_switches_fall_back_to_snapshot() {
    let mut rig = Rig::new(test_config(), MockEndstops::open_only(false), snapshot(0.7));
    rig.cover.start();
    assert_eq!(rig.cover.position(), 0.7);
    assert!(rig.cover.is_assumed_state());
}

#[test]
fn inversion_is_applied() {
    let config = CoverConfig {
        close_sensor_inverted: true,
        ..test_config()
    };
    // Raw low on an inverted switch reads as active.
    let mut rig = Rig::new(config, MockEndstops::wired(false, false), None);
    rig.cover.start();
    assert_eq!(rig.cover.position(), 0.0);
}

#[test]
fn open_switch_ends_travel_without_stop_pulse() {
    let mut rig = Rig::new(test_config(), MockEndstops::wired(false, true), None);
    rig.cover.control(CoverCommand::Open);
    rig.endstops.set(Endstop::Close, false);
    rig.run_for(4_000);
    assert!((rig.cover.position() - 0.4).abs() < 0.005);

    rig.endstops.set(Endstop::Open, true);
    rig.run_for(10);
    assert_eq!(rig.cover.operation(), MotionOperation::Idle);
    assert_eq!(rig.cover.position(), 1.0);
    rig.run_for(1_000);
    assert_eq!(rig.rising_edges(), vec![0]);
    assert!(rig.lifecycle_events().ends_with(&[CoverEvent::Idle, CoverEvent::Opened]));
}

#[test]
fn change_notification_ends_travel_immediately() {
    let mut rig = Rig::new(test_config(), MockEndstops::wired(true, false), None);
    rig.cover.control(CoverCommand::Close);
    rig.endstops.set(Endstop::Open, false);
    rig.run_for(2_000);

    rig.endstops.set(Endstop::Close, true);
    rig.cover.on_endstop_change(Endstop::Close);
    assert_eq!(rig.cover.operation(), MotionOperation::Idle);
    assert_eq!(rig.cover.position(), 0.0);
    assert_eq!(rig.cover.target_position(), 0.0);
}

#[test]
fn switch_not_matching_request_is_ignored() {
    let mut rig = Rig::new(test_config(), MockEndstops::wired(true, false), None);
    rig.cover.control(CoverCommand::Close);
    rig.run_for(2_000);

    // Open switch bounces while closing.
    rig.cover.on_endstop_change(Endstop::Open);
    assert_eq!(rig.cover.operation(), MotionOperation::Closing);
    rig.run_for(1_000);
    assert_eq!(rig.cover.operation(), MotionOperation::Closing);
}

#[test]
fn released_switch_is_ignored() {
    let mut rig = Rig::new(test_config(), MockEndstops::wired(false, false), snapshot(0.4));
    rig.cover.control(CoverCommand::Open);
    rig.cover.on_endstop_change(Endstop::Open);
    assert_eq!(rig.cover.operation(), MotionOperation::Opening);
}

#[test]
fn idle_poll_corrects_drift() {
    let config = CoverConfig {
        safety_timeout_ms: 20_000,
        ..test_config()
    };
    let mut rig = Rig::new(config, MockEndstops::wired(false, false), snapshot(0.3));
    rig.cover.start();
    assert_eq!(rig.cover.position(), 0.3);

    rig.endstops.set(Endstop::Close, true);
    rig.run_for(19_990);
    assert_eq!(rig.cover.position(), 0.3);
    rig.run_for(10);
    assert_eq!(rig.cover.position(), 0.0);
    assert!(rig.rising_edges().is_empty());
}

#[test]
fn idle_poll_ignores_conflict() {
    let config = CoverConfig {
        safety_timeout_ms: 20_000,
        ..test_config()
    };
    let mut rig = Rig::new(config, MockEndstops::wired(false, false), snapshot(0.3));
    rig.cover.start();
    rig.endstops.set(Endstop::Open, true);
    rig.endstops.set(Endstop::Close, true);
    rig.run_for(20_000);
    assert_eq!(rig.cover.position(), 0.3);
}
