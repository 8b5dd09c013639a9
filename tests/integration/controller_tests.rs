//! Command handling: pulse patterns, travel, stops and publication.

use super::mock_hw::{Rig, test_config};

use impulse_cover::{CoverCommand, CoverConfig, CoverEvent, CoverState, MotionOperation, TriggerOperation};

#[test]
fn open_from_closed_is_one_pulse() {
    let mut rig = Rig::at(test_config(), 0.0, MotionOperation::Closing);
    rig.cover.control(CoverCommand::Open);

    assert_eq!(rig.rising_edges(), vec![0]);
    assert_eq!(rig.cover.operation(), MotionOperation::Opening);
    assert_eq!(rig.cover.trigger_operation(), TriggerOperation::Opening);
    assert_eq!(rig.cover.cycle_count(), 1);

    rig.run_for(150);
    assert!(!rig.relay_is_on(), "relay must release after the pulse width");
}

#[test]
fn reversing_in_place_is_a_double_pulse() {
    // Last travel was opening, so one pulse would just resume opening.
    let mut rig = Rig::at(test_config(), 0.5, MotionOperation::Opening);
    rig.cover.control(CoverCommand::Open);
    assert_eq!(rig.cover.operation(), MotionOperation::Opening);
    assert_eq!(rig.cover.next_wakeup_ms(), Some(100));

    rig.run_for(1_000);
    assert_eq!(rig.rising_edges(), vec![0, 500]);
    assert_eq!(rig.cover.cycle_count(), 2);
}

#[test]
fn unknown_position_without_history_is_one_pulse() {
    let mut rig = Rig::new(test_config(), Default::default(), None);
    rig.cover.control(CoverCommand::Open);
    assert_eq!(rig.rising_edges(), vec![0]);

    let spent = rig.run_until(20_000, |c| !c.operation().is_moving());
    assert!((4_900..=5_010).contains(&spent), "took {spent}ms");
    assert_eq!(rig.cover.position(), 1.0);
    assert_eq!(rig.rising_edges().len(), 1);
}

#[test]
fn open_at_open_bound_does_nothing() {
    let mut rig = Rig::at(test_config(), 1.0, MotionOperation::Opening);
    rig.events();
    rig.cover.control(CoverCommand::Open);
    assert!(rig.rising_edges().is_empty());
    assert_eq!(rig.cover.operation(), MotionOperation::Idle);
    assert_eq!(rig.cover.pending_events(), 0);
}

#[test]
fn stop_when_idle_is_idempotent() {
    let mut rig = Rig::at(test_config(), 0.3, MotionOperation::Closing);
    let before = rig.events().len();
    rig.cover.control(CoverCommand::Stop);
    rig.cover.control(CoverCommand::Stop);
    assert!(rig.rising_edges().is_empty());
    assert_eq!(rig.events().len(), before);
    assert_eq!(rig.cover.position(), 0.3);
}

#[test]
fn stop_mid_travel_then_resume() {
    let mut rig = Rig::at(test_config(), 0.0, MotionOperation::Closing);
    rig.cover.control(CoverCommand::Open);
    rig.run_for(3_000);
    rig.cover.control(CoverCommand::Stop);

    assert_eq!(rig.cover.operation(), MotionOperation::Idle);
    assert!((rig.cover.position() - 0.3).abs() < 0.005);
    assert_eq!(rig.cover.target_position(), rig.cover.position());
    assert_eq!(rig.rising_edges(), vec![0, 3_000]);

    // Stopped while opening: carrying on opening takes two pulses,
    // closing takes one.
    rig.run_for(1_000);
    rig.cover.control(CoverCommand::Close);
    assert_eq!(rig.rising_edges(), vec![0, 3_000, 4_000]);
    assert_eq!(rig.cover.operation(), MotionOperation::Closing);
}

#[test]
fn full_open_needs_no_stop_pulse() {
    let mut rig = Rig::at(test_config(), 0.0, MotionOperation::Closing);
    rig.cover.control(CoverCommand::SetPosition(1.0));
    rig.run_for(9_000);
    assert_eq!(rig.cover.operation(), MotionOperation::Opening);
    rig.run_for(1_000);
    assert_eq!(rig.cover.operation(), MotionOperation::Idle);
    assert_eq!(rig.cover.position(), 1.0);
    assert_eq!(rig.rising_edges().len(), 1);
}

#[test]
fn partial_target_stops_with_a_pulse_and_snaps() {
    let mut rig = Rig::at(test_config(), 0.0, MotionOperation::Closing);
    rig.cover.control(CoverCommand::SetPosition(0.4));
    rig.run_until(10_000, |c| !c.operation().is_moving());

    assert_eq!(rig.cover.position(), 0.4);
    assert_eq!(rig.cover.last_direction(), MotionOperation::Opening);
    let edges = rig.rising_edges();
    assert_eq!(edges.len(), 2);
    assert!((3_850..=4_010).contains(&edges[1]), "stop at {}", edges[1]);
}

#[test]
fn back_to_back_requests_keep_pulse_spacing() {
    let config = CoverConfig {
        safety_max_cycles: 5,
        ..test_config()
    };
    let mut rig = Rig::at(config, 0.0, MotionOperation::Closing);
    rig.cover.control(CoverCommand::SetPosition(0.4));
    rig.run_until(10_000, |c| !c.operation().is_moving());
    let stop_at = rig.rising_edges()[1];

    // Same direction again straight after the stop pulse: a deferred double.
    rig.cover.control(CoverCommand::SetPosition(0.7));
    assert_eq!(rig.cover.operation(), MotionOperation::Opening);
    rig.run_for(1_500);

    let edges = rig.rising_edges();
    assert_eq!(edges.len(), 4);
    assert_eq!(edges[2], stop_at + 500);
    assert_eq!(edges[3], stop_at + 1_000);
}

#[test]
fn new_target_in_same_direction_only_moves_target() {
    let mut rig = Rig::at(test_config(), 0.0, MotionOperation::Closing);
    rig.cover.control(CoverCommand::Open);
    rig.run_for(2_000);
    rig.cover.control(CoverCommand::SetPosition(0.6));

    assert_eq!(rig.rising_edges().len(), 1);
    assert_eq!(rig.cover.target_position(), 0.6);
    rig.run_until(10_000, |c| !c.operation().is_moving());
    assert_eq!(rig.cover.position(), 0.6);
    assert_eq!(rig.rising_edges().len(), 2);
}

#[test]
fn reversal_while_moving_is_one_pulse() {
    let mut rig = Rig::at(test_config(), 0.0, MotionOperation::Closing);
    rig.cover.control(CoverCommand::SetPosition(0.8));
    rig.run_for(5_000);
    rig.cover.control(CoverCommand::SetPosition(0.1));

    assert_eq!(rig.cover.operation(), MotionOperation::Closing);
    assert_eq!(rig.rising_edges(), vec![0, 5_000]);
    rig.run_until(10_000, |c| !c.operation().is_moving());
    assert_eq!(rig.cover.position(), 0.1);
}

#[test]
fn toggle_cycles_open_stop_close() {
    let mut rig = Rig::at(test_config(), 0.0, MotionOperation::Closing);
    rig.cover.control(CoverCommand::Toggle);
    assert_eq!(rig.cover.operation(), MotionOperation::Opening);
    rig.run_for(7_000);
    rig.cover.control(CoverCommand::Toggle);
    assert_eq!(rig.cover.operation(), MotionOperation::Idle);
    rig.run_for(1_000);
    // Above halfway: toggle closes.
    rig.cover.control(CoverCommand::Toggle);
    assert_eq!(rig.cover.operation(), MotionOperation::Closing);
    assert_eq!(rig.cover.target_position(), 0.0);
}

#[test]
fn lifecycle_events_for_a_full_open() {
    let mut rig = Rig::at(test_config(), 0.0, MotionOperation::Closing);
    rig.cover.control(CoverCommand::Open);
    rig.run_for(10_500);

    assert_eq!(
        rig.lifecycle_events(),
        vec![
            CoverEvent::Started(CoverState {
                position: 0.0,
                operation: MotionOperation::Idle,
            }),
            CoverEvent::Opening,
            CoverEvent::Idle,
            CoverEvent::Opened,
        ]
    );
}

#[test]
fn state_is_published_on_meaningful_change_only() {
    let mut rig = Rig::at(test_config(), 0.0, MotionOperation::Closing);
    rig.cover.control(CoverCommand::Open);
    rig.run_for(1_000);

    let published: Vec<CoverState> = rig
        .events()
        .iter()
        .filter_map(|e| match e {
            CoverEvent::StatePublished(s) => Some(*s),
            _ => None,
        })
        .collect();
    // One for the start of motion, then roughly one per 1% of travel.
    assert!(published.len() >= 8 && published.len() <= 11, "{}", published.len());
    assert_eq!(published[0].operation, MotionOperation::Opening);
    for pair in published.windows(2) {
        assert!(pair[1].position > pair[0].position);
    }
}

#[test]
fn quick_stop_and_restart_reach_the_relay_in_order() {
    let config = CoverConfig {
        safety_max_cycles: 20,
        ..test_config()
    };
    let mut rig = Rig::at(config, 0.0, MotionOperation::Closing);
    rig.cover.control(CoverCommand::Open);
    rig.run_for(100);
    // Inside the spacing window: the stop leg waits until 500.
    rig.cover.control(CoverCommand::Stop);
    assert_eq!(rig.cover.operation(), MotionOperation::Idle);
    assert!((rig.cover.position() - 0.05).abs() < 0.005);
    rig.run_for(100);
    // Stopped while opening, so opening again is a double pulse, queued
    // behind the stop.
    rig.cover.control(CoverCommand::Open);
    assert_eq!(rig.cover.operation(), MotionOperation::Opening);

    rig.run_for(3_000);
    assert_eq!(rig.rising_edges(), vec![0, 500, 1_000, 1_500]);
    assert_eq!(rig.cover.operation(), MotionOperation::Opening);
    assert_eq!(rig.cover.cycle_count(), 3);
    // Travel resumes with the first leg at 1000, not when it was asked for.
    assert!((rig.cover.position() - 0.27).abs() < 0.005, "at {}", rig.cover.position());
}
