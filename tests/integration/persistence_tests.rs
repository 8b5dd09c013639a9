//! Snapshot save and restore across controller restarts.

use super::mock_hw::{MockEndstops, Rig, test_config};

use impulse_cover::adapters::memory::MemoryStorage;
use impulse_cover::app::ports::StoragePort;
use impulse_cover::persistence::SnapshotStore;
use impulse_cover::sensors::endstop::Endstop;
use impulse_cover::{CoverCommand, MotionOperation};

#[test]
fn restart_resumes_position_and_direction() {
    let mut storage = MemoryStorage::new();
    let mut rig = Rig::at(test_config(), 0.0, MotionOperation::Closing);
    rig.cover.control(CoverCommand::SetPosition(0.6));
    rig.run_until(10_000, |c| !c.operation().is_moving());
    assert!(rig.cover.persist_if_needed(&mut storage));

    let restored = SnapshotStore::new().load(&storage).unwrap();
    let mut rig = Rig::new(test_config(), MockEndstops::default(), restored);
    rig.cover.start();
    assert_eq!(rig.cover.position(), 0.6);
    assert_eq!(rig.cover.last_direction(), MotionOperation::Opening);

    // Last travel was opening: continuing needs a double pulse.
    rig.cover.control(CoverCommand::Open);
    rig.run_for(600);
    assert_eq!(rig.rising_edges(), vec![0, 500]);
}

#[test]
fn corrupt_snapshot_is_reported() {
    let mut storage = MemoryStorage::new();
    storage.write("cover", "state", &[0xFF, 0xFF]).unwrap();
    assert!(SnapshotStore::new().load(&storage).is_err());
}

#[test]
fn nothing_to_persist_before_motion() {
    let mut storage = MemoryStorage::new();
    let mut rig = Rig::at(test_config(), 0.2, MotionOperation::Closing);
    rig.run_for(1_000);
    assert!(!rig.cover.persist_if_needed(&mut storage));
    assert!(!SnapshotStore::new().exists(&storage));
}

#[test]
fn drift_correction_is_persisted() {
    let mut storage = MemoryStorage::new();
    let mut rig = Rig::new(
        impulse_cover::CoverConfig {
            safety_timeout_ms: 5_000,
            ..test_config()
        },
        MockEndstops::wired(false, false),
        None,
    );
    rig.cover.start();
    rig.endstops.set(Endstop::Open, true);
    rig.run_for(5_000);
    assert!(rig.cover.persist_if_needed(&mut storage));
    let saved = SnapshotStore::new().load(&storage).unwrap().unwrap();
    assert_eq!(saved.position, 1.0);
}
