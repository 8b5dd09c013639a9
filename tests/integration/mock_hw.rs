//! Mock hardware for integration tests.
//!
//! The controller owns its adapters, so the mocks keep their state behind
//! shared handles the test can still inspect after handing them over.

use std::cell::RefCell;
use std::rc::Rc;

use impulse_cover::adapters::time::SimClock;
use impulse_cover::app::ports::{ClockPort, EndstopPort, EventSink, OutputPort};
use impulse_cover::persistence::CoverSnapshot;
use impulse_cover::sensors::endstop::Endstop;
use impulse_cover::{CoverBuilder, CoverConfig, CoverController, CoverEvent, MotionOperation};

// ── Relay ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayEdge {
    pub at_ms: u64,
    pub on: bool,
}

/// Relay that timestamps every edge.
pub struct MockRelay {
    clock: SimClock,
    edges: Rc<RefCell<Vec<RelayEdge>>>,
}

impl OutputPort for MockRelay {
    fn turn_on(&mut self) {
        self.edges.borrow_mut().push(RelayEdge {
            at_ms: self.clock.now_ms(),
            on: true,
        });
    }

    fn turn_off(&mut self) {
        self.edges.borrow_mut().push(RelayEdge {
            at_ms: self.clock.now_ms(),
            on: false,
        });
    }
}

// ── Endstops ──────────────────────────────────────────────────

/// Raw switch levels, settable from the test.  `None` = not wired.
#[derive(Clone, Default)]
pub struct MockEndstops {
    levels: Rc<RefCell<[Option<bool>; 2]>>,
}

#[allow(dead_code)]
impl MockEndstops {
    pub fn wired(open: bool, close: bool) -> Self {
        Self {
            levels: Rc::new(RefCell::new([Some(open), Some(close)])),
        }
    }

    pub fn open_only(open: bool) -> Self {
        Self {
            levels: Rc::new(RefCell::new([Some(open), None])),
        }
    }

    pub fn set(&self, endstop: Endstop, active: bool) {
        self.levels.borrow_mut()[Self::slot(endstop)] = Some(active);
    }

    fn slot(endstop: Endstop) -> usize {
        match endstop {
            Endstop::Open => 0,
            Endstop::Close => 1,
        }
    }
}

impl EndstopPort for MockEndstops {
    fn raw_state(&mut self, endstop: Endstop) -> Option<bool> {
        self.levels.borrow()[Self::slot(endstop)]
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<CoverEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &CoverEvent) {
        self.events.push(*event);
    }
}

// ── Test rig ──────────────────────────────────────────────────

/// Host loop tick used by [`Rig::run_for`].
pub const TICK_MS: u64 = 10;

pub type MockCover = CoverController<SimClock, MockRelay, MockEndstops>;

pub struct Rig {
    pub clock: SimClock,
    pub cover: MockCover,
    pub endstops: MockEndstops,
    pub sink: RecordingSink,
    edges: Rc<RefCell<Vec<RelayEdge>>>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(config: CoverConfig, endstops: MockEndstops, restore: Option<CoverSnapshot>) -> Self {
        let clock = SimClock::new(0);
        let edges = Rc::new(RefCell::new(Vec::new()));
        let relay = MockRelay {
            clock: clock.clone(),
            edges: Rc::clone(&edges),
        };
        let cover = CoverBuilder::new(config)
            .output(relay)
            .endstops(endstops.clone())
            .restore(restore)
            .build(clock.clone())
            .expect("valid test config");
        Self {
            clock,
            cover,
            endstops,
            sink: RecordingSink::default(),
            edges,
        }
    }

    /// No endstops, restored at `position`.
    pub fn at(config: CoverConfig, position: f32, last_operation: MotionOperation) -> Self {
        let mut rig = Self::new(
            config,
            MockEndstops::default(),
            Some(CoverSnapshot {
                position,
                last_operation,
            }),
        );
        rig.cover.start();
        rig
    }

    /// Run the host loop for `duration_ms`.
    pub fn run_for(&mut self, duration_ms: u64) {
        let end = self.clock.now_ms() + duration_ms;
        while self.clock.now_ms() < end {
            self.step();
        }
    }

    /// Tick until `done` holds or `limit_ms` elapses.  Returns the time spent.
    pub fn run_until(&mut self, limit_ms: u64, done: impl Fn(&MockCover) -> bool) -> u64 {
        let start = self.clock.now_ms();
        while !done(&self.cover) && self.clock.now_ms() - start < limit_ms {
            self.step();
        }
        self.clock.now_ms() - start
    }

    /// One host loop iteration: advance, tick, drain events.
    fn step(&mut self) {
        self.clock.advance(TICK_MS);
        self.cover.tick();
        self.cover.flush_events(&mut self.sink);
    }

    /// Timestamps of every relay rising edge so far.
    pub fn rising_edges(&self) -> Vec<u64> {
        self.edges
            .borrow()
            .iter()
            .filter(|e| e.on)
            .map(|e| e.at_ms)
            .collect()
    }

    pub fn relay_is_on(&self) -> bool {
        self.edges.borrow().last().is_some_and(|e| e.on)
    }

    /// Flush queued events into the sink and return everything recorded.
    pub fn events(&mut self) -> &[CoverEvent] {
        self.cover.flush_events(&mut self.sink);
        &self.sink.events
    }

    /// Recorded events without the periodic state publications.
    pub fn lifecycle_events(&mut self) -> Vec<CoverEvent> {
        self.events()
            .iter()
            .copied()
            .filter(|e| !matches!(e, CoverEvent::StatePublished(_)))
            .collect()
    }
}

/// 10 s travel both ways, three direction starts before tripping.
pub fn test_config() -> CoverConfig {
    CoverConfig {
        open_duration_ms: 10_000,
        close_duration_ms: 10_000,
        safety_max_cycles: 3,
        ..CoverConfig::default()
    }
}
