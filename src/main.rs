//! Impulse cover host simulator.
//!
//! Runs a scripted session against a simulated relay and clock, logging
//! every relay edge and cover event.
//!
//! ```text
//! impulse-cover-sim [-v] [config.json]
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use impulse_cover::adapters::log_sink::LogEventSink;
use impulse_cover::adapters::memory::MemoryStorage;
use impulse_cover::adapters::time::SimClock;
use impulse_cover::app::ports::{ClockPort, OutputPort};
use impulse_cover::persistence::{CoverSnapshot, SnapshotStore};
use impulse_cover::{CoverBuilder, CoverCommand, CoverConfig, CoverController, MotionOperation};

/// Tick interval of the simulated host loop.
const TICK: Duration = Duration::from_millis(50);

/// Relay that logs its edges against the simulated clock.
struct SimRelay {
    clock: SimClock,
}

impl OutputPort for SimRelay {
    fn turn_on(&mut self) {
        info!("RELAY | on  @ {}ms", self.clock.now_ms());
    }

    fn turn_off(&mut self) {
        info!("RELAY | off @ {}ms", self.clock.now_ms());
    }
}

type SimCover = CoverController<SimClock, SimRelay, impulse_cover::app::ports::NoEndstops>;

fn main() -> Result<()> {
    let mut verbose = false;
    let mut config_path = None;
    for arg in std::env::args().skip(1) {
        if arg == "-v" || arg == "--verbose" {
            verbose = true;
        } else {
            config_path = Some(arg);
        }
    }

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
    builder.init();

    let config = match config_path {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            serde_json::from_str::<CoverConfig>(&text)
                .with_context(|| format!("parsing config {path}"))?
        }
        None => CoverConfig::default(),
    };
    config.validate().context("invalid configuration")?;
    info!("SIM | config {}", serde_json::to_string(&config)?);

    // Seed storage as if a previous run had left the cover closed.
    let mut storage = MemoryStorage::new();
    let store = SnapshotStore::new();
    store.save(
        &mut storage,
        &CoverSnapshot {
            position: 0.0,
            last_operation: MotionOperation::Closing,
        },
    )?;

    let clock = SimClock::new(0);
    let mut cover = CoverBuilder::new(config.clone())
        .output(SimRelay {
            clock: clock.clone(),
        })
        .restore(store.load(&storage)?)
        .build(clock.clone())?;
    let mut sink = LogEventSink::new();
    cover.start();

    let half_open = u64::from(config.open_duration_ms) / 2;
    let full_close = u64::from(config.close_duration_ms);

    cover.control(CoverCommand::Open);
    run_for(&mut cover, &clock, &mut sink, half_open);
    cover.control(CoverCommand::Stop);
    run_for(&mut cover, &clock, &mut sink, 2_000);

    cover.control(CoverCommand::SetPosition(0.2));
    run_for(&mut cover, &clock, &mut sink, full_close);

    cover.control(CoverCommand::Toggle);
    run_for(&mut cover, &clock, &mut sink, full_close + 1_000);

    if cover.persist_if_needed(&mut storage) {
        info!("SIM | snapshot persisted: {:?}", store.load(&storage)?);
    }
    info!(
        "SIM | done at {}ms: position={:.2} op={:?} pulses={} events={}",
        clock.now_ms(),
        cover.position(),
        cover.operation(),
        cover.pulses_sent(),
        sink.emitted()
    );
    Ok(())
}

fn run_for(cover: &mut SimCover, clock: &SimClock, sink: &mut LogEventSink, duration_ms: u64) {
    let step = TICK.as_millis() as u64;
    let end = clock.now_ms() + duration_ms;
    while clock.now_ms() < end {
        clock.advance(step);
        cover.tick();
        cover.flush_events(sink);
    }
}
