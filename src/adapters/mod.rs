//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements    | Connects to                    |
//! |------------|---------------|--------------------------------|
//! | `hal`      | OutputPort    | embedded-hal `OutputPin`       |
//! |            | EndstopPort   | embedded-hal `InputPin`s       |
//! | `log_sink` | EventSink     | `log` facade                   |
//! | `memory`   | StoragePort   | in-memory map (host / tests)   |
//! | `time`     | ClockPort     | `std::time::Instant`, sim clock|

pub mod hal;
pub mod log_sink;
pub mod memory;
pub mod time;
