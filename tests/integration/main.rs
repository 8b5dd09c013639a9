//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one concern of the
//! controller against mock adapters.  Everything runs on the host with a
//! simulated clock.

mod controller_tests;
mod endstop_tests;
mod mock_hw;
mod persistence_tests;
