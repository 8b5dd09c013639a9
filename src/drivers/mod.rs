//! Hardware-facing drivers.

pub mod pulse;
