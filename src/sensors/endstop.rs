//! Limit switch interpretation.
//!
//! Up to two binary endstops ("open reached", "close reached"), each
//! optionally inverted.  Raw levels come from an
//! [`EndstopPort`](crate::app::ports::EndstopPort); this module applies
//! inversion and classifies the pair.

use crate::app::ports::EndstopPort;
use crate::config::CoverConfig;
use crate::control::{CLOSED_POSITION, OPEN_POSITION};
use crate::fsm::{MotionOperation, TriggerOperation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endstop {
    Open,
    Close,
}

impl Endstop {
    /// Travel direction that ends at this switch.
    pub const fn direction(self) -> MotionOperation {
        match self {
            Self::Open => MotionOperation::Opening,
            Self::Close => MotionOperation::Closing,
        }
    }

    /// Position the cover sits at when this switch is active.
    pub const fn bound(self) -> f32 {
        match self {
            Self::Open => OPEN_POSITION,
            Self::Close => CLOSED_POSITION,
        }
    }

    /// Whether an activation of this switch concerns the current request.
    pub fn matches(self, trigger: TriggerOperation) -> bool {
        TriggerOperation::from(self.direction()) == trigger
    }

    fn inverted(self, config: &CoverConfig) -> bool {
        match self {
            Self::Open => config.open_sensor_inverted,
            Self::Close => config.close_sensor_inverted,
        }
    }
}

/// What the pair of switches says about the cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndstopStatus {
    /// Open switch active, close switch inactive or unwired.
    Open,
    /// Close switch active, open switch inactive or unwired.
    Closed,
    /// Wired switches are all inactive.
    Travel,
    /// Both switches active at once: wiring or configuration fault.
    Conflict,
    /// No switch is wired.
    Unwired,
}

/// Logical endstop levels after inversion.  `None` = not wired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndstopSnapshot {
    pub open: Option<bool>,
    pub close: Option<bool>,
}

impl EndstopSnapshot {
    /// Read both switches and apply the configured inversion.
    pub fn read(port: &mut impl EndstopPort, config: &CoverConfig) -> Self {
        Self {
            open: read_one(port, Endstop::Open, config),
            close: read_one(port, Endstop::Close, config),
        }
    }

    pub fn get(&self, endstop: Endstop) -> Option<bool> {
        match endstop {
            Endstop::Open => self.open,
            Endstop::Close => self.close,
        }
    }

    pub fn is_active(&self, endstop: Endstop) -> bool {
        self.get(endstop) == Some(true)
    }

    /// Both switches are wired, so position is observed rather than assumed.
    pub fn fully_wired(&self) -> bool {
        self.open.is_some() && self.close.is_some()
    }

    pub fn any_wired(&self) -> bool {
        self.open.is_some() || self.close.is_some()
    }

    pub fn status(&self) -> EndstopStatus {
        match (self.open, self.close) {
            (None, None) => EndstopStatus::Unwired,
            (Some(true), Some(true)) => EndstopStatus::Conflict,
            (Some(true), _) => EndstopStatus::Open,
            (_, Some(true)) => EndstopStatus::Closed,
            _ => EndstopStatus::Travel,
        }
    }
}

/// Read one switch and apply its inversion flag.
pub fn read_one(port: &mut impl EndstopPort, endstop: Endstop, config: &CoverConfig) -> Option<bool> {
    port.raw_state(endstop)
        .map(|raw| raw != endstop.inverted(config))
}
