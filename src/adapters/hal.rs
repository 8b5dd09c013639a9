//! embedded-hal pin adapters.
//!
//! [`RelayOutput`] drives the impulse relay from any `OutputPin`;
//! [`PinEndstops`] reads up to two limit switches from `InputPin`s.
//! Pin errors are logged and never reach the domain: a failed relay write
//! is lost, a failed switch read counts as "no reading".

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use log::error;

use crate::app::ports::{EndstopPort, OutputPort};
use crate::sensors::endstop::Endstop;

// ───────────────────────────────────────────────────────────────
// Relay output
// ───────────────────────────────────────────────────────────────

pub struct RelayOutput<P> {
    pin: P,
}

impl<P: OutputPin> RelayOutput<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> OutputPort for RelayOutput<P> {
    fn turn_on(&mut self) {
        if let Err(e) = self.pin.set_high() {
            error!("RELAY: set_high failed: {e:?}");
        }
    }

    fn turn_off(&mut self) {
        if let Err(e) = self.pin.set_low() {
            error!("RELAY: set_low failed: {e:?}");
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Endstop inputs
// ───────────────────────────────────────────────────────────────

/// Placeholder pin type for a switch that is not wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unwired;

impl ErrorType for Unwired {
    type Error = core::convert::Infallible;
}

impl InputPin for Unwired {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Raw pin levels for the two switches (inversion is applied later).
pub struct PinEndstops<A, B> {
    open: Option<A>,
    close: Option<B>,
}

impl<A: InputPin, B: InputPin> PinEndstops<A, B> {
    pub fn new(open: Option<A>, close: Option<B>) -> Self {
        Self { open, close }
    }

    pub fn both(open: A, close: B) -> Self {
        Self::new(Some(open), Some(close))
    }
}

impl<A: InputPin> PinEndstops<A, Unwired> {
    pub fn open_only(open: A) -> Self {
        Self::new(Some(open), None)
    }
}

impl<B: InputPin> PinEndstops<Unwired, B> {
    pub fn close_only(close: B) -> Self {
        Self::new(None, Some(close))
    }
}

impl<A: InputPin, B: InputPin> EndstopPort for PinEndstops<A, B> {
    fn raw_state(&mut self, endstop: Endstop) -> Option<bool> {
        let level = match endstop {
            Endstop::Open => self.open.as_mut()?.is_high().map_err(|e| format!("{e:?}")),
            Endstop::Close => self.close.as_mut()?.is_high().map_err(|e| format!("{e:?}")),
        };
        match level {
            Ok(high) => Some(high),
            Err(e) => {
                error!("ENDSTOP: {endstop:?} read failed: {e}");
                None
            }
        }
    }
}
