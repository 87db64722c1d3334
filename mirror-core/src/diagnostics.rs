//! Fault counters
//!
//! Nothing here is fatal; the controller counts each event and carries on.

use crate::safety::OutputClass;

/// Fault categories seen by the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Bad or disabled type byte after a header
    Framing,
    /// Receive backlog over the limit; input flushed
    Overrun,
    /// Actuator value above the wire domain; clamped
    Range,
    /// An output class went stale; failsafe applied
    Staleness(OutputClass),
    /// A peripheral write failed
    Driver,
}

/// Running event counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    /// Frames decoded and applied
    pub frames_ok: u32,
    /// Framing errors
    pub framing_errors: u32,
    /// Frames decoded but not applicable to this rig
    pub rejected_frames: u32,
    /// Overrun flushes
    pub overruns: u32,
    /// Bytes dropped by overrun flushes
    pub flushed_bytes: u32,
    /// Clamped actuator values
    pub clamped_values: u32,
    /// Pixel failsafes fired
    pub pixel_failsafes: u32,
    /// Actuator failsafes fired
    pub actuator_failsafes: u32,
    /// Failed peripheral writes
    pub driver_errors: u32,
}

impl Diagnostics {
    /// Count `n` occurrences of `fault`
    pub fn record(&mut self, fault: Fault, n: u32) {
        let counter = match fault {
            Fault::Framing => &mut self.framing_errors,
            Fault::Overrun => &mut self.overruns,
            Fault::Range => &mut self.clamped_values,
            Fault::Staleness(OutputClass::Pixels) => &mut self.pixel_failsafes,
            Fault::Staleness(OutputClass::Actuators) => &mut self.actuator_failsafes,
            Fault::Driver => &mut self.driver_errors,
        };
        *counter = counter.saturating_add(n);
    }

    /// Total occurrences of `fault`
    pub fn count(&self, fault: Fault) -> u32 {
        match fault {
            Fault::Framing => self.framing_errors,
            Fault::Overrun => self.overruns,
            Fault::Range => self.clamped_values,
            Fault::Staleness(OutputClass::Pixels) => self.pixel_failsafes,
            Fault::Staleness(OutputClass::Actuators) => self.actuator_failsafes,
            Fault::Driver => self.driver_errors,
        }
    }
}
