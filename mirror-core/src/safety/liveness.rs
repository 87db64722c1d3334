//! Liveness monitor
//!
//! Tracks when each output class last received a valid frame and reports
//! when one has gone quiet for longer than its threshold. A class that has
//! fired goes back to "never updated" and stays silent until new data
//! arrives, so a dead link blanks the outputs once, not every tick.

use crate::config::TimingConfig;

/// Output class watched by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputClass {
    /// Pixel matrix
    Pixels,
    /// Actuator array
    Actuators,
}

/// Classes whose failsafe fired during one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StaleOutputs {
    /// Pixel data went stale
    pub pixels: bool,
    /// Actuator data went stale
    pub actuators: bool,
}

impl StaleOutputs {
    /// Whether anything fired
    pub fn any(&self) -> bool {
        self.pixels || self.actuators
    }
}

/// Per-class staleness tracking
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    /// Time of the last pixel frame, `None` = never
    last_pixels_ms: Option<u32>,
    /// Time of the last actuator frame, `None` = never
    last_actuators_ms: Option<u32>,
    pixel_timeout_ms: u32,
    actuator_timeout_ms: u32,
}

impl LivenessMonitor {
    /// Create a monitor with both classes never updated
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            last_pixels_ms: None,
            last_actuators_ms: None,
            pixel_timeout_ms: timing.pixel_timeout_ms,
            actuator_timeout_ms: timing.actuator_timeout_ms,
        }
    }

    /// Record a valid frame for `class`
    pub fn record(&mut self, class: OutputClass, now_ms: u32) {
        *self.slot(class) = Some(now_ms);
    }

    /// Time of the last valid frame for `class`
    pub fn last_update(&self, class: OutputClass) -> Option<u32> {
        match class {
            OutputClass::Pixels => self.last_pixels_ms,
            OutputClass::Actuators => self.last_actuators_ms,
        }
    }

    /// Whether `class` will fire once its data goes stale
    pub fn is_armed(&self, class: OutputClass) -> bool {
        self.last_update(class).is_some()
    }

    /// Check both classes
    ///
    /// A class fires when it has been updated and more than its threshold
    /// has passed; firing disarms it.
    pub fn check(&mut self, now_ms: u32) -> StaleOutputs {
        StaleOutputs {
            pixels: self.expire(OutputClass::Pixels, now_ms),
            actuators: self.expire(OutputClass::Actuators, now_ms),
        }
    }

    fn expire(&mut self, class: OutputClass, now_ms: u32) -> bool {
        let timeout = match class {
            OutputClass::Pixels => self.pixel_timeout_ms,
            OutputClass::Actuators => self.actuator_timeout_ms,
        };
        let slot = self.slot(class);
        match *slot {
            Some(last) if now_ms.wrapping_sub(last) > timeout => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    fn slot(&mut self, class: OutputClass) -> &mut Option<u32> {
        match class {
            OutputClass::Pixels => &mut self.last_pixels_ms,
            OutputClass::Actuators => &mut self.last_actuators_ms,
        }
    }
}
