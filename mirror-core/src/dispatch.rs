//! Packet dispatch
//!
//! Routes each complete frame to the output it addresses and refreshes that
//! output's liveness. Probes produce a text reply instead.

use mirror_hal::UartTx;
use mirror_protocol::{Frame, FrameKind, InfoReply, Packet, PONG_REPLY};

use crate::actuator::{ActuatorArray, TargetsApplied};
use crate::config::{Capabilities, ConfigError, ControllerConfig};
use crate::safety::{LivenessMonitor, OutputClass};
use crate::topology::PixelBuffer;
use crate::LengthMismatch;

/// Text reply owed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    /// Answer to a ping
    Pong,
    /// Answer to an info probe
    Info(InfoReply),
}

impl Reply {
    /// Write the reply text to the transmit side of the link
    pub fn write_to<T: UartTx + ?Sized>(&self, tx: &mut T) -> Result<(), T::Error> {
        match self {
            Reply::Pong => tx.write_blocking(PONG_REPLY),
            Reply::Info(info) => tx.write_blocking(info.render().as_bytes()),
        }
    }
}

/// What a dispatched frame changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatched {
    /// Pixel buffer replaced; needs a commit
    Pixels,
    /// Actuator targets replaced
    Actuators(TargetsApplied),
    /// Probe answered
    Reply(Reply),
}

/// Why a frame was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// Frame type not enabled on this rig
    Disabled(FrameKind),
    /// Payload length does not fit the rig
    Length(FrameKind, LengthMismatch),
}

/// Output state owned by the control loop
#[derive(Debug, Clone)]
pub struct OutputState {
    /// Physical pixel buffer
    pub pixels: PixelBuffer,
    /// Actuator channels
    pub actuators: ActuatorArray,
    /// Per-class staleness
    pub liveness: LivenessMonitor,
    capabilities: Capabilities,
}

impl OutputState {
    /// Build blank outputs for a validated configuration
    pub fn new(config: &ControllerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            pixels: PixelBuffer::from_config(&config.matrix)?,
            actuators: ActuatorArray::new(&config.actuators)?,
            liveness: LivenessMonitor::new(&config.timing),
            capabilities: config.capabilities,
        })
    }

    /// Enabled frame types
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Identity block for the info probe
    pub fn info(&self) -> InfoReply {
        let map = self.pixels.map();
        let channels = if self.capabilities.actuators {
            self.actuators.len() as u16
        } else {
            0
        };
        InfoReply {
            width: map.width(),
            height: map.height(),
            panels: map.config().panel_count(),
            channels,
        }
    }

    /// Apply one complete frame received at `now_ms`
    pub fn dispatch(&mut self, frame: Frame<'_>, now_ms: u32) -> Result<Dispatched, DispatchError> {
        let kind = frame.kind;
        if !self.capabilities.allows(kind) {
            return Err(DispatchError::Disabled(kind));
        }
        let length = |e| DispatchError::Length(kind, e);

        match Packet::from_frame(frame) {
            Packet::Grayscale(payload) => {
                self.pixels.apply_grayscale(payload).map_err(length)?;
                self.liveness.record(OutputClass::Pixels, now_ms);
                Ok(Dispatched::Pixels)
            }
            Packet::PackedPixels(bits) => {
                self.pixels.apply_packed(bits).map_err(length)?;
                self.liveness.record(OutputClass::Pixels, now_ms);
                Ok(Dispatched::Pixels)
            }
            Packet::Actuators(targets) => {
                let applied = self.actuators.apply(targets).map_err(length)?;
                self.liveness.record(OutputClass::Actuators, now_ms);
                Ok(Dispatched::Actuators(applied))
            }
            Packet::Ping => Ok(Dispatched::Reply(Reply::Pong)),
            Packet::Info => Ok(Dispatched::Reply(Reply::Info(self.info()))),
        }
    }
}
