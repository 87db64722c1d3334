//! Output driver traits
//!
//! These traits define the interface between the control logic and the
//! peripherals that move pixels and actuators.

pub mod actuator;
pub mod pixel;

pub use actuator::ActuatorDriver;
pub use pixel::PixelDriver;

use core::convert::Infallible;

/// Driver for a rig without that output class
///
/// Accepts and discards every write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOutput;

impl PixelDriver for NoOutput {
    type Error = Infallible;

    fn write_bank(&mut self, _bank: u8, _pixels: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn show(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl ActuatorDriver for NoOutput {
    type Error = Infallible;

    fn write_drive(&mut self, _bank: u8, _sub_channel: u8, _level: u16) -> Result<(), Self::Error> {
        Ok(())
    }
}
