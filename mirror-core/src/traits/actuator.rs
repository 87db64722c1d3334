//! Actuator driver trait

/// A set of addressable actuator peripherals
///
/// Each bank is one peripheral; `sub_channel` selects the output on it.
/// Levels are in the peripheral's native units (PWM counts).
pub trait ActuatorDriver {
    /// Driver-specific error
    type Error;

    /// Set the drive level of one output
    fn write_drive(&mut self, bank: u8, sub_channel: u8, level: u16) -> Result<(), Self::Error>;
}

impl<T: ActuatorDriver + ?Sized> ActuatorDriver for &mut T {
    type Error = T::Error;

    fn write_drive(&mut self, bank: u8, sub_channel: u8, level: u16) -> Result<(), Self::Error> {
        T::write_drive(self, bank, sub_channel, level)
    }
}
