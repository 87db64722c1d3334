//! Pixel driver trait

/// A peripheral that latches one or more banks of pixel intensities
///
/// The controller writes every bank of a complete frame and then calls
/// [`show`](PixelDriver::show) exactly once; a driver may buffer writes
/// until then.
pub trait PixelDriver {
    /// Driver-specific error
    type Error;

    /// Stage the intensities for `bank`, in physical chain order
    fn write_bank(&mut self, bank: u8, pixels: &[u8]) -> Result<(), Self::Error>;

    /// Latch every staged bank onto the panels
    fn show(&mut self) -> Result<(), Self::Error>;
}

impl<T: PixelDriver + ?Sized> PixelDriver for &mut T {
    type Error = T::Error;

    fn write_bank(&mut self, bank: u8, pixels: &[u8]) -> Result<(), Self::Error> {
        T::write_bank(self, bank, pixels)
    }

    fn show(&mut self) -> Result<(), Self::Error> {
        T::show(self)
    }
}
