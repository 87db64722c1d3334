//! Pixel chain drivers

mod ws2812;

pub use ws2812::{encode_byte, scale, Ws2812Error, Ws2812Spi, BYTES_PER_PIXEL, LATCH_BYTES, SPI_FREQUENCY_HZ};

use mirror_core::traits::PixelDriver;

/// Error from one side of a [`DualBank`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DualBankError<A, B> {
    /// Bank 0 driver failed
    First(A),
    /// Bank 1 driver failed
    Second(B),
    /// Only banks 0 and 1 exist
    NoSuchBank(u8),
}

/// Two single-bank drivers exposed as banks 0 and 1
///
/// Each side sees its bank as bank 0. `show` latches both sides; the second
/// still latches when the first fails.
pub struct DualBank<A, B> {
    first: A,
    second: B,
}

impl<A: PixelDriver, B: PixelDriver> DualBank<A, B> {
    /// `first` serves bank 0, `second` bank 1
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    /// Release both drivers
    pub fn release(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: PixelDriver, B: PixelDriver> PixelDriver for DualBank<A, B> {
    type Error = DualBankError<A::Error, B::Error>;

    fn write_bank(&mut self, bank: u8, pixels: &[u8]) -> Result<(), Self::Error> {
        match bank {
            0 => self.first.write_bank(0, pixels).map_err(DualBankError::First),
            1 => self.second.write_bank(0, pixels).map_err(DualBankError::Second),
            other => Err(DualBankError::NoSuchBank(other)),
        }
    }

    fn show(&mut self) -> Result<(), Self::Error> {
        let first = self.first.show().map_err(DualBankError::First);
        let second = self.second.show().map_err(DualBankError::Second);
        first.and(second)
    }
}
