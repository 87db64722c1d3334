//! WS2812 chains clocked out of an SPI MOSI line
//!
//! At 3.2 MHz one LED bit takes four SPI bits: `1000` for a zero and `1110`
//! for a one. Every pixel carries a single intensity, sent identically on
//! the green, red and blue channels.

use embedded_hal::spi::SpiBus;

use mirror_core::traits::PixelDriver;

/// SPI clock the bit patterns are timed for
pub const SPI_FREQUENCY_HZ: u32 = 3_200_000;

/// SPI bytes per colour byte
pub const BYTES_PER_COLOR: usize = 4;

/// SPI bytes per pixel (three colour bytes)
pub const BYTES_PER_PIXEL: usize = 3 * BYTES_PER_COLOR;

/// Zero bytes that hold the line low long enough to latch (300 us)
pub const LATCH_BYTES: usize = 120;

const CHUNK_PIXELS: usize = 16;
const ZERO_CODE: u8 = 0b1000;
const ONE_CODE: u8 = 0b1110;
const LATCH: [u8; LATCH_BYTES] = [0; LATCH_BYTES];

/// Encode one colour byte, most significant bit first
pub const fn encode_byte(value: u8) -> [u8; BYTES_PER_COLOR] {
    let mut out = [0u8; BYTES_PER_COLOR];
    let mut i = 0;
    while i < BYTES_PER_COLOR {
        let hi = (value >> (7 - 2 * i)) & 1;
        let lo = (value >> (6 - 2 * i)) & 1;
        let hi = if hi == 1 { ONE_CODE } else { ZERO_CODE };
        let lo = if lo == 1 { ONE_CODE } else { ZERO_CODE };
        out[i] = (hi << 4) | lo;
        i += 1;
    }
    out
}

/// Scale an intensity by a global brightness; 255 leaves it unchanged
pub const fn scale(value: u8, brightness: u8) -> u8 {
    ((value as u16 * (brightness as u16 + 1)) >> 8) as u8
}

/// Errors from an LED chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ws2812Error<E> {
    /// Bus transfer failed
    Spi(E),
    /// A single chain only serves bank 0
    NoSuchBank(u8),
}

/// One WS2812 chain on a dedicated SPI bus
pub struct Ws2812Spi<SPI> {
    spi: SPI,
    brightness: u8,
}

impl<SPI: SpiBus<u8>> Ws2812Spi<SPI> {
    /// Chain on `spi`, which must already run at [`SPI_FREQUENCY_HZ`]
    pub fn new(spi: SPI) -> Self {
        Self { spi, brightness: 255 }
    }

    /// Global brightness applied to every pixel
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Set the global brightness; takes effect from the next write
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    /// Clock out intensities for the chain, first LED first
    pub fn write_pixels(&mut self, pixels: &[u8]) -> Result<(), Ws2812Error<SPI::Error>> {
        let mut staging = [0u8; CHUNK_PIXELS * BYTES_PER_PIXEL];
        for chunk in pixels.chunks(CHUNK_PIXELS) {
            let mut len = 0;
            for &value in chunk {
                let code = encode_byte(scale(value, self.brightness));
                for _ in 0..3 {
                    staging[len..len + BYTES_PER_COLOR].copy_from_slice(&code);
                    len += BYTES_PER_COLOR;
                }
            }
            self.spi.write(&staging[..len]).map_err(Ws2812Error::Spi)?;
        }
        Ok(())
    }

    /// Hold the line low so the chain latches what it received
    pub fn latch(&mut self) -> Result<(), Ws2812Error<SPI::Error>> {
        self.spi.write(&LATCH).map_err(Ws2812Error::Spi)?;
        self.spi.flush().map_err(Ws2812Error::Spi)
    }

    /// Release the bus
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI: SpiBus<u8>> PixelDriver for Ws2812Spi<SPI> {
    type Error = Ws2812Error<SPI::Error>;

    fn write_bank(&mut self, bank: u8, pixels: &[u8]) -> Result<(), Self::Error> {
        if bank != 0 {
            return Err(Ws2812Error::NoSuchBank(bank));
        }
        self.write_pixels(pixels)
    }

    fn show(&mut self) -> Result<(), Self::Error> {
        self.latch()
    }
}
