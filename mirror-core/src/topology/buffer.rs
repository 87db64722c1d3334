//! Physical pixel buffer
//!
//! Holds one intensity per physical pixel, in chain order, bank 0 first.
//! Every apply replaces the whole buffer: lengths are checked before the
//! first write and the map is total, so a frame is either applied
//! completely or not at all.

use heapless::Vec;

use mirror_protocol::PackedBits;

use crate::config::{ConfigError, MatrixConfig, MAX_PIXELS};
use crate::topology::TopologyMap;
use crate::traits::PixelDriver;
use crate::LengthMismatch;

/// Output buffer for the pixel matrix
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    map: TopologyMap,
    pixels: Vec<u8, MAX_PIXELS>,
}

impl PixelBuffer {
    /// Create an all-zero buffer sized for `map`
    pub fn new(map: TopologyMap) -> Self {
        let mut pixels = Vec::new();
        // Validated maps never exceed MAX_PIXELS
        let _ = pixels.resize(map.pixel_count().min(MAX_PIXELS), 0);
        Self { map, pixels }
    }

    /// Create a buffer from a matrix configuration
    pub fn from_config(config: &MatrixConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(TopologyMap::new(config)?))
    }

    /// The mapping in use
    pub fn map(&self) -> &TopologyMap {
        &self.map
    }

    /// Replace the mapping; dimensions must not change
    ///
    /// The buffer is cleared, since existing contents follow the old wiring.
    pub fn set_map(&mut self, map: TopologyMap) -> Result<(), ConfigError> {
        let old = self.map.config();
        let new = map.config();
        if old.width != new.width || old.height != new.height || old.panel_size != new.panel_size {
            return Err(ConfigError::DimensionsChanged);
        }
        self.map = map;
        self.clear();
        Ok(())
    }

    /// Apply a grayscale payload, one byte per logical pixel
    pub fn apply_grayscale(&mut self, payload: &[u8]) -> Result<(), LengthMismatch> {
        let expected = self.map.pixel_count();
        if payload.len() != expected {
            return Err(LengthMismatch {
                expected,
                actual: payload.len(),
            });
        }
        self.fill_logical(|index| payload[index]);
        Ok(())
    }

    /// Apply a packed payload, one MSB-first bit per logical pixel
    ///
    /// "On" pixels take the configured on-level.
    pub fn apply_packed(&mut self, bits: PackedBits<'_>) -> Result<(), LengthMismatch> {
        let expected = self.map.pixel_count().div_ceil(8);
        let actual = bits.len() / 8;
        if actual != expected {
            return Err(LengthMismatch { expected, actual });
        }
        let on_level = self.map.config().on_level;
        self.fill_logical(|index| if bits.bit(index) { on_level } else { 0 });
        Ok(())
    }

    /// Set every pixel to zero
    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = 0);
    }

    /// Whether every pixel is zero
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == 0)
    }

    /// Flat physical contents
    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }

    /// Contents of one driver bank; empty for unknown banks
    pub fn bank(&self, bank: u8) -> &[u8] {
        let start = self.map.bank_start(bank);
        let len = self.map.bank_len(bank);
        self.pixels.get(start..start + len).unwrap_or(&[])
    }

    /// Intensity at a logical coordinate
    pub fn get(&self, x: u16, y: u16) -> Option<u8> {
        let index = self.map.map(x, y)?;
        self.pixels.get(self.map.flat_index(index)).copied()
    }

    /// Hand every bank to the driver, then latch
    pub fn commit<D: PixelDriver>(&self, driver: &mut D) -> Result<(), D::Error> {
        for bank in 0..self.map.bank_count() {
            driver.write_bank(bank, self.bank(bank))?;
        }
        driver.show()
    }

    fn fill_logical<F: Fn(usize) -> u8>(&mut self, value: F) {
        let width = self.map.width();
        for y in 0..self.map.height() {
            for x in 0..width {
                let flat = self.map.flat_index(self.map.locate(x, y));
                self.pixels[flat] = value(y as usize * width as usize + x as usize);
            }
        }
    }
}
