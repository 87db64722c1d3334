//! Logical to physical pixel mapping
//!
//! The host sends pixels row-major over the whole matrix. Physically the
//! matrix is a grid of square panels, each a serpentine strip, chained into
//! one or two driver banks. [`TopologyMap`] is the pure function between
//! the two orders.

use crate::config::{ConfigError, MatrixConfig, PanelOrder};

/// Location of a pixel in the physical output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysicalIndex {
    /// Driver bank
    pub bank: u8,
    /// Position in the bank's chain
    pub offset: u16,
}

/// Pure, total mapping from logical coordinates to physical chain positions
///
/// Bijective over `0..width × 0..height` for every configuration that
/// passes [`MatrixConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyMap {
    config: MatrixConfig,
    panels_x: u16,
    panels_y: u16,
}

impl TopologyMap {
    /// Build a map from a matrix configuration
    pub fn new(config: &MatrixConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            panels_x: config.panels_x(),
            panels_y: config.panels_y(),
            config: config.clone(),
        })
    }

    /// Configuration the map was built from
    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    /// Logical width
    pub fn width(&self) -> u16 {
        self.config.width
    }

    /// Logical height
    pub fn height(&self) -> u16 {
        self.config.height
    }

    /// Total pixel count
    pub fn pixel_count(&self) -> usize {
        self.config.pixel_count()
    }

    /// Number of driver banks
    pub fn bank_count(&self) -> u8 {
        self.config.bank_count()
    }

    /// Pixels chained into `bank`
    pub fn bank_len(&self, bank: u8) -> usize {
        if bank >= self.bank_count() {
            return 0;
        }
        let panel_area = self.panel_area();
        self.side_columns(self.side_of(bank)) as usize * self.panels_y as usize * panel_area
    }

    /// Offset of `bank` in the flat physical buffer
    pub fn bank_start(&self, bank: u8) -> usize {
        (0..bank).map(|b| self.bank_len(b)).sum()
    }

    /// Map a logical coordinate; `None` outside the matrix
    pub fn map(&self, x: u16, y: u16) -> Option<PhysicalIndex> {
        if x >= self.config.width || y >= self.config.height {
            return None;
        }
        Some(self.locate(x, y))
    }

    /// Map a row-major logical index; `None` past the last pixel
    pub fn map_logical(&self, index: usize) -> Option<PhysicalIndex> {
        let width = self.config.width as usize;
        if index >= self.pixel_count() {
            return None;
        }
        Some(self.locate((index % width) as u16, (index / width) as u16))
    }

    /// Position of a physical index in the flat buffer (bank 0 first)
    pub fn flat_index(&self, index: PhysicalIndex) -> usize {
        self.bank_start(index.bank) + index.offset as usize
    }

    /// Map a coordinate already known to be inside the matrix
    pub(crate) fn locate(&self, x: u16, y: u16) -> PhysicalIndex {
        let size = self.config.panel_size;
        let panel_row = y / size;
        let panel_col = x / size;

        let mut local_x = x % size;
        let mut local_y = y % size;
        if self.config.mirror_x {
            local_x = size - 1 - local_x;
        }
        if self.config.mirror_y {
            local_y = size - 1 - local_y;
        }
        let in_panel = if self.config.serpentine && local_y % 2 == 1 {
            local_y * size + (size - 1 - local_x)
        } else {
            local_y * size + local_x
        };

        let split = self.config.split_column;
        let (side, first_col) = if split == 0 || panel_col < split {
            (0, 0)
        } else {
            (1, split)
        };
        let local_col = panel_col - first_col;
        let cols = self.side_columns(side);

        let slot = match &self.config.panel_order {
            PanelOrder::RowMajor => panel_row * cols + local_col,
            PanelOrder::ColumnMajor => local_col * self.panels_y + panel_row,
            PanelOrder::Custom(slots) => {
                let logical = (panel_row * cols + local_col) as usize;
                slots.get(logical).copied().map_or(logical as u16, u16::from)
            }
        };

        PhysicalIndex {
            bank: self.bank_of(side),
            offset: slot * size * size + in_panel,
        }
    }

    fn panel_area(&self) -> usize {
        let size = self.config.panel_size as usize;
        size * size
    }

    // Panel columns on one side of the split
    fn side_columns(&self, side: u8) -> u16 {
        match (self.config.split_column, side) {
            (0, _) => self.panels_x,
            (split, 0) => split,
            (split, _) => self.panels_x - split,
        }
    }

    fn bank_of(&self, side: u8) -> u8 {
        if self.config.swap_banks && self.bank_count() == 2 {
            1 - side
        } else {
            side
        }
    }

    fn side_of(&self, bank: u8) -> u8 {
        // Swapping is its own inverse
        self.bank_of(bank)
    }
}
