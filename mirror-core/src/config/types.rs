//! Configuration type definitions
//!
//! These types describe one controller rig: the pixel matrix geometry and
//! wiring, the actuator banks, loop timing, transport budgets and which
//! frame types are enabled. The firmware receives them as postcard binary
//! data produced from `controller.toml` at build time.

use heapless::Vec;

use mirror_protocol::{FrameKind, FrameLayout};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum physical pixels across all banks
pub const MAX_PIXELS: usize = 2048;

/// Maximum pixel driver banks
pub const MAX_PIXEL_BANKS: usize = 2;

/// Maximum panels wired into one pixel bank
pub const MAX_PANELS_PER_BANK: usize = 16;

/// Maximum actuator channels
pub const MAX_CHANNELS: usize = 64;

/// Maximum actuator driver banks
pub const MAX_ACTUATOR_BANKS: usize = 8;

/// Largest payload any enabled frame type can carry
///
/// Grayscale frames are the largest: one byte per pixel.
pub const MAX_PAYLOAD: usize = MAX_PIXELS;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Width, height or panel size is zero
    ZeroDimension,
    /// Width or height is not a whole number of panels
    PanelSizeMismatch,
    /// Pixel count exceeds [`MAX_PIXELS`]
    TooManyPixels,
    /// Largest enabled payload does not fit the decoder buffer
    PayloadTooLarge,
    /// Split column is not strictly inside the panel grid
    BadSplit,
    /// Custom panel order is not a permutation of the bank's panels
    BadPanelOrder,
    /// Dimensions differ from the running configuration
    DimensionsChanged,
    /// Smoothing coefficient outside (0, 1]
    AlphaOutOfRange,
    /// Channel count zero or over [`MAX_CHANNELS`]
    TooManyChannels,
    /// Zero channels per bank
    ZeroChannelsPerBank,
    /// Drive range table does not cover every bank
    BankCountMismatch,
    /// Drive range minimum not below maximum
    DriveRangeInverted,
    /// Angle limits empty or not finite
    BadAngleLimits,
    /// Bank index out of range
    NoSuchBank,
    /// Backlog multiple outside 2..=3
    BadBacklogMultiple,
    /// Byte or frame budget is zero
    ZeroBudget,
    /// TOML text could not be parsed into a configuration
    Parse,
}

/// Physical wiring order of panels inside one bank
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PanelOrder {
    /// Panels chained left to right, then top to bottom
    #[default]
    RowMajor,
    /// Panels chained top to bottom, then left to right
    ColumnMajor,
    /// Chain slot for each bank-local panel, indexed row-major
    Custom(Vec<u8, MAX_PANELS_PER_BANK>),
}

/// Pixel matrix geometry and wiring
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatrixConfig {
    /// Logical width in pixels
    pub width: u16,
    /// Logical height in pixels
    pub height: u16,
    /// Edge length of one square panel
    pub panel_size: u16,
    /// Odd panel rows run right to left
    pub serpentine: bool,
    /// Mirror x inside each panel
    pub mirror_x: bool,
    /// Mirror y inside each panel
    pub mirror_y: bool,
    /// Panel chain order inside a bank
    pub panel_order: PanelOrder,
    /// First panel column driven by the second bank (0 = single bank)
    pub split_column: u16,
    /// Swap which bank drives each side of the split
    pub swap_banks: bool,
    /// Intensity written for an "on" packed pixel
    pub on_level: u8,
    /// Global output brightness applied by the pixel driver (255 = unscaled)
    pub brightness: u8,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        // Two 16x16-panel columns, one per bank, left screen column on the
        // second bank.
        Self {
            width: 32,
            height: 64,
            panel_size: 16,
            serpentine: true,
            mirror_x: true,
            mirror_y: false,
            panel_order: PanelOrder::RowMajor,
            split_column: 1,
            swap_banks: true,
            on_level: 255,
            brightness: 255,
        }
    }
}

impl MatrixConfig {
    /// Total logical pixel count
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Panel columns across the matrix
    pub fn panels_x(&self) -> u16 {
        if self.panel_size == 0 {
            return 0;
        }
        self.width / self.panel_size
    }

    /// Panel rows down the matrix
    pub fn panels_y(&self) -> u16 {
        if self.panel_size == 0 {
            return 0;
        }
        self.height / self.panel_size
    }

    /// Total panel count
    pub fn panel_count(&self) -> u16 {
        self.panels_x() * self.panels_y()
    }

    /// Number of pixel banks (1 or 2)
    pub fn bank_count(&self) -> u8 {
        if self.split_column == 0 {
            1
        } else {
            2
        }
    }

    /// Validate geometry and wiring
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 || self.panel_size == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if self.width % self.panel_size != 0 || self.height % self.panel_size != 0 {
            return Err(ConfigError::PanelSizeMismatch);
        }
        if self.pixel_count() > MAX_PIXELS {
            return Err(ConfigError::TooManyPixels);
        }
        let panels_x = self.panels_x();
        if self.split_column >= panels_x && self.split_column != 0 {
            return Err(ConfigError::BadSplit);
        }

        if let PanelOrder::Custom(slots) = &self.panel_order {
            // Custom order needs both banks to hold the same panel count
            let widths = [self.split_column, panels_x - self.split_column];
            let bank_widths = if self.split_column == 0 {
                &widths[1..]
            } else {
                &widths[..]
            };
            for &cols in bank_widths {
                let panels = cols as usize * self.panels_y() as usize;
                if slots.len() != panels {
                    return Err(ConfigError::BadPanelOrder);
                }
            }
            let mut seen = [false; MAX_PANELS_PER_BANK];
            for &slot in slots {
                let slot = slot as usize;
                if slot >= slots.len() || seen[slot] {
                    return Err(ConfigError::BadPanelOrder);
                }
                seen[slot] = true;
            }
        }

        Ok(())
    }
}

/// Physical drive range of one actuator bank, in peripheral counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriveRange {
    /// Level at the lower angle limit
    pub min: u16,
    /// Level at the upper angle limit
    pub max: u16,
}

impl DriveRange {
    /// 12-bit PWM counts for 500..2500 us at 50 Hz
    pub const SERVO_50HZ: Self = Self { min: 102, max: 512 };

    /// Validate ordering
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min >= self.max {
            return Err(ConfigError::DriveRangeInverted);
        }
        Ok(())
    }
}

impl Default for DriveRange {
    fn default() -> Self {
        Self::SERVO_50HZ
    }
}

/// Actuator array configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ActuatorConfig {
    /// Number of channels in an actuator frame
    pub channel_count: u16,
    /// Channels served by one driver bank
    pub channels_per_bank: u16,
    /// Lower angle limit (degrees)
    pub min_angle: f32,
    /// Upper angle limit (degrees)
    pub max_angle: f32,
    /// Smoothing coefficient per tick, in (0, 1]
    pub alpha: f32,
    /// Drive range for each bank
    pub banks: Vec<DriveRange, MAX_ACTUATOR_BANKS>,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        let mut banks = Vec::new();
        for _ in 0..4 {
            let _ = banks.push(DriveRange::SERVO_50HZ);
        }
        Self {
            channel_count: 64,
            channels_per_bank: 16,
            min_angle: 0.0,
            max_angle: 180.0,
            alpha: 0.3,
            banks,
        }
    }
}

impl ActuatorConfig {
    /// Number of banks needed to cover every channel
    pub fn bank_count(&self) -> usize {
        if self.channels_per_bank == 0 {
            return 0;
        }
        (self.channel_count as usize).div_ceil(self.channels_per_bank as usize)
    }

    /// Validate channel layout and limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_count == 0 || self.channel_count as usize > MAX_CHANNELS {
            return Err(ConfigError::TooManyChannels);
        }
        if self.channels_per_bank == 0 {
            return Err(ConfigError::ZeroChannelsPerBank);
        }
        if self.banks.len() != self.bank_count() {
            return Err(ConfigError::BankCountMismatch);
        }
        for bank in &self.banks {
            bank.validate()?;
        }
        if !self.min_angle.is_finite()
            || !self.max_angle.is_finite()
            || self.min_angle >= self.max_angle
        {
            return Err(ConfigError::BadAngleLimits);
        }
        validate_alpha(self.alpha)
    }
}

/// Check a smoothing coefficient
pub fn validate_alpha(alpha: f32) -> Result<(), ConfigError> {
    if alpha > 0.0 && alpha <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::AlphaOutOfRange)
    }
}

/// Loop timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimingConfig {
    /// Minimum time between filter ticks (0 = every iteration)
    pub tick_period_ms: u32,
    /// Pixel staleness threshold
    pub pixel_timeout_ms: u32,
    /// Actuator staleness threshold
    pub actuator_timeout_ms: u32,
    /// Fixed delay at the end of each iteration
    pub loop_delay_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 20,
            pixel_timeout_ms: 1000,
            actuator_timeout_ms: 1000,
            loop_delay_ms: 1,
        }
    }
}

/// Input budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransportConfig {
    /// Backlog limit as a multiple of the largest frame
    pub backlog_multiple: u8,
    /// Most bytes decoded in one iteration
    pub max_bytes_per_pass: u16,
    /// Most frames applied in one iteration
    pub max_frames_per_pass: u8,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            backlog_multiple: 3,
            max_bytes_per_pass: 4096,
            max_frames_per_pass: 4,
        }
    }
}

impl TransportConfig {
    /// Validate budgets
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=3).contains(&self.backlog_multiple) {
            return Err(ConfigError::BadBacklogMultiple);
        }
        if self.max_bytes_per_pass == 0 || self.max_frames_per_pass == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        Ok(())
    }
}

/// Frame types the controller accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Capabilities {
    /// One byte per pixel frames
    pub grayscale: bool,
    /// One bit per pixel frames
    pub packed_pixels: bool,
    /// Actuator target frames
    pub actuators: bool,
    /// Ping probe
    pub ping: bool,
    /// Info probe
    pub info: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::combined()
    }
}

impl Capabilities {
    /// Pixels and actuators
    pub const fn combined() -> Self {
        Self {
            grayscale: true,
            packed_pixels: true,
            actuators: true,
            ping: true,
            info: true,
        }
    }

    /// Pixel matrix only
    pub const fn pixels_only() -> Self {
        Self {
            actuators: false,
            ..Self::combined()
        }
    }

    /// Actuator array only
    pub const fn actuators_only() -> Self {
        Self {
            grayscale: false,
            packed_pixels: false,
            ..Self::combined()
        }
    }

    /// Whether frames of `kind` are accepted
    pub fn allows(&self, kind: FrameKind) -> bool {
        match kind {
            FrameKind::Grayscale => self.grayscale,
            FrameKind::PackedPixels => self.packed_pixels,
            FrameKind::Actuators => self.actuators,
            FrameKind::Ping => self.ping,
            FrameKind::Info => self.info,
        }
    }

    /// Whether any pixel frame type is enabled
    pub fn has_pixels(&self) -> bool {
        self.grayscale || self.packed_pixels
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// Enabled frame types
    pub capabilities: Capabilities,
    /// Pixel matrix
    pub matrix: MatrixConfig,
    /// Actuator array
    pub actuators: ActuatorConfig,
    /// Loop timing
    pub timing: TimingConfig,
    /// Input budgets
    pub transport: TransportConfig,
}

impl ControllerConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matrix.validate()?;
        self.actuators.validate()?;
        self.transport.validate()
    }

    /// Frame type to payload length table for this rig
    pub fn frame_layout(&self) -> FrameLayout {
        let mut layout = FrameLayout::for_rig(
            self.matrix.pixel_count() as u16,
            self.actuators.channel_count,
        );
        for kind in FrameKind::ALL {
            if !self.capabilities.allows(kind) {
                layout.disable(kind);
            }
        }
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ControllerConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.matrix.pixel_count(), 2048);
        assert_eq!(config.matrix.panel_count(), 8);
        assert_eq!(config.actuators.bank_count(), 4);
    }

    #[test]
    fn test_panel_size_must_divide() {
        let matrix = MatrixConfig {
            width: 30,
            ..MatrixConfig::default()
        };
        assert_eq!(matrix.validate(), Err(ConfigError::PanelSizeMismatch));
    }

    #[test]
    fn test_split_outside_grid() {
        let matrix = MatrixConfig {
            split_column: 2,
            ..MatrixConfig::default()
        };
        assert_eq!(matrix.validate(), Err(ConfigError::BadSplit));
    }

    #[test]
    fn test_custom_order_must_be_permutation() {
        let mut slots = Vec::new();
        slots.extend_from_slice(&[0, 1, 1, 3]).unwrap();
        let matrix = MatrixConfig {
            panel_order: PanelOrder::Custom(slots),
            ..MatrixConfig::default()
        };
        assert_eq!(matrix.validate(), Err(ConfigError::BadPanelOrder));

        let mut slots = Vec::new();
        slots.extend_from_slice(&[3, 1, 0, 2]).unwrap();
        let matrix = MatrixConfig {
            panel_order: PanelOrder::Custom(slots),
            ..MatrixConfig::default()
        };
        assert_eq!(matrix.validate(), Ok(()));
    }

    #[test]
    fn test_alpha_bounds() {
        assert_eq!(validate_alpha(0.0), Err(ConfigError::AlphaOutOfRange));
        assert_eq!(validate_alpha(1.5), Err(ConfigError::AlphaOutOfRange));
        assert_eq!(validate_alpha(f32::NAN), Err(ConfigError::AlphaOutOfRange));
        assert_eq!(validate_alpha(1.0), Ok(()));
    }

    #[test]
    fn test_bank_table_must_cover_channels() {
        let mut actuators = ActuatorConfig {
            channel_count: 20,
            ..ActuatorConfig::default()
        };
        assert_eq!(actuators.validate(), Err(ConfigError::BankCountMismatch));
        actuators.banks.truncate(2);
        assert_eq!(actuators.validate(), Ok(()));
    }

    #[test]
    fn test_inverted_drive_range() {
        let range = DriveRange { min: 400, max: 100 };
        assert_eq!(range.validate(), Err(ConfigError::DriveRangeInverted));
    }

    #[test]
    fn test_capabilities_gate_layout() {
        let config = ControllerConfig {
            capabilities: Capabilities::actuators_only(),
            ..ControllerConfig::default()
        };
        let layout = config.frame_layout();
        assert_eq!(layout.payload_len(FrameKind::Actuators), Some(128));
        assert_eq!(layout.payload_len(FrameKind::Grayscale), None);
        assert_eq!(layout.payload_len(FrameKind::Ping), Some(0));
    }

    #[test]
    fn test_backlog_multiple_range() {
        let transport = TransportConfig {
            backlog_multiple: 5,
            ..TransportConfig::default()
        };
        assert_eq!(transport.validate(), Err(ConfigError::BadBacklogMultiple));
    }
}
