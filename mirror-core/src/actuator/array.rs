//! The actuator array
//!
//! Owns every channel plus the runtime-tunable filter coefficient and
//! per-bank drive ranges.

use heapless::Vec;

use mirror_protocol::ActuatorTargets;

use crate::actuator::ActuatorChannel;
use crate::config::{
    validate_alpha, ActuatorConfig, ConfigError, DriveRange, MAX_ACTUATOR_BANKS, MAX_CHANNELS,
};
use crate::traits::ActuatorDriver;
use crate::LengthMismatch;

/// Outcome of applying an actuator frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TargetsApplied {
    /// Values above the wire domain that were clamped
    pub clamped: u16,
}

/// Outcome of writing drive levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveWrite<E> {
    /// Writes that failed
    pub failures: u16,
    /// First failure seen
    pub first_error: Option<E>,
}

/// All actuator channels of the rig
#[derive(Debug, Clone)]
pub struct ActuatorArray {
    channels: Vec<ActuatorChannel, MAX_CHANNELS>,
    drive: Vec<DriveRange, MAX_ACTUATOR_BANKS>,
    alpha: f32,
}

impl ActuatorArray {
    /// Create the array with every channel at neutral
    pub fn new(config: &ActuatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut channels = Vec::new();
        for id in 0..config.channel_count {
            channels
                .push(ActuatorChannel::new(
                    id as u8,
                    config.min_angle,
                    config.max_angle,
                    config.channels_per_bank,
                ))
                .map_err(|_| ConfigError::TooManyChannels)?;
        }
        Ok(Self {
            channels,
            drive: config.banks.clone(),
            alpha: config.alpha,
        })
    }

    /// Channels in frame order
    pub fn channels(&self) -> &[ActuatorChannel] {
        &self.channels
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether the array has no channels
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Filter coefficient
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Change the filter coefficient
    pub fn set_alpha(&mut self, alpha: f32) -> Result<(), ConfigError> {
        validate_alpha(alpha)?;
        self.alpha = alpha;
        Ok(())
    }

    /// Drive range of `bank`
    pub fn drive_range(&self, bank: u8) -> Option<DriveRange> {
        self.drive.get(bank as usize).copied()
    }

    /// Change the drive range of one bank
    pub fn set_drive_range(&mut self, bank: u8, range: DriveRange) -> Result<(), ConfigError> {
        range.validate()?;
        let slot = self.drive.get_mut(bank as usize).ok_or(ConfigError::NoSuchBank)?;
        *slot = range;
        Ok(())
    }

    /// Set every target from an actuator frame
    ///
    /// The frame must carry exactly one value per channel.
    pub fn apply(&mut self, targets: ActuatorTargets<'_>) -> Result<TargetsApplied, LengthMismatch> {
        if targets.len() != self.channels.len() {
            return Err(LengthMismatch {
                expected: self.channels.len(),
                actual: targets.len(),
            });
        }
        let mut applied = TargetsApplied::default();
        for (channel, raw) in self.channels.iter_mut().zip(targets.iter()) {
            if channel.set_target_raw(raw) {
                applied.clamped += 1;
            }
        }
        Ok(applied)
    }

    /// Send every target to its neutral midpoint
    ///
    /// `current` is left alone; the filter glides there.
    pub fn go_neutral(&mut self) {
        for channel in self.channels.iter_mut() {
            let neutral = channel.neutral();
            channel.set_target(neutral);
        }
    }

    /// Run one filter step on every channel
    pub fn tick(&mut self) {
        let alpha = self.alpha;
        for channel in self.channels.iter_mut() {
            channel.step(alpha);
        }
    }

    /// Drive level of every channel, in frame order
    pub fn drive_levels(&self) -> impl Iterator<Item = u16> + '_ {
        self.channels.iter().map(move |channel| {
            let range = self.drive_range(channel.bank_index()).unwrap_or_default();
            channel.drive_level(range)
        })
    }

    /// Write every channel's drive level
    ///
    /// A failing write does not stop the others.
    pub fn write_drive<D: ActuatorDriver>(&self, driver: &mut D) -> DriveWrite<D::Error> {
        let mut result = DriveWrite {
            failures: 0,
            first_error: None,
        };
        for (channel, level) in self.channels.iter().zip(self.drive_levels()) {
            if let Err(e) = driver.write_drive(channel.bank_index(), channel.sub_channel(), level) {
                result.failures += 1;
                if result.first_error.is_none() {
                    result.first_error = Some(e);
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn six_servos() -> ActuatorConfig {
        let mut config = ActuatorConfig {
            channel_count: 6,
            ..ActuatorConfig::default()
        };
        config.banks.truncate(1);
        config
    }

    struct Levels {
        writes: Vec<(u8, u8, u16), 8>,
        fail_bank: Option<u8>,
    }

    impl ActuatorDriver for Levels {
        type Error = u8;

        fn write_drive(&mut self, bank: u8, sub_channel: u8, level: u16) -> Result<(), u8> {
            if self.fail_bank == Some(bank) {
                return Err(bank);
            }
            self.writes.push((bank, sub_channel, level)).unwrap();
            Ok(())
        }
    }

    #[test]
    fn test_apply_counts_clamps() {
        let mut array = ActuatorArray::new(&six_servos()).unwrap();
        let payload = [0x01, 0xF4, 0x00, 0x00, 0x04, 0xB0, 0x03, 0xE8, 0x00, 0x00, 0xFF, 0xFF];
        let applied = array.apply(ActuatorTargets::new(&payload)).unwrap();
        assert_eq!(applied.clamped, 2);
        assert_eq!(array.channels()[0].target(), 90.0);
        assert_eq!(array.channels()[1].target(), 0.0);
        assert_eq!(array.channels()[2].target(), 180.0);
        assert_eq!(array.channels()[5].target(), 180.0);
    }

    #[test]
    fn test_apply_wrong_length() {
        let mut array = ActuatorArray::new(&six_servos()).unwrap();
        let payload = [0u8; 4];
        assert_eq!(
            array.apply(ActuatorTargets::new(&payload)),
            Err(LengthMismatch {
                expected: 6,
                actual: 2
            })
        );
    }

    #[test]
    fn test_go_neutral_does_not_snap() {
        let mut array = ActuatorArray::new(&six_servos()).unwrap();
        array.apply(ActuatorTargets::new(&[0u8; 12])).unwrap();
        for _ in 0..50 {
            array.tick();
        }
        let before = array.channels()[0].current();
        array.go_neutral();
        assert_eq!(array.channels()[0].target(), 90.0);
        assert_eq!(array.channels()[0].current(), before);
        array.tick();
        assert!(array.channels()[0].current() > before);
    }

    #[test]
    fn test_set_alpha_validated() {
        let mut array = ActuatorArray::new(&six_servos()).unwrap();
        assert_eq!(array.set_alpha(0.0), Err(ConfigError::AlphaOutOfRange));
        array.set_alpha(0.8).unwrap();
        assert_eq!(array.alpha(), 0.8);
    }

    #[test]
    fn test_set_drive_range() {
        let mut array = ActuatorArray::new(&six_servos()).unwrap();
        let range = DriveRange { min: 150, max: 450 };
        assert_eq!(array.set_drive_range(3, range), Err(ConfigError::NoSuchBank));
        array.set_drive_range(0, range).unwrap();
        assert_eq!(array.drive_levels().next(), Some(300));
    }

    #[test]
    fn test_write_drive_routes_channels() {
        let array = ActuatorArray::new(&six_servos()).unwrap();
        let mut driver = Levels {
            writes: Vec::new(),
            fail_bank: None,
        };
        let result = array.write_drive(&mut driver);
        assert_eq!(result.failures, 0);
        assert_eq!(driver.writes.len(), 6);
        assert_eq!(driver.writes[5], (0, 5, 307));
    }

    #[test]
    fn test_write_drive_continues_after_failure() {
        let mut config = ActuatorConfig {
            channel_count: 4,
            channels_per_bank: 2,
            ..ActuatorConfig::default()
        };
        config.banks.truncate(2);
        let array = ActuatorArray::new(&config).unwrap();
        let mut driver = Levels {
            writes: Vec::new(),
            fail_bank: Some(0),
        };
        let result = array.write_drive(&mut driver);
        assert_eq!(result.failures, 2);
        assert_eq!(result.first_error, Some(0));
        assert_eq!(driver.writes.len(), 2);
    }
}
