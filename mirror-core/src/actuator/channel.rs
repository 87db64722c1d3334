//! One actuator channel and its smoothing filter

use mirror_protocol::ACTUATOR_DOMAIN_MAX;

use crate::config::DriveRange;

/// A continuous-position actuator
///
/// `target` changes only when an actuator frame arrives; `current` moves a
/// fraction `alpha` of the remaining distance towards it on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorChannel {
    /// Channel index in the actuator frame
    pub id: u8,
    target: f32,
    current: f32,
    min_limit: f32,
    max_limit: f32,
    bank_index: u8,
    sub_channel: u8,
}

impl ActuatorChannel {
    /// Create a channel resting at its neutral midpoint
    pub fn new(id: u8, min_limit: f32, max_limit: f32, channels_per_bank: u16) -> Self {
        let per_bank = channels_per_bank.max(1);
        let neutral = neutral_between(min_limit, max_limit);
        Self {
            id,
            target: neutral,
            current: neutral,
            min_limit,
            max_limit,
            bank_index: (id as u16 / per_bank) as u8,
            sub_channel: (id as u16 % per_bank) as u8,
        }
    }

    /// Target position
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Filtered position
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Lower limit
    pub fn min_limit(&self) -> f32 {
        self.min_limit
    }

    /// Upper limit
    pub fn max_limit(&self) -> f32 {
        self.max_limit
    }

    /// Driver bank this channel lives on
    pub fn bank_index(&self) -> u8 {
        self.bank_index
    }

    /// Output on the driver bank
    pub fn sub_channel(&self) -> u8 {
        self.sub_channel
    }

    /// Midpoint of the limits
    pub fn neutral(&self) -> f32 {
        neutral_between(self.min_limit, self.max_limit)
    }

    /// Set the target from a raw 0-1000 wire value
    ///
    /// Values above the domain clamp to the upper limit. Returns `true` when
    /// the value had to be clamped.
    pub fn set_target_raw(&mut self, raw: u16) -> bool {
        let clamped = raw > ACTUATOR_DOMAIN_MAX;
        let fraction = raw.min(ACTUATOR_DOMAIN_MAX) as f32 / ACTUATOR_DOMAIN_MAX as f32;
        self.set_target(self.min_limit + fraction * (self.max_limit - self.min_limit));
        clamped
    }

    /// Set the target position, clamped to the limits
    pub fn set_target(&mut self, position: f32) {
        self.target = position.clamp(self.min_limit, self.max_limit);
    }

    /// Run one filter step
    pub fn step(&mut self, alpha: f32) {
        self.current += alpha * (self.target - self.current);
    }

    /// Drive level for the current position within `range`
    pub fn drive_level(&self, range: DriveRange) -> u16 {
        let span = self.max_limit - self.min_limit;
        let fraction = ((self.current - self.min_limit) / span).clamp(0.0, 1.0);
        let level = range.min as f32 + fraction * (range.max - range.min) as f32;
        // Round to nearest; level is non-negative
        (level + 0.5) as u16
    }
}

fn neutral_between(min: f32, max: f32) -> f32 {
    min + (max - min) / 2.0
}

/// Ticks until a step input settles within `tolerance` of its size
///
/// The remaining error after `n` ticks is `(1 - alpha)^n`, so this is the
/// smallest `n` with `(1 - alpha)^n <= tolerance`. Returns `None` if `alpha`
/// or `tolerance` is outside (0, 1], and also when the step would need more
/// than [`MAX_SETTLE_TICKS`] (an alpha so small that `1 - alpha` rounds to 1
/// never settles at all).
pub fn settle_ticks(alpha: f32, tolerance: f32) -> Option<u32> {
    if !(alpha > 0.0 && alpha <= 1.0) || !(tolerance > 0.0 && tolerance <= 1.0) {
        return None;
    }
    let keep = 1.0 - alpha;
    if keep >= 1.0 {
        return None;
    }
    let mut remaining = 1.0f32;
    let mut ticks = 0;
    while remaining > tolerance {
        if ticks == MAX_SETTLE_TICKS {
            return None;
        }
        remaining *= keep;
        ticks += 1;
    }
    Some(ticks)
}

/// Upper bound on the answer of [`settle_ticks`]
pub const MAX_SETTLE_TICKS: u32 = 1_000_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing() {
        let channel = ActuatorChannel::new(37, 0.0, 180.0, 16);
        assert_eq!(channel.bank_index(), 2);
        assert_eq!(channel.sub_channel(), 5);
    }

    #[test]
    fn test_starts_neutral() {
        let channel = ActuatorChannel::new(0, 0.0, 180.0, 16);
        assert_eq!(channel.target(), 90.0);
        assert_eq!(channel.current(), 90.0);
    }

    #[test]
    fn test_raw_mapping() {
        let mut channel = ActuatorChannel::new(0, 0.0, 180.0, 16);
        assert!(!channel.set_target_raw(500));
        assert_eq!(channel.target(), 90.0);
        assert!(!channel.set_target_raw(0));
        assert_eq!(channel.target(), 0.0);
        assert!(!channel.set_target_raw(1000));
        assert_eq!(channel.target(), 180.0);
    }

    #[test]
    fn test_raw_above_domain_clamps() {
        let mut channel = ActuatorChannel::new(0, 0.0, 180.0, 16);
        assert!(channel.set_target_raw(1200));
        assert_eq!(channel.target(), 180.0);
    }

    #[test]
    fn test_narrow_limits() {
        let mut channel = ActuatorChannel::new(0, 30.0, 150.0, 16);
        channel.set_target_raw(500);
        assert_eq!(channel.target(), 90.0);
        channel.set_target(10.0);
        assert_eq!(channel.target(), 30.0);
    }

    #[test]
    fn test_step_moves_fraction_of_gap() {
        let mut channel = ActuatorChannel::new(0, 0.0, 180.0, 16);
        channel.set_target(180.0);
        channel.step(0.5);
        assert!((channel.current() - 135.0).abs() < 1e-4);
        channel.step(1.0);
        assert_eq!(channel.current(), 180.0);
    }

    #[test]
    fn test_drive_level_endpoints() {
        let range = DriveRange { min: 102, max: 512 };
        let mut channel = ActuatorChannel::new(0, 0.0, 180.0, 16);
        assert_eq!(channel.drive_level(range), 307);
        channel.set_target(0.0);
        channel.step(1.0);
        assert_eq!(channel.drive_level(range), 102);
        channel.set_target(180.0);
        channel.step(1.0);
        assert_eq!(channel.drive_level(range), 512);
    }

    #[test]
    fn test_settle_ticks() {
        assert_eq!(settle_ticks(1.0, 0.01), Some(1));
        assert_eq!(settle_ticks(0.5, 0.25), Some(2));
        // 0.7^13 = 0.0097
        assert_eq!(settle_ticks(0.3, 0.01), Some(13));
        assert_eq!(settle_ticks(0.0, 0.01), None);
        assert_eq!(settle_ticks(0.3, 0.0), None);
    }

    #[test]
    fn test_settle_ticks_tiny_alpha() {
        // 1 - 1e-9 rounds to 1.0 in f32
        assert_eq!(settle_ticks(1e-9, 0.01), None);
        // Settles, but only after ~3.9e7 ticks
        assert_eq!(settle_ticks(1e-7, 0.01), None);
        let slow = settle_ticks(1e-5, 0.01).unwrap();
        assert!(slow > 400_000 && slow <= MAX_SETTLE_TICKS);
    }
}
