//! PCA9685 16-channel PWM banks on a shared I2C bus
//!
//! Each bank is one PCA9685 at its own address. A channel is driven by
//! writing its 12-bit "off" count with the "on" count fixed at zero, so the
//! drive level is the pulse width in 1/4096ths of the PWM period.
//!
//! ```ignore
//! let mut banks = ServoBanks::new(i2c, &[0x40, 0x41, 0x42, 0x43]);
//! banks.init(&mut delay)?;
//! banks.set_off_count(0, 3, 307)?; // bank 0, channel 3, 1.5 ms
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use heapless::Vec;

use mirror_core::config::MAX_ACTUATOR_BANKS;
use mirror_core::traits::ActuatorDriver;

/// Mode register 1
pub const MODE1: u8 = 0x00;
/// First channel register (LED0_ON_L)
pub const LED0_ON_L: u8 = 0x06;
/// Prescaler register
pub const PRE_SCALE: u8 = 0xFE;

/// MODE1: restart
pub const MODE1_RESTART: u8 = 0x80;
/// MODE1: register auto-increment
pub const MODE1_AI: u8 = 0x20;
/// MODE1: low-power sleep (oscillator off)
pub const MODE1_SLEEP: u8 = 0x10;

/// Internal oscillator frequency
pub const OSCILLATOR_HZ: u32 = 25_000_000;

/// Outputs per chip
pub const CHANNELS_PER_CHIP: u8 = 16;

/// Largest off count
pub const MAX_COUNT: u16 = 4095;

/// Standard servo refresh rate
pub const SERVO_FREQUENCY_HZ: u32 = 50;

/// Prescaler value for a PWM frequency
///
/// `round(osc / (4096 * freq)) - 1`, clamped to the chip's 3..=255 range.
pub const fn prescale_for(frequency_hz: u32) -> u8 {
    let frequency_hz = if frequency_hz == 0 { 1 } else { frequency_hz };
    let divisor = 4096 * frequency_hz;
    let value = (OSCILLATOR_HZ + divisor / 2) / divisor;
    let value = if value < 4 { 4 } else if value > 256 { 256 } else { value };
    (value - 1) as u8
}

/// Errors from the PWM banks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pca9685Error<E> {
    /// Bus transfer failed
    I2c(E),
    /// No chip configured for this bank
    NoSuchBank(u8),
    /// Channel outside 0..16
    NoSuchChannel(u8),
}

/// A set of PCA9685 chips sharing one bus, one chip per bank
pub struct ServoBanks<I2C> {
    i2c: I2C,
    addresses: Vec<u8, MAX_ACTUATOR_BANKS>,
}

impl<I2C: I2c> ServoBanks<I2C> {
    /// Banks at `addresses`, in bank order, running at 50 Hz
    ///
    /// Addresses beyond [`MAX_ACTUATOR_BANKS`] are ignored.
    pub fn new(i2c: I2C, addresses: &[u8]) -> Self {
        let mut list = Vec::new();
        for &address in addresses.iter().take(MAX_ACTUATOR_BANKS) {
            let _ = list.push(address);
        }
        Self {
            i2c,
            addresses: list,
        }
    }

    /// Number of banks
    pub fn bank_count(&self) -> usize {
        self.addresses.len()
    }

    /// Program the prescaler and enable auto-increment on every chip
    ///
    /// The prescaler can only be written while the chip sleeps; the
    /// oscillator needs 500 us to settle after waking.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Pca9685Error<I2C::Error>> {
        for index in 0..self.addresses.len() {
            let address = self.addresses[index];
            self.write(address, &[MODE1, MODE1_SLEEP])?;
            self.write(address, &[PRE_SCALE, prescale_for(SERVO_FREQUENCY_HZ)])?;
            self.write(address, &[MODE1, MODE1_AI])?;
            delay.delay_us(500);
            self.write(address, &[MODE1, MODE1_RESTART | MODE1_AI])?;
        }
        Ok(())
    }

    /// Set the off count of one channel; counts above 4095 saturate
    pub fn set_off_count(&mut self, bank: u8, channel: u8, count: u16) -> Result<(), Pca9685Error<I2C::Error>> {
        let address = *self
            .addresses
            .get(bank as usize)
            .ok_or(Pca9685Error::NoSuchBank(bank))?;
        if channel >= CHANNELS_PER_CHIP {
            return Err(Pca9685Error::NoSuchChannel(channel));
        }
        let [lo, hi] = count.min(MAX_COUNT).to_le_bytes();
        self.write(address, &[LED0_ON_L + 4 * channel, 0x00, 0x00, lo, hi])
    }

    /// Release the bus
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Pca9685Error<I2C::Error>> {
        self.i2c.write(address, bytes).map_err(Pca9685Error::I2c)
    }
}

impl<I2C: I2c> ActuatorDriver for ServoBanks<I2C> {
    type Error = Pca9685Error<I2C::Error>;

    fn write_drive(&mut self, bank: u8, sub_channel: u8, level: u16) -> Result<(), Self::Error> {
        self.set_off_count(bank, sub_channel, level)
    }
}
