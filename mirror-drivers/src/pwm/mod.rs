//! PWM drivers for actuator channels

mod pca9685;

pub use pca9685::{prescale_for, Pca9685Error, ServoBanks, CHANNELS_PER_CHIP, MAX_COUNT};
