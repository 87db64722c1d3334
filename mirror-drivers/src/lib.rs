//! Output peripheral drivers
//!
//! Concrete implementations of the output traits in mirror-core:
//!
//! - PCA9685 PWM banks for the actuator channels
//! - WS2812 LED chains driven over SPI, one chain per pixel bank

#![no_std]
#![deny(unsafe_code)]

pub mod pixel;
pub mod pwm;
