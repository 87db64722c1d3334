//! Board-agnostic core logic for the Mirror controller
//!
//! This crate contains everything between the serial byte stream and the
//! output peripherals that does not depend on a specific board:
//!
//! - Rig configuration and validation
//! - Logical to physical pixel mapping and the pixel buffer
//! - Actuator channels with the smoothing filter
//! - Receive backlog guard and liveness failsafe
//! - Packet dispatch and the control loop iteration
//! - Output driver traits
//!
//! # Control loop
//!
//! [`Controller::poll`] runs one iteration: backlog check, bounded decode
//! and dispatch, one filter tick with drive writes, staleness check. The
//! caller owns the fixed delay between iterations.

#![no_std]
#![deny(unsafe_code)]

mod fmt;

pub mod actuator;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod dispatch;
pub mod safety;
pub mod topology;
pub mod traits;
pub mod transport;

pub use controller::{Controller, IterationReport};
pub use diagnostics::{Diagnostics, Fault};

/// A payload whose length does not match the configured rig
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LengthMismatch {
    /// Length the rig needs
    pub expected: usize,
    /// Length received
    pub actual: usize,
}
