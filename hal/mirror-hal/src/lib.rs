//! Mirror Hardware Abstraction Layer
//!
//! This crate defines the serial transport traits the controller core is
//! written against. Chip-specific firmware implements them on top of its
//! UART driver; host tests and simulations use [`ring::RingRx`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  mirror-core (decoder, control loop)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  mirror-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ firmware UART │       │ RingRx (host) │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::SerialRx`] - Non-blocking receive with backlog inspection
//! - [`uart::UartTx`] - Blocking transmit for short text replies

#![no_std]
#![deny(unsafe_code)]

pub mod ring;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use ring::RingRx;
pub use uart::{SerialRx, UartConfig, UartTx};
