//! Safety logic
//!
//! Staleness detection for the output classes.

pub mod liveness;

pub use liveness::{LivenessMonitor, OutputClass, StaleOutputs};
