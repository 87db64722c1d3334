//! Actuator channels and the smoothing filter

pub mod array;
pub mod channel;

pub use array::{ActuatorArray, DriveWrite, TargetsApplied};
pub use channel::{settle_ticks, ActuatorChannel};
