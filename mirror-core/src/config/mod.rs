//! Configuration types
//!
//! Board-agnostic rig description, stored as postcard binary data on the
//! device and written by hand as TOML.

#[cfg(feature = "toml")]
mod toml;
pub mod types;

pub use types::*;
