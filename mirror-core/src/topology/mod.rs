//! Pixel matrix topology and the physical output buffer

pub mod buffer;
pub mod map;

pub use buffer::PixelBuffer;
pub use map::{PhysicalIndex, TopologyMap};
