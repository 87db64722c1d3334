//! Mirror Serial Protocol
//!
//! This crate defines the binary framing between the host application
//! (camera tracking, animation) and the controller driving the pixel matrix
//! and servo banks. The protocol favours cheap resynchronization over
//! integrity guarantees: a frame is identified by two sentinel bytes and a
//! type byte whose payload length is fixed by the rig.
//!
//! # Protocol Overview
//!
//! ```text
//! ┌──────┬──────┬──────┬──────────────────────┐
//! │ HDR0 │ HDR1 │ TYPE │ PAYLOAD              │
//! │ 0xAA │ 0xBB │ 1B   │ len(TYPE) bytes      │
//! └──────┴──────┴──────┴──────────────────────┘
//! ```
//!
//! | TYPE | name          | payload                                   |
//! |------|---------------|-------------------------------------------|
//! | 0x01 | grayscale     | one brightness byte per logical pixel     |
//! | 0x02 | actuators     | big-endian u16 per channel, 0-1000        |
//! | 0x03 | packed pixels | one bit per pixel, MSB first, 1 = on      |
//! | 0x05 | ping          | none, controller answers `PONG`           |
//! | 0x06 | info          | none, controller answers an identity block |
//!
//! There is no length field and no checksum. Anything that is not a
//! well-formed header is dropped one byte at a time until the next header.

#![no_std]
#![deny(unsafe_code)]

pub mod frame;
pub mod messages;

pub use frame::{
    DecodeSummary, DecoderState, Frame, FrameDecoder, FrameKind, FrameLayout, FramingError,
    LayoutError, HEADER_0, HEADER_1, HEADER_LEN,
};
pub use messages::{
    encode_actuator_payload, encode_frame, encode_packed_payload, ActuatorTargets, EncodeError,
    InfoReply, Packet, PackedBits, ACTUATOR_DOMAIN_MAX, PONG_REPLY, PROTOCOL_VERSION,
};
