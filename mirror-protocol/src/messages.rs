//! Typed payload views and host-side encoding
//!
//! The controller works on borrowed views of the decoder buffer; nothing is
//! copied until the payload is applied to the outputs. The encoder half is
//! what a host (or a test) uses to produce frames.

use core::fmt::Write;

use heapless::String;

use crate::frame::{Frame, FrameKind, HEADER_0, HEADER_1, HEADER_LEN};

/// Largest meaningful actuator value; larger values clamp to it
pub const ACTUATOR_DOMAIN_MAX: u16 = 1000;

/// Reply sent for a ping frame
pub const PONG_REPLY: &[u8] = b"PONG\n";

/// Protocol revision reported by the info probe
pub const PROTOCOL_VERSION: &str = "2.0";

/// Errors that can occur while encoding a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Output buffer too small for header and payload
    BufferTooSmall,
}

/// A decoded frame, interpreted by type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet<'a> {
    /// One brightness byte per logical pixel
    Grayscale(&'a [u8]),
    /// One on/off bit per logical pixel
    PackedPixels(PackedBits<'a>),
    /// Raw 0-1000 targets per channel
    Actuators(ActuatorTargets<'a>),
    /// Link probe
    Ping,
    /// Identity probe
    Info,
}

impl<'a> Packet<'a> {
    /// Interpret a complete frame
    pub fn from_frame(frame: Frame<'a>) -> Self {
        match frame.kind {
            FrameKind::Grayscale => Packet::Grayscale(frame.payload),
            FrameKind::PackedPixels => Packet::PackedPixels(PackedBits::new(frame.payload)),
            FrameKind::Actuators => Packet::Actuators(ActuatorTargets::new(frame.payload)),
            FrameKind::Ping => Packet::Ping,
            FrameKind::Info => Packet::Info,
        }
    }
}

/// MSB-first bit view over a packed-pixel payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedBits<'a> {
    bytes: &'a [u8],
}

impl<'a> PackedBits<'a> {
    /// Wrap a packed payload
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Number of bits available (a multiple of 8)
    pub fn len(&self) -> usize {
        self.bytes.len() * 8
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// State of pixel `index`; out-of-range indices read as off
    pub fn bit(&self, index: usize) -> bool {
        match self.bytes.get(index / 8) {
            Some(byte) => byte & (0x80 >> (index % 8)) != 0,
            None => false,
        }
    }
}

/// Big-endian u16 view over an actuator payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorTargets<'a> {
    bytes: &'a [u8],
}

impl<'a> ActuatorTargets<'a> {
    /// Wrap an actuator payload
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Number of complete channel values
    pub fn len(&self) -> usize {
        self.bytes.len() / 2
    }

    /// Whether the payload carries no channel values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw value for `channel`, as sent (may exceed [`ACTUATOR_DOMAIN_MAX`])
    pub fn raw(&self, channel: usize) -> Option<u16> {
        let hi = *self.bytes.get(channel * 2)?;
        let lo = *self.bytes.get(channel * 2 + 1)?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    /// Iterate over raw channel values
    pub fn iter(&self) -> impl Iterator<Item = u16> + 'a {
        let bytes = self.bytes;
        bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
    }
}

/// Write a complete frame (header, type, payload) into `out`
///
/// Returns the number of bytes written.
pub fn encode_frame(kind: FrameKind, payload: &[u8], out: &mut [u8]) -> Result<usize, EncodeError> {
    let frame_len = HEADER_LEN + payload.len();
    if out.len() < frame_len {
        return Err(EncodeError::BufferTooSmall);
    }

    out[0] = HEADER_0;
    out[1] = HEADER_1;
    out[2] = kind.to_byte();
    out[HEADER_LEN..frame_len].copy_from_slice(payload);

    Ok(frame_len)
}

/// Write actuator values as a big-endian payload into `out`
///
/// Returns the number of bytes written.
pub fn encode_actuator_payload(values: &[u16], out: &mut [u8]) -> Result<usize, EncodeError> {
    let len = values.len() * 2;
    if out.len() < len {
        return Err(EncodeError::BufferTooSmall);
    }
    for (pair, value) in out.chunks_exact_mut(2).zip(values) {
        pair.copy_from_slice(&value.to_be_bytes());
    }
    Ok(len)
}

/// Pack on/off pixels MSB-first into `out`
///
/// Returns the number of bytes written.
pub fn encode_packed_payload<I>(pixels: I, out: &mut [u8]) -> Result<usize, EncodeError>
where
    I: IntoIterator<Item = bool>,
{
    let mut written = 0;
    for (index, on) in pixels.into_iter().enumerate() {
        let byte = index / 8;
        if byte >= out.len() {
            return Err(EncodeError::BufferTooSmall);
        }
        if index % 8 == 0 {
            out[byte] = 0;
            written = byte + 1;
        }
        if on {
            out[byte] |= 0x80 >> (index % 8);
        }
    }
    Ok(written)
}

/// Identity block sent in answer to an info probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InfoReply {
    /// Matrix width in pixels
    pub width: u16,
    /// Matrix height in pixels
    pub height: u16,
    /// Number of physical panels
    pub panels: u16,
    /// Number of actuator channels
    pub channels: u16,
}

impl InfoReply {
    /// Render the newline-terminated text reply
    pub fn render(&self) -> String<96> {
        let mut text = String::new();
        // 96 bytes holds the block for any u16 field values
        let _ = write!(
            text,
            "MIRROR-LED-{}x{}\nVERSION:{}\nPANELS:{}\nSERVOS:{}\nOK\n",
            self.width, self.height, PROTOCOL_VERSION, self.panels, self.channels
        );
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actuator_targets_big_endian() {
        let payload = [0x01, 0xF4, 0x00, 0x00, 0x04, 0xB0];
        let targets = ActuatorTargets::new(&payload);
        assert_eq!(targets.len(), 3);
        assert_eq!(targets.raw(0), Some(500));
        assert_eq!(targets.raw(1), Some(0));
        assert_eq!(targets.raw(2), Some(1200));
        assert_eq!(targets.raw(3), None);
    }

    #[test]
    fn test_actuator_iter_matches_raw() {
        let payload = [0x03, 0xE8, 0x00, 0x01];
        let targets = ActuatorTargets::new(&payload);
        let mut iter = targets.iter();
        assert_eq!(iter.next(), Some(1000));
        assert_eq!(iter.next(), Some(1));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_packed_bits_msb_first() {
        let payload = [0b1000_0001, 0b0100_0000];
        let bits = PackedBits::new(&payload);
        assert_eq!(bits.len(), 16);
        assert!(bits.bit(0));
        assert!(!bits.bit(1));
        assert!(bits.bit(7));
        assert!(bits.bit(9));
        assert!(!bits.bit(100));
    }

    #[test]
    fn test_encode_frame() {
        let mut out = [0u8; 8];
        let len = encode_frame(FrameKind::Actuators, &[0x01, 0xF4], &mut out).unwrap();
        assert_eq!(len, 5);
        assert_eq!(&out[..5], &[0xAA, 0xBB, 0x02, 0x01, 0xF4]);
    }

    #[test]
    fn test_encode_frame_buffer_too_small() {
        let mut out = [0u8; 4];
        assert_eq!(
            encode_frame(FrameKind::Actuators, &[0, 0], &mut out),
            Err(EncodeError::BufferTooSmall)
        );
    }

    #[test]
    fn test_encode_actuator_payload() {
        let mut out = [0u8; 4];
        let len = encode_actuator_payload(&[500, 0], &mut out).unwrap();
        assert_eq!(len, 4);
        assert_eq!(out, [0x01, 0xF4, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_packed_payload() {
        let mut out = [0xFFu8; 2];
        let pixels = [true, false, false, false, false, false, false, true, false, true];
        let len = encode_packed_payload(pixels, &mut out).unwrap();
        assert_eq!(len, 2);
        assert_eq!(out, [0b1000_0001, 0b0100_0000]);
    }

    #[test]
    fn test_packet_from_frame() {
        let payload = [0x00, 0x10];
        let frame = Frame {
            kind: FrameKind::Actuators,
            payload: &payload,
        };
        match Packet::from_frame(frame) {
            Packet::Actuators(targets) => assert_eq!(targets.raw(0), Some(16)),
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn test_info_reply_text() {
        let reply = InfoReply {
            width: 32,
            height: 64,
            panels: 8,
            channels: 64,
        };
        assert_eq!(
            reply.render().as_str(),
            "MIRROR-LED-32x64\nVERSION:2.0\nPANELS:8\nSERVOS:64\nOK\n"
        );
    }
}
