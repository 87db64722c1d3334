//! Frame decoding for the Mirror serial protocol.
//!
//! Frame format:
//! - HDR0 (1 byte): 0xAA synchronization byte
//! - HDR1 (1 byte): 0xBB synchronization byte
//! - TYPE (1 byte): frame type, see [`FrameKind`]
//! - PAYLOAD: exactly `len(TYPE)` bytes, looked up in the [`FrameLayout`]

use heapless::Vec;

/// First synchronization byte
pub const HEADER_0: u8 = 0xAA;

/// Second synchronization byte
pub const HEADER_1: u8 = 0xBB;

/// Bytes preceding the payload (HDR0 + HDR1 + TYPE)
pub const HEADER_LEN: usize = 3;

/// Number of distinct frame types
const KIND_COUNT: usize = 5;

/// Frame type identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameKind {
    /// One brightness byte per logical pixel
    Grayscale = 0x01,
    /// One big-endian u16 target per actuator channel
    Actuators = 0x02,
    /// One bit per logical pixel, MSB first
    PackedPixels = 0x03,
    /// Link probe, answered with `PONG`
    Ping = 0x05,
    /// Identity probe, answered with the rig description
    Info = 0x06,
}

impl FrameKind {
    /// All frame types, in table order
    pub const ALL: [FrameKind; KIND_COUNT] = [
        FrameKind::Grayscale,
        FrameKind::Actuators,
        FrameKind::PackedPixels,
        FrameKind::Ping,
        FrameKind::Info,
    ];

    /// Parse a type byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(FrameKind::Grayscale),
            0x02 => Some(FrameKind::Actuators),
            0x03 => Some(FrameKind::PackedPixels),
            0x05 => Some(FrameKind::Ping),
            0x06 => Some(FrameKind::Info),
            _ => None,
        }
    }

    /// Wire value of this type
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Whether this type carries pixel data
    pub fn is_pixel(self) -> bool {
        matches!(self, FrameKind::Grayscale | FrameKind::PackedPixels)
    }

    fn slot(self) -> usize {
        match self {
            FrameKind::Grayscale => 0,
            FrameKind::Actuators => 1,
            FrameKind::PackedPixels => 2,
            FrameKind::Ping => 3,
            FrameKind::Info => 4,
        }
    }
}

/// Errors raised while decoding the byte stream
///
/// All of them are recoverable: the decoder has already returned to a
/// resynchronizing state when one is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FramingError {
    /// Type byte after a valid header is not a known frame type
    UnknownType(u8),
    /// Type byte is known but this rig does not accept it
    DisabledType(u8),
}

/// Errors building a decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    /// An enabled type needs more payload than the decoder can hold
    PayloadTooLarge {
        /// Largest payload in the layout
        needed: usize,
        /// Decoder capacity
        capacity: usize,
    },
}

/// Fixed type→payload-length table
///
/// A `None` entry means the type is disabled on this rig and is treated like
/// an unknown type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameLayout {
    lengths: [Option<u16>; KIND_COUNT],
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::empty()
    }
}

impl FrameLayout {
    /// A layout with every type disabled
    pub const fn empty() -> Self {
        Self {
            lengths: [None; KIND_COUNT],
        }
    }

    /// A layout with every type enabled for a rig of the given size
    pub fn for_rig(pixel_count: u16, channel_count: u16) -> Self {
        let mut layout = Self::empty();
        layout.enable(FrameKind::Grayscale, grayscale_len(pixel_count));
        layout.enable(FrameKind::Actuators, actuator_len(channel_count));
        layout.enable(FrameKind::PackedPixels, packed_len(pixel_count));
        layout.enable(FrameKind::Ping, 0);
        layout.enable(FrameKind::Info, 0);
        layout
    }

    /// Accept `kind` with a payload of `len` bytes
    pub fn enable(&mut self, kind: FrameKind, len: u16) {
        self.lengths[kind.slot()] = Some(len);
    }

    /// Stop accepting `kind`
    pub fn disable(&mut self, kind: FrameKind) {
        self.lengths[kind.slot()] = None;
    }

    /// Payload length for `kind`, or `None` if disabled
    pub fn payload_len(&self, kind: FrameKind) -> Option<usize> {
        self.lengths[kind.slot()].map(usize::from)
    }

    /// Whether `kind` is accepted
    pub fn is_enabled(&self, kind: FrameKind) -> bool {
        self.lengths[kind.slot()].is_some()
    }

    /// Largest payload of any enabled type
    pub fn max_payload_len(&self) -> usize {
        self.lengths
            .iter()
            .flatten()
            .map(|&len| usize::from(len))
            .max()
            .unwrap_or(0)
    }

    /// Largest complete frame of any enabled type, header included
    pub fn max_frame_len(&self) -> usize {
        HEADER_LEN + self.max_payload_len()
    }
}

/// Payload length of a grayscale frame
pub const fn grayscale_len(pixel_count: u16) -> u16 {
    pixel_count
}

/// Payload length of an actuator frame
pub const fn actuator_len(channel_count: u16) -> u16 {
    channel_count * 2
}

/// Payload length of a packed-pixel frame
pub const fn packed_len(pixel_count: u16) -> u16 {
    pixel_count.div_ceil(8)
}

/// A complete frame, borrowed from the decoder's payload buffer
///
/// Valid until the next byte is fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Frame type
    pub kind: FrameKind,
    /// Payload bytes, exactly as long as the layout demands
    pub payload: &'a [u8],
}

/// Externally visible decoder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecoderState {
    /// Waiting for HDR0
    Idle,
    /// Got HDR0, waiting for HDR1
    GotHeader1,
    /// Got HDR0 HDR1, waiting for TYPE
    GotHeader2,
    /// Accumulating payload bytes
    ReadingPayload {
        /// Frame type being read
        kind: FrameKind,
        /// Bytes still missing
        remaining: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Idle,
    GotHeader1,
    GotHeader2,
    ReadingPayload { kind: FrameKind, needed: usize },
}

/// Outcome of [`FrameDecoder::feed_slice`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodeSummary {
    /// Bytes taken from the input
    pub consumed: usize,
    /// Complete frames handed to the callback
    pub frames: usize,
    /// Framing errors seen
    pub framing_errors: usize,
}

/// Byte-at-a-time frame decoder
///
/// `CAP` is the payload capacity. It is fixed at compile time so the decoder
/// never allocates; [`FrameDecoder::new`] rejects layouts that do not fit.
#[derive(Debug, Clone)]
pub struct FrameDecoder<const CAP: usize> {
    layout: FrameLayout,
    state: ParseState,
    payload: Vec<u8, CAP>,
}

impl<const CAP: usize> FrameDecoder<CAP> {
    /// Create a decoder for `layout`
    pub fn new(layout: FrameLayout) -> Result<Self, LayoutError> {
        let needed = layout.max_payload_len();
        if needed > CAP {
            return Err(LayoutError::PayloadTooLarge {
                needed,
                capacity: CAP,
            });
        }
        Ok(Self {
            layout,
            state: ParseState::Idle,
            payload: Vec::new(),
        })
    }

    /// The type→length table this decoder uses
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Abort any partial frame and wait for a fresh header
    pub fn reset(&mut self) {
        self.state = ParseState::Idle;
        self.payload.clear();
    }

    /// Whether the decoder is waiting for HDR0
    pub fn is_idle(&self) -> bool {
        self.state == ParseState::Idle
    }

    /// Current state
    pub fn state(&self) -> DecoderState {
        match self.state {
            ParseState::Idle => DecoderState::Idle,
            ParseState::GotHeader1 => DecoderState::GotHeader1,
            ParseState::GotHeader2 => DecoderState::GotHeader2,
            ParseState::ReadingPayload { kind, needed } => DecoderState::ReadingPayload {
                kind,
                remaining: needed - self.payload.len(),
            },
        }
    }

    /// Feed a single byte to the decoder
    ///
    /// Returns `Ok(Some(frame))` when the byte completes a frame, `Ok(None)`
    /// when more bytes are needed, or `Err` when the type byte was rejected.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame<'_>>, FramingError> {
        match self.state {
            ParseState::Idle => {
                // Anything but HDR0 is dropped here; this is the resync path
                if byte == HEADER_0 {
                    self.state = ParseState::GotHeader1;
                }
                Ok(None)
            }
            ParseState::GotHeader1 => {
                self.state = match byte {
                    HEADER_1 => ParseState::GotHeader2,
                    // A run of HDR0 still ends in a usable HDR0
                    HEADER_0 => ParseState::GotHeader1,
                    _ => ParseState::Idle,
                };
                Ok(None)
            }
            ParseState::GotHeader2 => {
                let Some(kind) = FrameKind::from_byte(byte) else {
                    self.reject(byte);
                    return Err(FramingError::UnknownType(byte));
                };
                let Some(needed) = self.layout.payload_len(kind) else {
                    self.reject(byte);
                    return Err(FramingError::DisabledType(byte));
                };

                self.payload.clear();
                if needed == 0 {
                    self.state = ParseState::Idle;
                    return Ok(Some(Frame {
                        kind,
                        payload: &self.payload,
                    }));
                }
                self.state = ParseState::ReadingPayload { kind, needed };
                Ok(None)
            }
            ParseState::ReadingPayload { kind, needed } => {
                // Cannot fail: new() checked every enabled length against CAP
                let _ = self.payload.push(byte);
                if self.payload.len() < needed {
                    return Ok(None);
                }
                self.state = ParseState::Idle;
                Ok(Some(Frame {
                    kind,
                    payload: &self.payload,
                }))
            }
        }
    }

    /// Feed a run of bytes, handing every completed frame to `on_frame`
    ///
    /// Stops early once `max_frames` frames have been delivered so the
    /// caller can bound the work done per call.
    pub fn feed_slice<F>(&mut self, bytes: &[u8], max_frames: usize, mut on_frame: F) -> DecodeSummary
    where
        F: FnMut(Frame<'_>),
    {
        let mut summary = DecodeSummary::default();
        for &byte in bytes {
            if summary.frames >= max_frames {
                break;
            }
            summary.consumed += 1;
            match self.feed(byte) {
                Ok(Some(frame)) => {
                    summary.frames += 1;
                    on_frame(frame);
                }
                Ok(None) => {}
                Err(_) => summary.framing_errors += 1,
            }
        }
        summary
    }

    fn reject(&mut self, byte: u8) {
        self.payload.clear();
        // The rejected type byte may itself open the next header
        self.state = if byte == HEADER_0 {
            ParseState::GotHeader1
        } else {
            ParseState::Idle
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Decoder = FrameDecoder<64>;

    fn small_layout() -> FrameLayout {
        // 16 pixels, 2 channels
        FrameLayout::for_rig(16, 2)
    }

    fn decode_all(decoder: &mut Decoder, bytes: &[u8]) -> Vec<(FrameKind, Vec<u8, 64>), 4> {
        let mut frames = Vec::new();
        decoder.feed_slice(bytes, usize::MAX, |frame| {
            let mut payload = Vec::new();
            payload.extend_from_slice(frame.payload).unwrap();
            let _ = frames.push((frame.kind, payload));
        });
        frames
    }

    #[test]
    fn test_layout_lengths() {
        let layout = FrameLayout::for_rig(2048, 64);
        assert_eq!(layout.payload_len(FrameKind::Grayscale), Some(2048));
        assert_eq!(layout.payload_len(FrameKind::Actuators), Some(128));
        assert_eq!(layout.payload_len(FrameKind::PackedPixels), Some(256));
        assert_eq!(layout.payload_len(FrameKind::Ping), Some(0));
        assert_eq!(layout.max_frame_len(), 2051);
    }

    #[test]
    fn test_packed_len_rounds_up() {
        assert_eq!(packed_len(17), 3);
        assert_eq!(packed_len(16), 2);
    }

    #[test]
    fn test_layout_too_large_for_capacity() {
        let result = FrameDecoder::<8>::new(small_layout());
        assert_eq!(
            result.err(),
            Some(LayoutError::PayloadTooLarge {
                needed: 16,
                capacity: 8
            })
        );
    }

    #[test]
    fn test_decode_actuator_frame() {
        let mut decoder = Decoder::new(small_layout()).unwrap();
        let frames = decode_all(&mut decoder, &[0xAA, 0xBB, 0x02, 0x01, 0xF4, 0x00, 0x00]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, FrameKind::Actuators);
        assert_eq!(&frames[0].1[..], &[0x01, 0xF4, 0x00, 0x00]);
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_zero_length_frame_completes_on_type() {
        let mut decoder = Decoder::new(small_layout()).unwrap();
        assert_eq!(decoder.feed(HEADER_0), Ok(None));
        assert_eq!(decoder.feed(HEADER_1), Ok(None));
        let frame = decoder.feed(0x05).unwrap().unwrap();
        assert_eq!(frame.kind, FrameKind::Ping);
        assert!(frame.payload.is_empty());
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_state_transitions() {
        let mut decoder = Decoder::new(small_layout()).unwrap();
        assert_eq!(decoder.state(), DecoderState::Idle);
        decoder.feed(HEADER_0).unwrap();
        assert_eq!(decoder.state(), DecoderState::GotHeader1);
        decoder.feed(HEADER_1).unwrap();
        assert_eq!(decoder.state(), DecoderState::GotHeader2);
        decoder.feed(0x02).unwrap();
        assert_eq!(
            decoder.state(),
            DecoderState::ReadingPayload {
                kind: FrameKind::Actuators,
                remaining: 4
            }
        );
        decoder.feed(0x00).unwrap();
        assert_eq!(
            decoder.state(),
            DecoderState::ReadingPayload {
                kind: FrameKind::Actuators,
                remaining: 3
            }
        );
    }

    #[test]
    fn test_bad_second_header_resets() {
        let mut decoder = Decoder::new(small_layout()).unwrap();
        decoder.feed(HEADER_0).unwrap();
        decoder.feed(0x12).unwrap();
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_repeated_first_header_keeps_sync() {
        let mut decoder = Decoder::new(small_layout()).unwrap();
        let frames = decode_all(&mut decoder, &[0xAA, 0xAA, 0xAA, 0xBB, 0x05]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, FrameKind::Ping);
    }

    #[test]
    fn test_unknown_type_is_framing_error() {
        let mut decoder = Decoder::new(small_layout()).unwrap();
        decoder.feed(HEADER_0).unwrap();
        decoder.feed(HEADER_1).unwrap();
        assert_eq!(decoder.feed(0x7F), Err(FramingError::UnknownType(0x7F)));
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_disabled_type_is_framing_error() {
        let mut layout = small_layout();
        layout.disable(FrameKind::Grayscale);
        let mut decoder = Decoder::new(layout).unwrap();
        decoder.feed(HEADER_0).unwrap();
        decoder.feed(HEADER_1).unwrap();
        assert_eq!(decoder.feed(0x01), Err(FramingError::DisabledType(0x01)));
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_rejected_type_equal_to_header_starts_new_frame() {
        let mut decoder = Decoder::new(small_layout()).unwrap();
        let summary = decoder.feed_slice(&[0xAA, 0xBB, 0xAA, 0xBB, 0x06], usize::MAX, |frame| {
            assert_eq!(frame.kind, FrameKind::Info);
        });
        assert_eq!(summary.framing_errors, 1);
        assert_eq!(summary.frames, 1);
    }

    #[test]
    fn test_resync_after_garbage() {
        let mut decoder = Decoder::new(small_layout()).unwrap();
        let frames = decode_all(
            &mut decoder,
            &[0x00, 0xFF, 0x12, 0xAA, 0x34, 0xBB, 0xAA, 0xBB, 0x05],
        );
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, FrameKind::Ping);
    }

    #[test]
    fn test_header_bytes_inside_payload_are_data() {
        let mut decoder = Decoder::new(small_layout()).unwrap();
        let frames = decode_all(&mut decoder, &[0xAA, 0xBB, 0x02, 0xAA, 0xBB, 0xAA, 0xBB]);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0].1[..], &[0xAA, 0xBB, 0xAA, 0xBB]);
    }

    #[test]
    fn test_feed_slice_respects_frame_budget() {
        let mut decoder = Decoder::new(small_layout()).unwrap();
        let stream = [0xAA, 0xBB, 0x05, 0xAA, 0xBB, 0x05, 0xAA, 0xBB, 0x05];
        let summary = decoder.feed_slice(&stream, 2, |_| {});
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.consumed, 6);
    }

    #[test]
    fn test_reset_drops_partial_frame() {
        let mut decoder = Decoder::new(small_layout()).unwrap();
        decode_all(&mut decoder, &[0xAA, 0xBB, 0x01, 1, 2, 3]);
        assert!(!decoder.is_idle());
        decoder.reset();
        assert!(decoder.is_idle());
        // The tail of the aborted frame is now garbage
        let frames = decode_all(&mut decoder, &[4, 5, 6, 0xAA, 0xBB, 0x05]);
        assert_eq!(frames.len(), 1);
    }
}
