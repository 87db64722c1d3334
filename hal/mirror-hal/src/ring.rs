//! Fixed-capacity receive ring
//!
//! Backs host-side simulation and tests, and is used by firmware as the
//! staging area between the UART driver and the decoder.

use heapless::Deque;

use crate::uart::SerialRx;

/// Bounded FIFO of received bytes that implements [`SerialRx`]
#[derive(Debug, Clone)]
pub struct RingRx<const N: usize> {
    bytes: Deque<u8, N>,
    /// Bytes refused because the ring was full
    dropped: u32,
}

impl<const N: usize> Default for RingRx<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingRx<N> {
    /// Create an empty ring
    pub const fn new() -> Self {
        Self {
            bytes: Deque::new(),
            dropped: 0,
        }
    }

    /// Queue one received byte
    ///
    /// Returns `false` (and counts a drop) if the ring is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.bytes.push_back(byte).is_ok() {
            true
        } else {
            self.dropped = self.dropped.saturating_add(1);
            false
        }
    }

    /// Queue as many bytes as fit, returning how many were accepted
    pub fn extend_from_slice(&mut self, data: &[u8]) -> usize {
        data.iter().take_while(|&&b| self.push(b)).count()
    }

    /// Free space left in the ring
    pub fn free(&self) -> usize {
        N - self.bytes.len()
    }

    /// Whether the ring holds no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the ring is at capacity
    pub fn is_full(&self) -> bool {
        self.bytes.is_full()
    }

    /// Bytes refused since creation
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<const N: usize> SerialRx for RingRx<N> {
    fn available(&mut self) -> usize {
        self.bytes.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.bytes.pop_front()
    }

    fn discard_pending(&mut self) -> usize {
        let n = self.bytes.len();
        self.bytes.clear();
        n
    }
}
