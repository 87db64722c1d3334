//! Backlog guard
//!
//! Checked before each decode pass. A backlog several frames deep means the
//! host is outrunning the loop or the stream has desynchronized; acting on
//! that data would display stale or corrupted frames, so the guard has the
//! caller drop it and restart framing.

use mirror_hal::SerialRx;
use mirror_protocol::FrameDecoder;

use crate::config::TransportConfig;

/// Result of a backlog check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GuardVerdict {
    /// Backlog within bounds
    Healthy {
        /// Bytes waiting
        pending: usize,
    },
    /// Backlog over the limit; input was flushed and framing reset
    Flushed {
        /// Bytes dropped
        dropped: usize,
    },
}

/// Bounds the unconsumed receive backlog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportGuard {
    limit: usize,
}

impl TransportGuard {
    /// Guard sized for frames of at most `max_frame_len` bytes
    pub fn new(max_frame_len: usize, config: &TransportConfig) -> Self {
        Self {
            limit: max_frame_len.max(1) * config.backlog_multiple as usize,
        }
    }

    /// Largest backlog accepted
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether `pending` bytes exceed the limit
    pub fn is_overrun(&self, pending: usize) -> bool {
        pending > self.limit
    }

    /// Check the backlog, flushing input and resetting `decoder` on overrun
    pub fn check<R, const CAP: usize>(
        &self,
        rx: &mut R,
        decoder: &mut FrameDecoder<CAP>,
    ) -> GuardVerdict
    where
        R: SerialRx + ?Sized,
    {
        let pending = rx.available();
        if !self.is_overrun(pending) {
            return GuardVerdict::Healthy { pending };
        }
        let dropped = rx.discard_pending();
        decoder.reset();
        GuardVerdict::Flushed { dropped }
    }
}
