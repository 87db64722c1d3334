//! UART serial communication abstractions
//!
//! The controller never blocks on receive: every loop iteration asks how much
//! input is waiting, pulls a bounded amount of it, and moves on. Transmit is
//! only used for short probe replies and may block.

/// Non-blocking UART receiver
///
/// Implementations expose their receive backlog so the transport guard can
/// detect a stream that has fallen behind.
pub trait SerialRx {
    /// Number of received bytes not yet consumed
    ///
    /// Implementations that cannot count exactly must never under-report.
    fn available(&mut self) -> usize;

    /// Take the next received byte, or `None` if nothing is pending
    fn read_byte(&mut self) -> Option<u8>;

    /// Drop everything currently pending
    ///
    /// Returns the number of bytes discarded. Bytes arriving while the drain
    /// runs are left for the next iteration.
    fn discard_pending(&mut self) -> usize {
        let pending = self.available();
        let mut discarded = 0;
        while discarded < pending && self.read_byte().is_some() {
            discarded += 1;
        }
        discarded
    }
}

/// UART transmitter
pub trait UartTx {
    /// Error type for transmit operations
    type Error;

    /// Write data to the UART
    ///
    /// Blocks until all data has been written or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Error returned by in-memory transmit sinks when they run out of room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SinkFull;

/// A fixed-capacity vector collects transmitted bytes (host tests, simulation)
impl<const N: usize> UartTx for heapless::Vec<u8, N> {
    type Error = SinkFull;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.extend_from_slice(data).map_err(|_| SinkFull)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: DEFAULT_BAUDRATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// Link speed used by the host application
pub const DEFAULT_BAUDRATE: u32 = 460_800;

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
    Nine,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

impl UartConfig {
    /// Time on the wire for one byte, in microseconds (start + data + parity + stop bits)
    pub fn byte_time_us(&self) -> u32 {
        let data = match self.data_bits {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
            DataBits::Nine => 9,
        };
        let parity = if self.parity == Parity::None { 0 } else { 1 };
        let stop = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        let bits = 1 + data + parity + stop;
        (bits * 1_000_000) / self.baudrate.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_collects_bytes() {
        let mut sink: heapless::Vec<u8, 8> = heapless::Vec::new();
        sink.write_blocking(b"PONG\n").unwrap();
        assert_eq!(&sink[..], b"PONG\n");
    }

    #[test]
    fn test_vec_sink_full() {
        let mut sink: heapless::Vec<u8, 4> = heapless::Vec::new();
        assert_eq!(sink.write_blocking(b"PONG\n"), Err(SinkFull));
    }

    #[test]
    fn test_byte_time_default_link() {
        // 10 bits at 460800 baud is ~21.7us
        assert_eq!(UartConfig::default().byte_time_us(), 21);
    }
}
