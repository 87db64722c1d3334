//! Host link adapters
//!
//! The UART driver's interrupt buffer is drained into a [`RingRx`] before
//! every iteration, so the staging ring holds the whole backlog the
//! transport guard measures.

use embassy_rp::uart;
use embedded_io::{Read, ReadReady, Write};
use mirror_hal::uart::{DataBits, Parity, StopBits};
use mirror_hal::{RingRx, UartConfig, UartTx};

/// Translate link settings into the RP2040 UART configuration
///
/// The PL011 has no 9-bit mode; `Nine` falls back to eight data bits.
pub fn rp_uart_config(link: &UartConfig) -> uart::Config {
    let mut config = uart::Config::default();
    config.baudrate = link.baudrate;
    config.data_bits = match link.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight | DataBits::Nine => uart::DataBits::DataBits8,
    };
    config.parity = match link.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    config.stop_bits = match link.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    config
}

/// Move every byte the UART has buffered into `ring`
///
/// Stops early when the ring is full; the rest stays in the driver buffer
/// and the guard sees a full ring. Returns the number of bytes moved.
pub fn pump<R, const N: usize>(uart: &mut R, ring: &mut RingRx<N>) -> usize
where
    R: Read + ReadReady,
{
    let mut chunk = [0u8; 64];
    let mut moved = 0;
    while ring.free() > 0 && matches!(uart.read_ready(), Ok(true)) {
        let want = ring.free().min(chunk.len());
        match uart.read(&mut chunk[..want]) {
            Ok(0) | Err(_) => break,
            Ok(n) => moved += ring.extend_from_slice(&chunk[..n]),
        }
    }
    moved
}

/// Blocking transmit half of the host link
pub struct TxLink<T>(pub T);

impl<T: Write> UartTx for TxLink<T> {
    type Error = T::Error;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.0.write_all(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush()
    }
}
