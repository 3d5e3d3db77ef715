pub mod serialport;

use std::time::Duration;

use crate::error::LatencyResult;

pub type BaudRate = u32;

/// A byte-level link whose transmit side is looped back to its receive side
pub trait EchoChannel {
    /// Discard anything already sitting in the receive buffer.
    /// Returns the number of bytes that were pending.
    fn drain(&mut self) -> LatencyResult<usize>;

    /// Transmit a single byte
    fn send_byte(&mut self, byte: u8) -> LatencyResult<()>;

    /// Block for at most `timeout` waiting for one byte.
    /// `Ok(None)` means nothing arrived in time.
    fn receive_byte(&mut self, timeout: Duration) -> LatencyResult<Option<u8>>;
}

/// Opens an [`EchoChannel`] configured for 8N1 at a given baud rate.
/// Dropping the returned channel closes it.
pub trait ChannelOpener {
    type Channel: EchoChannel;

    fn open(&mut self, baud: BaudRate) -> LatencyResult<Self::Channel>;
}
