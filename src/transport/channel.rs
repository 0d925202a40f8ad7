//! Seams between the transport state machine and real sockets.

use crate::error::ChannelError;

/// An open, exclusively owned network channel.
pub trait Channel: Send {
    /// Write one complete line. Blocks until written or failed.
    fn write_line(&mut self, line: &[u8]) -> Result<(), ChannelError>;

    /// Shut the channel down.
    fn close(&mut self) -> Result<(), ChannelError>;
}

/// Starts connection attempts on behalf of the transport.
///
/// `begin_connect` must return promptly. The outcome is delivered later via
/// [`Transport::on_connect_complete`](super::Transport::on_connect_complete)
/// tagged with the same `generation`.
pub trait Connector: Send {
    type Channel: Channel;

    fn begin_connect(&mut self, generation: u64);
}
