use crate::error::IoResult as Result;
use std::net::SocketAddr;
use std::time::Duration;

/// An ICMP-capable datagram socket.
///
/// The engine owns exactly one per run; the orchestration thread sends
/// through it while the receive loop polls it, so all operations take
/// `&self`.
#[cfg_attr(test, mockall::automock)]
pub trait Socket
where
    Self: Sized,
{
    /// Send a datagram to the given address.
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<()>;
    /// Returns true if the socket becomes readable before the timeout.
    fn is_readable(&self, timeout: Duration) -> Result<bool>;
    /// Receive a single datagram.
    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, Option<SocketAddr>)>;
    /// Shut the socket down. Idempotent at the caller.
    fn shutdown(&self) -> Result<()>;
}
