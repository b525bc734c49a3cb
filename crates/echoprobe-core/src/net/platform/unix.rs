use crate::error::{IoError, IoOperation, IoResult};
use crate::net::socket::Socket;
use echoprobe_packet::fmt_payload;
use nix::{
    sys::select::FdSet,
    sys::time::{TimeVal, TimeValLike},
    Error,
};
use socket2::{Domain, Protocol, SockAddr, Type};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr};
use std::os::fd::AsFd;
use std::time::Duration;
use tracing::instrument;

/// A network socket.
pub struct SocketImpl {
    inner: socket2::Socket,
}

impl SocketImpl {
    fn new(domain: Domain, ty: Type, protocol: Protocol) -> IoResult<Self> {
        Ok(Self {
            inner: socket2::Socket::new(domain, ty, Some(protocol))
                .map_err(|err| IoError::Other(err, IoOperation::NewSocket))?,
        })
    }

    /// Open an ICMP socket for an IPv4 target.
    ///
    /// An unprivileged ICMP datagram socket is preferred, with a raw socket
    /// as the fallback for hosts that do not offer one. On Linux the
    /// datagram socket is bound to the session identifier so the kernel
    /// carries it as the echo identifier and demultiplexes replies by it.
    #[instrument(level = "trace")]
    pub(crate) fn open_ipv4(identifier: u16) -> IoResult<Self> {
        match Self::new(Domain::IPV4, Type::DGRAM, Protocol::ICMPV4) {
            Ok(socket) => {
                socket.set_nonblocking(true)?;
                socket.bind_identifier(SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), identifier))?;
                tracing::debug!("opened ICMPv4 datagram socket");
                Ok(socket)
            }
            Err(err) => {
                tracing::debug!(%err, "ICMPv4 datagram socket unavailable, trying raw");
                let socket = Self::new(Domain::IPV4, Type::RAW, Protocol::ICMPV4)?;
                socket.set_nonblocking(true)?;
                tracing::debug!("opened ICMPv4 raw socket");
                Ok(socket)
            }
        }
    }

    /// Open an ICMP socket for an IPv6 target.
    ///
    /// See [`SocketImpl::open_ipv4`]; the same preference order applies.
    #[instrument(level = "trace")]
    pub(crate) fn open_ipv6(identifier: u16) -> IoResult<Self> {
        match Self::new(Domain::IPV6, Type::DGRAM, Protocol::ICMPV6) {
            Ok(socket) => {
                socket.set_nonblocking(true)?;
                socket.bind_identifier(SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), identifier))?;
                tracing::debug!("opened ICMPv6 datagram socket");
                Ok(socket)
            }
            Err(err) => {
                tracing::debug!(%err, "ICMPv6 datagram socket unavailable, trying raw");
                let socket = Self::new(Domain::IPV6, Type::RAW, Protocol::ICMPV6)?;
                socket.set_nonblocking(true)?;
                tracing::debug!("opened ICMPv6 raw socket");
                Ok(socket)
            }
        }
    }

    fn set_nonblocking(&self, nonblocking: bool) -> IoResult<()> {
        self.inner
            .set_nonblocking(nonblocking)
            .map_err(|err| IoError::Other(err, IoOperation::SetNonBlocking))
    }

    #[cfg(target_os = "linux")]
    fn bind_identifier(&self, addr: SocketAddr) -> IoResult<()> {
        self.inner
            .bind(&SockAddr::from(addr))
            .map_err(|err| IoError::Bind(err, addr))
    }

    #[cfg(not(target_os = "linux"))]
    #[allow(clippy::unnecessary_wraps, clippy::unused_self)]
    fn bind_identifier(&self, _addr: SocketAddr) -> IoResult<()> {
        Ok(())
    }
}

impl Socket for SocketImpl {
    #[instrument(skip(self, buf), level = "trace")]
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> IoResult<()> {
        tracing::trace!(buf = fmt_payload(buf), ?addr);
        self.inner
            .send_to(buf, &SockAddr::from(addr))
            .map_err(|err| IoError::SendTo(err, addr))?;
        Ok(())
    }

    #[instrument(skip(self), level = "trace")]
    fn is_readable(&self, timeout: Duration) -> IoResult<bool> {
        let mut read = FdSet::new();
        read.insert(self.inner.as_fd());
        let readable = nix::sys::select::select(
            None,
            Some(&mut read),
            None,
            None,
            Some(&mut TimeVal::milliseconds(timeout.as_millis() as i64)),
        );
        match readable {
            Ok(readable) => Ok(readable == 1),
            Err(Error::EINTR) => Ok(false),
            Err(err) => Err(IoError::Other(io::Error::from(err), IoOperation::Select)),
        }
    }

    #[instrument(skip(self, buf), level = "trace")]
    fn recv_from(&self, buf: &mut [u8]) -> IoResult<(usize, Option<SocketAddr>)> {
        let (bytes_read, addr) = self
            .inner
            .recv_from_into_buf(buf)
            .map_err(|err| IoError::Other(err, IoOperation::RecvFrom))?;
        tracing::trace!(buf = fmt_payload(&buf[..bytes_read]), bytes_read, ?addr);
        Ok((bytes_read, addr))
    }

    #[instrument(skip(self), level = "trace")]
    fn shutdown(&self) -> IoResult<()> {
        self.inner
            .shutdown(Shutdown::Both)
            .map_err(|err| IoError::Other(err, IoOperation::Shutdown))
    }
}

/// An extension trait to allow `recv_from` method which writes to a `&mut [u8]`.
///
/// This is required for `socket2::Socket` which [does not currently provide] this method.
///
/// [does not currently provide]: https://github.com/rust-lang/socket2/issues/223
trait RecvFrom {
    fn recv_from_into_buf(&self, buf: &mut [u8]) -> io::Result<(usize, Option<SocketAddr>)>;
}

impl RecvFrom for socket2::Socket {
    // Safety: the `recv` implementation promises not to write uninitialised
    // bytes to the `buf`fer, so this casting is safe.
    #![allow(unsafe_code)]
    fn recv_from_into_buf(&self, buf: &mut [u8]) -> io::Result<(usize, Option<SocketAddr>)> {
        let buf =
            unsafe { &mut *(std::ptr::from_mut::<[u8]>(buf) as *mut [std::mem::MaybeUninit<u8>]) };
        self.recv_from(buf)
            .map(|(size, addr)| (size, addr.as_socket()))
    }
}
