use crate::config::SessionConfig;
use crate::constants::MAX_PACKET_SIZE;
use crate::error::{Error, Result};
use crate::net::ipv4::Ipv4;
use crate::net::ipv6::Ipv6;
use crate::net::socket::Socket;
use crate::net::SocketImpl;
use crate::probe::Response;
use crate::types::{PayloadSize, Sequence, SessionId};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tracing::instrument;

/// A channel for sending echo requests and receiving echo replies.
///
/// Owns the single socket for one destination. The orchestration thread
/// sends through it while the receive loop polls it, so every operation
/// takes `&self` and closing is a flag plus a socket shutdown.
pub struct Channel<S: Socket> {
    socket: S,
    family: Family,
    dest: SocketAddr,
    read_timeout: Duration,
    closed: AtomicBool,
}

/// The address family codec for the channel.
#[derive(Debug)]
enum Family {
    V4(Ipv4),
    V6(Ipv6),
}

impl Channel<SocketImpl> {
    /// Open an ICMP channel to the target.
    ///
    /// Raw ICMP sockets typically require elevated privilege or an
    /// OS-granted capability; failure to acquire a socket is fatal for the
    /// session and surfaced immediately, never retried.
    #[instrument(skip(config), level = "debug")]
    pub fn open(
        target_addr: IpAddr,
        identifier: SessionId,
        config: &SessionConfig,
    ) -> Result<Self> {
        let socket = match target_addr {
            IpAddr::V4(_) => SocketImpl::open_ipv4(identifier.0),
            IpAddr::V6(_) => SocketImpl::open_ipv6(identifier.0),
        }
        .map_err(|err| match err.kind() {
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(err),
            _ => Error::SocketUnavailable(err),
        })?;
        Ok(Self::with_socket(socket, target_addr, config))
    }
}

impl<S: Socket> Channel<S> {
    /// Wrap an already open socket.
    pub(crate) fn with_socket(socket: S, target_addr: IpAddr, config: &SessionConfig) -> Self {
        let family = match target_addr {
            IpAddr::V4(dest_addr) => Family::V4(Ipv4 {
                dest_addr,
                payload_pattern: config.payload_pattern,
            }),
            IpAddr::V6(dest_addr) => Family::V6(Ipv6 {
                dest_addr,
                payload_pattern: config.payload_pattern,
            }),
        };
        Self {
            socket,
            family,
            dest: SocketAddr::new(target_addr, 0),
            read_timeout: config.read_timeout,
            closed: AtomicBool::new(false),
        }
    }

    /// Encode and send one echo request.
    #[instrument(skip(self), level = "trace")]
    pub fn send_probe(
        &self,
        identifier: SessionId,
        sequence: Sequence,
        payload_size: PayloadSize,
    ) -> Result<()> {
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        let packet = match &self.family {
            Family::V4(ipv4) => {
                ipv4.make_echo_request(&mut buf, identifier, sequence, payload_size)?
            }
            Family::V6(ipv6) => {
                ipv6.make_echo_request(&mut buf, identifier, sequence, payload_size)?
            }
        };
        self.socket
            .send_to(packet, self.dest)
            .map_err(Error::ProbeFailed)
    }

    /// Read and decode the next inbound datagram, if one arrives within the
    /// read timeout.
    ///
    /// Malformed datagrams are discarded, not surfaced as errors; only a
    /// real socket failure propagates.
    #[instrument(skip(self), level = "trace")]
    pub fn recv_response(&self) -> Result<Option<Response>> {
        if !self.socket.is_readable(self.read_timeout).map_err(Error::Io)? {
            return Ok(None);
        }
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        let (len, addr) = match self.socket.recv_from(&mut buf) {
            Ok(read) => read,
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                return Ok(None)
            }
            Err(err) => return Err(Error::Io(err)),
        };
        let recv = SystemTime::now();
        let from = addr.map(|addr| addr.ip());
        let parsed = match &self.family {
            Family::V4(ipv4) => ipv4.parse_response(&buf[..len], recv, from),
            Family::V6(ipv6) => ipv6.parse_response(&buf[..len], recv, from),
        };
        match parsed {
            Ok(response) => Ok(response),
            Err(Error::Packet(err)) => {
                tracing::debug!(%err, "discarded unparseable packet");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Close the channel.
    ///
    /// Idempotent and safe to call from any thread while the receive loop
    /// is active; the loop observes closure and exits without further reads.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            if let Err(err) = self.socket.shutdown() {
                tracing::trace!(%err, "shutdown after close");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IoError, IoOperation};
    use crate::net::socket::MockSocket;
    use crate::probe::ResponseData;
    use hex_literal::hex;
    use mockall::predicate;
    use std::net::Ipv4Addr;

    const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));

    fn config() -> SessionConfig {
        SessionConfig {
            payload_size: PayloadSize(0),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_send_probe() {
        let expected_send_to_buf = hex!("08 00 f3 23 04 d2 00 0a");
        let expected_send_to_addr = SocketAddr::new(TARGET, 0);
        let mut socket = MockSocket::new();
        socket
            .expect_send_to()
            .with(
                predicate::eq(expected_send_to_buf),
                predicate::eq(expected_send_to_addr),
            )
            .times(1)
            .returning(|_, _| Ok(()));
        let channel = Channel::with_socket(socket, TARGET, &config());
        channel
            .send_probe(SessionId(1234), Sequence(10), PayloadSize(0))
            .unwrap();
    }

    #[test]
    fn test_send_probe_failure() {
        let mut socket = MockSocket::new();
        socket.expect_send_to().returning(|_, addr| {
            Err(IoError::SendTo(
                std::io::Error::from(std::io::ErrorKind::AddrNotAvailable),
                addr,
            ))
        });
        let channel = Channel::with_socket(socket, TARGET, &config());
        let err = channel
            .send_probe(SessionId(1), Sequence(0), PayloadSize(0))
            .unwrap_err();
        assert!(matches!(err, Error::ProbeFailed(_)));
    }

    #[test]
    fn test_recv_not_readable() {
        let mut socket = MockSocket::new();
        socket.expect_is_readable().returning(|_| Ok(false));
        let channel = Channel::with_socket(socket, TARGET, &config());
        assert_eq!(None, channel.recv_response().unwrap());
    }

    #[test]
    fn test_recv_reply() {
        let reply = hex!("00 00 fb 23 04 d2 00 0a");
        let mut socket = MockSocket::new();
        socket.expect_is_readable().returning(|_| Ok(true));
        socket.expect_recv_from().returning(move |buf| {
            buf[..reply.len()].copy_from_slice(&reply);
            Ok((reply.len(), Some(SocketAddr::new(TARGET, 0))))
        });
        let channel = Channel::with_socket(socket, TARGET, &config());
        let response = channel.recv_response().unwrap().unwrap();
        let Response::EchoReply(ResponseData {
            identifier,
            sequence,
            addr,
            ..
        }) = response
        else {
            panic!("expected an echo reply");
        };
        assert_eq!(1234, identifier);
        assert_eq!(10, sequence);
        assert_eq!(TARGET, addr);
    }

    #[test]
    fn test_recv_would_block() {
        let mut socket = MockSocket::new();
        socket.expect_is_readable().returning(|_| Ok(true));
        socket.expect_recv_from().returning(|_| {
            Err(IoError::Other(
                std::io::Error::from(std::io::ErrorKind::WouldBlock),
                IoOperation::RecvFrom,
            ))
        });
        let channel = Channel::with_socket(socket, TARGET, &config());
        assert_eq!(None, channel.recv_response().unwrap());
    }

    #[test]
    fn test_recv_malformed_discarded() {
        let mut socket = MockSocket::new();
        socket.expect_is_readable().returning(|_| Ok(true));
        socket.expect_recv_from().returning(|buf| {
            buf[0] = 0;
            Ok((3, None))
        });
        let channel = Channel::with_socket(socket, TARGET, &config());
        assert_eq!(None, channel.recv_response().unwrap());
    }

    #[test]
    fn test_recv_socket_error_is_fatal() {
        let mut socket = MockSocket::new();
        socket.expect_is_readable().returning(|_| {
            Err(IoError::Other(
                std::io::Error::from(std::io::ErrorKind::NotConnected),
                IoOperation::Select,
            ))
        });
        let channel = Channel::with_socket(socket, TARGET, &config());
        assert!(channel.recv_response().is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut socket = MockSocket::new();
        socket.expect_shutdown().times(1).returning(|| Ok(()));
        let channel = Channel::with_socket(socket, TARGET, &config());
        assert!(!channel.is_closed());
        channel.close();
        channel.close();
        assert!(channel.is_closed());
    }
}
