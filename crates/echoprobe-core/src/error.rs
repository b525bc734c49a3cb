use std::fmt::{Display, Formatter};
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// A probing error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A probing error.
#[derive(Error, Debug)]
pub enum Error {
    /// The target name or address could not be resolved. Fatal for a run.
    #[error("failed to resolve target: {0}")]
    ResolveFailed(String),
    /// An ICMP socket could not be acquired for lack of privilege. Fatal for
    /// a run; never silently downgraded to another transport.
    #[error("ICMP socket permission denied: {0}")]
    PermissionDenied(IoError),
    /// An ICMP socket could not be created. Fatal for a run.
    #[error("failed to open ICMP socket: {0}")]
    SocketUnavailable(IoError),
    /// A single probe failed to send. The run continues.
    #[error("probe failed to send: {0}")]
    ProbeFailed(IoError),
    #[error("invalid payload size: {0}")]
    InvalidPayloadSize(usize),
    #[error("invalid config: {0}")]
    BadConfig(String),
    #[error("invalid packet: {0}")]
    Packet(#[from] echoprobe_packet::error::Error),
    #[error("session closed")]
    SessionClosed,
    #[error("IO error: {0}")]
    Io(#[from] IoError),
    #[error("probe error: {0}")]
    Other(String),
}

/// Custom IO error result.
pub type IoResult<T> = std::result::Result<T, IoError>;

/// Custom IO error.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("bind error for {1}: {0}")]
    Bind(io::Error, SocketAddr),
    #[error("sendto error for {1}: {0}")]
    SendTo(io::Error, SocketAddr),
    #[error("failed to {1}: {0}")]
    Other(io::Error, IoOperation),
}

impl IoError {
    /// The underlying `io::ErrorKind`.
    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::Bind(e, _) | Self::SendTo(e, _) | Self::Other(e, _) => e.kind(),
        }
    }
}

/// Io operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IoOperation {
    NewSocket,
    SetNonBlocking,
    Select,
    RecvFrom,
    Shutdown,
}

impl Display for IoOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewSocket => write!(f, "create new socket"),
            Self::SetNonBlocking => write!(f, "set non-blocking"),
            Self::Select => write!(f, "select"),
            Self::RecvFrom => write!(f, "recv from"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kind() {
        let err = IoError::Other(
            io::Error::from(io::ErrorKind::WouldBlock),
            IoOperation::RecvFrom,
        );
        assert_eq!(io::ErrorKind::WouldBlock, err.kind());
    }

    #[test]
    fn test_io_error_display() {
        let err = IoError::Other(
            io::Error::from(io::ErrorKind::PermissionDenied),
            IoOperation::NewSocket,
        );
        assert_eq!(
            "failed to create new socket: permission denied",
            err.to_string()
        );
    }
}
