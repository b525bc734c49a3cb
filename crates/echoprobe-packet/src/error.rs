use thiserror::Error;

/// A packet error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A packet error.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum Error {
    /// Attempting to create a packet view over an insufficient buffer.
    #[error("insufficient buffer for {0} packet, minimum={1}, provided={2}")]
    InsufficientPacketBuffer(String, usize, usize),
    /// The IPv4 header length field held an out-of-range value.
    #[error("invalid IPv4 header length: {0}")]
    InvalidHeaderLength(usize),
}
