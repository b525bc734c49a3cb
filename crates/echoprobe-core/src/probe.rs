use crate::types::Sequence;
use std::net::IpAddr;
use std::time::{Duration, SystemTime};

/// The lifecycle record for a single probe.
///
/// Created when the probe is sent and completed exactly once, by reply,
/// timeout, send failure, receive failure or cancellation. Owned exclusively
/// by the run state table; sessions only report events referencing a
/// sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeState {
    /// The sequence of the probe.
    pub sequence: Sequence,
    /// Timestamp when the probe was sent.
    pub sent_at: SystemTime,
    /// Timestamp when the reply was received, if one arrived.
    pub received_at: Option<SystemTime>,
    /// Whether a result has been emitted for this probe.
    pub completed: bool,
}

impl ProbeState {
    #[must_use]
    pub(crate) const fn new(sequence: Sequence, sent_at: SystemTime) -> Self {
        Self {
            sequence,
            sent_at,
            received_at: None,
            completed: false,
        }
    }
}

/// The outcome of a single probe.
///
/// Exactly one is emitted per probe ever sent. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// The sequence of the probe.
    pub sequence: Sequence,
    /// Whether a matching reply was received.
    pub success: bool,
    /// The measured round-trip time for a successful probe.
    pub round_trip: Option<Duration>,
    /// A human readable outcome, e.g. `reply from 1.1.1.1` or `timeout`.
    pub message: String,
}

impl ProbeResult {
    pub(crate) fn reply(sequence: Sequence, round_trip: Duration, from: IpAddr) -> Self {
        Self {
            sequence,
            success: true,
            round_trip: Some(round_trip),
            message: format!("reply from {from}"),
        }
    }

    pub(crate) fn failure(sequence: Sequence, message: impl Into<String>) -> Self {
        Self {
            sequence,
            success: false,
            round_trip: None,
            message: message.into(),
        }
    }

    /// The round-trip time in fractional milliseconds, zero when absent.
    #[must_use]
    pub fn round_trip_millis(&self) -> f64 {
        self.round_trip
            .map_or(0_f64, |rtt| rtt.as_secs_f64() * 1000_f64)
    }
}

/// A decoded inbound datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// An echo reply carrying the echoed identifier and sequence.
    EchoReply(ResponseData),
    /// A time exceeded message. Never correlated with a probe; classified so
    /// a future hop-discovery caller can reuse the channel.
    TimeExceeded { addr: IpAddr },
    /// Any other ICMP message sharing the socket.
    Other { addr: IpAddr, icmp_type: u8 },
}

/// The data in an echo reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseData {
    /// Timestamp when the reply was read from the socket.
    pub recv: SystemTime,
    /// The address the reply came from.
    pub addr: IpAddr,
    /// The echoed identifier.
    pub identifier: u16,
    /// The echoed sequence number.
    pub sequence: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_reply_result() {
        let result = ProbeResult::reply(
            Sequence(3),
            Duration::from_micros(12_500),
            IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
        );
        assert!(result.success);
        assert_eq!("reply from 1.1.1.1", result.message);
        assert!((result.round_trip_millis() - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failure_result() {
        let result = ProbeResult::failure(Sequence(0), "timeout");
        assert!(!result.success);
        assert_eq!(None, result.round_trip);
        assert!((result.round_trip_millis() - 0.0).abs() < f64::EPSILON);
        assert!(result.message.contains("timeout"));
    }
}
