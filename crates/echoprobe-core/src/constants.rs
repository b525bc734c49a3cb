/// The maximum size of any datagram buffer, inbound or outbound.
pub const MAX_PACKET_SIZE: usize = 1024;

/// The maximum number of ICMP payload bytes per probe.
///
/// Sized so that an echoed reply, prefixed with a maximal 60 byte IPv4
/// header on a raw socket, still fits the receive buffer.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - 60 - 8;

/// The highest probe count a single run may be configured with.
///
/// Sequence numbers are 16-bit and never reused within a session.
pub const MAX_PROBE_COUNT: usize = 65536;
