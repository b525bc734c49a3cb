use crate::constants::MAX_PAYLOAD_SIZE;
use crate::error::{Error, Result};
use crate::probe::{Response, ResponseData};
use crate::types::{PayloadPattern, PayloadSize, Sequence, SessionId};
use echoprobe_packet::icmpv6::echo_reply::EchoReplyPacket;
use echoprobe_packet::icmpv6::echo_request::EchoRequestPacket;
use echoprobe_packet::icmpv6::{IcmpCode, IcmpPacket, IcmpType};
use std::net::{IpAddr, Ipv6Addr};
use std::time::SystemTime;
use tracing::instrument;

/// Builds and parses IPv6 ICMP echo datagrams for one destination.
///
/// Unlike IPv4 there is no header stripping: `ICMPv6` sockets always deliver
/// the bare ICMP message. The checksum is left at zero on outbound packets
/// as the kernel computes it from the IPv6 pseudo-header.
#[derive(Debug, Clone, Copy)]
pub struct Ipv6 {
    pub dest_addr: Ipv6Addr,
    pub payload_pattern: PayloadPattern,
}

impl Ipv6 {
    /// Build an echo request into `buf` and return the wire bytes.
    pub fn make_echo_request<'a>(
        &self,
        buf: &'a mut [u8],
        identifier: SessionId,
        sequence: Sequence,
        payload_size: PayloadSize,
    ) -> Result<&'a [u8]> {
        let payload_size = usize::from(payload_size.0);
        if payload_size > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidPayloadSize(payload_size));
        }
        let packet_size = EchoRequestPacket::minimum_packet_size() + payload_size;
        let payload = [self.payload_pattern.0; MAX_PAYLOAD_SIZE];
        let mut icmp = EchoRequestPacket::new(&mut buf[..packet_size])?;
        icmp.set_icmp_type(IcmpType::EchoRequest);
        icmp.set_icmp_code(IcmpCode(0));
        icmp.set_checksum(0);
        icmp.set_identifier(identifier.0);
        icmp.set_sequence(sequence.0);
        icmp.set_payload(&payload[..payload_size]);
        Ok(&buf[..packet_size])
    }

    /// Decode an inbound datagram.
    #[instrument(skip(self, bytes), level = "trace")]
    pub fn parse_response(
        &self,
        bytes: &[u8],
        recv: SystemTime,
        from: Option<IpAddr>,
    ) -> Result<Option<Response>> {
        let addr = from.unwrap_or(IpAddr::V6(self.dest_addr));
        let icmp = IcmpPacket::new_view(bytes)?;
        match icmp.get_icmp_type() {
            IcmpType::EchoReply => {
                let reply = EchoReplyPacket::new_view(bytes)?;
                Ok(Some(Response::EchoReply(ResponseData {
                    recv,
                    addr,
                    identifier: reply.get_identifier(),
                    sequence: reply.get_sequence(),
                })))
            }
            IcmpType::EchoRequest => Ok(None),
            IcmpType::TimeExceeded => Ok(Some(Response::TimeExceeded { addr })),
            IcmpType::Other(icmp_type) => Ok(Some(Response::Other { addr, icmp_type })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const DEST: Ipv6Addr = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);

    fn codec() -> Ipv6 {
        Ipv6 {
            dest_addr: DEST,
            payload_pattern: PayloadPattern(0),
        }
    }

    #[test]
    fn test_make_echo_request() {
        let mut buf = [0_u8; 64];
        let packet = codec()
            .make_echo_request(&mut buf, SessionId(0xbeef), Sequence(3), PayloadSize(2))
            .unwrap();
        assert_eq!(&hex!("80 00 00 00 be ef 00 03 00 00"), packet);
    }

    #[test]
    fn test_parse_reply() {
        let bytes = hex!("81 00 00 00 be ef 00 03");
        let recv = SystemTime::UNIX_EPOCH;
        let from = IpAddr::V6(Ipv6Addr::LOCALHOST);
        let response = codec()
            .parse_response(&bytes, recv, Some(from))
            .unwrap()
            .unwrap();
        assert_eq!(
            Response::EchoReply(ResponseData {
                recv,
                addr: from,
                identifier: 0xbeef,
                sequence: 3,
            }),
            response
        );
    }

    #[test]
    fn test_parse_time_exceeded() {
        let bytes = hex!("03 00 00 00 00 00 00 00");
        let response = codec()
            .parse_response(&bytes, SystemTime::UNIX_EPOCH, None)
            .unwrap()
            .unwrap();
        assert_eq!(Response::TimeExceeded { addr: IpAddr::V6(DEST) }, response);
    }

    #[test]
    fn test_parse_unknown_type() {
        let bytes = hex!("ff 00 00 00 00 00 00 00");
        let from = IpAddr::V6(Ipv6Addr::LOCALHOST);
        let response = codec()
            .parse_response(&bytes, SystemTime::UNIX_EPOCH, Some(from))
            .unwrap()
            .unwrap();
        assert_eq!(
            Response::Other {
                addr: from,
                icmp_type: 0xff
            },
            response
        );
    }
}
