use crate::constants::MAX_PAYLOAD_SIZE;
use crate::error::{Error, Result};
use crate::probe::{Response, ResponseData};
use crate::types::{PayloadPattern, PayloadSize, Sequence, SessionId};
use echoprobe_packet::checksum::icmp_ipv4_checksum;
use echoprobe_packet::icmpv4::echo_reply::EchoReplyPacket;
use echoprobe_packet::icmpv4::echo_request::EchoRequestPacket;
use echoprobe_packet::icmpv4::{IcmpCode, IcmpPacket, IcmpType};
use echoprobe_packet::ipv4::{Ipv4Packet, PROTOCOL_ICMP};
use std::net::{IpAddr, Ipv4Addr};
use std::time::SystemTime;
use tracing::instrument;

/// Builds and parses IPv4 ICMP echo datagrams for one destination.
#[derive(Debug, Clone, Copy)]
pub struct Ipv4 {
    pub dest_addr: Ipv4Addr,
    pub payload_pattern: PayloadPattern,
}

impl Ipv4 {
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
        icmp.set_identifier(identifier.0);
        icmp.set_sequence(sequence.0);
        icmp.set_payload(&payload[..payload_size]);
        icmp.set_checksum(icmp_ipv4_checksum(icmp.packet()));
        Ok(&buf[..packet_size])
    }

    /// Decode an inbound datagram.
    ///
    /// Raw sockets deliver the IPv4 header; ICMP datagram sockets on Linux
    /// deliver the bare ICMP message. Both shapes are accepted. Our own
    /// looped-back echo requests decode to `None`.
    #[instrument(skip(self, bytes), level = "trace")]
    pub fn parse_response(
        &self,
        bytes: &[u8],
        recv: SystemTime,
        from: Option<IpAddr>,
    ) -> Result<Option<Response>> {
        let Some((icmp_bytes, addr)) = self.strip_ip_header(bytes, from)? else {
            return Ok(None);
        };
        let icmp = IcmpPacket::new_view(icmp_bytes)?;
        match icmp.get_icmp_type() {
            IcmpType::EchoReply => {
                let reply = EchoReplyPacket::new_view(icmp_bytes)?;
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

    /// Locate the ICMP message and its source address within a datagram.
    ///
    /// The version nibble disambiguates the two inbound shapes: bare ICMP
    /// echo messages never begin with a `0x4x` type byte.
    fn strip_ip_header<'a>(
        &self,
        bytes: &'a [u8],
        from: Option<IpAddr>,
    ) -> Result<Option<(&'a [u8], IpAddr)>> {
        if bytes.first().is_some_and(|byte| byte >> 4 == 4)
            && bytes.len() >= Ipv4Packet::minimum_packet_size()
        {
            let ipv4 = Ipv4Packet::new_view(bytes)?;
            if ipv4.get_protocol() != PROTOCOL_ICMP {
                return Ok(None);
            }
            let addr = IpAddr::V4(ipv4.get_source());
            Ok(Some((&bytes[usize::from(ipv4.get_header_length()) * 4..], addr)))
        } else {
            let addr = from.unwrap_or(IpAddr::V4(self.dest_addr));
            Ok(Some((bytes, addr)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const DEST: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

    fn codec() -> Ipv4 {
        Ipv4 {
            dest_addr: DEST,
            payload_pattern: PayloadPattern(0),
        }
    }

    #[test]
    fn test_make_echo_request() {
        let mut buf = [0_u8; 64];
        let packet = codec()
            .make_echo_request(&mut buf, SessionId(1234), Sequence(10), PayloadSize(0))
            .unwrap();
        assert_eq!(&hex!("08 00 f3 23 04 d2 00 0a"), packet);
    }

    #[test]
    fn test_make_echo_request_with_pattern() {
        let mut buf = [0_u8; 64];
        let codec = Ipv4 {
            dest_addr: DEST,
            payload_pattern: PayloadPattern(0xaa),
        };
        let packet = codec
            .make_echo_request(&mut buf, SessionId(1), Sequence(2), PayloadSize(4))
            .unwrap();
        assert_eq!(12, packet.len());
        assert_eq!(&[0xaa; 4], &packet[8..]);
        let stored = u16::from_be_bytes([packet[2], packet[3]]);
        assert_eq!(stored, icmp_ipv4_checksum(packet));
    }

    #[test]
    fn test_make_echo_request_payload_too_large() {
        let mut buf = [0_u8; 64];
        let err = codec()
            .make_echo_request(
                &mut buf,
                SessionId(1),
                Sequence(0),
                PayloadSize(u16::MAX),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPayloadSize(_)));
    }

    #[test]
    fn test_request_round_trips_as_reply() {
        // what a remote host does: echo our request back with type 0
        let mut buf = [0_u8; 64];
        let len = codec()
            .make_echo_request(&mut buf, SessionId(0x1f2e), Sequence(41), PayloadSize(8))
            .unwrap()
            .len();
        buf[0] = 0;
        let response = codec()
            .parse_response(&buf[..len], SystemTime::UNIX_EPOCH, None)
            .unwrap()
            .unwrap();
        let Response::EchoReply(data) = response else {
            panic!("expected an echo reply");
        };
        assert_eq!(0x1f2e, data.identifier);
        assert_eq!(41, data.sequence);
    }

    #[test]
    fn test_parse_reply_with_ip_header() {
        let bytes = hex!(
            "45 00 00 1c 00 00 00 00 40 01 00 00 01 01 01 01"
            "08 08 08 08"
            "00 00 fb 23 04 d2 00 0a"
        );
        let recv = SystemTime::UNIX_EPOCH;
        let response = codec().parse_response(&bytes, recv, None).unwrap().unwrap();
        assert_eq!(
            Response::EchoReply(ResponseData {
                recv,
                addr: IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
                identifier: 1234,
                sequence: 10,
            }),
            response
        );
    }

    #[test]
    fn test_parse_bare_reply() {
        let bytes = hex!("00 00 fb 23 04 d2 00 0a");
        let recv = SystemTime::UNIX_EPOCH;
        let from = IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9));
        let response = codec()
            .parse_response(&bytes, recv, Some(from))
            .unwrap()
            .unwrap();
        assert_eq!(
            Response::EchoReply(ResponseData {
                recv,
                addr: from,
                identifier: 1234,
                sequence: 10,
            }),
            response
        );
    }

    #[test]
    fn test_parse_bare_reply_without_source() {
        let bytes = hex!("00 00 fb 23 04 d2 00 0a");
        let response = codec()
            .parse_response(&bytes, SystemTime::UNIX_EPOCH, None)
            .unwrap()
            .unwrap();
        let Response::EchoReply(data) = response else {
            panic!("expected an echo reply");
        };
        assert_eq!(IpAddr::V4(DEST), data.addr);
    }

    #[test]
    fn test_parse_non_icmp_protocol() {
        // IPv4 header carrying UDP (protocol 17)
        let bytes = hex!(
            "45 00 00 1c 00 00 00 00 40 11 00 00 01 01 01 01"
            "08 08 08 08"
            "00 00 00 00 00 00 00 00"
        );
        let response = codec()
            .parse_response(&bytes, SystemTime::UNIX_EPOCH, None)
            .unwrap();
        assert_eq!(None, response);
    }

    #[test]
    fn test_parse_time_exceeded() {
        let bytes = hex!("0b 00 00 00 00 00 00 00");
        let from = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let response = codec()
            .parse_response(&bytes, SystemTime::UNIX_EPOCH, Some(from))
            .unwrap()
            .unwrap();
        assert_eq!(Response::TimeExceeded { addr: from }, response);
    }

    #[test]
    fn test_parse_looped_back_request() {
        let bytes = hex!("08 00 f3 23 04 d2 00 0a");
        let response = codec()
            .parse_response(&bytes, SystemTime::UNIX_EPOCH, None)
            .unwrap();
        assert_eq!(None, response);
    }

    #[test]
    fn test_parse_truncated_packet() {
        let bytes = hex!("00 00 fb");
        let err = codec()
            .parse_response(&bytes, SystemTime::UNIX_EPOCH, None)
            .unwrap_err();
        assert!(matches!(err, Error::Packet(_)));
    }
}
