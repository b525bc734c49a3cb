use crate::buffer::Buffer;
use crate::error::{Error, Result};
use std::fmt::{Debug, Formatter};
use std::net::Ipv4Addr;

const VERSION_OFFSET: usize = 0;
const PROTOCOL_OFFSET: usize = 9;
const SOURCE_OFFSET: usize = 12;
const DESTINATION_OFFSET: usize = 16;

/// The IP protocol number for `ICMP`.
pub const PROTOCOL_ICMP: u8 = 1;

/// An `IPv4` header view.
///
/// Raw `ICMP` sockets deliver inbound datagrams with the `IPv4` header still
/// attached; this view is only ever used to locate and strip that header, so
/// it exposes the handful of fields the engine inspects and nothing else.
pub struct Ipv4Packet<'a> {
    buf: Buffer<'a>,
}

impl<'a> Ipv4Packet<'a> {
    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        if packet.len() >= Self::minimum_packet_size() {
            let ipv4 = Self {
                buf: Buffer::Immutable(packet),
            };
            let header_len = usize::from(ipv4.get_header_length()) * 4;
            if header_len < Self::minimum_packet_size() || header_len > packet.len() {
                return Err(Error::InvalidHeaderLength(header_len));
            }
            Ok(ipv4)
        } else {
            Err(Error::InsufficientPacketBuffer(
                String::from("Ipv4Packet"),
                Self::minimum_packet_size(),
                packet.len(),
            ))
        }
    }

    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        20
    }

    #[must_use]
    pub fn get_version(&self) -> u8 {
        self.buf.read_u8(VERSION_OFFSET) >> 4
    }

    #[must_use]
    pub fn get_header_length(&self) -> u8 {
        self.buf.read_u8(VERSION_OFFSET) & 0x0f
    }

    #[must_use]
    pub fn get_protocol(&self) -> u8 {
        self.buf.read_u8(PROTOCOL_OFFSET)
    }

    #[must_use]
    pub fn get_source(&self) -> Ipv4Addr {
        Ipv4Addr::new(
            self.buf.read_u8(SOURCE_OFFSET),
            self.buf.read_u8(SOURCE_OFFSET + 1),
            self.buf.read_u8(SOURCE_OFFSET + 2),
            self.buf.read_u8(SOURCE_OFFSET + 3),
        )
    }

    #[must_use]
    pub fn get_destination(&self) -> Ipv4Addr {
        Ipv4Addr::new(
            self.buf.read_u8(DESTINATION_OFFSET),
            self.buf.read_u8(DESTINATION_OFFSET + 1),
            self.buf.read_u8(DESTINATION_OFFSET + 2),
            self.buf.read_u8(DESTINATION_OFFSET + 3),
        )
    }

    /// The bytes following the header, as given by the header length field.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buf.as_slice()[usize::from(self.get_header_length()) * 4..]
    }
}

impl Debug for Ipv4Packet<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ipv4Packet")
            .field("version", &self.get_version())
            .field("header_length", &self.get_header_length())
            .field("protocol", &self.get_protocol())
            .field("source", &self.get_source())
            .field("destination", &self.get_destination())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_view_header() {
        let buf = hex!(
            "45 00 00 1c 00 00 00 00 40 01 00 00 c0 a8 01 01"
            "08 08 08 08 00 00 f7 ff 00 00 00 00"
        );
        let packet = Ipv4Packet::new_view(&buf).unwrap();
        assert_eq!(4, packet.get_version());
        assert_eq!(5, packet.get_header_length());
        assert_eq!(PROTOCOL_ICMP, packet.get_protocol());
        assert_eq!(Ipv4Addr::new(192, 168, 1, 1), packet.get_source());
        assert_eq!(Ipv4Addr::new(8, 8, 8, 8), packet.get_destination());
        assert_eq!(8, packet.payload().len());
    }

    #[test]
    fn test_view_with_options() {
        // header length of 6 words pushes the payload out by 4 bytes
        let mut buf = vec![0_u8; 24];
        buf[0] = 0x46;
        let packet = Ipv4Packet::new_view(&buf).unwrap();
        assert_eq!(6, packet.get_header_length());
        assert!(packet.payload().is_empty());
    }

    #[test]
    fn test_invalid_header_length() {
        let mut buf = [0_u8; 20];
        buf[0] = 0x41;
        let err = Ipv4Packet::new_view(&buf).unwrap_err();
        assert_eq!(Error::InvalidHeaderLength(4), err);
    }

    #[test]
    fn test_insufficient_buffer() {
        let buf = [0_u8; 19];
        let err = Ipv4Packet::new_view(&buf).unwrap_err();
        assert_eq!(
            Error::InsufficientPacketBuffer(String::from("Ipv4Packet"), 20, 19),
            err
        );
    }
}
